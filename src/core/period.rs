use std::fmt::{Display, Formatter};

use chrono::{
    DateTime,
    Datelike,
    Days,
    NaiveDateTime,
    NaiveTime,
    SecondsFormat,
    TimeDelta,
    TimeZone,
    Timelike,
};
use serde::{Deserialize, Serialize};

/// Longest daylight saving gap we step over when a period starts inside one, in quarter-hours.
const MAX_GAP_QUARTERS: i64 = 8;

/// Accounting period of a meter, always aligned to the local wall clock.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Hourly,
    Daily,

    /// Weeks start on Sunday at midnight.
    Weekly,

    Monthly,
}

impl Period {
    pub const fn title(self) -> &'static str {
        match self {
            Self::Hourly => "Hourly",
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Start of the period instance containing `at`, in the same time zone.
    pub fn start_of<Tz: TimeZone>(self, at: &DateTime<Tz>) -> DateTime<Tz> {
        let local = at.naive_local();
        let date = local.date();
        let first_day = match self {
            Self::Hourly => {
                // Truncate the instant itself, so that an hour repeated at the fall-back is
                // a period on its own, with its own offset.
                let elapsed = TimeDelta::seconds(i64::from(local.minute() * 60 + local.second()))
                    + TimeDelta::nanoseconds(i64::from(local.nanosecond()));
                return at.clone() - elapsed;
            }
            Self::Daily => date,
            Self::Weekly => date - Days::new(u64::from(date.weekday().num_days_from_sunday())),
            Self::Monthly => date - Days::new(u64::from(date.day0())),
        };
        resolve_local(at, first_day.and_time(NaiveTime::MIN))
    }

    pub fn key_of<Tz: TimeZone>(self, at: &DateTime<Tz>) -> PeriodKey {
        PeriodKey::from_start(&self.start_of(at))
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map the local wall-clock time onto an instant in the time zone of `at`.
///
/// Ambiguous times resolve to the earliest instant, since a day starts at its first midnight.
/// A time that falls into a daylight saving gap resolves to the first existing instant after it.
fn resolve_local<Tz: TimeZone>(at: &DateTime<Tz>, local: NaiveDateTime) -> DateTime<Tz> {
    let timezone = at.timezone();
    (0..=MAX_GAP_QUARTERS)
        .map(|n_quarters| local + TimeDelta::minutes(15 * n_quarters))
        .find_map(|candidate| timezone.from_local_datetime(&candidate).earliest())
        .unwrap_or_else(|| at.clone())
}

/// Identifier of a period instance: its start as a local ISO-8601 timestamp with the UTC offset,
/// for example `2025-01-05T00:00:00+01:00`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(transparent)]
pub struct PeriodKey(String);

impl PeriodKey {
    pub fn from_start<Tz: TimeZone>(start: &DateTime<Tz>) -> Self {
        Self(start.fixed_offset().to_rfc3339_opts(SecondsFormat::Secs, false))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
