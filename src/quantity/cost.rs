quantity!(Cost, "¤");
