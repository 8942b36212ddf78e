/// Daily-data endpoint of the climate service
pub const DAILY_DATA_URL: &str = "https://climate.weather.gc.ca/climate_data/daily_data_e.html";

/// Default station and location tag
pub const DEFAULT_STATION_ID: u32 = 27174;
pub const DEFAULT_LOCATION: &str = "Winnipeg, MB";

/// Fixed query window the service expects on every request
pub const QUERY_START_YEAR: i32 = 1840;
pub const QUERY_END_YEAR: i32 = 2018;

/// Format of the full date carried by a row's abbreviation element,
/// e.g. "October 19, 1996"
pub const ROW_DATE_FORMAT: &str = "%B %d, %Y";

/// Text token that opens the monthly summary section and ends row extraction
pub const SUMMARY_MARKER: &str = "Sum";

/// Attribute value marking a disabled "previous" pagination control,
/// i.e. the oldest available page
pub const LAST_PAGE_MARKER: &str = "previous disabled";

/// Placeholder the source uses for an unrecorded reading
pub const MISSING_MARKER: &str = "M";

/// Defaults
pub const DEFAULT_DB_FILE: &str = "weather.sqlite";
pub const FETCH_TIMEOUT_SECS: u64 = 30;
