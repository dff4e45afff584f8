use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Timestamp layout of the `Time` column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Time zone used when writing the `Time` column
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogTimeZone {
    /// The host's local time, like a wall clock next to the barrier
    Local,
    Named(Tz),
}

impl LogTimeZone {
    /// Resolve a configured zone name. `local` (any case) selects host time.
    pub fn resolve(name: &str) -> Result<Self, String> {
        if name.trim().eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        name.trim()
            .parse::<Tz>()
            .map(Self::Named)
            .map_err(|e| format!("unknown time zone '{}': {}", name, e))
    }

    pub fn format(&self, timestamp: DateTime<Utc>) -> String {
        match self {
            Self::Local => timestamp
                .with_timezone(&Local)
                .format(TIMESTAMP_FORMAT)
                .to_string(),
            Self::Named(tz) => timestamp
                .with_timezone(tz)
                .format(TIMESTAMP_FORMAT)
                .to_string(),
        }
    }

    /// Interpret a logged wall-clock time in this zone
    pub fn to_utc(&self, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Self::Local => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|t| t.with_timezone(&Utc)),
            Self::Named(tz) => tz
                .from_local_datetime(naive)
                .earliest()
                .map(|t| t.with_timezone(&Utc)),
        }
    }
}

impl Default for LogTimeZone {
    fn default() -> Self {
        Self::Local
    }
}

pub fn parse_timestamp(field: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(field.trim(), TIMESTAMP_FORMAT).ok()
}
