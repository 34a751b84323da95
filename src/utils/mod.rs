pub mod binary_resolver;
pub mod config;

use chrono::{DateTime, SecondsFormat, Utc};

pub use config::Config;

/// ISO-8601 UTC timestamp with millisecond precision, e.g. `2026-10-16T09:42:00.123Z`
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time as [`iso_timestamp`]
pub fn now_iso() -> String {
    iso_timestamp(Utc::now())
}
