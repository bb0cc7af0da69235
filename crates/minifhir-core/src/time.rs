use std::fmt;

use serde::{Serialize, Serializer};
use time::{OffsetDateTime, UtcOffset, macros::format_description};

/// A UTC instant rendered with second precision, e.g. `2024-05-01T10:00:00Z`.
///
/// The rendering is fixed width, so comparing two rendered instants as strings
/// orders them chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FhirInstant(OffsetDateTime);

impl FhirInstant {
    pub fn new(dt: OffsetDateTime) -> Self {
        let utc = dt.to_offset(UtcOffset::UTC);
        Self(utc.replace_nanosecond(0).unwrap_or(utc))
    }
}

impl fmt::Display for FhirInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
        match self.0.format(format) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl Serialize for FhirInstant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Current time in UTC.
pub fn now_utc() -> FhirInstant {
    FhirInstant::new(OffsetDateTime::now_utc())
}
