//! Identifier and time types shared by every entity.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque server identifier.
///
/// Every entity kind (notifications, meet requests, messages, users) has its own
/// id space. Within one kind a higher id means a newer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u64);

impl ResourceId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for ResourceId {
    fn from(value: u64) -> Self {
        ResourceId(value)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wire format used by the server for message dates, e.g. `2016-06-14T10:00:00.000+0000`.
const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Wall-clock instant with millisecond precision, the precision of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current time, truncated to milliseconds.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        Timestamp(datetime.trunc_subsecs(3))
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Formats the timestamp the way the server encodes it.
    pub fn to_wire(&self) -> String {
        self.0.format(WIRE_FORMAT).to_string()
    }

    /// Parses a server timestamp.
    ///
    /// Accepts the numeric-offset wire format as well as RFC 3339 (`...Z`), which
    /// is what the server emits for UTC dates.
    pub fn parse_wire(value: &str) -> Option<Self> {
        if let Ok(parsed) = DateTime::parse_from_str(value, WIRE_FORMAT) {
            return Some(Self::from_datetime(parsed.with_timezone(&Utc)));
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            return Some(Self::from_datetime(parsed.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| Self::from_datetime(naive.and_utc()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse_wire(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}
