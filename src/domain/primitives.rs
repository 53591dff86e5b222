//! Domain primitives: TimeMs, SegmentId, UserId.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_ms(&self) -> i64 {
        self.0
    }

    /// The instant `days` whole days before this one.
    pub fn days_before(&self, days: i64) -> Self {
        TimeMs(self.0.saturating_sub(days.saturating_mul(MS_PER_DAY)))
    }

    /// Parse an RFC 3339 timestamp (e.g. `2024-01-31T00:00:00Z`).
    pub fn from_rfc3339(s: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s).map(|dt| TimeMs(dt.timestamp_millis()))
    }

    /// Format as RFC 3339 in UTC with millisecond precision.
    ///
    /// Falls back to the raw millisecond count for instants chrono cannot represent.
    pub fn to_rfc3339(&self) -> String {
        match Utc.timestamp_millis_opt(self.0).single() {
            Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
            None => self.0.to_string(),
        }
    }

    /// Read a timestamp from JSON: an RFC 3339 string or integer epoch milliseconds.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Self::from_rfc3339(s).ok(),
            serde_json::Value::Number(n) => n.as_i64().map(TimeMs),
            _ => None,
        }
    }
}

impl std::fmt::Display for TimeMs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

/// Segment identifier (UUID v4 text).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub String);

impl SegmentId {
    /// Create a SegmentId from a string.
    pub fn new(id: String) -> Self {
        SegmentId(id)
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        SegmentId(uuid::Uuid::new_v4().to_string())
    }

    /// Get the id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Create a UserId from a string.
    pub fn new(id: String) -> Self {
        UserId(id)
    }

    /// Get the id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_days_before() {
        let t = TimeMs::new(10 * MS_PER_DAY);
        assert_eq!(t.days_before(3).as_ms(), 7 * MS_PER_DAY);
    }

    #[test]
    fn test_rfc3339_roundtrip() {
        let t = TimeMs::from_rfc3339("2024-01-31T12:30:00Z").unwrap();
        assert_eq!(t.as_ms(), 1706704200000);
        assert_eq!(t.to_rfc3339(), "2024-01-31T12:30:00.000Z");
    }

    #[test]
    fn test_rfc3339_with_offset() {
        let t = TimeMs::from_rfc3339("2024-01-31T20:30:00+08:00").unwrap();
        assert_eq!(t.as_ms(), 1706704200000);
    }

    #[test]
    fn test_from_json_variants() {
        assert_eq!(
            TimeMs::from_json(&json!(1706704200000i64)),
            Some(TimeMs::new(1706704200000))
        );
        assert_eq!(
            TimeMs::from_json(&json!("2024-01-31T12:30:00Z")),
            Some(TimeMs::new(1706704200000))
        );
        assert_eq!(TimeMs::from_json(&json!("yesterday")), None);
        assert_eq!(TimeMs::from_json(&json!(true)), None);
        assert_eq!(TimeMs::from_json(&json!(1.5)), None);
    }

    #[test]
    fn test_segment_id_generate_unique() {
        let a = SegmentId::generate();
        let b = SegmentId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_ids_serialize_transparent() {
        let id = UserId::new("u-1".to_string());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"u-1\"");
    }
}
