use super::{Condition, SegmentId, TimeMs};
use serde::Serialize;
use serde_json::Value;

/// A named, persisted group of users defined by a condition.
///
/// `conditions` is kept as the raw stored JSON; it is interpreted leniently at
/// compile time. `user_count` is a cached projection, valid only as of the
/// last materialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: SegmentId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub conditions: Value,
    pub is_dynamic: bool,
    pub user_count: i64,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
}

impl Segment {
    /// Parsed view of the stored conditions.
    pub fn condition(&self) -> Condition {
        Condition::from_value(&self.conditions)
    }
}

/// Input for creating a segment.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSegment {
    pub name: String,
    pub description: Option<String>,
    pub conditions: Value,
    pub is_dynamic: bool,
}

impl NewSegment {
    pub fn new(name: impl Into<String>, conditions: Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            conditions,
            is_dynamic: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn fixed(mut self) -> Self {
        self.is_dynamic = false;
        self
    }
}

/// Partial update. `None` leaves a field unchanged; `description: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub conditions: Option<Value>,
    pub is_dynamic: Option<bool>,
}

impl SegmentUpdate {
    pub fn is_empty(&self) -> bool {
        *self == SegmentUpdate::default()
    }

    /// Whether applying this update changes which users the segment matches.
    pub fn touches_membership(&self) -> bool {
        self.conditions.is_some() || self.is_dynamic == Some(true)
    }
}
