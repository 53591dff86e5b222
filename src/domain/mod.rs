//! Domain types for user segmentation.
//!
//! This module provides:
//! - Lossless money handling via the Decimal wrapper
//! - Primitives: TimeMs, SegmentId, UserId
//! - The Condition predicate vocabulary and its lenient JSON reader
//! - Segment records and their create/update inputs

pub mod condition;
pub mod decimal;
pub mod primitives;
pub mod segment;

pub use condition::Condition;
pub use decimal::Decimal;
pub use primitives::{SegmentId, TimeMs, UserId};
pub use segment::{NewSegment, Segment, SegmentUpdate};
