//! Storage abstractions the segment materializer runs against.
//!
//! The SQLite `Repository` implements both traits for production; the
//! in-memory `MemoryStore` backs tests and supports failure injection.

use crate::domain::{Segment, SegmentId};
use crate::filter::Filter;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod memory;

pub use memory::MemoryStore;

/// User-record store: counts users matching a compiled filter.
#[async_trait]
pub trait UserStore: Send + Sync + fmt::Debug {
    /// Count user records for which `filter` holds.
    async fn count_users(&self, filter: &Filter) -> Result<i64, StoreError>;
}

/// Segment persistence.
#[async_trait]
pub trait SegmentStore: Send + Sync + fmt::Debug {
    /// Read one segment, `None` if absent.
    async fn get_segment(&self, id: &SegmentId) -> Result<Option<Segment>, StoreError>;

    /// Every segment flagged `is_dynamic`.
    async fn list_dynamic_segments(&self) -> Result<Vec<Segment>, StoreError>;

    /// Overwrite the cached user count of one segment.
    ///
    /// Returns `StoreError::NotFound` if the segment no longer exists.
    async fn update_user_count(&self, id: &SegmentId, count: i64) -> Result<(), StoreError>;
}

/// Error type for store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Backend query or write failed.
    #[error("Database error: {0}")]
    Database(String),
    /// A stored row could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
    /// The row targeted by a write does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// Backend unreachable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Decode(err.to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}
