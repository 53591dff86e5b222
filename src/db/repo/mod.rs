//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `segments.rs` - Segment CRUD and cached-count writes
//! - `users.rs` - User, order and design records, filtered user counts
//!
//! `Repository` also implements the `UserStore` and `SegmentStore` traits.

mod segments;
mod users;

use crate::domain::{Segment, SegmentId};
use crate::filter::Filter;
use crate::store::{SegmentStore, StoreError, UserStore};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Underlying pool, for health checks.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for Repository {
    async fn count_users(&self, filter: &Filter) -> Result<i64, StoreError> {
        Ok(self.count_matching_users(filter).await?)
    }
}

#[async_trait]
impl SegmentStore for Repository {
    async fn get_segment(&self, id: &SegmentId) -> Result<Option<Segment>, StoreError> {
        Ok(self.find_segment(id).await?)
    }

    async fn list_dynamic_segments(&self) -> Result<Vec<Segment>, StoreError> {
        Ok(self.query_dynamic_segments().await?)
    }

    async fn update_user_count(&self, id: &SegmentId, count: i64) -> Result<(), StoreError> {
        if self.set_user_count(id, count).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("segment {}", id)))
        }
    }
}
