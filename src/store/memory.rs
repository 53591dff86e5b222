//! In-memory store for testing without a database.

use super::{SegmentStore, StoreError, UserStore};
use crate::domain::{Segment, SegmentId};
use crate::filter::{Filter, UserRecord};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory user and segment store with injectable failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Vec<UserRecord>,
    segments: Mutex<BTreeMap<SegmentId, Segment>>,
    failing_filters: Vec<Filter>,
    failing_reads: HashSet<SegmentId>,
    failing_writes: HashSet<SegmentId>,
    fail_listing: bool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user record.
    pub fn with_user(mut self, user: UserRecord) -> Self {
        self.users.push(user);
        self
    }

    /// Add multiple user records.
    pub fn with_users(mut self, users: impl IntoIterator<Item = UserRecord>) -> Self {
        self.users.extend(users);
        self
    }

    /// Add a segment.
    pub fn with_segment(self, segment: Segment) -> Self {
        self.lock_segments().insert(segment.id.clone(), segment);
        self
    }

    /// Make `count_users` fail whenever it is asked for exactly `filter`.
    pub fn failing_count_for(mut self, filter: Filter) -> Self {
        self.failing_filters.push(filter);
        self
    }

    /// Make `get_segment` fail for `id`.
    pub fn failing_read_for(mut self, id: SegmentId) -> Self {
        self.failing_reads.insert(id);
        self
    }

    /// Make `update_user_count` fail for `id`.
    pub fn failing_write_for(mut self, id: SegmentId) -> Self {
        self.failing_writes.insert(id);
        self
    }

    /// Make `list_dynamic_segments` fail.
    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    /// Snapshot of a stored segment.
    pub fn segment(&self, id: &SegmentId) -> Option<Segment> {
        self.lock_segments().get(id).cloned()
    }

    /// Number of successful count writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Highest number of `count_users` calls observed running at once.
    pub fn max_concurrent_counts(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn lock_segments(&self) -> std::sync::MutexGuard<'_, BTreeMap<SegmentId, Segment>> {
        // Poisoned only after a panic mid-update; the map itself stays consistent.
        self.segments
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn count_users(&self, filter: &Filter) -> Result<i64, StoreError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        // Suspend once so concurrently scheduled counts overlap.
        tokio::task::yield_now().await;

        let result = if self.failing_filters.contains(filter) {
            Err(StoreError::Database("injected count failure".to_string()))
        } else {
            Ok(filter.count_matching(&self.users))
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl SegmentStore for MemoryStore {
    async fn get_segment(&self, id: &SegmentId) -> Result<Option<Segment>, StoreError> {
        if self.failing_reads.contains(id) {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        Ok(self.lock_segments().get(id).cloned())
    }

    async fn list_dynamic_segments(&self) -> Result<Vec<Segment>, StoreError> {
        if self.fail_listing {
            return Err(StoreError::Unavailable("injected listing failure".to_string()));
        }
        Ok(self
            .lock_segments()
            .values()
            .filter(|s| s.is_dynamic)
            .cloned()
            .collect())
    }

    async fn update_user_count(&self, id: &SegmentId, count: i64) -> Result<(), StoreError> {
        if self.failing_writes.contains(id) {
            return Err(StoreError::Database("injected write failure".to_string()));
        }
        let mut segments = self.lock_segments();
        let segment = segments
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("segment {}", id)))?;
        segment.user_count = count;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
