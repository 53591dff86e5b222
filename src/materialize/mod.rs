//! Segment count materialization.
//!
//! Loads a segment's stored conditions, compiles them, counts matching users
//! and writes the count back onto the segment. The lenient entry points never
//! fail: errors are logged and reported as a count of 0, leaving the cached
//! count as it was. The `try_` variants expose the same work with typed errors.

use crate::domain::SegmentId;
use crate::filter::compile_value;
use crate::store::{SegmentStore, StoreError, UserStore};
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct Materializer {
    users: Arc<dyn UserStore>,
    segments: Arc<dyn SegmentStore>,
}

impl Materializer {
    pub fn new(users: Arc<dyn UserStore>, segments: Arc<dyn SegmentStore>) -> Self {
        Self { users, segments }
    }

    /// Recompute and persist one segment's user count.
    ///
    /// Returns 0 on any failure; a genuinely empty segment also returns 0.
    pub async fn calculate_segment_user_count(&self, id: &SegmentId) -> i64 {
        match self.try_calculate_segment_user_count(id).await {
            Ok(count) => count,
            Err(e) => {
                error!(segment_id = %id, error = %e, "Segment count failed, reporting 0");
                0
            }
        }
    }

    /// Recompute and persist one segment's user count, surfacing failures.
    pub async fn try_calculate_segment_user_count(
        &self,
        id: &SegmentId,
    ) -> Result<i64, MaterializeError> {
        let segment = self
            .segments
            .get_segment(id)
            .await
            .map_err(MaterializeError::Load)?
            .ok_or_else(|| MaterializeError::SegmentNotFound(id.clone()))?;

        let filter = compile_value(&segment.conditions);
        if filter.is_always() {
            debug!(segment_id = %id, "Segment has no effective conditions, counting all users");
        }

        let count = self
            .users
            .count_users(&filter)
            .await
            .map_err(MaterializeError::Count)?;

        self.segments
            .update_user_count(id, count)
            .await
            .map_err(MaterializeError::Write)?;

        debug!(segment_id = %id, user_count = count, "Segment count materialized");
        Ok(count)
    }

    /// Recompute every dynamic segment concurrently, waiting for all.
    ///
    /// Individual failures are logged and do not affect other segments.
    pub async fn update_all_segment_counts(&self) {
        match self.try_update_all_segment_counts().await {
            Ok(report) => {
                for (id, e) in report.failures() {
                    error!(segment_id = %id, error = %e, "Segment count failed, reporting 0");
                }
            }
            Err(e) => error!(error = %e, "Listing dynamic segments failed, nothing refreshed"),
        }
    }

    /// Recompute every dynamic segment concurrently and report each outcome.
    ///
    /// Only a failure to list the segments is returned as an error.
    pub async fn try_update_all_segment_counts(&self) -> Result<RefreshReport, MaterializeError> {
        let segments = self
            .segments
            .list_dynamic_segments()
            .await
            .map_err(MaterializeError::Load)?;

        let ids: Vec<SegmentId> = segments.into_iter().map(|s| s.id).collect();
        let results = join_all(ids.iter().map(|id| self.try_calculate_segment_user_count(id))).await;

        let report = RefreshReport {
            outcomes: ids.into_iter().zip(results).collect(),
        };

        if report.failed() > 0 {
            warn!(
                succeeded = report.succeeded(),
                failed = report.failed(),
                "Segment refresh finished with failures"
            );
        } else {
            info!(succeeded = report.succeeded(), "Segment refresh finished");
        }
        Ok(report)
    }

    /// Count users matching an unsaved condition without touching any segment.
    pub async fn preview_count(&self, conditions: &Value) -> Result<i64, StoreError> {
        self.users.count_users(&compile_value(conditions)).await
    }
}

/// Per-segment outcome of a batch refresh.
#[derive(Debug)]
pub struct RefreshReport {
    pub outcomes: Vec<(SegmentId, Result<i64, MaterializeError>)>,
}

impl RefreshReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&SegmentId, &MaterializeError)> {
        self.outcomes
            .iter()
            .filter_map(|(id, r)| r.as_ref().err().map(|e| (id, e)))
    }

    /// Serializable summary for API responses.
    pub fn summary(&self) -> RefreshSummary {
        RefreshSummary {
            succeeded: self.succeeded(),
            failed: self.failed(),
            segments: self
                .outcomes
                .iter()
                .map(|(id, r)| SegmentOutcome {
                    segment_id: id.clone(),
                    user_count: r.as_ref().ok().copied(),
                    error: r.as_ref().err().map(|e| e.to_string()),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub segments: Vec<SegmentOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentOutcome {
    pub segment_id: SegmentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("segment {0} not found")]
    SegmentNotFound(SegmentId),
    #[error("loading segments failed: {0}")]
    Load(StoreError),
    #[error("counting users failed: {0}")]
    Count(StoreError),
    #[error("writing user count failed: {0}")]
    Write(StoreError),
}
