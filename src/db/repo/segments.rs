//! Segment persistence operations for the repository.

use crate::domain::{NewSegment, Segment, SegmentId, SegmentUpdate, TimeMs};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::warn;

use super::Repository;

const SEGMENT_COLUMNS: &str =
    "id, name, description, conditions, is_dynamic, user_count, created_at, updated_at";

impl Repository {
    /// Insert a new segment with a zero cached count.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_segment(&self, new: &NewSegment) -> Result<Segment, sqlx::Error> {
        let now = TimeMs::now();
        let segment = Segment {
            id: SegmentId::generate(),
            name: new.name.clone(),
            description: new.description.clone(),
            conditions: new.conditions.clone(),
            is_dynamic: new.is_dynamic,
            user_count: 0,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO segments (
                id, name, description, conditions, is_dynamic, user_count, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(segment.id.as_str())
        .bind(&segment.name)
        .bind(segment.description.as_deref())
        .bind(segment.conditions.to_string())
        .bind(segment.is_dynamic)
        .bind(segment.user_count)
        .bind(segment.created_at.as_ms())
        .bind(segment.updated_at.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(segment)
    }

    /// Load one segment by id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn find_segment(&self, id: &SegmentId) -> Result<Option<Segment>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM segments WHERE id = ?",
            SEGMENT_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(segment_from_row))
    }

    /// All segments, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_segments(&self) -> Result<Vec<Segment>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM segments ORDER BY created_at DESC, id ASC",
            SEGMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(segment_from_row).collect())
    }

    /// Segments whose count is recomputed on demand.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_dynamic_segments(&self) -> Result<Vec<Segment>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM segments WHERE is_dynamic = 1 ORDER BY id ASC",
            SEGMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(segment_from_row).collect())
    }

    /// Apply a partial update. Returns the updated segment, or `None` if absent.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn update_segment(
        &self,
        id: &SegmentId,
        update: &SegmentUpdate,
    ) -> Result<Option<Segment>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM segments WHERE id = ?",
            SEGMENT_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        let Some(mut segment) = row.as_ref().map(segment_from_row) else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            segment.name = name.clone();
        }
        if let Some(description) = &update.description {
            segment.description = description.clone();
        }
        if let Some(conditions) = &update.conditions {
            segment.conditions = conditions.clone();
        }
        if let Some(is_dynamic) = update.is_dynamic {
            segment.is_dynamic = is_dynamic;
        }
        segment.updated_at = TimeMs::now();

        sqlx::query(
            r#"
            UPDATE segments
            SET name = ?, description = ?, conditions = ?, is_dynamic = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&segment.name)
        .bind(segment.description.as_deref())
        .bind(segment.conditions.to_string())
        .bind(segment.is_dynamic)
        .bind(segment.updated_at.as_ms())
        .bind(id.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(segment))
    }

    /// Delete a segment. Returns whether a row was removed.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub async fn delete_segment(&self, id: &SegmentId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM segments WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrite the cached user count. Returns whether the segment exists.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn set_user_count(&self, id: &SegmentId, count: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE segments SET user_count = ? WHERE id = ?")
            .bind(count)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn segment_from_row(row: &SqliteRow) -> Segment {
    let id: String = row.get("id");
    let raw_conditions: String = row.get("conditions");

    // Unparseable text is kept as a JSON string, which compiles to the identity filter.
    let conditions = serde_json::from_str(&raw_conditions).unwrap_or_else(|e| {
        warn!(
            segment_id = %id,
            error = %e,
            "Stored segment conditions are not valid JSON"
        );
        Value::String(raw_conditions.clone())
    });

    Segment {
        id: SegmentId::new(id),
        name: row.get("name"),
        description: row.get("description"),
        conditions,
        is_dynamic: row.get::<i64, _>("is_dynamic") != 0,
        user_count: row.get("user_count"),
        created_at: TimeMs::new(row.get("created_at")),
        updated_at: TimeMs::new(row.get("updated_at")),
    }
}
