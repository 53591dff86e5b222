use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::info;

use crate::api::AppState;
use crate::domain::{NewSegment, Segment, SegmentId, SegmentUpdate};
use crate::error::AppError;
use crate::presets::find_preset;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSegmentRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub conditions: Option<Value>,
    /// Preset key seeding `conditions` (and the name, if none is given).
    pub preset: Option<String>,
    pub is_dynamic: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSegmentRequest {
    pub name: Option<String>,
    /// Absent leaves the description alone; `null` clears it.
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub conditions: Option<Value>,
    pub is_dynamic: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StrictQuery {
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentsResponse {
    pub segments: Vec<Segment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub segment_id: SegmentId,
    pub user_count: i64,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn validated_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("Segment name must not be blank".into()));
    }
    Ok(trimmed.to_string())
}

pub async fn list_segments(
    State(state): State<AppState>,
) -> Result<Json<SegmentsResponse>, AppError> {
    let segments = state.repo.query_segments().await?;
    Ok(Json(SegmentsResponse { segments }))
}

pub async fn get_segment(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Segment>, AppError> {
    let id = SegmentId::new(id);
    state
        .repo
        .find_segment(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("segment {}", id)))
}

/// Create a segment and compute its initial count.
pub async fn create_segment(
    State(state): State<AppState>,
    Json(body): Json<CreateSegmentRequest>,
) -> Result<(StatusCode, Json<Segment>), AppError> {
    let preset = match body.preset.as_deref() {
        Some(key) => Some(
            find_preset(key)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown preset: {}", key)))?,
        ),
        None => None,
    };

    let name = match (body.name.as_deref(), &preset) {
        (Some(name), _) => validated_name(name)?,
        (None, Some(preset)) => preset.display_name.to_string(),
        (None, None) => return Err(AppError::BadRequest("Segment name is required".into())),
    };

    let conditions = match (body.conditions, &preset) {
        (Some(conditions), _) => conditions,
        (None, Some(preset)) => preset.condition.to_value(),
        (None, None) => Value::Object(Default::default()),
    };

    let new_segment = NewSegment {
        name,
        description: body
            .description
            .or_else(|| preset.as_ref().map(|p| p.description.to_string())),
        conditions,
        is_dynamic: body.is_dynamic.unwrap_or(true),
    };

    let mut segment = state.repo.insert_segment(&new_segment).await?;
    segment.user_count = state
        .materializer
        .calculate_segment_user_count(&segment.id)
        .await;

    info!(
        segment_id = %segment.id,
        preset = body.preset.as_deref().unwrap_or("-"),
        user_count = segment.user_count,
        "Segment created"
    );
    Ok((StatusCode::CREATED, Json(segment)))
}

/// Apply a partial update; edits that change membership trigger a recount.
pub async fn update_segment(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<UpdateSegmentRequest>,
) -> Result<Json<Segment>, AppError> {
    let id = SegmentId::new(id);
    let update = SegmentUpdate {
        name: body.name.as_deref().map(validated_name).transpose()?,
        description: body.description,
        conditions: body.conditions,
        is_dynamic: body.is_dynamic,
    };

    let mut segment = state
        .repo
        .update_segment(&id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("segment {}", id)))?;

    if update.touches_membership() {
        segment.user_count = state.materializer.calculate_segment_user_count(&id).await;
    }

    Ok(Json(segment))
}

pub async fn delete_segment(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let id = SegmentId::new(id);
    if state.repo.delete_segment(&id).await? {
        info!(segment_id = %id, "Segment deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("segment {}", id)))
    }
}

/// Recount one segment. Without `strict`, failures report a count of 0.
pub async fn count_segment(
    Path(id): Path<String>,
    Query(params): Query<StrictQuery>,
    State(state): State<AppState>,
) -> Result<Json<CountResponse>, AppError> {
    let segment_id = SegmentId::new(id);
    let user_count = if params.strict {
        state
            .materializer
            .try_calculate_segment_user_count(&segment_id)
            .await?
    } else {
        state
            .materializer
            .calculate_segment_user_count(&segment_id)
            .await
    };

    Ok(Json(CountResponse {
        segment_id,
        user_count,
    }))
}

/// Recount every dynamic segment. With `strict`, returns per-segment outcomes.
pub async fn refresh_segments(
    Query(params): Query<StrictQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    if params.strict {
        let report = state.materializer.try_update_all_segment_counts().await?;
        return Ok(Json(report.summary()).into_response());
    }

    state.materializer.update_all_segment_counts().await;
    Ok(Json(serde_json::json!({"status": "completed"})).into_response())
}
