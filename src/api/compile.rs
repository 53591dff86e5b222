use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::api::AppState;
use crate::error::AppError;
use crate::filter::{compile_value, Filter};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResponse {
    pub filter: Filter,
    pub matches_all: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub user_count: i64,
}

/// Compile a condition body to its filter tree. Any JSON body is accepted.
pub async fn compile_condition(Json(condition): Json<Value>) -> Json<CompileResponse> {
    let filter = compile_value(&condition);
    Json(CompileResponse {
        matches_all: filter.is_always(),
        filter,
    })
}

/// Count users matching an unsaved condition.
pub async fn preview_condition(
    State(state): State<AppState>,
    Json(condition): Json<Value>,
) -> Result<Json<PreviewResponse>, AppError> {
    let user_count = state.materializer.preview_count(&condition).await?;
    Ok(Json(PreviewResponse { user_count }))
}
