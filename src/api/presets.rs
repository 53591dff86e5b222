use axum::Json;
use std::collections::BTreeMap;

use crate::presets::{list_presets, Preset};

/// All built-in presets keyed by preset key, windows evaluated at request time.
pub async fn get_presets() -> Json<BTreeMap<&'static str, Preset>> {
    Json(list_presets())
}
