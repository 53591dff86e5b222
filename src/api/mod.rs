pub mod compile;
pub mod health;
pub mod presets;
pub mod segments;

use crate::db::Repository;
use crate::materialize::Materializer;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub materializer: Arc<Materializer>,
}

impl AppState {
    /// State whose materializer counts and writes through `repo`.
    pub fn new(repo: Arc<Repository>) -> Self {
        let materializer = Arc::new(Materializer::new(repo.clone(), repo.clone()));
        Self { repo, materializer }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/presets", get(presets::get_presets))
        .route("/v1/compile", post(compile::compile_condition))
        .route("/v1/preview", post(compile::preview_condition))
        .route(
            "/v1/segments",
            get(segments::list_segments).post(segments::create_segment),
        )
        .route("/v1/segments/refresh", post(segments::refresh_segments))
        .route(
            "/v1/segments/:id",
            get(segments::get_segment)
                .put(segments::update_segment)
                .delete(segments::delete_segment),
        )
        .route("/v1/segments/:id/count", post(segments::count_segment))
        .layer(cors)
        .with_state(state)
}
