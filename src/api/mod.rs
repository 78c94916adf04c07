pub mod dto;
pub mod errors;
pub mod handlers;
pub mod realtime;
pub mod summary;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::{control::ControlService, db::repository::SensorRepository, fusion::FusionState};

use handlers::ApiDoc;

/// Everything a request handler or viewer session can reach.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn SensorRepository>,
    pub fusion: FusionState,
    pub control: ControlService,
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/api/history", get(handlers::get_history))
        .route("/api/data", get(handlers::get_all_data))
        .route("/api/data/reset", delete(handlers::reset_data))
        .route("/api/data/{id}", get(handlers::get_data_by_id))
        .route("/api/latest", get(handlers::get_latest))
        .route("/api/summary", get(handlers::get_summary))
        .route("/api/statistics", get(handlers::get_statistics))
        .route("/api/realtime", get(handlers::get_realtime))
        .route("/api/control/led", post(handlers::control_led))
        .route("/health", get(handlers::health))
        .route("/ws", get(realtime::ws_handler))
        .with_state(state)
        .split_for_parts();

    router.route(
        "/api-docs/openapi.json",
        get(move || async move { axum::Json(api) }),
    )
}
