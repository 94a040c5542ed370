use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::{admin, handlers, middleware::auth_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let admin_routes = Router::new()
        .route("/pipeline", get(admin::get_pipeline))
        .route("/pipeline/start", post(admin::start_pipeline))
        .route("/pipeline/stop", post(admin::stop_pipeline))
        .route("/schedule", get(admin::get_schedule).post(admin::apply_schedule))
        .route("/status", get(admin::get_status))
        .route("/config", get(admin::get_config))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .nest("/admin", admin_routes)
        .with_state(state)
}
