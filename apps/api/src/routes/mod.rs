pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::journey::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/journey/:user_id", get(handlers::handle_get_journey))
        .route(
            "/api/v1/journey/:user_id/refresh",
            post(handlers::handle_refresh),
        )
        .route(
            "/api/v1/journey/:user_id/steps/:step_id/can-execute",
            get(handlers::handle_can_execute),
        )
        .route(
            "/api/v1/journey/:user_id/steps/:step_id/execute",
            post(handlers::handle_execute_step),
        )
        .with_state(state)
}
