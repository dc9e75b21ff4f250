use std::sync::Arc;

use crate::journey::registry::ControllerRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Per-user journey controllers. Each holds the store and executor handles.
    pub registry: Arc<ControllerRegistry>,
}
