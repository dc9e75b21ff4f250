//! Axum route handlers for the Journey API.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::journey::controller::{ExecuteOutcome, JourneySnapshot};
use crate::journey::selection::Selection;
use crate::journey::stage::{Stage, StepId};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ExecuteStepRequest {
    pub selection: Option<Selection>,
}

#[derive(Debug, Serialize)]
pub struct ExecuteStepResponse {
    pub outcome: ExecuteOutcome,
    pub snapshot: JourneySnapshot,
}

#[derive(Debug, Serialize)]
pub struct CanExecuteResponse {
    pub step_id: StepId,
    pub can_execute: bool,
}

fn parse_step(raw: &str) -> Result<StepId, AppError> {
    raw.parse::<StepId>()
        .map_err(|e| AppError::Validation(e.to_string()))
}

fn parse_stage(raw: &str) -> Result<Stage, AppError> {
    match parse_step(raw)? {
        StepId::Stage(stage) => Ok(stage),
        other => Err(AppError::Validation(format!("{other} is not an executable step"))),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/journey/:user_id
pub async fn handle_get_journey(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<JourneySnapshot>, AppError> {
    let controller = state.registry.get_or_load(user_id).await?;
    Ok(Json(controller.snapshot().await))
}

/// POST /api/v1/journey/:user_id/refresh
///
/// Reloads completion flags from the store and recomputes the current step.
pub async fn handle_refresh(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<JourneySnapshot>, AppError> {
    let controller = state.registry.get_or_load(user_id).await?;
    controller.refresh().await?;
    Ok(Json(controller.snapshot().await))
}

/// GET /api/v1/journey/:user_id/steps/:step_id/can-execute
pub async fn handle_can_execute(
    State(state): State<AppState>,
    Path((user_id, step_id)): Path<(Uuid, String)>,
) -> Result<Json<CanExecuteResponse>, AppError> {
    let step_id = parse_step(&step_id)?;
    let controller = state.registry.get_or_load(user_id).await?;
    Ok(Json(CanExecuteResponse {
        step_id,
        can_execute: controller.can_execute(step_id).await,
    }))
}

/// POST /api/v1/journey/:user_id/steps/:step_id/execute
///
/// Runs the step if it is current and nothing else is running. A failed or
/// skipped stage is still a 200: the outcome and snapshot say what happened.
/// The body is optional, but one that is sent must be valid JSON.
pub async fn handle_execute_step(
    State(state): State<AppState>,
    Path((user_id, step_id)): Path<(Uuid, String)>,
    body: Result<Json<ExecuteStepRequest>, JsonRejection>,
) -> Result<Json<ExecuteStepResponse>, AppError> {
    let stage = parse_stage(&step_id)?;
    let request = match body {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => ExecuteStepRequest::default(),
        Err(rejection) => return Err(AppError::Validation(rejection.body_text())),
    };

    let controller = state.registry.get_or_load(user_id).await?;
    let outcome = controller.execute_step(stage, request.selection).await;

    Ok(Json(ExecuteStepResponse {
        outcome,
        snapshot: controller.snapshot().await,
    }))
}
