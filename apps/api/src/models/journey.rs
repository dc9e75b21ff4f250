use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// One row of `get_sigma_journey_state(user_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JourneyStateRow {
    pub user_id: Uuid,
    pub resume_uploaded: bool,
    pub resume_parsed: bool,
    pub career_analysis_completed: bool,
    pub skill_validation_completed: bool,
    pub learning_plan_completed: bool,
    pub project_guidance_completed: bool,
    pub project_plan_completed: bool,
    pub project_build_completed: bool,
    pub resume_completed: bool,
    pub job_matching_completed: bool,
    pub interview_completed: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload persisted by a remote stage function on success.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StageResultRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stage: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}
