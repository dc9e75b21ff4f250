use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::journey::stage::Stage;
use crate::journey::state::JourneyState;
use crate::models::journey::{JourneyStateRow, StageResultRow};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read access to the persisted journey. Writes happen inside the remote
/// stage functions.
#[async_trait]
pub trait JourneyStore: Send + Sync {
    /// Completion flags for a user. A user with no row has completed nothing.
    async fn load_state(&self, user_id: Uuid) -> Result<JourneyState, StoreError>;

    /// Payload of the latest successful run of `stage`, if any.
    async fn latest_result(&self, user_id: Uuid, stage: Stage) -> Result<Option<Value>, StoreError>;
}

/// Postgres-backed store over the hosted database.
#[derive(Clone)]
pub struct PgJourneyStore {
    pool: PgPool,
}

impl PgJourneyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JourneyStore for PgJourneyStore {
    async fn load_state(&self, user_id: Uuid) -> Result<JourneyState, StoreError> {
        let row = sqlx::query_as::<_, JourneyStateRow>("SELECT * FROM get_sigma_journey_state($1)")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(JourneyState::from).unwrap_or_default())
    }

    async fn latest_result(&self, user_id: Uuid, stage: Stage) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query_as::<_, StageResultRow>(
            r#"
            SELECT *
            FROM sigma_stage_results
            WHERE user_id = $1 AND stage = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(stage.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.data))
    }
}
