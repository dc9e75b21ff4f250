use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::journey::selection::StageCall;

/// Outcome reported by a remote stage executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Runs one stage of the journey on the hosted backend.
///
/// Implementations persist completion flags and stage results themselves;
/// the controller only reads them back. A transport error is returned as
/// `Err` and treated exactly like `success: false`.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    async fn execute(&self, user_id: Uuid, call: &StageCall) -> anyhow::Result<StageResult>;
}
