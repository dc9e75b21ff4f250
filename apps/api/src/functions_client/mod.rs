//! Edge function client: the single point of entry for remote stage calls.
//!
//! ARCHITECTURAL RULE: No other module may call the hosted functions directly.
//! The controller reaches them through the `StageExecutor` trait only.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::journey::executor::{StageExecutor, StageResult};
use crate::journey::selection::{Selection, StageCall};

const FUNCTIONS_PATH: &str = "functions/v1";
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum FunctionsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Function error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Gave up after {retries} attempts")]
    Exhausted { retries: u32 },
}

#[derive(Debug, Serialize)]
struct FunctionRequest<'a> {
    user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    selection: Option<&'a Selection>,
}

#[derive(Debug, Deserialize)]
struct FunctionErrorBody {
    #[serde(alias = "message")]
    error: String,
}

/// Calls the per-stage edge functions on the hosted backend.
/// Retries rate limits, 5xx and connection failures with exponential backoff.
#[derive(Clone)]
pub struct EdgeFunctionClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl EdgeFunctionClient {
    pub fn new(base_url: &str, api_key: String) -> Result<Self, FunctionsError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn function_url(&self, slug: &str) -> String {
        format!("{}/{FUNCTIONS_PATH}/{slug}", self.base_url)
    }

    /// Invokes one stage function and returns its reported result.
    /// A 4xx answer is folded into a failed `StageResult` carrying the server's message.
    pub async fn invoke(&self, user_id: Uuid, call: &StageCall) -> Result<StageResult, FunctionsError> {
        let def = call.stage().def();
        let url = self.function_url(def.function);
        let body = FunctionRequest {
            user_id,
            selection: call.selection(),
        };

        let mut last_error: Option<FunctionsError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "{} attempt {} failed, retrying after {}ms...",
                    def.operation,
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .header("apikey", &self.api_key)
                .json(&body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(FunctionsError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("{} returned {}: {}", def.operation, status, body);
                last_error = Some(FunctionsError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Ok(StageResult::failed(error_message(&body)));
            }

            let result: StageResult = response.json().await?;
            debug!(
                "{} for user {user_id} finished: success={}",
                def.operation, result.success
            );
            return Ok(result);
        }

        Err(last_error.unwrap_or(FunctionsError::Exhausted {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl StageExecutor for EdgeFunctionClient {
    async fn execute(&self, user_id: Uuid, call: &StageCall) -> anyhow::Result<StageResult> {
        Ok(self.invoke(user_id, call).await?)
    }
}

/// Pulls a human-readable message out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<FunctionErrorBody>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                "Stage function rejected the request".to_string()
            } else {
                body.trim().to_string()
            }
        })
}
