//! In-memory store and scripted executor shared by the journey tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::journey::executor::{StageExecutor, StageResult};
use crate::journey::selection::StageCall;
use crate::journey::stage::Stage;
use crate::journey::state::JourneyState;
use crate::journey::store::{JourneyStore, StoreError};

pub fn ready_state() -> JourneyState {
    JourneyState {
        resume_uploaded: true,
        resume_parsed: true,
        ..JourneyState::default()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<JourneyState>,
    results: Mutex<HashMap<Stage, Value>>,
    fail_state: AtomicBool,
    fail_results: AtomicBool,
    results_gate: Mutex<Option<Arc<Notify>>>,
}

impl MemoryStore {
    pub fn new(state: JourneyState) -> Self {
        Self {
            state: Mutex::new(state),
            ..Self::default()
        }
    }

    pub fn replace_state(&self, state: JourneyState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn complete(&self, stage: Stage) {
        self.state.lock().unwrap().mark_completed(stage);
    }

    pub fn set_result(&self, stage: Stage, data: Value) {
        self.results.lock().unwrap().insert(stage, data);
    }

    pub fn fail_state(&self) {
        self.fail_state.store(true, Ordering::SeqCst);
    }

    pub fn restore_state(&self) {
        self.fail_state.store(false, Ordering::SeqCst);
    }

    pub fn fail_results(&self) {
        self.fail_results.store(true, Ordering::SeqCst);
    }

    /// The next `latest_result` call waits for a permit on the returned gate.
    pub fn gate_results(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.results_gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl JourneyStore for MemoryStore {
    async fn load_state(&self, _user_id: Uuid) -> Result<JourneyState, StoreError> {
        if self.fail_state.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.state.lock().unwrap().clone())
    }

    async fn latest_result(&self, _user_id: Uuid, stage: Stage) -> Result<Option<Value>, StoreError> {
        let gate = self.results_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_results.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.results.lock().unwrap().get(&stage).cloned())
    }
}

enum Scripted {
    Result(StageResult),
    Transport(String),
}

/// Executor that records calls and, like the real functions, marks the
/// stage complete in the store on success. Unscripted stages succeed.
pub struct StubExecutor {
    store: Arc<MemoryStore>,
    scripted: Mutex<HashMap<Stage, Scripted>>,
    calls: Mutex<Vec<StageCall>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl StubExecutor {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            scripted: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    pub fn respond(&self, stage: Stage, result: StageResult) {
        self.scripted
            .lock()
            .unwrap()
            .insert(stage, Scripted::Result(result));
    }

    pub fn fail_transport(&self, stage: Stage, message: &str) {
        self.scripted
            .lock()
            .unwrap()
            .insert(stage, Scripted::Transport(message.to_string()));
    }

    /// Every call from now on waits for a permit on the returned gate.
    pub fn gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<StageCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl StageExecutor for StubExecutor {
    async fn execute(&self, _user_id: Uuid, call: &StageCall) -> anyhow::Result<StageResult> {
        self.calls.lock().unwrap().push(call.clone());

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let stage = call.stage();
        let scripted = self.scripted.lock().unwrap().remove(&stage);
        let result = match scripted {
            Some(Scripted::Transport(message)) => return Err(anyhow::anyhow!(message)),
            Some(Scripted::Result(result)) => result,
            None => StageResult::ok(json!({})),
        };
        if result.success {
            self.store.complete(stage);
        }
        Ok(result)
    }
}
