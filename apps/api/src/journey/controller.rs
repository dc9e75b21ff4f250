//! Journey controller: decides which stage a user is on and is the only
//! component allowed to run a stage.
//!
//! Flow per user:
//! 1. `refresh` loads the completion flags, picks the first incomplete stage,
//!    and attaches the options a selection-driven stage needs.
//! 2. `execute_step` runs that stage through the `StageExecutor`, one at a time.
//! 3. On success a reload is scheduled; stages without a decision point are
//!    then started by an auto-advance timer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::journey::executor::StageExecutor;
use crate::journey::notify::{Notification, Notifier};
use crate::journey::selection::{Selection, StageCall};
use crate::journey::stage::{determine_current_step, Stage, StepId};
use crate::journey::state::{JourneyProgress, JourneyState};
use crate::journey::step::{empty_options, ControllerPhase, StepDescriptor, StepStatus};
use crate::journey::store::{JourneyStore, StoreError};

#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    /// Pause between a successful stage and the state reload.
    pub reload_delay: Duration,
    /// A remote call running longer than this counts as failed.
    pub stage_timeout: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            reload_delay: Duration::from_millis(1000),
            stage_timeout: Duration::from_secs(180),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteOutcome {
    Executed,
    Failed,
    /// The step was not executable; nothing was dispatched.
    Skipped,
}

/// What the presentation layer sees.
#[derive(Debug, Clone, Serialize)]
pub struct JourneySnapshot {
    pub user_id: Uuid,
    pub agent_state: JourneyState,
    pub current_step: Option<StepDescriptor>,
    pub is_executing: bool,
    pub phase: ControllerPhase,
    pub progress: JourneyProgress,
    pub notifications: Vec<Notification>,
}

#[derive(Default)]
struct Inner {
    agent_state: JourneyState,
    current_step: Option<StepDescriptor>,
    phase: ControllerPhase,
    /// Stage with a pending auto-advance timer, if any.
    scheduled_auto_advance: Option<Stage>,
    /// Last selection made per stage this session.
    selections: HashMap<Stage, Selection>,
    /// Bumped whenever a stage starts; a refresh computed across a bump is stale.
    generation: u64,
}

impl Inner {
    fn can_execute(&self, step: StepId) -> bool {
        !self.phase.is_executing()
            && self
                .current_step
                .as_ref()
                .is_some_and(|current| current.id == step && current.is_actionable())
    }

    /// Stage that should start on its own now, with its delay.
    fn auto_advance_due(&self) -> Option<(Stage, Duration)> {
        let stage = self.current_step.as_ref()?.id.stage()?;
        let delay = stage.def().auto_advance?;
        if self.scheduled_auto_advance == Some(stage) || !self.auto_advance_ready(stage) {
            return None;
        }
        Some((stage, delay))
    }

    fn auto_advance_ready(&self, stage: Stage) -> bool {
        self.can_execute(StepId::Stage(stage)) && stage.predecessor_completed(&self.agent_state)
    }

    /// Input an auto-advanced stage carries without asking the user.
    fn implicit_selection(&self, stage: Stage) -> Option<Selection> {
        match stage {
            Stage::ProjectBuild => self.selections.get(&Stage::ProjectPlan).cloned(),
            _ => None,
        }
    }
}

pub struct JourneyController {
    user_id: Uuid,
    store: Arc<dyn JourneyStore>,
    executor: Arc<dyn StageExecutor>,
    settings: ControllerSettings,
    notifier: Notifier,
    inner: Mutex<Inner>,
}

impl JourneyController {
    pub fn new(
        user_id: Uuid,
        store: Arc<dyn JourneyStore>,
        executor: Arc<dyn StageExecutor>,
        settings: ControllerSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            user_id,
            store,
            executor,
            settings,
            notifier: Notifier::default(),
            inner: Mutex::new(Inner::default()),
        })
    }

    /// Creates a controller and performs the initial state load.
    pub async fn load(
        user_id: Uuid,
        store: Arc<dyn JourneyStore>,
        executor: Arc<dyn StageExecutor>,
        settings: ControllerSettings,
    ) -> Result<Arc<Self>, StoreError> {
        let controller = Self::new(user_id, store, executor, settings);
        controller.refresh().await?;
        Ok(controller)
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Reloads the journey state and recomputes the current step.
    pub async fn refresh(self: &Arc<Self>) -> Result<(), StoreError> {
        let fresh = self.store.load_state(self.user_id).await?;

        let (step_id, generation) = {
            let mut inner = self.inner.lock().await;
            let regressed = inner.agent_state.merge_monotonic(fresh);
            if !regressed.is_empty() {
                warn!(
                    "Store reported regressed flags for user {}, keeping them set: {regressed:?}",
                    self.user_id
                );
            }
            (determine_current_step(&inner.agent_state), inner.generation)
        };

        let data = match step_id {
            StepId::Stage(stage) => self.load_step_data(stage).await,
            _ => Value::Null,
        };

        let due = {
            let mut inner = self.inner.lock().await;
            if inner.phase.is_executing() {
                // The running stage schedules its own reload when it settles.
                debug!("Skipping recompute for user {} while a stage runs", self.user_id);
                return Ok(());
            }
            if inner.generation != generation {
                // A stage ran while the options loaded; its outcome stands
                // until the reload it schedules.
                debug!("Discarding stale recompute for user {}", self.user_id);
                return Ok(());
            }
            if determine_current_step(&inner.agent_state) != step_id {
                // A newer refresh already moved on.
                return Ok(());
            }
            let previous = inner.current_step.as_ref().map(|s| s.id);
            if previous != Some(step_id) {
                info!("User {} is now on step {}", self.user_id, step_id);
            }
            inner.current_step = Some(StepDescriptor::enter(step_id, data));

            let due = inner.auto_advance_due();
            if let Some((stage, _)) = due {
                inner.scheduled_auto_advance = Some(stage);
            }
            due
        };

        if let Some((stage, delay)) = due {
            self.schedule_auto_advance(stage, delay);
        }
        Ok(())
    }

    /// Options for a selection-driven stage, taken from the result of the
    /// stage that produces them. Any failure yields an empty option list.
    async fn load_step_data(&self, stage: Stage) -> Value {
        let Some(aux) = stage.def().aux else {
            return Value::Null;
        };

        match self.store.latest_result(self.user_id, aux.stage).await {
            Ok(Some(payload)) => match payload.get(aux.source_key) {
                Some(options @ Value::Array(_)) => {
                    let mut data = serde_json::Map::new();
                    data.insert(aux.attach_as.to_string(), options.clone());
                    Value::Object(data)
                }
                _ => empty_options(aux.attach_as),
            },
            Ok(None) => empty_options(aux.attach_as),
            Err(e) => {
                warn!(
                    "Failed to load {} options for user {}: {e}",
                    aux.attach_as, self.user_id
                );
                empty_options(aux.attach_as)
            }
        }
    }

    pub async fn can_execute(&self, step: StepId) -> bool {
        self.inner.lock().await.can_execute(step)
    }

    pub async fn is_executing(&self) -> bool {
        self.inner.lock().await.phase.is_executing()
    }

    /// Runs `stage` if it is the current, actionable step and nothing else is
    /// running. Failures leave the step pending with the error attached.
    pub async fn execute_step(
        self: &Arc<Self>,
        stage: Stage,
        selection: Option<Selection>,
    ) -> ExecuteOutcome {
        let call = {
            let mut inner = self.inner.lock().await;
            if !inner.can_execute(StepId::Stage(stage)) {
                debug!("Ignoring {stage} for user {}: not executable", self.user_id);
                return ExecuteOutcome::Skipped;
            }
            inner.phase = ControllerPhase::Executing(stage);
            inner.generation += 1;
            if let Some(step) = inner.current_step.as_mut() {
                step.status = StepStatus::Executing;
                step.error = None;
            }
            if let Some(chosen) = selection.as_ref().filter(|_| stage.def().accepts_selection) {
                inner.selections.insert(stage, chosen.clone());
            }
            StageCall::new(stage, selection)
        };

        let def = stage.def();
        info!("Running {} for user {}", def.operation, self.user_id);

        let dispatched = tokio::time::timeout(
            self.settings.stage_timeout,
            self.executor.execute(self.user_id, &call),
        )
        .await;

        let result = match dispatched {
            Ok(Ok(result)) if result.success => Ok(result.data.unwrap_or(Value::Null)),
            Ok(Ok(result)) => Err(result
                .error
                .unwrap_or_else(|| format!("{} failed", def.name))),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "{} timed out after {}s",
                def.name,
                self.settings.stage_timeout.as_secs()
            )),
        };

        let mut inner = self.inner.lock().await;
        inner.phase = ControllerPhase::Idle;
        let step = inner.current_step.as_mut().filter(|s| s.is_stage(stage));

        match result {
            Ok(data) => {
                if let Some(step) = step {
                    step.status = StepStatus::Completed;
                    step.data = data;
                    step.error = None;
                }
                drop(inner);
                info!("{} succeeded for user {}", def.operation, self.user_id);
                self.notifier.success(stage);
                self.schedule_reload();
                ExecuteOutcome::Executed
            }
            Err(message) => {
                if let Some(step) = step {
                    step.status = StepStatus::Pending;
                    step.error = Some(message.clone());
                }
                drop(inner);
                warn!(
                    "{} failed for user {}: {message}",
                    def.operation, self.user_id
                );
                self.notifier.failure(stage, &message);
                ExecuteOutcome::Failed
            }
        }
    }

    fn schedule_reload(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let delay = self.settings.reload_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = this.refresh().await {
                warn!("Journey reload failed for user {}: {e}", this.user_id);
            }
        });
    }

    /// Starts `stage` after `delay` unless the situation changed meanwhile.
    fn schedule_auto_advance(self: &Arc<Self>, stage: Stage, delay: Duration) {
        debug!(
            "Auto-advancing {stage} for user {} in {}ms",
            self.user_id,
            delay.as_millis()
        );
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let selection = {
                let mut inner = this.inner.lock().await;
                if inner.scheduled_auto_advance == Some(stage) {
                    inner.scheduled_auto_advance = None;
                }
                if !inner.auto_advance_ready(stage) {
                    debug!("Dropping stale auto-advance of {stage} for user {}", this.user_id);
                    return;
                }
                inner.implicit_selection(stage)
            };

            this.execute_step(stage, selection).await;
        });
    }

    pub async fn snapshot(&self) -> JourneySnapshot {
        let inner = self.inner.lock().await;
        JourneySnapshot {
            user_id: self.user_id,
            agent_state: inner.agent_state.clone(),
            current_step: inner.current_step.clone(),
            is_executing: inner.phase.is_executing(),
            phase: inner.phase,
            progress: inner.agent_state.progress(),
            notifications: self.notifier.recent(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }
}
