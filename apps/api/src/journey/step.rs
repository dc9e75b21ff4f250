use serde::Serialize;
use serde_json::Value;

use crate::journey::stage::{Stage, StepId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Executing,
    Completed,
    Blocked,
}

/// The step the controller currently presents. Rebuilt on every
/// recomputation; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct StepDescriptor {
    pub id: StepId,
    pub name: &'static str,
    pub status: StepStatus,
    pub data: Value,
    pub error: Option<String>,
}

impl StepDescriptor {
    /// Fresh descriptor for a freshly determined step.
    pub fn enter(id: StepId, data: Value) -> Self {
        let status = match id {
            StepId::EntryGate => StepStatus::Blocked,
            StepId::Completed => StepStatus::Completed,
            StepId::Stage(_) => StepStatus::Pending,
        };
        Self {
            id,
            name: id.name(),
            status,
            data,
            error: None,
        }
    }

    pub fn is_stage(&self, stage: Stage) -> bool {
        self.id == StepId::Stage(stage)
    }

    /// Whether a user (or the auto-advance timer) may act on this step.
    pub fn is_actionable(&self) -> bool {
        matches!(self.status, StepStatus::Pending)
    }
}

/// What the controller is doing right now. Only one stage executes at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum ControllerPhase {
    #[default]
    Idle,
    Executing(Stage),
}

impl ControllerPhase {
    pub fn is_executing(&self) -> bool {
        matches!(self, ControllerPhase::Executing(_))
    }
}

/// Empty option set attached when auxiliary data cannot be loaded.
pub fn empty_options(attach_as: &str) -> Value {
    let mut data = serde_json::Map::new();
    data.insert(attach_as.to_string(), Value::Array(Vec::new()));
    Value::Object(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enter_sets_status_from_step_kind() {
        assert_eq!(
            StepDescriptor::enter(StepId::EntryGate, Value::Null).status,
            StepStatus::Blocked
        );
        assert_eq!(
            StepDescriptor::enter(StepId::Completed, Value::Null).status,
            StepStatus::Completed
        );
        let step = StepDescriptor::enter(StepId::Stage(Stage::CareerAnalysis), Value::Null);
        assert_eq!(step.status, StepStatus::Pending);
        assert_eq!(step.name, "Career Analysis");
        assert!(step.error.is_none());
        assert!(step.is_actionable());
    }

    #[test]
    fn test_descriptor_serializes_for_presentation() {
        let step = StepDescriptor::enter(
            StepId::Stage(Stage::SkillValidation),
            empty_options("careerMatches"),
        );
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["id"], "skill_validation");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["data"]["careerMatches"], json!([]));
    }

    #[test]
    fn test_phase_serialization() {
        assert_eq!(
            serde_json::to_value(ControllerPhase::Idle).unwrap(),
            json!({ "state": "idle" })
        );
        assert_eq!(
            serde_json::to_value(ControllerPhase::Executing(Stage::JobMatching)).unwrap(),
            json!({ "state": "executing", "stage": "job_matching" })
        );
    }
}
