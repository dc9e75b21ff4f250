use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::journey::stage::Stage;

/// A user's choice at a decision point (a career match, a skill set, a
/// project idea, a job). Opaque to the controller; forwarded as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection(pub Value);

/// A fully-typed invocation of one remote stage executor.
///
/// Stages that take no decision input have no slot for one, so a selection
/// passed for them is dropped when the call is built.
#[derive(Debug, Clone, PartialEq)]
pub enum StageCall {
    CareerAnalysis,
    SkillValidation { career: Option<Selection> },
    LearningPlan { skills: Option<Selection> },
    ProjectIdeas,
    ProjectPlan { project: Option<Selection> },
    ProjectBuild { project: Option<Selection> },
    ResumeUpgrade,
    JobMatching,
    InterviewPrep { job: Option<Selection> },
}

impl StageCall {
    pub fn new(stage: Stage, selection: Option<Selection>) -> Self {
        match stage {
            Stage::CareerAnalysis => StageCall::CareerAnalysis,
            Stage::SkillValidation => StageCall::SkillValidation { career: selection },
            Stage::LearningPlan => StageCall::LearningPlan { skills: selection },
            Stage::ProjectIdeas => StageCall::ProjectIdeas,
            Stage::ProjectPlan => StageCall::ProjectPlan { project: selection },
            Stage::ProjectBuild => StageCall::ProjectBuild { project: selection },
            Stage::ResumeUpgrade => StageCall::ResumeUpgrade,
            Stage::JobMatching => StageCall::JobMatching,
            Stage::InterviewPrep => StageCall::InterviewPrep { job: selection },
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            StageCall::CareerAnalysis => Stage::CareerAnalysis,
            StageCall::SkillValidation { .. } => Stage::SkillValidation,
            StageCall::LearningPlan { .. } => Stage::LearningPlan,
            StageCall::ProjectIdeas => Stage::ProjectIdeas,
            StageCall::ProjectPlan { .. } => Stage::ProjectPlan,
            StageCall::ProjectBuild { .. } => Stage::ProjectBuild,
            StageCall::ResumeUpgrade => Stage::ResumeUpgrade,
            StageCall::JobMatching => Stage::JobMatching,
            StageCall::InterviewPrep { .. } => Stage::InterviewPrep,
        }
    }

    pub fn selection(&self) -> Option<&Selection> {
        match self {
            StageCall::SkillValidation { career: s }
            | StageCall::LearningPlan { skills: s }
            | StageCall::ProjectPlan { project: s }
            | StageCall::ProjectBuild { project: s }
            | StageCall::InterviewPrep { job: s } => s.as_ref(),
            StageCall::CareerAnalysis
            | StageCall::ProjectIdeas
            | StageCall::ResumeUpgrade
            | StageCall::JobMatching => None,
        }
    }
}
