//! Stage identifiers and the fixed pipeline table.
//!
//! The total order of the journey lives in `STAGE_TABLE`; reordering stages is
//! a change to that table, not to the controller.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::journey::state::JourneyState;

/// An executable stage of the career journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CareerAnalysis,
    SkillValidation,
    LearningPlan,
    ProjectIdeas,
    ProjectPlan,
    ProjectBuild,
    ResumeUpgrade,
    JobMatching,
    InterviewPrep,
}

/// Where the auxiliary options for a selection-driven stage come from.
#[derive(Debug, Clone, Copy)]
pub struct AuxSource {
    /// Stage whose persisted result holds the options.
    pub stage: Stage,
    /// Key inside that result's payload.
    pub source_key: &'static str,
    /// Key the options are attached under in `StepDescriptor::data`.
    pub attach_as: &'static str,
}

/// One row of the pipeline table.
#[derive(Clone, Copy)]
pub struct StageDef {
    pub stage: Stage,
    pub name: &'static str,
    pub predecessor: Option<Stage>,
    pub completed: fn(&JourneyState) -> bool,
    /// Edge function slug on the hosted backend.
    pub function: &'static str,
    /// Operation name used in logs and notifications.
    pub operation: &'static str,
    pub accepts_selection: bool,
    pub aux: Option<AuxSource>,
    /// Stages that need no user decision run on their own after this delay.
    pub auto_advance: Option<Duration>,
}

pub static STAGE_TABLE: [StageDef; 9] = [
    StageDef {
        stage: Stage::CareerAnalysis,
        name: "Career Analysis",
        predecessor: None,
        completed: |s| s.career_analysis_completed,
        function: "execute-career-analysis",
        operation: "executeCareerAnalysis",
        accepts_selection: false,
        aux: None,
        auto_advance: None,
    },
    StageDef {
        stage: Stage::SkillValidation,
        name: "Skill Validation",
        predecessor: Some(Stage::CareerAnalysis),
        completed: |s| s.skill_validation_completed,
        function: "execute-skill-validation",
        operation: "executeSkillValidation",
        accepts_selection: true,
        aux: Some(AuxSource {
            stage: Stage::CareerAnalysis,
            source_key: "career_matches",
            attach_as: "careerMatches",
        }),
        auto_advance: None,
    },
    StageDef {
        stage: Stage::LearningPlan,
        name: "Learning Plan",
        predecessor: Some(Stage::SkillValidation),
        completed: |s| s.learning_plan_completed,
        function: "execute-learning-plan",
        operation: "executeLearningPlan",
        accepts_selection: true,
        aux: Some(AuxSource {
            stage: Stage::SkillValidation,
            source_key: "skill_gaps",
            attach_as: "skillGaps",
        }),
        auto_advance: None,
    },
    StageDef {
        stage: Stage::ProjectIdeas,
        name: "Project Ideas",
        predecessor: Some(Stage::LearningPlan),
        completed: |s| s.project_guidance_completed,
        function: "execute-project-ideas",
        operation: "executeProjectIdeas",
        accepts_selection: false,
        aux: None,
        auto_advance: Some(Duration::from_millis(1500)),
    },
    StageDef {
        stage: Stage::ProjectPlan,
        name: "Project Plan",
        predecessor: Some(Stage::ProjectIdeas),
        completed: |s| s.project_plan_completed,
        function: "execute-project-plan",
        operation: "executeProjectPlan",
        accepts_selection: true,
        aux: Some(AuxSource {
            stage: Stage::ProjectIdeas,
            source_key: "project_ideas",
            attach_as: "projectIdeas",
        }),
        auto_advance: None,
    },
    StageDef {
        stage: Stage::ProjectBuild,
        name: "Project Build",
        predecessor: Some(Stage::ProjectPlan),
        completed: |s| s.project_build_completed,
        function: "execute-project-build",
        operation: "executeProjectBuild",
        accepts_selection: true,
        aux: None,
        auto_advance: Some(Duration::from_millis(2000)),
    },
    StageDef {
        stage: Stage::ResumeUpgrade,
        name: "Resume Upgrade",
        predecessor: Some(Stage::ProjectBuild),
        completed: |s| s.resume_completed,
        function: "execute-resume-upgrade",
        operation: "executeResumeUpgrade",
        accepts_selection: false,
        aux: None,
        auto_advance: Some(Duration::from_millis(1500)),
    },
    StageDef {
        stage: Stage::JobMatching,
        name: "Job Matching",
        predecessor: Some(Stage::ResumeUpgrade),
        completed: |s| s.job_matching_completed,
        function: "execute-job-matching",
        operation: "executeJobMatching",
        accepts_selection: false,
        aux: None,
        auto_advance: Some(Duration::from_millis(1500)),
    },
    StageDef {
        stage: Stage::InterviewPrep,
        name: "Interview Preparation",
        predecessor: Some(Stage::JobMatching),
        completed: |s| s.interview_completed,
        function: "execute-interview-prep",
        operation: "executeInterviewPrep",
        accepts_selection: true,
        aux: Some(AuxSource {
            stage: Stage::JobMatching,
            source_key: "job_matches",
            attach_as: "jobMatches",
        }),
        auto_advance: None,
    },
];

impl Stage {
    /// All stages in pipeline order.
    pub fn all() -> impl Iterator<Item = Stage> {
        STAGE_TABLE.iter().map(|d| d.stage)
    }

    pub fn def(self) -> &'static StageDef {
        // Rows are laid out in declaration order of the enum.
        &STAGE_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.def().name
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::CareerAnalysis => "career_analysis",
            Stage::SkillValidation => "skill_validation",
            Stage::LearningPlan => "learning_plan",
            Stage::ProjectIdeas => "project_ideas",
            Stage::ProjectPlan => "project_plan",
            Stage::ProjectBuild => "project_build",
            Stage::ResumeUpgrade => "resume_upgrade",
            Stage::JobMatching => "job_matching",
            Stage::InterviewPrep => "interview_prep",
        }
    }

    pub fn is_completed(self, state: &JourneyState) -> bool {
        (self.def().completed)(state)
    }

    /// Whether the stage this one follows has been observed complete.
    /// The first stage is gated by the entry guard instead.
    pub fn predecessor_completed(self, state: &JourneyState) -> bool {
        match self.def().predecessor {
            Some(prev) => prev.is_completed(state),
            None => state.entry_ready(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of the step the user is on: a stage, or one of the two sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepId {
    /// Resume not yet uploaded and parsed; nothing can run.
    EntryGate,
    Stage(Stage),
    Completed,
}

impl StepId {
    pub fn as_str(self) -> &'static str {
        match self {
            StepId::EntryGate => "entry_gate",
            StepId::Stage(stage) => stage.as_str(),
            StepId::Completed => "completed",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StepId::EntryGate => "Upload Resume",
            StepId::Stage(stage) => stage.name(),
            StepId::Completed => "Journey Complete",
        }
    }

    pub fn stage(self) -> Option<Stage> {
        match self {
            StepId::Stage(stage) => Some(stage),
            _ => None,
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown step: {0}")]
pub struct UnknownStep(pub String);

impl FromStr for StepId {
    type Err = UnknownStep;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry_gate" => Ok(StepId::EntryGate),
            "completed" => Ok(StepId::Completed),
            other => Stage::all()
                .find(|stage| stage.as_str() == other)
                .map(StepId::Stage)
                .ok_or_else(|| UnknownStep(other.to_string())),
        }
    }
}

impl Serialize for StepId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StepId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Picks the step the user is on: the entry gate if the resume is not ready,
/// otherwise the first stage whose completion flag is false.
pub fn determine_current_step(state: &JourneyState) -> StepId {
    if !state.entry_ready() {
        return StepId::EntryGate;
    }
    STAGE_TABLE
        .iter()
        .find(|def| !(def.completed)(state))
        .map(|def| StepId::Stage(def.stage))
        .unwrap_or(StepId::Completed)
}
