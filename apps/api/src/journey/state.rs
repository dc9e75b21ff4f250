use serde::{Deserialize, Serialize};

use crate::journey::stage::{Stage, STAGE_TABLE};
use crate::models::journey::JourneyStateRow;

/// Persisted stage-completion flags for one user.
///
/// Stages are assumed to complete in order; nothing here validates that.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyState {
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
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JourneyProgress {
    pub completed_stages: usize,
    pub total_stages: usize,
    pub percent: u32,
}

impl JourneyState {
    /// Resume uploaded and parsed: the pipeline may start.
    pub fn entry_ready(&self) -> bool {
        self.resume_uploaded && self.resume_parsed
    }

    fn flags_mut(&mut self) -> [(&'static str, &mut bool); 11] {
        [
            ("resume_uploaded", &mut self.resume_uploaded),
            ("resume_parsed", &mut self.resume_parsed),
            ("career_analysis_completed", &mut self.career_analysis_completed),
            ("skill_validation_completed", &mut self.skill_validation_completed),
            ("learning_plan_completed", &mut self.learning_plan_completed),
            ("project_guidance_completed", &mut self.project_guidance_completed),
            ("project_plan_completed", &mut self.project_plan_completed),
            ("project_build_completed", &mut self.project_build_completed),
            ("resume_completed", &mut self.resume_completed),
            ("job_matching_completed", &mut self.job_matching_completed),
            ("interview_completed", &mut self.interview_completed),
        ]
    }

    /// Folds a freshly loaded state into this one. A flag observed true in
    /// this session stays true even if the store reports otherwise.
    /// Returns the names of flags the store tried to regress.
    pub fn merge_monotonic(&mut self, mut fresh: JourneyState) -> Vec<&'static str> {
        let mut regressed = Vec::new();
        for ((name, current), (_, incoming)) in self.flags_mut().into_iter().zip(fresh.flags_mut())
        {
            if *current && !*incoming {
                regressed.push(name);
                continue;
            }
            *current = *incoming;
        }
        regressed
    }

    pub fn progress(&self) -> JourneyProgress {
        let total_stages = STAGE_TABLE.len();
        let completed_stages = Stage::all().filter(|s| s.is_completed(self)).count();
        JourneyProgress {
            completed_stages,
            total_stages,
            percent: (completed_stages * 100 / total_stages) as u32,
        }
    }

    #[cfg(test)]
    pub fn mark_completed(&mut self, stage: Stage) {
        match stage {
            Stage::CareerAnalysis => self.career_analysis_completed = true,
            Stage::SkillValidation => self.skill_validation_completed = true,
            Stage::LearningPlan => self.learning_plan_completed = true,
            Stage::ProjectIdeas => self.project_guidance_completed = true,
            Stage::ProjectPlan => self.project_plan_completed = true,
            Stage::ProjectBuild => self.project_build_completed = true,
            Stage::ResumeUpgrade => self.resume_completed = true,
            Stage::JobMatching => self.job_matching_completed = true,
            Stage::InterviewPrep => self.interview_completed = true,
        }
    }
}

impl From<JourneyStateRow> for JourneyState {
    fn from(row: JourneyStateRow) -> Self {
        JourneyState {
            resume_uploaded: row.resume_uploaded,
            resume_parsed: row.resume_parsed,
            career_analysis_completed: row.career_analysis_completed,
            skill_validation_completed: row.skill_validation_completed,
            learning_plan_completed: row.learning_plan_completed,
            project_guidance_completed: row.project_guidance_completed,
            project_plan_completed: row.project_plan_completed,
            project_build_completed: row.project_build_completed,
            resume_completed: row.resume_completed,
            job_matching_completed: row.job_matching_completed,
            interview_completed: row.interview_completed,
        }
    }
}
