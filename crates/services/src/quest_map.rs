use std::sync::Arc;

use backend::QuestApi;
use log::info;
use quest_core::model::{
    ClassAnalytics, ClassroomId, Level, LevelGate, MistakeEntry, MistakeScope, Progress,
    RemedialPlan,
};
use quest_core::session::SessionConfig;

use crate::Clock;
use crate::error::QuestMapError;
use crate::sessions::AssessmentController;

/// Classroom-level views around the assessment: progress, level gating,
/// past mistakes and teacher analytics.
#[derive(Clone)]
pub struct QuestMapService {
    api: Arc<dyn QuestApi>,
    clock: Clock,
    session_config: SessionConfig,
}

impl QuestMapService {
    #[must_use]
    pub fn new(api: Arc<dyn QuestApi>, clock: Clock, session_config: SessionConfig) -> Self {
        Self {
            api,
            clock,
            session_config,
        }
    }

    /// # Errors
    ///
    /// Returns `QuestMapError::Backend` if the request fails.
    pub async fn list_classrooms(&self) -> Result<Vec<ClassroomId>, QuestMapError> {
        Ok(self.api.list_classrooms().await?)
    }

    /// # Errors
    ///
    /// Returns `QuestMapError::Backend` if the request fails.
    pub async fn progress(&self, classroom: &ClassroomId) -> Result<Progress, QuestMapError> {
        Ok(self.api.progress(classroom).await?)
    }

    /// Whether `level` can be attempted now.
    ///
    /// # Errors
    ///
    /// Returns `QuestMapError::Backend` if progress cannot be fetched.
    pub async fn gate(&self, classroom: &ClassroomId, level: Level) -> Result<LevelGate, QuestMapError> {
        Ok(self.progress(classroom).await?.gate(level))
    }

    /// The remedial plan to work through while the frontier level cools down.
    ///
    /// `None` once the cooldown has passed, even if the backend still reports
    /// a plan.
    ///
    /// # Errors
    ///
    /// Returns `QuestMapError::Backend` if progress cannot be fetched.
    pub async fn remedial_plan(
        &self,
        classroom: &ClassroomId,
    ) -> Result<Option<RemedialPlan>, QuestMapError> {
        let progress = self.progress(classroom).await?;
        match progress.gate(progress.unlocked_level) {
            LevelGate::CoolingDown { remedial_plan, .. } => Ok(remedial_plan),
            LevelGate::Open | LevelGate::Locked { .. } => Ok(None),
        }
    }

    /// Open an assessment controller for `level` if its gate is open.
    ///
    /// Must be called inside a tokio runtime; the controller starts its
    /// fetches immediately.
    ///
    /// # Errors
    ///
    /// Returns `QuestMapError::Locked` or `QuestMapError::CoolingDown` when the
    /// level cannot be attempted, or `QuestMapError::Backend`.
    pub async fn open_session(
        &self,
        classroom: ClassroomId,
        level: Level,
    ) -> Result<AssessmentController, QuestMapError> {
        match self.gate(&classroom, level).await? {
            LevelGate::Open => {}
            LevelGate::Locked { unlocked_level } => {
                return Err(QuestMapError::Locked {
                    level,
                    unlocked_level,
                });
            }
            LevelGate::CoolingDown { remaining_secs, .. } => {
                return Err(QuestMapError::CoolingDown {
                    level,
                    remaining_secs,
                });
            }
        }

        info!("level {level} of {classroom} is open");
        let mut controller = AssessmentController::new(
            Arc::clone(&self.api),
            self.clock,
            self.session_config.clone(),
        );
        controller.open(classroom, level);
        Ok(controller)
    }

    /// # Errors
    ///
    /// Returns `QuestMapError::Backend` if the request fails.
    pub async fn mistakes(&self, scope: &MistakeScope) -> Result<Vec<MistakeEntry>, QuestMapError> {
        Ok(self.api.mistakes(scope).await?)
    }

    /// # Errors
    ///
    /// Returns `QuestMapError::Backend` if the request fails.
    pub async fn analytics(&self, classroom: &ClassroomId) -> Result<ClassAnalytics, QuestMapError> {
        Ok(self.api.analytics(classroom).await?)
    }
}
