use crate::model::ids::Level;

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Whether the student keeps up with the chapter deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LearnerStatus {
    #[default]
    OnTrack,
    Lagging,
}

impl LearnerStatus {
    /// Unknown tags fall back to `OnTrack`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "lagging" => Self::Lagging,
            _ => Self::OnTrack,
        }
    }
}

//
// ─── REMEDIAL PLAN ─────────────────────────────────────────────────────────────
//

/// Single-choice question attached to a remedial plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PracticeQuestion {
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
}

impl PracticeQuestion {
    /// Exact match against the expected answer, like the assessment's
    /// multiple-choice grading. Without an expected answer nothing checks out.
    #[must_use]
    pub fn check(&self, answer: &str) -> bool {
        self.correct_answer.as_deref() == Some(answer)
    }
}

/// Diagnosis produced by the backend after a failed attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemedialPlan {
    pub diagnosis: String,
    pub explanation: String,
    pub practice_question: Option<PracticeQuestion>,
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Snapshot of a student's standing in a classroom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub xp: u32,
    pub unlocked_level: Level,
    pub cooldown_remaining_secs: Option<u32>,
    pub remedial_plan: Option<RemedialPlan>,
    pub status: LearnerStatus,
    pub deadline_message: Option<String>,
    pub current_chapter_title: Option<String>,
    pub next_chapter_title: Option<String>,
    pub total_chapters: u32,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            xp: 0,
            unlocked_level: Level::FIRST,
            cooldown_remaining_secs: None,
            remedial_plan: None,
            status: LearnerStatus::OnTrack,
            deadline_message: None,
            current_chapter_title: None,
            next_chapter_title: None,
            total_chapters: 0,
        }
    }
}

/// Whether a level may be attempted right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelGate {
    Open,
    Locked {
        unlocked_level: Level,
    },
    /// The last attempt at this level failed and the retake lockout is running.
    CoolingDown {
        remaining_secs: u32,
        remedial_plan: Option<RemedialPlan>,
    },
}

impl Progress {
    /// Decide whether `level` can be opened.
    ///
    /// The cooldown only guards the frontier level; levels already passed stay
    /// open for practice.
    #[must_use]
    pub fn gate(&self, level: Level) -> LevelGate {
        if level > self.unlocked_level {
            return LevelGate::Locked {
                unlocked_level: self.unlocked_level,
            };
        }

        match self.cooldown_remaining_secs {
            Some(remaining_secs) if remaining_secs > 0 && level == self.unlocked_level => {
                LevelGate::CoolingDown {
                    remaining_secs,
                    remedial_plan: self.remedial_plan.clone(),
                }
            }
            _ => LevelGate::Open,
        }
    }
}
