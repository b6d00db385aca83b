use std::fmt;
use std::time::Duration;

use crate::model::{ClassroomId, Level, MistakeRecord};

//
// ─── IDENTITY ──────────────────────────────────────────────────────────────────
//

/// Identity of one opened session.
///
/// Bumped on every open and close. Anything issued under an older generation
/// (timer ticks, backend replies) is dropped on arrival.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }

    #[must_use]
    pub(crate) fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Identifies one scheduled feedback-to-advance transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackTicket {
    pub generation: Generation,
    pub seq: u64,
}

/// Identifies one in-flight hint purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HintTicket {
    pub generation: Generation,
    pub question_index: usize,
    pub ledger_epoch: u64,
    pub cost: u32,
}

//
// ─── SUBMISSION ────────────────────────────────────────────────────────────────
//

/// Everything sent to the backend when an attempt ends.
///
/// Built once when submission begins; a retry re-sends the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    pub classroom: ClassroomId,
    pub level: Level,
    pub score: u32,
    pub max_score: u32,
    pub mistakes: Vec<MistakeRecord>,
}

/// What ended the interactive loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    LastAnswer,
    Manual,
    Timeout,
}

//
// ─── EFFECTS ───────────────────────────────────────────────────────────────────
//

/// Work the owner of the state machine must carry out after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchQuestions {
        generation: Generation,
        classroom: ClassroomId,
        level: Level,
    },
    FetchBalance {
        generation: Generation,
        classroom: ClassroomId,
    },
    /// Start a one-second tick that reports back with `generation`.
    StartCountdown { generation: Generation },
    StopCountdown,
    ScheduleFeedback {
        ticket: FeedbackTicket,
        delay: Duration,
    },
    CancelFeedback,
    SpendXp {
        ticket: HintTicket,
        classroom: ClassroomId,
        amount: u32,
    },
    Submit {
        generation: Generation,
        trigger: SubmitTrigger,
        payload: SubmissionPayload,
    },
    Notify(Notice),
}

//
// ─── NOTICES ───────────────────────────────────────────────────────────────────
//

/// A user-visible message produced by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    LoadFailed { reason: String },
    NoQuestions,
    BalanceUnavailable { reason: String },
    HintUnlocked { ordinal: usize, cost: u32 },
    HintDeclined { reason: String },
    HintFailed { reason: String },
    TimeUp,
    SubmitFailed { reason: String },
    Finished { passed: bool, xp_gained: u32 },
}

impl Notice {
    /// True for notices that report a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Notice::LoadFailed { .. }
                | Notice::NoQuestions
                | Notice::BalanceUnavailable { .. }
                | Notice::HintDeclined { .. }
                | Notice::HintFailed { .. }
                | Notice::SubmitFailed { .. }
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::LoadFailed { reason } => write!(f, "Failed to load assessment: {reason}"),
            Notice::NoQuestions => write!(f, "No questions are available for this level yet."),
            Notice::BalanceUnavailable { reason } => {
                write!(f, "Could not load your XP balance: {reason}")
            }
            Notice::HintUnlocked { ordinal, cost: 0 } => write!(f, "Hint {ordinal} unlocked."),
            Notice::HintUnlocked { ordinal, cost } => {
                write!(f, "Spent {cost} XP for hint {ordinal}!")
            }
            Notice::HintDeclined { reason } => write!(f, "{reason}"),
            Notice::HintFailed { reason } => write!(f, "Network error spending XP: {reason}"),
            Notice::TimeUp => write!(f, "Time is up! Submitting your answers."),
            Notice::SubmitFailed { reason } => {
                write!(f, "Failed to submit assessment: {reason}")
            }
            Notice::Finished {
                passed: true,
                xp_gained,
            } => write!(f, "Level complete! +{xp_gained} XP"),
            Notice::Finished { passed: false, .. } => write!(f, "Not this time. Review and try again."),
        }
    }
}
