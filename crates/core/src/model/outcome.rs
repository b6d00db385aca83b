use crate::model::ids::Level;

/// Authoritative result of a submitted assessment, as decided by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentOutcome {
    pub passed: bool,
    pub xp_gained: u32,
    pub new_total_xp: u32,
    pub unlocked_level: Level,
    pub score: u32,
}

/// Backend answer to an XP deduction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendReceipt {
    pub accepted: bool,
    pub message: Option<String>,
}

impl SpendReceipt {
    #[must_use]
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            message: None,
        }
    }

    #[must_use]
    pub fn declined(message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            message: Some(message.into()),
        }
    }
}
