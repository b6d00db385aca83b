//! Shared error types for the services crate.

use thiserror::Error;

use backend::BackendError;
use quest_core::model::Level;
use quest_core::session::{SessionConfigError, SessionError};

/// Errors emitted by `AssessmentController` for rejected user input.
///
/// Backend failures never show up here; they arrive as notices.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ControllerError {
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Errors emitted by `QuestMapService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestMapError {
    #[error("level {level} is locked; finish level {unlocked_level} first")]
    Locked { level: Level, unlocked_level: Level },
    #[error("level {level} reopens in {remaining_secs} s")]
    CoolingDown { level: Level, remaining_secs: u32 },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors emitted while reading `QuestConfig`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
    #[error(transparent)]
    Session(#[from] SessionConfigError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
