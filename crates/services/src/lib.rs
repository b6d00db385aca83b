#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod quest_map;
pub mod sessions;

pub use quest_core::Clock;

pub use config::QuestConfig;
pub use error::{ConfigError, ControllerError, QuestMapError};
pub use quest_map::QuestMapService;
pub use sessions::{AssessmentController, QuestionView, SessionView, format_countdown};
