mod controller;
mod view;

// Public API of the session subsystem.
pub use crate::error::ControllerError;
pub use controller::AssessmentController;
pub use view::{QuestionView, SessionView, format_countdown};
