use thiserror::Error;

use crate::model::{ParseIdError, QuestionError};
use crate::session::{SessionConfigError, SessionError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    InvalidId(#[from] ParseIdError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    SessionConfig(#[from] SessionConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
