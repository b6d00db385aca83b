mod analytics;
mod ids;
mod mistake;
mod outcome;
mod progress;
mod question;

pub use ids::{ClassroomId, Level, ParseIdError, QuestionId};

pub use analytics::{ClassAnalytics, CommonMistake};
pub use mistake::{MistakeEntry, MistakeRecord, MistakeScope};
pub use outcome::{AssessmentOutcome, SpendReceipt};
pub use progress::{LearnerStatus, LevelGate, PracticeQuestion, Progress, RemedialPlan};
pub use question::{Question, QuestionDraft, QuestionError, QuestionKind, validate_question_set};
