use std::fmt;

use crate::model::ids::{ClassroomId, Level};
use crate::model::question::Question;

/// A question the student got wrong during the current attempt.
///
/// Built the moment the wrong answer is given; the list for an attempt is
/// append-only and travels with the submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MistakeRecord {
    pub question: String,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub submitted_answer: String,
}

impl MistakeRecord {
    #[must_use]
    pub fn for_answer(question: &Question, submitted_answer: &str) -> Self {
        Self {
            question: question.prompt().to_owned(),
            correct_answer: question.correct_answer().map(str::to_owned),
            explanation: question.explanation().map(str::to_owned),
            submitted_answer: submitted_answer.to_owned(),
        }
    }
}

/// A mistake stored by the backend from an earlier attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MistakeEntry {
    pub question: String,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub submitted_answer: Option<String>,
    pub level: Option<Level>,
    pub comments: String,
    /// Only filled in for the cross-classroom listing.
    pub classroom: Option<ClassroomId>,
}

/// Which mistakes to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MistakeScope {
    Classroom(ClassroomId),
    All,
}

impl MistakeScope {
    /// Path segment understood by the backend.
    #[must_use]
    pub fn as_segment(&self) -> &str {
        match self {
            MistakeScope::Classroom(id) => id.as_str(),
            MistakeScope::All => "all",
        }
    }
}

impl fmt::Display for MistakeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_segment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionDraft, QuestionId};

    #[test]
    fn record_copies_question_context() {
        let question = QuestionDraft {
            id: Some(QuestionId::new(2)),
            prompt: "Capital of France?".into(),
            choices: Some(vec!["Paris".into(), "Lyon".into()]),
            correct_answer: Some("Paris".into()),
            explanation: Some("Paris is the capital.".into()),
            ..QuestionDraft::default()
        }
        .validate(0)
        .unwrap();

        let record = MistakeRecord::for_answer(&question, "Lyon");
        assert_eq!(record.question, "Capital of France?");
        assert_eq!(record.correct_answer.as_deref(), Some("Paris"));
        assert_eq!(record.explanation.as_deref(), Some("Paris is the capital."));
        assert_eq!(record.submitted_answer, "Lyon");
    }

    #[test]
    fn scope_segments() {
        let id = ClassroomId::new("chem").unwrap();
        assert_eq!(MistakeScope::Classroom(id).as_segment(), "chem");
        assert_eq!(MistakeScope::All.to_string(), "all");
    }
}
