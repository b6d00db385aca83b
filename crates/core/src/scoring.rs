//! Local, provisional scoring.
//!
//! The backend re-grades every submission; these values only drive the
//! feedback pulse and the `score` field of the submission payload.

use std::collections::HashMap;

use crate::model::{Question, QuestionId, QuestionKind};

/// Short answers longer than this many characters earn provisional credit.
pub const SHORT_ANSWER_MIN_CHARS: usize = 5;

/// What the feedback pulse shows right after an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect,
    /// Free-text answer stored for the backend to grade.
    Recorded,
}

/// Verdict for the feedback pulse.
///
/// Multiple-choice answers are compared exactly with the canonical choice.
/// Short answers are never judged locally.
#[must_use]
pub fn feedback_verdict(question: &Question, answer: &str) -> Verdict {
    match question.kind() {
        QuestionKind::MultipleChoice if question.matches_canonical(answer) => Verdict::Correct,
        QuestionKind::MultipleChoice => Verdict::Incorrect,
        QuestionKind::ShortAnswer => Verdict::Recorded,
    }
}

/// Whether `answer` earns a provisional point for `question`.
#[must_use]
pub fn provisional_credit(question: &Question, answer: Option<&str>) -> bool {
    let Some(answer) = answer else {
        return false;
    };
    match question.kind() {
        QuestionKind::MultipleChoice => question.matches_canonical(answer),
        // A reference answer does not switch off the length heuristic.
        QuestionKind::ShortAnswer => {
            question.matches_canonical(answer)
                || answer.chars().count() > SHORT_ANSWER_MIN_CHARS
        }
    }
}

/// Provisional score over the whole set.
#[must_use]
pub fn provisional_score(questions: &[Question], answers: &HashMap<QuestionId, String>) -> u32 {
    let credited = questions
        .iter()
        .filter(|q| provisional_credit(q, answers.get(&q.id()).map(String::as_str)))
        .count();
    u32::try_from(credited).unwrap_or(u32::MAX)
}
