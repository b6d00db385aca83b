use std::collections::HashMap;

use crate::model::{Question, QuestionId};

/// How an answer compares with the canonical answer in review mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewVerdict {
    Correct,
    Incorrect,
    Unanswered,
    /// Answered, but the question has no canonical answer to compare with.
    Ungraded,
}

/// One row of the read-only review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem<'a> {
    /// 1-based position in the question set.
    pub position: usize,
    pub question: &'a Question,
    pub submitted: Option<&'a str>,
    pub verdict: ReviewVerdict,
}

pub(crate) fn build<'a>(
    questions: &'a [Question],
    answers: &'a HashMap<QuestionId, String>,
) -> Vec<ReviewItem<'a>> {
    questions
        .iter()
        .enumerate()
        .map(|(idx, question)| {
            let submitted = answers.get(&question.id()).map(String::as_str);
            let verdict = match (submitted, question.correct_answer()) {
                (None, _) => ReviewVerdict::Unanswered,
                (Some(_), None) => ReviewVerdict::Ungraded,
                (Some(answer), Some(_)) if question.matches_canonical(answer) => {
                    ReviewVerdict::Correct
                }
                (Some(_), Some(_)) => ReviewVerdict::Incorrect,
            };
            ReviewItem {
                position: idx + 1,
                question,
                submitted,
                verdict,
            }
        })
        .collect()
}
