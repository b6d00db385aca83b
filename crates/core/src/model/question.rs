use std::collections::HashSet;

use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("no questions available")]
    Empty,

    #[error("question {id} has an empty prompt")]
    EmptyPrompt { id: QuestionId },

    #[error("question {id} appears more than once")]
    DuplicateId { id: QuestionId },

    #[error("multiple-choice question {id} has no choices")]
    NoChoices { id: QuestionId },
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    /// Pick one of the listed choices; graded by exact match.
    MultipleChoice,
    /// Free text; graded by the backend.
    ShortAnswer,
}

impl QuestionKind {
    /// Resolve the kind from an optional wire tag.
    ///
    /// An explicit tag wins. Without one, a question that lists choices is
    /// multiple-choice and anything else is short-answer.
    #[must_use]
    pub fn resolve(tag: Option<&str>, has_choices: bool) -> Self {
        match tag.map(str::trim) {
            Some("mcq" | "multiple_choice") => Self::MultipleChoice,
            Some("short_answer") => Self::ShortAnswer,
            _ if has_choices => Self::MultipleChoice,
            _ => Self::ShortAnswer,
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question as received from the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionDraft {
    pub id: Option<QuestionId>,
    pub prompt: String,
    pub choices: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    pub kind_tag: Option<String>,
    pub explanation: Option<String>,
    pub hints: Vec<String>,
}

impl QuestionDraft {
    /// Validate a single draft. `position` is the 0-based index in the set and
    /// stands in for a missing identifier (as `position + 1`).
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt is blank or a multiple-choice
    /// question lists no choices.
    pub fn validate(self, position: usize) -> Result<Question, QuestionError> {
        let id = self.id.unwrap_or_else(|| {
            QuestionId::new(u64::try_from(position).unwrap_or(u64::MAX).saturating_add(1))
        });

        let prompt = self.prompt.trim().to_owned();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt { id });
        }

        let choices = self.choices.unwrap_or_default();
        let kind = QuestionKind::resolve(self.kind_tag.as_deref(), !choices.is_empty());
        if kind == QuestionKind::MultipleChoice && choices.is_empty() {
            return Err(QuestionError::NoChoices { id });
        }

        Ok(Question {
            id,
            prompt,
            kind,
            choices,
            correct_answer: self.correct_answer,
            explanation: self.explanation.filter(|e| !e.trim().is_empty()),
            hints: self
                .hints
                .into_iter()
                .filter(|h| !h.trim().is_empty())
                .collect(),
        })
    }
}

/// Validate a whole question set, preserving order.
///
/// # Errors
///
/// Returns `QuestionError::Empty` for an empty set, `QuestionError::DuplicateId`
/// when two questions share an id, or the first per-question error.
pub fn validate_question_set(drafts: Vec<QuestionDraft>) -> Result<Vec<Question>, QuestionError> {
    if drafts.is_empty() {
        return Err(QuestionError::Empty);
    }

    let mut seen = HashSet::with_capacity(drafts.len());
    let mut questions = Vec::with_capacity(drafts.len());
    for (position, draft) in drafts.into_iter().enumerate() {
        let question = draft.validate(position)?;
        if !seen.insert(question.id) {
            return Err(QuestionError::DuplicateId { id: question.id });
        }
        questions.push(question);
    }
    Ok(questions)
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A validated assessment question. Immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    kind: QuestionKind,
    choices: Vec<String>,
    correct_answer: Option<String>,
    explanation: Option<String>,
    hints: Vec<String>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    /// Listed choices, in backend order. Empty for short-answer questions.
    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    #[must_use]
    pub fn choice(&self, index: usize) -> Option<&str> {
        self.choices.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn correct_answer(&self) -> Option<&str> {
        self.correct_answer.as_deref()
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    /// Exact match against the canonical answer. A question without one never
    /// matches.
    #[must_use]
    pub fn matches_canonical(&self, answer: &str) -> bool {
        self.correct_answer.as_deref() == Some(answer)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
