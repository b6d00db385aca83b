use quest_core::model::{AssessmentOutcome, ClassroomId, Level, QuestionKind};
use quest_core::scoring::Verdict;
use quest_core::session::{AssessmentSession, Phase, Stage};

/// Render a countdown as `m:ss`.
#[must_use]
pub fn format_countdown(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// The question on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    /// 1-based.
    pub position: usize,
    pub total: usize,
    pub prompt: String,
    pub kind: QuestionKind,
    pub choices: Vec<String>,
    /// Answer already given, if any. Answered questions are read-only.
    pub answer: Option<String>,
    pub hints: Vec<String>,
    pub hints_available: usize,
}

/// Presentation-agnostic snapshot of a session.
///
/// Hosts render from this and never reach into the state machine directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub phase: Phase,
    pub classroom: Option<ClassroomId>,
    pub level: Option<Level>,
    pub question: Option<QuestionView>,
    /// Verdict being pulsed while feedback shows.
    pub feedback: Option<Verdict>,
    pub remaining_secs: u32,
    pub xp_balance: u32,
    pub next_hint_cost: Option<u32>,
    pub hint_pending: bool,
    pub can_previous: bool,
    pub can_next: bool,
    pub can_complete: bool,
    pub answered: usize,
    pub load_error: Option<String>,
    pub submitting: bool,
    pub submission_error: Option<String>,
    pub outcome: Option<AssessmentOutcome>,
    pub time_taken_secs: Option<u32>,
}

impl SessionView {
    #[must_use]
    pub fn from_session(session: &AssessmentSession) -> Self {
        let stage = session.stage();
        let awaiting = stage == Some(Stage::AwaitingAnswer);
        let feedback = match stage {
            Some(Stage::ShowingFeedback(verdict)) => Some(verdict),
            _ => None,
        };
        let total = session.questions().len();
        let index = session.current_index();

        let question = index
            .zip(session.current_question())
            .map(|(idx, q)| QuestionView {
                position: idx + 1,
                total,
                prompt: q.prompt().to_owned(),
                kind: q.kind(),
                choices: q.choices().to_vec(),
                answer: session.answer_for(q.id()).map(str::to_owned),
                hints: session.unlocked_hints().to_vec(),
                hints_available: q.hints().len(),
            });
        let current_answered = question.as_ref().is_some_and(|q| q.answer.is_some());
        let on_last = index.is_some_and(|i| i + 1 == total);

        Self {
            phase: session.phase(),
            classroom: session.classroom().cloned(),
            level: session.level(),
            question,
            feedback,
            remaining_secs: session.remaining_secs(),
            xp_balance: session.xp_balance(),
            next_hint_cost: session.next_hint_cost(),
            hint_pending: session.hint_purchase_pending(),
            can_previous: awaiting && index.is_some_and(|i| i > 0),
            can_next: awaiting && current_answered && !on_last,
            can_complete: session.phase() == Phase::Active && on_last,
            answered: session.answered_count(),
            load_error: session.load_error().map(str::to_owned),
            submitting: session.submission_in_flight(),
            submission_error: session.submission_error().map(str::to_owned),
            outcome: session.outcome().cloned(),
            time_taken_secs: session.time_taken_secs(),
        }
    }

    #[must_use]
    pub fn countdown(&self) -> String {
        format_countdown(self.remaining_secs)
    }
}
