//! The assessment session state machine.
//!
//! `AssessmentSession` is a plain record with transition methods. It performs
//! no I/O and keeps no timers: every transition returns the [`Effect`]s its
//! owner must carry out, and results of that work come back through the
//! `*_loaded`, `*_settled`, `tick` and `feedback_elapsed` methods tagged with
//! the [`Generation`] or ticket they were issued under.
//!
//! Phases: `Closed → Loading → Active → Submitting → Finished → Review`.
//! While `Active`, each question is either awaiting an answer or showing
//! feedback for the answer just given.

mod config;
mod effect;
mod review;

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::hints::HintLedger;
use crate::model::{
    AssessmentOutcome, ClassroomId, Level, MistakeRecord, Question, QuestionId, SpendReceipt,
};
use crate::scoring::{self, Verdict};
use crate::time;

pub use config::{
    DEFAULT_FEEDBACK_DELAY, DEFAULT_TIME_BUDGET_SECS, SessionConfig, SessionConfigError,
};
pub use effect::{
    Effect, FeedbackTicket, Generation, HintTicket, Notice, SubmissionPayload, SubmitTrigger,
};
pub use review::{ReviewItem, ReviewVerdict};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Rejections of user-driven transitions. The session is unchanged whenever
/// one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no session is open")]
    Closed,

    #[error("the session is not taking answers")]
    NotActive,

    #[error("questions are not being loaded")]
    NotLoading,

    #[error("a request for this is already in flight")]
    RequestInFlight,

    #[error("XP balance is already loaded")]
    BalanceLoaded,

    #[error("feedback is still showing for this question")]
    AnswerLocked,

    #[error("question {id} has already been answered")]
    AlreadyAnswered { id: QuestionId },

    #[error("answer cannot be empty")]
    EmptyAnswer,

    #[error("no choice at position {index}")]
    NoSuchChoice { index: usize },

    #[error("already at the first question")]
    AtFirstQuestion,

    #[error("already at the last question")]
    AtLastQuestion,

    #[error("answer this question before moving on")]
    Unanswered,

    #[error("the quest can only be completed from the last question")]
    NotLastQuestion,

    #[error("a hint purchase is already in progress")]
    HintPurchasePending,

    #[error("Not enough XP! You need {cost} XP (balance: {balance}).")]
    InsufficientXp { cost: u32, balance: u32 },

    #[error("no submission is pending")]
    NotSubmitting,

    #[error("submission already in flight")]
    SubmissionInFlight,

    #[error("no result yet")]
    NoResult,
}

//
// ─── PHASES ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Closed,
    Loading,
    Active,
    Submitting,
    Finished,
    Review,
}

/// Micro-state of the question on screen while `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AwaitingAnswer,
    ShowingFeedback(Verdict),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Fetch {
    InFlight,
    Failed(String),
    Done,
}

#[derive(Debug, Clone)]
struct Submission {
    payload: SubmissionPayload,
    trigger: SubmitTrigger,
    in_flight: bool,
    last_error: Option<String>,
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// Everything that belongs to one opened session and is dropped on close.
#[derive(Debug, Clone)]
struct Attempt {
    classroom: ClassroomId,
    level: Level,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    load: Fetch,
    balance: Fetch,
    questions: Vec<Question>,
    current: usize,
    stage: Stage,
    answers: HashMap<QuestionId, String>,
    mistakes: Vec<MistakeRecord>,
    remaining_secs: u32,
    hints: HintLedger,
    pending_hint: Option<HintTicket>,
    xp_balance: u32,
    pending_feedback: Option<FeedbackTicket>,
    submission: Option<Submission>,
    outcome: Option<AssessmentOutcome>,
}

impl Attempt {
    fn new(classroom: ClassroomId, level: Level, started_at: DateTime<Utc>, budget: u32) -> Self {
        Self {
            classroom,
            level,
            started_at,
            finished_at: None,
            load: Fetch::InFlight,
            balance: Fetch::InFlight,
            questions: Vec::new(),
            current: 0,
            stage: Stage::AwaitingAnswer,
            answers: HashMap::new(),
            mistakes: Vec::new(),
            remaining_secs: budget,
            hints: HintLedger::default(),
            pending_hint: None,
            xp_balance: 0,
            pending_feedback: None,
            submission: None,
            outcome: None,
        }
    }

    fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    fn available_hints(&self) -> usize {
        self.current_question().map_or(0, |q| q.hints().len())
    }

    fn move_to(&mut self, index: usize) {
        self.current = index;
        self.hints.reset();
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One student's timed attempt at one level.
#[derive(Debug, Clone)]
pub struct AssessmentSession {
    config: SessionConfig,
    generation: Generation,
    feedback_seq: u64,
    phase: Phase,
    attempt: Option<Attempt>,
}

impl AssessmentSession {
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            generation: Generation::default(),
            feedback_seq: 0,
            phase: Phase::Closed,
            attempt: None,
        }
    }

    /// Start a fresh attempt, discarding any previous one.
    ///
    /// `now` should come from the services layer clock.
    pub fn open(&mut self, classroom: ClassroomId, level: Level, now: DateTime<Utc>) -> Vec<Effect> {
        let mut effects = self.teardown();
        self.generation = self.generation.next();
        self.attempt = Some(Attempt::new(
            classroom.clone(),
            level,
            now,
            self.config.time_budget_secs(),
        ));
        self.phase = Phase::Loading;

        effects.push(Effect::FetchQuestions {
            generation: self.generation,
            classroom: classroom.clone(),
            level,
        });
        effects.push(Effect::FetchBalance {
            generation: self.generation,
            classroom,
        });
        effects
    }

    /// Drop the attempt. Anything still in flight for it becomes stale.
    pub fn close(&mut self) -> Vec<Effect> {
        let effects = self.teardown();
        self.generation = self.generation.next();
        self.attempt = None;
        self.phase = Phase::Closed;
        effects
    }

    fn teardown(&self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.phase == Phase::Active {
            effects.push(Effect::StopCountdown);
        }
        if self
            .attempt
            .as_ref()
            .is_some_and(|a| a.pending_feedback.is_some())
        {
            effects.push(Effect::CancelFeedback);
        }
        effects
    }

    /// Whether results issued under `generation` still apply.
    #[must_use]
    pub fn is_current(&self, generation: Generation) -> bool {
        self.attempt.is_some() && self.generation == generation
    }

    //
    // ─── LOADING ───────────────────────────────────────────────────────────────
    //

    /// Apply the question-set fetch. An empty set counts as a failed load.
    pub fn questions_loaded(
        &mut self,
        generation: Generation,
        result: Result<Vec<Question>, String>,
    ) -> Vec<Effect> {
        if !self.is_current(generation) || self.phase != Phase::Loading {
            return Vec::new();
        }
        let Some(attempt) = self.attempt.as_mut() else {
            return Vec::new();
        };

        match result {
            Ok(questions) if questions.is_empty() => {
                attempt.load = Fetch::Failed(Notice::NoQuestions.to_string());
                vec![Effect::Notify(Notice::NoQuestions)]
            }
            Ok(questions) => {
                attempt.load = Fetch::Done;
                attempt.questions = questions;
                attempt.move_to(0);
                attempt.stage = Stage::AwaitingAnswer;
                attempt.remaining_secs = self.config.time_budget_secs();
                self.phase = Phase::Active;
                vec![Effect::StartCountdown { generation }]
            }
            Err(reason) => {
                attempt.load = Fetch::Failed(reason.clone());
                vec![Effect::Notify(Notice::LoadFailed { reason })]
            }
        }
    }

    /// Re-issue the question fetch after a failure.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotLoading` outside `Loading` and
    /// `SessionError::RequestInFlight` while a fetch is outstanding.
    pub fn retry_load(&mut self) -> Result<Vec<Effect>, SessionError> {
        let generation = self.generation;
        let phase = self.phase;
        let attempt = self.attempt.as_mut().ok_or(SessionError::Closed)?;
        if phase != Phase::Loading {
            return Err(SessionError::NotLoading);
        }
        if attempt.load == Fetch::InFlight {
            return Err(SessionError::RequestInFlight);
        }

        attempt.load = Fetch::InFlight;
        Ok(vec![Effect::FetchQuestions {
            generation,
            classroom: attempt.classroom.clone(),
            level: attempt.level,
        }])
    }

    /// Apply the XP balance fetch. Only the first successful fetch of an
    /// attempt is used, so the balance can never grow mid-session.
    pub fn balance_loaded(&mut self, generation: Generation, result: Result<u32, String>) -> Vec<Effect> {
        if !self.is_current(generation) {
            return Vec::new();
        }
        let Some(attempt) = self.attempt.as_mut() else {
            return Vec::new();
        };
        if attempt.balance == Fetch::Done {
            return Vec::new();
        }

        match result {
            Ok(xp) => {
                attempt.xp_balance = xp;
                attempt.balance = Fetch::Done;
                Vec::new()
            }
            Err(reason) => {
                attempt.balance = Fetch::Failed(reason.clone());
                vec![Effect::Notify(Notice::BalanceUnavailable { reason })]
            }
        }
    }

    /// Re-issue the balance fetch after a failure.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::BalanceLoaded` once a balance is known and
    /// `SessionError::RequestInFlight` while a fetch is outstanding.
    pub fn retry_balance(&mut self) -> Result<Vec<Effect>, SessionError> {
        let generation = self.generation;
        let attempt = self.attempt.as_mut().ok_or(SessionError::Closed)?;
        match attempt.balance {
            Fetch::Done => Err(SessionError::BalanceLoaded),
            Fetch::InFlight => Err(SessionError::RequestInFlight),
            Fetch::Failed(_) => {
                attempt.balance = Fetch::InFlight;
                Ok(vec![Effect::FetchBalance {
                    generation,
                    classroom: attempt.classroom.clone(),
                }])
            }
        }
    }

    //
    // ─── QUESTION LOOP ─────────────────────────────────────────────────────────
    //

    /// Answer the question on screen and start the feedback pulse.
    ///
    /// A wrong multiple-choice answer is recorded as a mistake right away.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AnswerLocked` while feedback is showing,
    /// `SessionError::AlreadyAnswered` for a revisited question, or
    /// `SessionError::NotActive` outside the question loop.
    pub fn answer(&mut self, text: &str) -> Result<Vec<Effect>, SessionError> {
        if self.phase != Phase::Active {
            return Err(SessionError::NotActive);
        }
        let attempt = self.attempt.as_mut().ok_or(SessionError::Closed)?;
        if matches!(attempt.stage, Stage::ShowingFeedback(_)) {
            return Err(SessionError::AnswerLocked);
        }
        if text.trim().is_empty() {
            return Err(SessionError::EmptyAnswer);
        }

        let question = attempt
            .questions
            .get(attempt.current)
            .ok_or(SessionError::NotActive)?;
        let id = question.id();
        if attempt.answers.contains_key(&id) {
            return Err(SessionError::AlreadyAnswered { id });
        }

        let verdict = scoring::feedback_verdict(question, text);
        if verdict == Verdict::Incorrect {
            attempt
                .mistakes
                .push(MistakeRecord::for_answer(question, text));
        }
        attempt.answers.insert(id, text.to_owned());
        attempt.stage = Stage::ShowingFeedback(verdict);

        self.feedback_seq = self.feedback_seq.wrapping_add(1);
        let ticket = FeedbackTicket {
            generation: self.generation,
            seq: self.feedback_seq,
        };
        attempt.pending_feedback = Some(ticket);

        Ok(vec![Effect::ScheduleFeedback {
            ticket,
            delay: self.config.feedback_delay(),
        }])
    }

    /// Answer with the choice at `index` of the question on screen.
    ///
    /// # Errors
    ///
    /// Same as [`AssessmentSession::answer`], plus `SessionError::NoSuchChoice`.
    pub fn answer_choice(&mut self, index: usize) -> Result<Vec<Effect>, SessionError> {
        if self.phase != Phase::Active {
            return Err(SessionError::NotActive);
        }
        let choice = self
            .current_question()
            .and_then(|q| q.choice(index))
            .map(str::to_owned)
            .ok_or(SessionError::NoSuchChoice { index })?;
        self.answer(&choice)
    }

    /// The feedback delay for `ticket` ran out: advance, or submit after the
    /// last question. Superseded tickets are ignored.
    pub fn feedback_elapsed(&mut self, ticket: FeedbackTicket) -> Vec<Effect> {
        if self.phase != Phase::Active {
            return Vec::new();
        }
        let Some(attempt) = self.attempt.as_mut() else {
            return Vec::new();
        };
        if attempt.pending_feedback != Some(ticket) {
            return Vec::new();
        }

        attempt.pending_feedback = None;
        attempt.stage = Stage::AwaitingAnswer;
        let next = attempt.current + 1;
        if next < attempt.questions.len() {
            attempt.move_to(next);
            return Vec::new();
        }
        self.begin_submission(SubmitTrigger::LastAnswer)
    }

    /// One second of the countdown elapsed.
    pub fn tick(&mut self, generation: Generation) -> Vec<Effect> {
        if !self.is_current(generation) || self.phase != Phase::Active {
            return Vec::new();
        }
        let Some(attempt) = self.attempt.as_mut() else {
            return Vec::new();
        };

        attempt.remaining_secs = attempt.remaining_secs.saturating_sub(1);
        if attempt.remaining_secs > 0 {
            return Vec::new();
        }

        let mut effects = vec![Effect::Notify(Notice::TimeUp)];
        effects.extend(self.begin_submission(SubmitTrigger::Timeout));
        effects
    }

    /// Go back one question. Its answer stays locked.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AtFirstQuestion` on the first question.
    pub fn previous(&mut self) -> Result<(), SessionError> {
        let attempt = self.navigable()?;
        if attempt.current == 0 {
            return Err(SessionError::AtFirstQuestion);
        }
        let target = attempt.current - 1;
        attempt.move_to(target);
        Ok(())
    }

    /// Move forward one question; only allowed once it has an answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AtLastQuestion` or `SessionError::Unanswered`.
    pub fn next(&mut self) -> Result<(), SessionError> {
        let attempt = self.navigable()?;
        let target = attempt.current + 1;
        if target >= attempt.questions.len() {
            return Err(SessionError::AtLastQuestion);
        }
        let answered = attempt
            .current_question()
            .is_some_and(|q| attempt.answers.contains_key(&q.id()));
        if !answered {
            return Err(SessionError::Unanswered);
        }
        attempt.move_to(target);
        Ok(())
    }

    fn navigable(&mut self) -> Result<&mut Attempt, SessionError> {
        if self.phase != Phase::Active {
            return Err(SessionError::NotActive);
        }
        let attempt = self.attempt.as_mut().ok_or(SessionError::Closed)?;
        if matches!(attempt.stage, Stage::ShowingFeedback(_)) {
            return Err(SessionError::AnswerLocked);
        }
        Ok(attempt)
    }

    //
    // ─── HINTS ─────────────────────────────────────────────────────────────────
    //

    /// Unlock the next hint of the question on screen.
    ///
    /// Free hints open immediately. Paid hints produce an `Effect::SpendXp`;
    /// nothing changes locally until [`AssessmentSession::hint_settled`]
    /// reports an accepted deduction. Asking past the last hint is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InsufficientXp` when the balance cannot cover
    /// the cost and `SessionError::HintPurchasePending` while a purchase is
    /// outstanding.
    pub fn request_hint(&mut self) -> Result<Vec<Effect>, SessionError> {
        if self.phase != Phase::Active {
            return Err(SessionError::NotActive);
        }
        let generation = self.generation;
        let pricing = self.config.hint_pricing();
        let attempt = self.attempt.as_mut().ok_or(SessionError::Closed)?;

        let available = attempt.available_hints();
        let unlocked = attempt.hints.unlocked();
        if unlocked >= available {
            return Ok(Vec::new());
        }
        if attempt.pending_hint.is_some() {
            return Err(SessionError::HintPurchasePending);
        }

        let cost = pricing.cost_of_next(unlocked);
        if cost == 0 {
            let ordinal = attempt.hints.unlock(available).unwrap_or(unlocked);
            return Ok(vec![Effect::Notify(Notice::HintUnlocked { ordinal, cost })]);
        }
        if attempt.xp_balance < cost {
            return Err(SessionError::InsufficientXp {
                cost,
                balance: attempt.xp_balance,
            });
        }

        let ticket = HintTicket {
            generation,
            question_index: attempt.current,
            ledger_epoch: attempt.hints.epoch(),
            cost,
        };
        attempt.pending_hint = Some(ticket);
        Ok(vec![Effect::SpendXp {
            ticket,
            classroom: attempt.classroom.clone(),
            amount: cost,
        }])
    }

    /// Apply the backend's answer to a hint purchase.
    ///
    /// An accepted deduction always lowers the balance. The hint only opens
    /// if the student is still on the question it was bought for.
    pub fn hint_settled(
        &mut self,
        ticket: HintTicket,
        result: Result<SpendReceipt, String>,
    ) -> Vec<Effect> {
        if !self.is_current(ticket.generation) {
            return Vec::new();
        }
        let phase = self.phase;
        let Some(attempt) = self.attempt.as_mut() else {
            return Vec::new();
        };
        if attempt.pending_hint != Some(ticket) {
            return Vec::new();
        }
        attempt.pending_hint = None;

        match result {
            Ok(receipt) if receipt.accepted => {
                attempt.xp_balance = attempt.xp_balance.saturating_sub(ticket.cost);
                let same_question = phase == Phase::Active
                    && attempt.current == ticket.question_index
                    && attempt.hints.epoch() == ticket.ledger_epoch;
                if !same_question {
                    return Vec::new();
                }
                let available = attempt.available_hints();
                attempt
                    .hints
                    .unlock(available)
                    .map(|ordinal| {
                        Effect::Notify(Notice::HintUnlocked {
                            ordinal,
                            cost: ticket.cost,
                        })
                    })
                    .into_iter()
                    .collect()
            }
            Ok(receipt) => vec![Effect::Notify(Notice::HintDeclined {
                reason: receipt
                    .message
                    .unwrap_or_else(|| "Failed to spend XP".to_string()),
            })],
            Err(reason) => vec![Effect::Notify(Notice::HintFailed { reason })],
        }
    }

    //
    // ─── SUBMISSION ────────────────────────────────────────────────────────────
    //

    fn begin_submission(&mut self, trigger: SubmitTrigger) -> Vec<Effect> {
        let generation = self.generation;
        let Some(attempt) = self.attempt.as_mut() else {
            return Vec::new();
        };

        let mut effects = vec![Effect::StopCountdown];
        if attempt.pending_feedback.take().is_some() {
            effects.push(Effect::CancelFeedback);
        }
        attempt.stage = Stage::AwaitingAnswer;

        let payload = SubmissionPayload {
            classroom: attempt.classroom.clone(),
            level: attempt.level,
            score: scoring::provisional_score(&attempt.questions, &attempt.answers),
            max_score: u32::try_from(attempt.questions.len()).unwrap_or(u32::MAX),
            mistakes: attempt.mistakes.clone(),
        };
        attempt.submission = Some(Submission {
            payload: payload.clone(),
            trigger,
            in_flight: true,
            last_error: None,
        });
        self.phase = Phase::Submitting;

        effects.push(Effect::Submit {
            generation,
            trigger,
            payload,
        });
        effects
    }

    /// "Complete Quest" from the last question. After a failed submission this
    /// re-submits the same payload.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SubmissionInFlight` while a submission is
    /// outstanding and `SessionError::NotLastQuestion` before the last question.
    pub fn complete(&mut self) -> Result<Vec<Effect>, SessionError> {
        match self.phase {
            Phase::Active => {
                let on_last = self
                    .attempt
                    .as_ref()
                    .is_some_and(|a| a.current + 1 == a.questions.len());
                if !on_last {
                    return Err(SessionError::NotLastQuestion);
                }
                Ok(self.begin_submission(SubmitTrigger::Manual))
            }
            Phase::Submitting => self.retry_submission(),
            Phase::Closed => Err(SessionError::Closed),
            _ => Err(SessionError::NotActive),
        }
    }

    /// Re-send the stored payload after a failed submission.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmitting` outside `Submitting` and
    /// `SessionError::SubmissionInFlight` while the previous send is outstanding.
    pub fn retry_submission(&mut self) -> Result<Vec<Effect>, SessionError> {
        if self.phase != Phase::Submitting {
            return Err(SessionError::NotSubmitting);
        }
        let generation = self.generation;
        let submission = self
            .attempt
            .as_mut()
            .and_then(|a| a.submission.as_mut())
            .ok_or(SessionError::NotSubmitting)?;
        if submission.in_flight {
            return Err(SessionError::SubmissionInFlight);
        }

        submission.in_flight = true;
        submission.last_error = None;
        Ok(vec![Effect::Submit {
            generation,
            trigger: submission.trigger,
            payload: submission.payload.clone(),
        }])
    }

    /// Apply the backend's answer to the submission.
    pub fn submission_settled(
        &mut self,
        generation: Generation,
        result: Result<AssessmentOutcome, String>,
        now: DateTime<Utc>,
    ) -> Vec<Effect> {
        if !self.is_current(generation) || self.phase != Phase::Submitting {
            return Vec::new();
        }
        let Some(attempt) = self.attempt.as_mut() else {
            return Vec::new();
        };
        let Some(submission) = attempt.submission.as_mut() else {
            return Vec::new();
        };
        if !submission.in_flight {
            return Vec::new();
        }
        submission.in_flight = false;

        match result {
            Ok(outcome) => {
                let notice = Notice::Finished {
                    passed: outcome.passed,
                    xp_gained: outcome.xp_gained,
                };
                attempt.outcome = Some(outcome);
                attempt.finished_at = Some(now);
                self.phase = Phase::Finished;
                vec![Effect::Notify(notice)]
            }
            Err(reason) => {
                submission.last_error = Some(reason.clone());
                vec![Effect::Notify(Notice::SubmitFailed { reason })]
            }
        }
    }

    //
    // ─── REVIEW ────────────────────────────────────────────────────────────────
    //

    /// Switch the finished session to read-only review.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoResult` before the outcome arrived.
    pub fn enter_review(&mut self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Finished | Phase::Review => {
                self.phase = Phase::Review;
                Ok(())
            }
            Phase::Closed => Err(SessionError::Closed),
            _ => Err(SessionError::NoResult),
        }
    }

    /// Every question with the submitted answer, in review mode only.
    #[must_use]
    pub fn review(&self) -> Option<Vec<ReviewItem<'_>>> {
        if self.phase != Phase::Review {
            return None;
        }
        self.attempt
            .as_ref()
            .map(|a| review::build(&a.questions, &a.answers))
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Micro-state of the question loop; `None` outside `Active`.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        if self.phase != Phase::Active {
            return None;
        }
        self.attempt.as_ref().map(|a| a.stage)
    }

    #[must_use]
    pub fn classroom(&self) -> Option<&ClassroomId> {
        self.attempt.as_ref().map(|a| &a.classroom)
    }

    #[must_use]
    pub fn level(&self) -> Option<Level> {
        self.attempt.as_ref().map(|a| a.level)
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.attempt.as_ref().map(|a| a.started_at)
    }

    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.attempt.as_ref().and_then(|a| a.finished_at)
    }

    /// Wall-clock seconds from open to the arrival of the outcome.
    #[must_use]
    pub fn time_taken_secs(&self) -> Option<u32> {
        let attempt = self.attempt.as_ref()?;
        attempt
            .finished_at
            .map(|end| time::seconds_between(attempt.started_at, end))
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        self.attempt
            .as_ref()
            .map(|a| a.questions.as_slice())
            .unwrap_or_default()
    }

    /// Cursor into `questions()`; `None` until questions are loaded.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.attempt
            .as_ref()
            .filter(|a| a.current < a.questions.len())
            .map(|a| a.current)
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.attempt.as_ref().and_then(Attempt::current_question)
    }

    #[must_use]
    pub fn answer_for(&self, id: QuestionId) -> Option<&str> {
        self.attempt
            .as_ref()
            .and_then(|a| a.answers.get(&id))
            .map(String::as_str)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.attempt.as_ref().map_or(0, |a| a.answers.len())
    }

    #[must_use]
    pub fn mistakes(&self) -> &[MistakeRecord] {
        self.attempt
            .as_ref()
            .map(|a| a.mistakes.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.attempt
            .as_ref()
            .map_or(self.config.time_budget_secs(), |a| a.remaining_secs)
    }

    #[must_use]
    pub fn xp_balance(&self) -> u32 {
        self.attempt.as_ref().map_or(0, |a| a.xp_balance)
    }

    /// Hints of the current question opened so far.
    #[must_use]
    pub fn unlocked_hints(&self) -> &[String] {
        let Some(attempt) = self.attempt.as_ref() else {
            return &[];
        };
        attempt
            .current_question()
            .map(|q| &q.hints()[..attempt.hints.unlocked().min(q.hints().len())])
            .unwrap_or_default()
    }

    /// Price of the next hint, or `None` if no hint is left to open.
    #[must_use]
    pub fn next_hint_cost(&self) -> Option<u32> {
        let attempt = self.attempt.as_ref()?;
        let unlocked = attempt.hints.unlocked();
        (self.phase == Phase::Active && unlocked < attempt.available_hints())
            .then(|| self.config.hint_pricing().cost_of_next(unlocked))
    }

    #[must_use]
    pub fn hint_purchase_pending(&self) -> bool {
        self.attempt
            .as_ref()
            .is_some_and(|a| a.pending_hint.is_some())
    }

    /// Provisional score of the answers given so far.
    #[must_use]
    pub fn provisional_score(&self) -> u32 {
        self.attempt.as_ref().map_or(0, |a| {
            scoring::provisional_score(&a.questions, &a.answers)
        })
    }

    #[must_use]
    pub fn load_error(&self) -> Option<&str> {
        match self.attempt.as_ref().map(|a| &a.load) {
            Some(Fetch::Failed(reason)) => Some(reason.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn submission_in_flight(&self) -> bool {
        self.attempt
            .as_ref()
            .and_then(|a| a.submission.as_ref())
            .is_some_and(|s| s.in_flight)
    }

    #[must_use]
    pub fn submission_error(&self) -> Option<&str> {
        self.attempt
            .as_ref()
            .and_then(|a| a.submission.as_ref())
            .and_then(|s| s.last_error.as_deref())
    }

    #[must_use]
    pub fn submission_payload(&self) -> Option<&SubmissionPayload> {
        self.attempt
            .as_ref()
            .and_then(|a| a.submission.as_ref())
            .map(|s| &s.payload)
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&AssessmentOutcome> {
        self.attempt.as_ref().and_then(|a| a.outcome.as_ref())
    }
}

impl Default for AssessmentSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
