use std::sync::Arc;

use backend::QuestApi;
use log::{debug, info, warn};
use quest_core::Clock;
use quest_core::model::{AssessmentOutcome, ClassroomId, Level, Question, SpendReceipt};
use quest_core::session::{
    AssessmentSession, Effect, FeedbackTicket, Generation, HintTicket, Notice, ReviewItem,
    SessionConfig, SubmissionPayload, SubmitTrigger,
};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

use super::view::SessionView;
use crate::error::ControllerError;

const TICK: Duration = Duration::from_secs(1);

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// Results of background work, tagged with the identity they were issued under.
#[derive(Debug)]
enum Event {
    Questions {
        generation: Generation,
        result: Result<Vec<Question>, String>,
    },
    Balance {
        generation: Generation,
        result: Result<u32, String>,
    },
    Tick(Generation),
    FeedbackElapsed(FeedbackTicket),
    HintSettled {
        ticket: HintTicket,
        result: Result<SpendReceipt, String>,
    },
    Submitted {
        generation: Generation,
        result: Result<AssessmentOutcome, String>,
    },
}

impl Event {
    fn generation(&self) -> Generation {
        match self {
            Event::Questions { generation, .. }
            | Event::Balance { generation, .. }
            | Event::Submitted { generation, .. }
            | Event::Tick(generation) => *generation,
            Event::FeedbackElapsed(ticket) => ticket.generation,
            Event::HintSettled { ticket, .. } => ticket.generation,
        }
    }
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Drives one `AssessmentSession` against a `QuestApi`.
///
/// The controller owns the session exclusively. Backend calls and timers run
/// as tokio tasks and report back through one channel; the host pumps that
/// channel with [`AssessmentController::next_update`]. Every method must be
/// called from inside a tokio runtime.
pub struct AssessmentController {
    api: Arc<dyn QuestApi>,
    clock: Clock,
    session: AssessmentSession,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    countdown: Option<AbortHandle>,
    feedback: Option<AbortHandle>,
}

impl AssessmentController {
    #[must_use]
    pub fn new(api: Arc<dyn QuestApi>, clock: Clock, config: SessionConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            api,
            clock,
            session: AssessmentSession::new(config),
            events_tx,
            events_rx,
            countdown: None,
            feedback: None,
        }
    }

    #[must_use]
    pub fn session(&self) -> &AssessmentSession {
        &self.session
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView::from_session(&self.session)
    }

    /// Read-only review rows; `None` outside review mode.
    #[must_use]
    pub fn review(&self) -> Option<Vec<ReviewItem<'_>>> {
        self.session.review()
    }

    /// Open a fresh attempt at `level`, discarding any current one.
    pub fn open(&mut self, classroom: ClassroomId, level: Level) -> Vec<Notice> {
        info!("opening level {level} of {classroom}");
        let effects = self.session.open(classroom, level, self.clock.now());
        self.run(effects)
    }

    pub fn close(&mut self) -> Vec<Notice> {
        debug!("closing session {}", self.session.generation());
        let effects = self.session.close();
        self.run(effects)
    }

    /// # Errors
    ///
    /// Returns `ControllerError::Session` when the answer is not accepted.
    pub fn answer(&mut self, text: &str) -> Result<Vec<Notice>, ControllerError> {
        let effects = self.session.answer(text)?;
        Ok(self.run(effects))
    }

    /// # Errors
    ///
    /// Returns `ControllerError::Session` when the choice is not accepted.
    pub fn answer_choice(&mut self, index: usize) -> Result<Vec<Notice>, ControllerError> {
        let effects = self.session.answer_choice(index)?;
        Ok(self.run(effects))
    }

    /// # Errors
    ///
    /// Returns `ControllerError::Session` for insufficient XP or a purchase
    /// already in flight.
    pub fn unlock_hint(&mut self) -> Result<Vec<Notice>, ControllerError> {
        let effects = self.session.request_hint()?;
        Ok(self.run(effects))
    }

    /// # Errors
    ///
    /// Returns `ControllerError::Session` if the move is not allowed.
    pub fn next(&mut self) -> Result<(), ControllerError> {
        Ok(self.session.next()?)
    }

    /// # Errors
    ///
    /// Returns `ControllerError::Session` if the move is not allowed.
    pub fn previous(&mut self) -> Result<(), ControllerError> {
        Ok(self.session.previous()?)
    }

    /// # Errors
    ///
    /// Returns `ControllerError::Session` if completing is not allowed now.
    pub fn complete(&mut self) -> Result<Vec<Notice>, ControllerError> {
        let effects = self.session.complete()?;
        Ok(self.run(effects))
    }

    /// # Errors
    ///
    /// Returns `ControllerError::Session` unless a question fetch failed.
    pub fn retry_load(&mut self) -> Result<Vec<Notice>, ControllerError> {
        let effects = self.session.retry_load()?;
        Ok(self.run(effects))
    }

    /// # Errors
    ///
    /// Returns `ControllerError::Session` unless the balance fetch failed.
    pub fn retry_balance(&mut self) -> Result<Vec<Notice>, ControllerError> {
        let effects = self.session.retry_balance()?;
        Ok(self.run(effects))
    }

    /// # Errors
    ///
    /// Returns `ControllerError::Session` unless a submission failed.
    pub fn retry_submission(&mut self) -> Result<Vec<Notice>, ControllerError> {
        let effects = self.session.retry_submission()?;
        Ok(self.run(effects))
    }

    /// # Errors
    ///
    /// Returns `ControllerError::Session` before the outcome arrived.
    pub fn enter_review(&mut self) -> Result<(), ControllerError> {
        Ok(self.session.enter_review()?)
    }

    /// Wait for the next background result and apply it.
    ///
    /// Cancel-safe: dropping the future before it resolves loses nothing.
    /// Results issued for a closed or replaced session are discarded and
    /// yield no notices.
    pub async fn next_update(&mut self) -> Vec<Notice> {
        // The controller keeps a sender, so the channel never closes.
        let Some(event) = self.events_rx.recv().await else {
            return Vec::new();
        };
        self.apply(event)
    }

    /// Apply every result that is already waiting, without blocking.
    pub fn drain_ready(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            notices.extend(self.apply(event));
        }
        notices
    }

    fn apply(&mut self, event: Event) -> Vec<Notice> {
        if !self.session.is_current(event.generation()) {
            warn!(
                "discarding stale result from {} (current {})",
                event.generation(),
                self.session.generation()
            );
            return Vec::new();
        }

        let effects = match event {
            Event::Questions { generation, result } => {
                if let Err(reason) = &result {
                    warn!("question fetch failed: {reason}");
                }
                self.session.questions_loaded(generation, result)
            }
            Event::Balance { generation, result } => {
                if let Err(reason) = &result {
                    warn!("balance fetch failed: {reason}");
                }
                self.session.balance_loaded(generation, result)
            }
            Event::Tick(generation) => self.session.tick(generation),
            Event::FeedbackElapsed(ticket) => {
                self.feedback = None;
                self.session.feedback_elapsed(ticket)
            }
            Event::HintSettled { ticket, result } => {
                if let Err(reason) = &result {
                    warn!("hint purchase failed: {reason}");
                }
                self.session.hint_settled(ticket, result)
            }
            Event::Submitted { generation, result } => {
                match &result {
                    Ok(outcome) => info!(
                        "submission settled: passed={} xp_gained={}",
                        outcome.passed, outcome.xp_gained
                    ),
                    Err(reason) => warn!("submission failed: {reason}"),
                }
                self.session
                    .submission_settled(generation, result, self.clock.now())
            }
        };
        self.run(effects)
    }

    //
    // ─── EFFECTS ───────────────────────────────────────────────────────────────
    //

    fn run(&mut self, effects: Vec<Effect>) -> Vec<Notice> {
        let mut notices = Vec::new();
        for effect in effects {
            match effect {
                Effect::FetchQuestions {
                    generation,
                    classroom,
                    level,
                } => self.fetch_questions(generation, classroom, level),
                Effect::FetchBalance {
                    generation,
                    classroom,
                } => self.fetch_balance(generation, classroom),
                Effect::StartCountdown { generation } => self.start_countdown(generation),
                Effect::StopCountdown => abort(&mut self.countdown),
                Effect::ScheduleFeedback { ticket, delay } => {
                    self.schedule_feedback(ticket, delay);
                }
                Effect::CancelFeedback => abort(&mut self.feedback),
                Effect::SpendXp {
                    ticket,
                    classroom,
                    amount,
                } => self.spend_xp(ticket, classroom, amount),
                Effect::Submit {
                    generation,
                    trigger,
                    payload,
                } => self.submit(generation, trigger, payload),
                Effect::Notify(notice) => notices.push(notice),
            }
        }
        notices
    }

    fn fetch_questions(&self, generation: Generation, classroom: ClassroomId, level: Level) {
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = api
                .generate_assessment(&classroom, level)
                .await
                .map_err(|e| e.to_string());
            send(&tx, Event::Questions { generation, result });
        });
    }

    fn fetch_balance(&self, generation: Generation, classroom: ClassroomId) {
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = api
                .progress(&classroom)
                .await
                .map(|p| p.xp)
                .map_err(|e| e.to_string());
            send(&tx, Event::Balance { generation, result });
        });
    }

    fn start_countdown(&mut self, generation: Generation) {
        abort(&mut self.countdown);
        let tx = self.events_tx.clone();
        let task = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + TICK, TICK);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(Event::Tick(generation)).is_err() {
                    break;
                }
            }
        });
        self.countdown = Some(task.abort_handle());
    }

    fn schedule_feedback(&mut self, ticket: FeedbackTicket, delay: Duration) {
        abort(&mut self.feedback);
        let tx = self.events_tx.clone();
        let task = tokio::spawn(async move {
            time::sleep(delay).await;
            send(&tx, Event::FeedbackElapsed(ticket));
        });
        self.feedback = Some(task.abort_handle());
    }

    fn spend_xp(&self, ticket: HintTicket, classroom: ClassroomId, amount: u32) {
        debug!("spending {amount} XP for a hint");
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = api
                .spend_xp(&classroom, amount)
                .await
                .map_err(|e| e.to_string());
            send(&tx, Event::HintSettled { ticket, result });
        });
    }

    fn submit(&self, generation: Generation, trigger: SubmitTrigger, payload: SubmissionPayload) {
        info!(
            "submitting level {} ({trigger:?}): score {}/{}, {} mistakes",
            payload.level,
            payload.score,
            payload.max_score,
            payload.mistakes.len()
        );
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = api
                .submit_assessment(&payload)
                .await
                .map_err(|e| e.to_string());
            send(&tx, Event::Submitted { generation, result });
        });
    }
}

impl Drop for AssessmentController {
    fn drop(&mut self) {
        abort(&mut self.countdown);
        abort(&mut self.feedback);
    }
}

fn abort(handle: &mut Option<AbortHandle>) {
    if let Some(handle) = handle.take() {
        handle.abort();
    }
}

fn send(tx: &mpsc::UnboundedSender<Event>, event: Event) {
    if tx.send(event).is_err() {
        debug!("controller dropped before a background result arrived");
    }
}
