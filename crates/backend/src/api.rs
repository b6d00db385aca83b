use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quest_core::model::{
    AssessmentOutcome, ClassAnalytics, ClassroomId, Level, MistakeEntry, MistakeScope, Progress,
    Question, QuestionError, RemedialPlan, SpendReceipt,
};
use quest_core::session::SubmissionPayload;
use thiserror::Error;

/// Errors surfaced by backend adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("backend returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("{0}")]
    Rejected(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("malformed question set: {0}")]
    InvalidQuestions(#[from] QuestionError),

    #[error("invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Contract of the quest backend.
///
/// Every call is keyed by classroom; the backend tracks a single student per
/// classroom.
#[async_trait]
pub trait QuestApi: Send + Sync {
    /// Fetch XP, unlocked level, cooldown and chapter standing.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails or the body is unusable.
    async fn progress(&self, classroom: &ClassroomId) -> Result<Progress, BackendError>;

    /// Generate the question set for one level attempt.
    ///
    /// An empty set is a valid answer; the caller decides how to treat it.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Rejected` when the backend explains why it
    /// cannot generate questions, `BackendError::InvalidQuestions` for a
    /// malformed set, or a transport error.
    async fn generate_assessment(
        &self,
        classroom: &ClassroomId,
        level: Level,
    ) -> Result<Vec<Question>, BackendError>;

    /// Ask the backend to deduct `amount` XP.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure. A refusal is an `Ok`
    /// receipt with `accepted == false`.
    async fn spend_xp(&self, classroom: &ClassroomId, amount: u32)
    -> Result<SpendReceipt, BackendError>;

    /// Submit a finished attempt and receive the authoritative outcome.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails or the body is unusable.
    async fn submit_assessment(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<AssessmentOutcome, BackendError>;

    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    async fn list_classrooms(&self) -> Result<Vec<ClassroomId>, BackendError>;

    /// # Errors
    ///
    /// Returns `BackendError` if the request fails or the body is unusable.
    async fn analytics(&self, classroom: &ClassroomId) -> Result<ClassAnalytics, BackendError>;

    /// # Errors
    ///
    /// Returns `BackendError` if the request fails or the body is unusable.
    async fn mistakes(&self, scope: &MistakeScope) -> Result<Vec<MistakeEntry>, BackendError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

/// Backend operations, used to script failures and inspect traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Progress,
    GenerateAssessment,
    SpendXp,
    SubmitAssessment,
    ListClassrooms,
    Analytics,
    Mistakes,
}

/// Seconds a student waits after a failed attempt in the in-memory backend.
pub const IN_MEMORY_COOLDOWN_SECS: u32 = 300;

#[derive(Debug, Clone, Default)]
struct ClassroomState {
    progress: Progress,
    questions: HashMap<Level, Vec<Question>>,
    mistakes: Vec<MistakeEntry>,
    analytics: ClassAnalytics,
}

#[derive(Debug, Default)]
struct State {
    classrooms: BTreeMap<ClassroomId, ClassroomState>,
    failures: HashMap<Call, VecDeque<String>>,
    rejections: HashMap<Level, String>,
    calls: Vec<Call>,
    spent: Vec<u32>,
    submissions: Vec<SubmissionPayload>,
    latency: Duration,
}

/// Scriptable backend kept in process memory, for tests and offline demos.
///
/// Attempts pass at 70% of `max_score`. A pass unlocks the next level and
/// grants `50 × level` XP; a failure starts a cooldown and stores the
/// submitted mistakes.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<State>>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a classroom with its starting progress.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the state lock is poisoned.
    pub fn add_classroom(&self, id: ClassroomId, progress: Progress) -> Result<(), BackendError> {
        let mut state = self.lock()?;
        state.classrooms.entry(id).or_default().progress = progress;
        Ok(())
    }

    /// Questions served for `level` of `classroom`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the state lock is poisoned.
    pub fn set_questions(
        &self,
        classroom: &ClassroomId,
        level: Level,
        questions: Vec<Question>,
    ) -> Result<(), BackendError> {
        let mut state = self.lock()?;
        state
            .classrooms
            .entry(classroom.clone())
            .or_default()
            .questions
            .insert(level, questions);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the state lock is poisoned.
    pub fn set_analytics(
        &self,
        classroom: &ClassroomId,
        analytics: ClassAnalytics,
    ) -> Result<(), BackendError> {
        let mut state = self.lock()?;
        state
            .classrooms
            .entry(classroom.clone())
            .or_default()
            .analytics = analytics;
        Ok(())
    }

    /// Make generation for `level` answer with an `{error}` body.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the state lock is poisoned.
    pub fn reject_level(&self, level: Level, reason: impl Into<String>) -> Result<(), BackendError> {
        self.lock()?.rejections.insert(level, reason.into());
        Ok(())
    }

    /// Fail the next `call` with `reason`. Queued failures are consumed in order.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the state lock is poisoned.
    pub fn fail_next(&self, call: Call, reason: impl Into<String>) -> Result<(), BackendError> {
        self.lock()?
            .failures
            .entry(call)
            .or_default()
            .push_back(reason.into());
        Ok(())
    }

    /// Delay every response by `latency`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the state lock is poisoned.
    pub fn set_latency(&self, latency: Duration) -> Result<(), BackendError> {
        self.lock()?.latency = latency;
        Ok(())
    }

    /// Every call received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().map(|s| s.calls.clone()).unwrap_or_default()
    }

    /// Number of times `call` was received.
    #[must_use]
    pub fn count(&self, call: Call) -> usize {
        self.lock()
            .map(|s| s.calls.iter().filter(|c| **c == call).count())
            .unwrap_or_default()
    }

    /// Accepted XP deductions, in order.
    #[must_use]
    pub fn spent(&self) -> Vec<u32> {
        self.lock().map(|s| s.spent.clone()).unwrap_or_default()
    }

    /// Every submission payload received, including failed ones.
    #[must_use]
    pub fn submissions(&self) -> Vec<SubmissionPayload> {
        self.lock()
            .map(|s| s.submissions.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, BackendError> {
        self.state
            .lock()
            .map_err(|e| BackendError::Unavailable(e.to_string()))
    }

    /// Record `call`, apply latency and pop a scripted failure if any.
    async fn enter(&self, call: Call) -> Result<(), BackendError> {
        let (latency, failure) = {
            let mut state = self.lock()?;
            state.calls.push(call);
            let failure = state.failures.get_mut(&call).and_then(VecDeque::pop_front);
            (state.latency, failure)
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match failure {
            Some(reason) => Err(BackendError::Unavailable(reason)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl QuestApi for InMemoryBackend {
    async fn progress(&self, classroom: &ClassroomId) -> Result<Progress, BackendError> {
        self.enter(Call::Progress).await?;
        let state = self.lock()?;
        Ok(state
            .classrooms
            .get(classroom)
            .map(|c| c.progress.clone())
            .unwrap_or_default())
    }

    async fn generate_assessment(
        &self,
        classroom: &ClassroomId,
        level: Level,
    ) -> Result<Vec<Question>, BackendError> {
        self.enter(Call::GenerateAssessment).await?;
        let state = self.lock()?;
        if let Some(reason) = state.rejections.get(&level) {
            return Err(BackendError::Rejected(reason.clone()));
        }
        Ok(state
            .classrooms
            .get(classroom)
            .and_then(|c| c.questions.get(&level))
            .cloned()
            .unwrap_or_default())
    }

    async fn spend_xp(
        &self,
        classroom: &ClassroomId,
        amount: u32,
    ) -> Result<SpendReceipt, BackendError> {
        self.enter(Call::SpendXp).await?;
        let mut state = self.lock()?;
        let Some(room) = state.classrooms.get_mut(classroom) else {
            return Ok(SpendReceipt::declined("Unknown classroom"));
        };
        if room.progress.xp < amount {
            return Ok(SpendReceipt::declined("Not enough XP"));
        }
        room.progress.xp -= amount;
        state.spent.push(amount);
        Ok(SpendReceipt::accepted())
    }

    async fn submit_assessment(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<AssessmentOutcome, BackendError> {
        self.lock()?.submissions.push(payload.clone());
        self.enter(Call::SubmitAssessment).await?;

        let mut state = self.lock()?;
        let room = state
            .classrooms
            .entry(payload.classroom.clone())
            .or_default();
        let passed = payload.max_score > 0
            && u64::from(payload.score) * 10 >= u64::from(payload.max_score) * 7;
        let level = payload.level;
        let progress = &mut room.progress;

        let xp_gained = if passed {
            let gained = 50u32.saturating_mul(level.value());
            progress.xp = progress.xp.saturating_add(gained);
            let next = Level::new(level.value().saturating_add(1)).unwrap_or(level);
            if next > progress.unlocked_level {
                progress.unlocked_level = next;
            }
            progress.cooldown_remaining_secs = None;
            progress.remedial_plan = None;
            gained
        } else {
            progress.cooldown_remaining_secs = Some(IN_MEMORY_COOLDOWN_SECS);
            if let Some(first) = payload.mistakes.first() {
                progress.remedial_plan = Some(RemedialPlan {
                    diagnosis: format!("Revisit: {}", first.question),
                    explanation: first.explanation.clone().unwrap_or_default(),
                    practice_question: None,
                });
            }
            0
        };

        let outcome = AssessmentOutcome {
            passed,
            xp_gained,
            new_total_xp: progress.xp,
            unlocked_level: progress.unlocked_level,
            score: payload.score,
        };
        room.mistakes
            .extend(payload.mistakes.iter().map(|m| MistakeEntry {
                question: m.question.clone(),
                correct_answer: m.correct_answer.clone(),
                explanation: m.explanation.clone(),
                submitted_answer: Some(m.submitted_answer.clone()),
                level: Some(level),
                comments: String::new(),
                classroom: None,
            }));
        Ok(outcome)
    }

    async fn list_classrooms(&self) -> Result<Vec<ClassroomId>, BackendError> {
        self.enter(Call::ListClassrooms).await?;
        Ok(self.lock()?.classrooms.keys().cloned().collect())
    }

    async fn analytics(&self, classroom: &ClassroomId) -> Result<ClassAnalytics, BackendError> {
        self.enter(Call::Analytics).await?;
        let state = self.lock()?;
        Ok(state
            .classrooms
            .get(classroom)
            .map(|c| c.analytics.clone())
            .unwrap_or_default())
    }

    async fn mistakes(&self, scope: &MistakeScope) -> Result<Vec<MistakeEntry>, BackendError> {
        self.enter(Call::Mistakes).await?;
        let state = self.lock()?;
        let entries = match scope {
            MistakeScope::Classroom(id) => state
                .classrooms
                .get(id)
                .map(|c| c.mistakes.clone())
                .unwrap_or_default(),
            MistakeScope::All => state
                .classrooms
                .iter()
                .flat_map(|(id, c)| {
                    c.mistakes.iter().map(move |m| MistakeEntry {
                        classroom: Some(id.clone()),
                        ..m.clone()
                    })
                })
                .collect(),
        };
        Ok(entries)
    }
}
