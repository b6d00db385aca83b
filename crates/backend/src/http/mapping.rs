use std::collections::BTreeMap;

use quest_core::model::{
    AssessmentOutcome, ClassAnalytics, ClassroomId, CommonMistake, LearnerStatus, Level,
    MistakeEntry, PracticeQuestion, Progress, Question, QuestionDraft, QuestionError, QuestionId,
    RemedialPlan, SpendReceipt, validate_question_set,
};
use quest_core::session::SubmissionPayload;

use crate::api::BackendError;
use crate::http::wire::{
    AnalyticsBody, MistakeBody, MistakeOut, ProgressBody, QuestionBody, RemedialPlanBody,
    SpendBody, SubmitBody, SubmitRequest,
};

/// Clamp an untrusted JSON number into `u32`. Negative, fractional and
/// non-finite input saturate.
pub(crate) fn count(v: Option<f64>) -> u32 {
    match v {
        Some(n) if n.is_finite() && n > 0.0 => n.floor().min(f64::from(u32::MAX)) as u32,
        _ => 0,
    }
}

fn level_or_first(v: Option<f64>) -> Level {
    Level::new(count(v)).unwrap_or(Level::FIRST)
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

/// Keys look like `"2"` or `"level_2"`.
fn level_key(key: &str) -> Option<Level> {
    let digits = key.trim().trim_start_matches("level_");
    digits.parse::<u32>().ok().and_then(|n| Level::new(n).ok())
}

pub(crate) fn map_progress(body: ProgressBody) -> Progress {
    Progress {
        xp: count(body.xp),
        unlocked_level: level_or_first(body.unlocked_level),
        cooldown_remaining_secs: Some(count(body.cooldown_remaining)).filter(|s| *s > 0),
        remedial_plan: body.remedial_plan.and_then(map_remedial_plan),
        status: body
            .status
            .as_deref()
            .map(LearnerStatus::from_tag)
            .unwrap_or_default(),
        deadline_message: non_blank(body.deadline_message),
        current_chapter_title: non_blank(body.current_chapter_title),
        next_chapter_title: non_blank(body.next_chapter_title),
        total_chapters: count(body.total_chapters),
    }
}

/// An empty plan object means "no plan".
fn map_remedial_plan(body: RemedialPlanBody) -> Option<RemedialPlan> {
    let diagnosis = non_blank(body.diagnosis);
    let explanation = non_blank(body.explanation);
    if diagnosis.is_none() && explanation.is_none() {
        return None;
    }
    let practice_question = body.practice_question.and_then(|q| {
        let prompt = non_blank(q.question)?;
        Some(PracticeQuestion {
            prompt,
            choices: q.options.unwrap_or_default(),
            correct_answer: q.correct_answer,
            explanation: non_blank(q.explanation),
        })
    });
    Some(RemedialPlan {
        diagnosis: diagnosis.unwrap_or_default(),
        explanation: explanation.unwrap_or_default(),
        practice_question,
    })
}

pub(crate) fn map_questions(bodies: Vec<QuestionBody>) -> Result<Vec<Question>, QuestionError> {
    if bodies.is_empty() {
        return Ok(Vec::new());
    }
    let drafts = bodies
        .into_iter()
        .map(|q| QuestionDraft {
            id: q.id.map(QuestionId::new),
            prompt: q.question.unwrap_or_default(),
            choices: q.options,
            correct_answer: q.correct_answer,
            kind_tag: q.kind,
            explanation: q.explanation,
            hints: q.hints.unwrap_or_default(),
        })
        .collect();
    validate_question_set(drafts)
}

pub(crate) fn map_receipt(body: SpendBody) -> SpendReceipt {
    SpendReceipt {
        accepted: body.success.unwrap_or(false),
        message: non_blank(body.message),
    }
}

/// # Errors
///
/// Returns `BackendError::Rejected` for an `{error}` body and
/// `BackendError::Malformed` when `passed` is missing.
pub(crate) fn map_outcome(body: SubmitBody) -> Result<AssessmentOutcome, BackendError> {
    if let Some(reason) = non_blank(body.error) {
        return Err(BackendError::Rejected(reason));
    }
    let passed = body
        .passed
        .ok_or_else(|| BackendError::Malformed("submission result without `passed`".into()))?;
    Ok(AssessmentOutcome {
        passed,
        xp_gained: count(body.xp_gained),
        new_total_xp: count(body.new_total_xp),
        unlocked_level: level_or_first(body.unlocked_level),
        score: count(body.score),
    })
}

pub(crate) fn map_classrooms(names: Vec<String>) -> Vec<ClassroomId> {
    names
        .into_iter()
        .filter_map(|name| ClassroomId::new(name).ok())
        .collect()
}

pub(crate) fn map_analytics(body: AnalyticsBody) -> ClassAnalytics {
    let mut level_distribution = BTreeMap::new();
    let mut completed = 0;
    for (key, n) in body.level_distribution {
        if key.trim() == "completed" {
            completed = count(Some(n));
        } else if let Some(level) = level_key(&key) {
            level_distribution.insert(level, count(Some(n)));
        }
    }

    let average_attempts = body
        .average_attempts
        .into_iter()
        .filter(|(_, n)| n.is_finite() && *n >= 0.0)
        .filter_map(|(key, n)| level_key(&key).map(|level| (level, n)))
        .collect();

    let common_mistakes = body
        .common_mistakes
        .into_iter()
        .filter_map(|m| {
            Some(CommonMistake {
                concept: non_blank(m.concept)?,
                frequency: count(m.frequency),
            })
        })
        .collect();

    ClassAnalytics {
        total_students: count(body.total_students),
        level_distribution,
        completed,
        stuck_percent: count(body.stuck_percent),
        average_attempts,
        common_mistakes,
    }
}

/// Entries without question text are dropped.
pub(crate) fn map_mistakes(bodies: Vec<MistakeBody>) -> Vec<MistakeEntry> {
    bodies
        .into_iter()
        .filter_map(|m| {
            Some(MistakeEntry {
                question: non_blank(m.question)?,
                correct_answer: m.correct_answer,
                explanation: non_blank(m.explanation),
                submitted_answer: m.user_answer,
                level: m.level.and_then(|l| Level::new(count(Some(l))).ok()),
                comments: m.comments.unwrap_or_default(),
                classroom: m.session_id.and_then(|id| ClassroomId::new(id).ok()),
            })
        })
        .collect()
}

pub(crate) fn submit_request(payload: &SubmissionPayload) -> SubmitRequest<'_> {
    SubmitRequest {
        session_id: payload.classroom.as_str(),
        level: payload.level.value(),
        score: payload.score,
        max_score: payload.max_score,
        mistakes: payload
            .mistakes
            .iter()
            .map(|m| MistakeOut {
                question: &m.question,
                correct_answer: m.correct_answer.as_deref(),
                explanation: m.explanation.as_deref(),
                user_answer: &m.submitted_answer,
            })
            .collect(),
    }
}
