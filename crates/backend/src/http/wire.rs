//! JSON shapes exchanged with the quest backend.
//!
//! Response types default every field: the backend is untrusted and partial
//! bodies are normal. Numbers arrive as JSON numbers of any flavour, so they
//! are read as `f64` and clamped during mapping.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

//
// ─── REQUESTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequest<'a> {
    pub session_id: &'a str,
    pub level: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct SpendRequest<'a> {
    pub session_id: &'a str,
    pub amount: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitRequest<'a> {
    pub session_id: &'a str,
    pub level: u32,
    pub score: u32,
    pub max_score: u32,
    pub mistakes: Vec<MistakeOut<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MistakeOut<'a> {
    pub question: &'a str,
    pub correct_answer: Option<&'a str>,
    pub explanation: Option<&'a str>,
    pub user_answer: &'a str,
}

//
// ─── RESPONSES ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ProgressBody {
    pub xp: Option<f64>,
    pub unlocked_level: Option<f64>,
    pub cooldown_remaining: Option<f64>,
    pub remedial_plan: Option<RemedialPlanBody>,
    pub status: Option<String>,
    pub deadline_message: Option<String>,
    pub current_chapter_title: Option<String>,
    pub next_chapter_title: Option<String>,
    pub total_chapters: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RemedialPlanBody {
    pub diagnosis: Option<String>,
    pub explanation: Option<String>,
    pub practice_question: Option<PracticeQuestionBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PracticeQuestionBody {
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct GenerateBody {
    pub questions: Option<Vec<QuestionBody>>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct QuestionBody {
    #[serde(deserialize_with = "lenient_id")]
    pub id: Option<u64>,
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub explanation: Option<String>,
    pub hints: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SpendBody {
    pub success: Option<bool>,
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SubmitBody {
    pub passed: Option<bool>,
    pub xp_gained: Option<f64>,
    pub new_total_xp: Option<f64>,
    pub unlocked_level: Option<f64>,
    pub score: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ClassroomsBody {
    pub classrooms: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AnalyticsBody {
    pub total_students: Option<f64>,
    pub level_distribution: HashMap<String, f64>,
    pub stuck_percent: Option<f64>,
    pub average_attempts: HashMap<String, f64>,
    pub common_mistakes: Vec<CommonMistakeBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CommonMistakeBody {
    pub concept: Option<String>,
    pub frequency: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct MistakeBody {
    pub question: Option<String>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub user_answer: Option<String>,
    pub level: Option<f64>,
    pub comments: Option<String>,
    pub session_id: Option<String>,
}

/// Generated question sets sometimes carry ids as strings. Anything that is
/// not a non-negative integer reads as absent, so the position stands in.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
