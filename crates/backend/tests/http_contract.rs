use std::time::Duration;

use backend::{BackendError, HttpBackend, HttpConfig, QuestApi};
use mockito::{Matcher, Server};
use quest_core::model::{
    ClassroomId, Level, MistakeRecord, MistakeScope, QuestionDraft, QuestionId, QuestionKind,
};
use quest_core::session::SubmissionPayload;
use serde_json::json;

fn client(server: &Server) -> HttpBackend {
    let config = HttpConfig::new(&server.url(), Duration::from_secs(5)).unwrap();
    HttpBackend::new(&config).unwrap()
}

fn classroom() -> ClassroomId {
    ClassroomId::new("physics").unwrap()
}

#[tokio::test]
async fn progress_defaults_missing_fields() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/progress/physics")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "current_chapter_title": "Optics.pdf" }).to_string())
        .create_async()
        .await;

    let progress = client(&server).progress(&classroom()).await.unwrap();

    assert_eq!(progress.xp, 0);
    assert_eq!(progress.unlocked_level, Level::FIRST);
    assert_eq!(progress.current_chapter_title.as_deref(), Some("Optics.pdf"));
}

#[tokio::test]
async fn generated_string_ids_are_tolerated() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/assessment/generate")
        .with_status(200)
        .with_body(
            json!({
                "questions": [
                    { "id": "7", "question": "Unit of force?", "options": ["Newton", "Joule"] },
                    { "id": "first", "question": "Unit of energy?", "options": ["Newton", "Joule"] }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let questions = client(&server)
        .generate_assessment(&classroom(), Level::FIRST)
        .await
        .unwrap();

    assert_eq!(questions[0].id(), QuestionId::new(7));
    assert_eq!(questions[1].id(), QuestionId::new(2));
}

#[tokio::test]
async fn generate_posts_classroom_and_level() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/assessment/generate")
        .match_body(Matcher::Json(json!({ "session_id": "physics", "level": 2 })))
        .with_status(200)
        .with_body(
            json!({
                "level": 2,
                "timer_seconds": 600,
                "questions": [
                    {
                        "id": 1,
                        "question": "Which lens converges light?",
                        "options": ["Convex", "Concave"],
                        "correct_answer": "Convex",
                        "explanation": "Convex lenses bend rays inward.",
                        "hints": ["Think of a magnifier", "Bulges outward", "Convex"]
                    },
                    {
                        "id": 2,
                        "question": "Describe total internal reflection.",
                        "type": "short_answer"
                    }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let questions = client(&server)
        .generate_assessment(&classroom(), Level::new(2).unwrap())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].hints().len(), 3);
    assert_eq!(questions[0].correct_answer(), Some("Convex"));
    assert_eq!(questions[1].kind(), QuestionKind::ShortAnswer);
}

#[tokio::test]
async fn generate_error_body_is_a_rejection() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/assessment/generate")
        .with_status(200)
        .with_body(json!({ "error": "No documents found for this session." }).to_string())
        .create_async()
        .await;

    let err = client(&server)
        .generate_assessment(&classroom(), Level::FIRST)
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::Rejected(reason) if reason.contains("No documents")));
}

#[tokio::test]
async fn generate_without_questions_is_empty() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/assessment/generate")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let questions = client(&server)
        .generate_assessment(&classroom(), Level::FIRST)
        .await
        .unwrap();
    assert!(questions.is_empty());
}

#[tokio::test]
async fn duplicate_question_ids_are_malformed() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/assessment/generate")
        .with_status(200)
        .with_body(
            json!({ "questions": [
                { "id": 3, "question": "A?", "options": ["x"] },
                { "id": 3, "question": "B?", "options": ["y"] }
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let err = client(&server)
        .generate_assessment(&classroom(), Level::FIRST)
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::InvalidQuestions(_)));
}

#[tokio::test]
async fn spend_reports_decline_message() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/spend_xp")
        .match_body(Matcher::Json(json!({ "session_id": "physics", "amount": 10 })))
        .with_status(200)
        .with_body(json!({ "success": false, "message": "Insufficient XP" }).to_string())
        .create_async()
        .await;

    let receipt = client(&server).spend_xp(&classroom(), 10).await.unwrap();

    assert!(!receipt.accepted);
    assert_eq!(receipt.message.as_deref(), Some("Insufficient XP"));
}

#[tokio::test]
async fn submit_sends_mistakes_in_wire_shape() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/assessment/submit")
        .match_body(Matcher::Json(json!({
            "session_id": "physics",
            "level": 1,
            "score": 1,
            "max_score": 3,
            "mistakes": [{
                "question": "Speed of light?",
                "correct_answer": "c",
                "explanation": null,
                "user_answer": "v"
            }]
        })))
        .with_status(200)
        .with_body(
            json!({
                "passed": false,
                "xp_gained": 0,
                "new_total_xp": 40,
                "unlocked_level": 1,
                "score": 1
            })
            .to_string(),
        )
        .create_async()
        .await;

    let question = QuestionDraft {
        id: Some(QuestionId::new(2)),
        prompt: "Speed of light?".into(),
        choices: Some(vec!["c".into(), "v".into()]),
        correct_answer: Some("c".into()),
        ..QuestionDraft::default()
    }
    .validate(1)
    .unwrap();
    let payload = SubmissionPayload {
        classroom: classroom(),
        level: Level::FIRST,
        score: 1,
        max_score: 3,
        mistakes: vec![MistakeRecord::for_answer(&question, "v")],
    };

    let outcome = client(&server).submit_assessment(&payload).await.unwrap();

    mock.assert_async().await;
    assert!(!outcome.passed);
    assert_eq!(outcome.new_total_xp, 40);
}

#[tokio::test]
async fn server_errors_map_to_status() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/classrooms")
        .with_status(503)
        .create_async()
        .await;

    let err = client(&server).list_classrooms().await.unwrap_err();
    assert!(matches!(err, BackendError::Status(status) if status.as_u16() == 503));
}

#[tokio::test]
async fn unparseable_body_is_malformed() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/teacher/analytics/physics")
        .with_status(200)
        .with_body("<html>oops</html>")
        .create_async()
        .await;

    let err = client(&server).analytics(&classroom()).await.unwrap_err();
    assert!(matches!(err, BackendError::Malformed(_)));
}

#[tokio::test]
async fn classrooms_and_global_mistakes() {
    let mut server = Server::new_async().await;
    let _classrooms = server
        .mock("GET", "/api/classrooms")
        .with_status(200)
        .with_body(json!({ "classrooms": ["physics", " ", "chemistry"] }).to_string())
        .create_async()
        .await;
    let _mistakes = server
        .mock("GET", "/api/mistakes/all")
        .with_status(200)
        .with_body(
            json!([{
                "question": "Unit of force?",
                "correct_answer": "Newton",
                "user_answer": "Joule",
                "level": 1,
                "comments": "",
                "session_id": "physics"
            }])
            .to_string(),
        )
        .create_async()
        .await;

    let backend = client(&server);
    let rooms = backend.list_classrooms().await.unwrap();
    assert_eq!(rooms.len(), 2);

    let mistakes = backend.mistakes(&MistakeScope::All).await.unwrap();
    assert_eq!(mistakes.len(), 1);
    assert_eq!(mistakes[0].classroom, Some(classroom()));
    assert_eq!(mistakes[0].submitted_answer.as_deref(), Some("Joule"));
}
