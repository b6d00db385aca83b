use super::*;
use crate::model::QuestionDraft;
use crate::time::fixed_now;

fn classroom() -> ClassroomId {
    ClassroomId::new("math-101").unwrap()
}

fn mcq(id: u64, hints: &[&str]) -> Question {
    QuestionDraft {
        id: Some(QuestionId::new(id)),
        prompt: format!("Question {id}?"),
        choices: Some(vec!["A".into(), "B".into(), "C".into()]),
        correct_answer: Some("A".into()),
        kind_tag: Some("mcq".into()),
        explanation: Some(format!("Because of {id}.")),
        hints: hints.iter().map(|h| (*h).to_string()).collect(),
    }
    .validate(0)
    .unwrap()
}

fn short_answer(id: u64) -> Question {
    QuestionDraft {
        id: Some(QuestionId::new(id)),
        prompt: format!("Explain {id}."),
        kind_tag: Some("short_answer".into()),
        ..QuestionDraft::default()
    }
    .validate(0)
    .unwrap()
}

fn three_mcq() -> Vec<Question> {
    vec![mcq(1, &[]), mcq(2, &[]), mcq(3, &[])]
}

/// An `Active` session over `questions` with `balance` XP.
fn active(questions: Vec<Question>, balance: u32) -> AssessmentSession {
    let mut session = AssessmentSession::default();
    session.open(classroom(), Level::FIRST, fixed_now());
    let generation = session.generation();
    session.questions_loaded(generation, Ok(questions));
    session.balance_loaded(generation, Ok(balance));
    assert_eq!(session.phase(), Phase::Active);
    session
}

fn feedback_ticket(effects: &[Effect]) -> FeedbackTicket {
    effects
        .iter()
        .find_map(|e| match e {
            Effect::ScheduleFeedback { ticket, .. } => Some(*ticket),
            _ => None,
        })
        .expect("a feedback schedule")
}

fn hint_ticket(effects: &[Effect]) -> HintTicket {
    effects
        .iter()
        .find_map(|e| match e {
            Effect::SpendXp { ticket, .. } => Some(*ticket),
            _ => None,
        })
        .expect("a spend request")
}

fn answer_and_advance(session: &mut AssessmentSession, text: &str) -> Vec<Effect> {
    let effects = session.answer(text).unwrap();
    session.feedback_elapsed(feedback_ticket(&effects))
}

fn outcome(passed: bool) -> AssessmentOutcome {
    AssessmentOutcome {
        passed,
        xp_gained: if passed { 50 } else { 0 },
        new_total_xp: 50,
        unlocked_level: Level::new(2).unwrap(),
        score: 3,
    }
}

//
// ─── LOADING ───────────────────────────────────────────────────────────────────
//

#[test]
fn open_requests_questions_and_balance() {
    let mut session = AssessmentSession::default();
    assert_eq!(session.phase(), Phase::Closed);

    let effects = session.open(classroom(), Level::FIRST, fixed_now());
    let generation = session.generation();

    assert_eq!(session.phase(), Phase::Loading);
    assert_eq!(
        effects,
        vec![
            Effect::FetchQuestions {
                generation,
                classroom: classroom(),
                level: Level::FIRST,
            },
            Effect::FetchBalance {
                generation,
                classroom: classroom(),
            },
        ]
    );
    assert_eq!(session.started_at(), Some(fixed_now()));
    assert_eq!(session.remaining_secs(), DEFAULT_TIME_BUDGET_SECS);
}

#[test]
fn loaded_questions_start_the_countdown() {
    let mut session = AssessmentSession::default();
    session.open(classroom(), Level::FIRST, fixed_now());
    let generation = session.generation();

    let effects = session.questions_loaded(generation, Ok(three_mcq()));

    assert_eq!(effects, vec![Effect::StartCountdown { generation }]);
    assert_eq!(session.phase(), Phase::Active);
    assert_eq!(session.current_index(), Some(0));
    assert_eq!(session.stage(), Some(Stage::AwaitingAnswer));
}

#[test]
fn empty_question_set_stays_loading_and_can_retry() {
    let mut session = AssessmentSession::default();
    session.open(classroom(), Level::FIRST, fixed_now());
    let generation = session.generation();

    let effects = session.questions_loaded(generation, Ok(Vec::new()));
    assert_eq!(effects, vec![Effect::Notify(Notice::NoQuestions)]);
    assert_eq!(session.phase(), Phase::Loading);
    assert!(session.load_error().is_some());

    let retry = session.retry_load().unwrap();
    assert!(matches!(retry.as_slice(), [Effect::FetchQuestions { .. }]));
    assert_eq!(session.retry_load(), Err(SessionError::RequestInFlight));

    session.questions_loaded(generation, Ok(three_mcq()));
    assert_eq!(session.phase(), Phase::Active);
}

#[test]
fn load_failure_is_reported() {
    let mut session = AssessmentSession::default();
    session.open(classroom(), Level::FIRST, fixed_now());
    let generation = session.generation();

    let effects = session.questions_loaded(generation, Err("HTTP 500".into()));
    assert_eq!(
        effects,
        vec![Effect::Notify(Notice::LoadFailed {
            reason: "HTTP 500".into()
        })]
    );
    assert_eq!(session.load_error(), Some("HTTP 500"));
}

#[test]
fn stale_questions_are_discarded_after_reopen() {
    let mut session = AssessmentSession::default();
    session.open(classroom(), Level::FIRST, fixed_now());
    let stale = session.generation();
    session.open(classroom(), Level::new(2).unwrap(), fixed_now());

    assert!(session.questions_loaded(stale, Ok(three_mcq())).is_empty());
    assert_eq!(session.phase(), Phase::Loading);
    assert!(session.questions().is_empty());
}

#[test]
fn balance_is_applied_once_per_generation() {
    let mut session = AssessmentSession::default();
    session.open(classroom(), Level::FIRST, fixed_now());
    let generation = session.generation();

    session.balance_loaded(generation, Ok(20));
    session.balance_loaded(generation, Ok(500));
    assert_eq!(session.xp_balance(), 20);
    assert_eq!(session.retry_balance(), Err(SessionError::BalanceLoaded));
}

#[test]
fn failed_balance_can_be_retried() {
    let mut session = AssessmentSession::default();
    session.open(classroom(), Level::FIRST, fixed_now());
    let generation = session.generation();

    let effects = session.balance_loaded(generation, Err("offline".into()));
    assert!(matches!(
        effects.as_slice(),
        [Effect::Notify(Notice::BalanceUnavailable { .. })]
    ));
    assert_eq!(session.xp_balance(), 0);

    let retry = session.retry_balance().unwrap();
    assert!(matches!(retry.as_slice(), [Effect::FetchBalance { .. }]));
    session.balance_loaded(generation, Ok(15));
    assert_eq!(session.xp_balance(), 15);
}

//
// ─── ANSWERING ─────────────────────────────────────────────────────────────────
//

#[test]
fn answer_shows_feedback_then_advances() {
    let mut session = active(three_mcq(), 0);

    let effects = session.answer("A").unwrap();
    let ticket = feedback_ticket(&effects);
    assert_eq!(
        effects,
        vec![Effect::ScheduleFeedback {
            ticket,
            delay: DEFAULT_FEEDBACK_DELAY,
        }]
    );
    assert_eq!(
        session.stage(),
        Some(Stage::ShowingFeedback(Verdict::Correct))
    );
    assert_eq!(session.current_index(), Some(0));

    assert!(session.feedback_elapsed(ticket).is_empty());
    assert_eq!(session.current_index(), Some(1));
    assert_eq!(session.stage(), Some(Stage::AwaitingAnswer));
}

#[test]
fn answers_are_locked_while_feedback_shows() {
    let mut session = active(three_mcq(), 0);

    session.answer("B").unwrap();
    assert_eq!(session.answer("A"), Err(SessionError::AnswerLocked));
    assert_eq!(session.answer_choice(0), Err(SessionError::AnswerLocked));

    assert_eq!(session.mistakes().len(), 1);
    assert_eq!(session.answer_for(QuestionId::new(1)), Some("B"));
}

#[test]
fn navigation_is_blocked_while_feedback_shows() {
    let mut session = active(three_mcq(), 0);
    session.answer("A").unwrap();

    assert_eq!(session.next(), Err(SessionError::AnswerLocked));
    assert_eq!(session.previous(), Err(SessionError::AnswerLocked));
}

#[test]
fn revisited_question_cannot_be_answered_again() {
    let mut session = active(three_mcq(), 0);
    answer_and_advance(&mut session, "B");

    session.previous().unwrap();
    assert_eq!(
        session.answer("A"),
        Err(SessionError::AlreadyAnswered {
            id: QuestionId::new(1)
        })
    );
    assert_eq!(session.mistakes().len(), 1);

    session.next().unwrap();
    assert_eq!(session.current_index(), Some(1));
}

#[test]
fn next_requires_an_answer() {
    let mut session = active(three_mcq(), 0);
    assert_eq!(session.next(), Err(SessionError::Unanswered));
    assert_eq!(session.previous(), Err(SessionError::AtFirstQuestion));
}

#[test]
fn blank_and_unknown_choices_are_rejected() {
    let mut session = active(three_mcq(), 0);
    assert_eq!(session.answer("   "), Err(SessionError::EmptyAnswer));
    assert_eq!(
        session.answer_choice(7),
        Err(SessionError::NoSuchChoice { index: 7 })
    );
    assert_eq!(session.stage(), Some(Stage::AwaitingAnswer));
}

#[test]
fn answer_choice_uses_choice_text() {
    let mut session = active(three_mcq(), 0);
    session.answer_choice(0).unwrap();
    assert_eq!(session.answer_for(QuestionId::new(1)), Some("A"));
    assert!(session.mistakes().is_empty());
}

#[test]
fn wrong_choice_records_a_mistake() {
    let mut session = active(three_mcq(), 0);
    session.answer_choice(2).unwrap();

    let mistake = &session.mistakes()[0];
    assert_eq!(mistake.question, "Question 1?");
    assert_eq!(mistake.submitted_answer, "C");
    assert_eq!(mistake.correct_answer.as_deref(), Some("A"));
    assert_eq!(mistake.explanation.as_deref(), Some("Because of 1."));
}

#[test]
fn short_answers_get_a_neutral_pulse_and_no_mistake() {
    let mut session = active(vec![short_answer(1), mcq(2, &[])], 0);
    session.answer("a short reply").unwrap();

    assert_eq!(
        session.stage(),
        Some(Stage::ShowingFeedback(Verdict::Recorded))
    );
    assert!(session.mistakes().is_empty());
}

#[test]
fn last_answer_submits_after_feedback() {
    let mut session = active(three_mcq(), 0);
    answer_and_advance(&mut session, "A");
    answer_and_advance(&mut session, "B");

    let effects = answer_and_advance(&mut session, "A");
    let generation = session.generation();

    assert_eq!(session.phase(), Phase::Submitting);
    assert_eq!(effects[0], Effect::StopCountdown);
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Submit {
            generation: g,
            trigger: SubmitTrigger::LastAnswer,
            payload,
        } if *g == generation && payload.score == 2 && payload.max_score == 3
    )));
}

#[test]
fn superseded_feedback_ticket_is_ignored() {
    let mut session = active(three_mcq(), 0);
    let first = feedback_ticket(&session.answer("A").unwrap());
    session.feedback_elapsed(first);

    assert!(session.feedback_elapsed(first).is_empty());
    assert_eq!(session.current_index(), Some(1));
}

//
// ─── COUNTDOWN ─────────────────────────────────────────────────────────────────
//

#[test]
fn countdown_drops_one_second_per_tick() {
    let mut session = active(three_mcq(), 0);
    let generation = session.generation();

    for _ in 0..10 {
        assert!(session.tick(generation).is_empty());
    }
    assert_eq!(session.remaining_secs(), 590);
}

#[test]
fn ticks_from_an_old_generation_are_ignored() {
    let mut session = active(three_mcq(), 0);
    let stale = session.generation();
    session.close();
    session.open(classroom(), Level::FIRST, fixed_now());
    session.questions_loaded(session.generation(), Ok(three_mcq()));

    session.tick(stale);
    assert_eq!(session.remaining_secs(), 600);
}

#[test]
fn timeout_submits_exactly_once_with_partial_answers() {
    let mut session = active(three_mcq(), 0);
    let generation = session.generation();
    answer_and_advance(&mut session, "A");
    answer_and_advance(&mut session, "B");

    let mut submits = Vec::new();
    let mut time_up = 0;
    for _ in 0..700 {
        for effect in session.tick(generation) {
            match effect {
                Effect::Submit {
                    trigger, payload, ..
                } => submits.push((trigger, payload)),
                Effect::Notify(Notice::TimeUp) => time_up += 1,
                _ => {}
            }
        }
    }

    assert_eq!(time_up, 1);
    assert_eq!(submits.len(), 1);
    let (trigger, payload) = &submits[0];
    assert_eq!(*trigger, SubmitTrigger::Timeout);
    assert_eq!(payload.score, 1);
    assert_eq!(payload.max_score, 3);
    assert_eq!(payload.mistakes.len(), 1);
    assert_eq!(payload.mistakes[0].question, "Question 2?");
    assert_eq!(session.remaining_secs(), 0);
    assert_eq!(session.phase(), Phase::Submitting);
}

#[test]
fn timeout_during_feedback_cancels_the_advance() {
    let mut session = active(three_mcq(), 0);
    let generation = session.generation();
    for _ in 0..599 {
        session.tick(generation);
    }
    let ticket = feedback_ticket(&session.answer("A").unwrap());

    let effects = session.tick(generation);
    assert!(effects.contains(&Effect::CancelFeedback));
    assert!(effects.contains(&Effect::StopCountdown));
    assert_eq!(session.phase(), Phase::Submitting);

    assert!(session.feedback_elapsed(ticket).is_empty());
    assert_eq!(session.submission_payload().map(|p| p.score), Some(1));
}

//
// ─── HINTS ─────────────────────────────────────────────────────────────────────
//

#[test]
fn hint_prices_escalate_and_balance_gates_purchases() {
    let mut session = active(vec![mcq(1, &["h1", "h2", "h3"])], 5);

    let effects = session.request_hint().unwrap();
    assert_eq!(
        effects,
        vec![Effect::Notify(Notice::HintUnlocked {
            ordinal: 1,
            cost: 0
        })]
    );
    assert_eq!(session.xp_balance(), 5);
    assert_eq!(session.unlocked_hints(), ["h1".to_string()]);
    assert_eq!(session.next_hint_cost(), Some(5));

    let effects = session.request_hint().unwrap();
    let ticket = hint_ticket(&effects);
    assert!(matches!(
        effects.as_slice(),
        [Effect::SpendXp { amount: 5, .. }]
    ));
    assert_eq!(session.xp_balance(), 5);
    assert_eq!(session.unlocked_hints().len(), 1);
    assert_eq!(
        session.request_hint(),
        Err(SessionError::HintPurchasePending)
    );

    let effects = session.hint_settled(ticket, Ok(SpendReceipt::accepted()));
    assert_eq!(
        effects,
        vec![Effect::Notify(Notice::HintUnlocked {
            ordinal: 2,
            cost: 5
        })]
    );
    assert_eq!(session.xp_balance(), 0);
    assert_eq!(session.unlocked_hints().len(), 2);

    assert_eq!(
        session.request_hint(),
        Err(SessionError::InsufficientXp {
            cost: 10,
            balance: 0
        })
    );
    assert_eq!(session.unlocked_hints().len(), 2);
}

#[test]
fn declined_purchase_changes_nothing() {
    let mut session = active(vec![mcq(1, &["h1", "h2"])], 50);
    session.request_hint().unwrap();
    let ticket = hint_ticket(&session.request_hint().unwrap());

    let effects = session.hint_settled(ticket, Ok(SpendReceipt::declined("Not enough XP")));
    assert_eq!(
        effects,
        vec![Effect::Notify(Notice::HintDeclined {
            reason: "Not enough XP".into()
        })]
    );
    assert_eq!(session.xp_balance(), 50);
    assert_eq!(session.unlocked_hints().len(), 1);
    assert!(!session.hint_purchase_pending());
}

#[test]
fn failed_purchase_changes_nothing() {
    let mut session = active(vec![mcq(1, &["h1", "h2"])], 50);
    session.request_hint().unwrap();
    let ticket = hint_ticket(&session.request_hint().unwrap());

    let effects = session.hint_settled(ticket, Err("timeout".into()));
    assert!(matches!(
        effects.as_slice(),
        [Effect::Notify(Notice::HintFailed { .. })]
    ));
    assert_eq!(session.xp_balance(), 50);
    assert_eq!(session.unlocked_hints().len(), 1);
}

#[test]
fn hint_request_past_the_last_hint_is_a_no_op() {
    let mut session = active(vec![mcq(1, &["only"])], 50);
    session.request_hint().unwrap();

    assert_eq!(session.request_hint(), Ok(Vec::new()));
    assert_eq!(session.next_hint_cost(), None);
    assert_eq!(session.xp_balance(), 50);
}

#[test]
fn hints_reset_when_the_question_changes() {
    let mut session = active(vec![mcq(1, &["a1"]), mcq(2, &["b1"])], 0);
    session.request_hint().unwrap();
    assert_eq!(session.unlocked_hints().len(), 1);

    answer_and_advance(&mut session, "A");
    assert!(session.unlocked_hints().is_empty());

    session.previous().unwrap();
    assert!(session.unlocked_hints().is_empty());
}

#[test]
fn purchase_settling_after_navigation_charges_but_does_not_unlock() {
    let mut session = active(vec![mcq(1, &["a1", "a2"]), mcq(2, &["b1", "b2"])], 20);
    session.request_hint().unwrap();
    let ticket = hint_ticket(&session.request_hint().unwrap());

    answer_and_advance(&mut session, "A");
    let effects = session.hint_settled(ticket, Ok(SpendReceipt::accepted()));

    assert!(effects.is_empty());
    assert_eq!(session.xp_balance(), 15);
    assert_eq!(session.current_index(), Some(1));
    assert!(session.unlocked_hints().is_empty());
}

//
// ─── SUBMISSION ────────────────────────────────────────────────────────────────
//

#[test]
fn complete_is_only_offered_on_the_last_question() {
    let mut session = active(three_mcq(), 0);
    assert_eq!(session.complete(), Err(SessionError::NotLastQuestion));

    answer_and_advance(&mut session, "A");
    answer_and_advance(&mut session, "A");
    let effects = session.complete().unwrap();

    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Submit {
            trigger: SubmitTrigger::Manual,
            ..
        }
    )));
    assert_eq!(session.complete(), Err(SessionError::SubmissionInFlight));
}

#[test]
fn manual_complete_during_last_feedback_submits_once() {
    let mut session = active(vec![mcq(1, &[])], 0);
    let ticket = feedback_ticket(&session.answer("A").unwrap());

    let effects = session.complete().unwrap();
    assert!(effects.contains(&Effect::CancelFeedback));
    assert!(session.feedback_elapsed(ticket).is_empty());
    assert!(session.tick(session.generation()).is_empty());
}

#[test]
fn failed_submission_keeps_results_and_retries_same_payload() {
    let mut session = active(three_mcq(), 0);
    answer_and_advance(&mut session, "A");
    answer_and_advance(&mut session, "B");
    let first = answer_and_advance(&mut session, "C");
    let generation = session.generation();
    let sent = first
        .iter()
        .find_map(|e| match e {
            Effect::Submit { payload, .. } => Some(payload.clone()),
            _ => None,
        })
        .unwrap();

    let effects = session.submission_settled(generation, Err("HTTP 502".into()), fixed_now());
    assert_eq!(
        effects,
        vec![Effect::Notify(Notice::SubmitFailed {
            reason: "HTTP 502".into()
        })]
    );
    assert_eq!(session.phase(), Phase::Submitting);
    assert!(session.outcome().is_none());
    assert_eq!(session.submission_error(), Some("HTTP 502"));
    assert_eq!(session.mistakes().len(), 2);

    let retry = session.retry_submission().unwrap();
    assert_eq!(
        retry,
        vec![Effect::Submit {
            generation,
            trigger: SubmitTrigger::LastAnswer,
            payload: sent,
        }]
    );
    assert_eq!(
        session.retry_submission(),
        Err(SessionError::SubmissionInFlight)
    );

    let arrived = fixed_now() + chrono::Duration::seconds(95);
    let effects = session.submission_settled(generation, Ok(outcome(true)), arrived);
    assert_eq!(
        effects,
        vec![Effect::Notify(Notice::Finished {
            passed: true,
            xp_gained: 50
        })]
    );
    assert_eq!(session.phase(), Phase::Finished);
    assert_eq!(session.finished_at(), Some(arrived));
    assert_eq!(session.time_taken_secs(), Some(95));
}

#[test]
fn stale_submission_result_is_dropped() {
    let mut session = active(vec![mcq(1, &[])], 0);
    answer_and_advance(&mut session, "A");
    let stale = session.generation();
    session.close();

    assert!(session
        .submission_settled(stale, Ok(outcome(true)), fixed_now())
        .is_empty());
    assert_eq!(session.phase(), Phase::Closed);
    assert!(session.outcome().is_none());
}

//
// ─── RESET AND REVIEW ──────────────────────────────────────────────────────────
//

#[test]
fn reset_during_feedback_leaves_new_attempt_untouched() {
    let mut session = active(three_mcq(), 0);
    let ticket = feedback_ticket(&session.answer("A").unwrap());

    let effects = session.close();
    assert!(effects.contains(&Effect::StopCountdown));
    assert!(effects.contains(&Effect::CancelFeedback));

    session.open(classroom(), Level::FIRST, fixed_now());
    session.questions_loaded(session.generation(), Ok(three_mcq()));

    assert!(session.feedback_elapsed(ticket).is_empty());
    assert_eq!(session.current_index(), Some(0));
    assert_eq!(session.stage(), Some(Stage::AwaitingAnswer));
    assert_eq!(session.answered_count(), 0);
}

#[test]
fn close_forgets_everything() {
    let mut session = active(three_mcq(), 30);
    session.close();

    assert_eq!(session.phase(), Phase::Closed);
    assert!(session.questions().is_empty());
    assert!(session.mistakes().is_empty());
    assert_eq!(session.xp_balance(), 0);
    assert_eq!(session.answer("A"), Err(SessionError::NotActive));
}

#[test]
fn review_lists_every_question_with_verdicts() {
    let mut session = active(vec![mcq(1, &[]), mcq(2, &[]), short_answer(3)], 0);
    assert_eq!(session.enter_review(), Err(SessionError::NoResult));

    answer_and_advance(&mut session, "A");
    answer_and_advance(&mut session, "B");
    session.answer("a considered reply").unwrap();
    session.complete().unwrap();
    session.submission_settled(session.generation(), Ok(outcome(false)), fixed_now());
    assert!(session.review().is_none());

    session.enter_review().unwrap();
    let review = session.review().unwrap();
    let verdicts: Vec<_> = review.iter().map(|item| item.verdict).collect();
    assert_eq!(
        verdicts,
        vec![
            ReviewVerdict::Correct,
            ReviewVerdict::Incorrect,
            ReviewVerdict::Ungraded,
        ]
    );
    assert_eq!(review[1].submitted, Some("B"));
    assert_eq!(review[2].position, 3);
}

#[test]
fn review_marks_unanswered_questions_after_timeout() {
    let mut session = active(three_mcq(), 0);
    let generation = session.generation();
    answer_and_advance(&mut session, "A");
    for _ in 0..600 {
        session.tick(generation);
    }
    session.submission_settled(generation, Ok(outcome(false)), fixed_now());
    session.enter_review().unwrap();

    let review = session.review().unwrap();
    assert_eq!(review[1].verdict, ReviewVerdict::Unanswered);
    assert_eq!(review[2].verdict, ReviewVerdict::Unanswered);
}
