//! Interactive terminal loop around one `AssessmentController`.

use std::io;

use quest_core::model::QuestionKind;
use quest_core::scoring::Verdict;
use quest_core::session::{Notice, Phase, ReviewVerdict};
use services::{AssessmentController, ControllerError, SessionView, format_countdown};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::input::pick_choice;

/// Countdown values announced while a question is on screen.
const ANNOUNCE_AT: [u32; 5] = [300, 120, 60, 30, 10];

enum Flow {
    Continue(Vec<Notice>),
    Quit,
}

/// Run the quiz until the user quits or stdin closes.
pub async fn run(mut controller: AssessmentController) -> io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shown: Option<SessionView> = None;
    print_help();

    loop {
        let view = controller.view();
        if let Some(previous) = &shown {
            announce_time(previous, &view);
        }
        if shown.as_ref().map(screen) != Some(screen(&view)) {
            render(&view);
        }
        shown = Some(view);

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match handle(&mut controller, line.trim()) {
                    Ok(Flow::Continue(notices)) => print_notices(&notices),
                    Ok(Flow::Quit) => break,
                    Err(err) => println!("! {err}"),
                }
            }
            notices = controller.next_update() => print_notices(&notices),
        }
    }

    controller.close();
    Ok(())
}

fn handle(controller: &mut AssessmentController, line: &str) -> Result<Flow, ControllerError> {
    let notices = match line {
        "" => Vec::new(),
        ":quit" | ":q" => return Ok(Flow::Quit),
        ":help" => {
            print_help();
            Vec::new()
        }
        ":hint" => controller.unlock_hint()?,
        ":prev" => {
            controller.previous()?;
            Vec::new()
        }
        ":next" => {
            controller.next()?;
            Vec::new()
        }
        ":done" => controller.complete()?,
        ":retry" => retry(controller)?,
        ":time" => {
            println!("{} left", controller.view().countdown());
            Vec::new()
        }
        ":review" => {
            if controller.session().phase() != Phase::Review {
                controller.enter_review()?;
            }
            print_review(controller);
            Vec::new()
        }
        text => answer(controller, text)?,
    };
    Ok(Flow::Continue(notices))
}

/// Retry whatever failed last.
fn retry(controller: &mut AssessmentController) -> Result<Vec<Notice>, ControllerError> {
    let view = controller.view();
    if view.load_error.is_some() {
        controller.retry_load()
    } else if view.submission_error.is_some() {
        controller.retry_submission()
    } else {
        controller.retry_balance()
    }
}

/// On multiple-choice questions the input is matched against the choices
/// first; anything else is taken as typed text.
fn answer(controller: &mut AssessmentController, text: &str) -> Result<Vec<Notice>, ControllerError> {
    let choice = controller
        .view()
        .question
        .filter(|q| q.kind == QuestionKind::MultipleChoice)
        .and_then(|q| pick_choice(&q.choices, text));
    match choice {
        Some(index) => controller.answer_choice(index),
        None => controller.answer(text),
    }
}

//
// ─── RENDERING ─────────────────────────────────────────────────────────────────
//

/// The part of a view that warrants a redraw. The countdown alone does not.
fn screen(view: &SessionView) -> SessionView {
    SessionView {
        remaining_secs: 0,
        ..view.clone()
    }
}

fn announce_time(previous: &SessionView, current: &SessionView) {
    if current.phase != Phase::Active || previous.remaining_secs == current.remaining_secs {
        return;
    }
    if ANNOUNCE_AT.contains(&current.remaining_secs) || (1..=5).contains(&current.remaining_secs)
    {
        println!("⏱ {} left", format_countdown(current.remaining_secs));
    }
}

fn render(view: &SessionView) {
    match view.phase {
        Phase::Closed | Phase::Review => {}
        Phase::Loading => {
            if view.load_error.is_some() {
                println!("Type :retry to try again, or :quit.");
            } else {
                println!("Loading assessment...");
            }
        }
        Phase::Active => render_question(view),
        Phase::Submitting => match &view.submission_error {
            Some(_) if !view.submitting => println!("Type :retry (or :done) to submit again."),
            _ => println!("Submitting your answers..."),
        },
        Phase::Finished => {
            let Some(outcome) = &view.outcome else {
                return;
            };
            if outcome.passed {
                println!(
                    "Passed with score {}! +{} XP (total {}). Level {} is open.",
                    outcome.score, outcome.xp_gained, outcome.new_total_xp, outcome.unlocked_level
                );
            } else {
                println!("Score {}. Not passed this time.", outcome.score);
            }
            if let Some(secs) = view.time_taken_secs {
                println!("Time taken: {}", format_countdown(secs));
            }
            println!("Type :review to go through your answers, or :quit.");
        }
    }
}

fn render_question(view: &SessionView) {
    let Some(question) = &view.question else {
        return;
    };

    println!();
    println!(
        "Question {}/{}  [{}]  {} XP",
        question.position,
        question.total,
        view.countdown(),
        view.xp_balance
    );
    println!("{}", question.prompt);
    for (i, choice) in question.choices.iter().enumerate() {
        println!("  {}) {choice}", i + 1);
    }
    for (i, hint) in question.hints.iter().enumerate() {
        println!("  hint {}: {hint}", i + 1);
    }

    match view.feedback {
        Some(Verdict::Correct) => println!("Correct!"),
        Some(Verdict::Incorrect) => println!("Incorrect."),
        Some(Verdict::Recorded) => println!("Answer recorded."),
        None => {
            if let Some(answer) = &question.answer {
                println!("  answered: {answer}");
            }
        }
    }

    if view.hint_pending {
        println!("Unlocking hint...");
    } else if let Some(cost) = view.next_hint_cost {
        if question.hints.len() < question.hints_available {
            match cost {
                0 => println!("(:hint is free)"),
                cost => println!("(:hint costs {cost} XP)"),
            }
        }
    }
    if view.can_complete && question.answer.is_some() && view.feedback.is_none() {
        println!("Type :done to submit.");
    }
}

fn print_review(controller: &AssessmentController) {
    let Some(items) = controller.review() else {
        return;
    };
    for item in items {
        let mark = match item.verdict {
            ReviewVerdict::Correct => "✓",
            ReviewVerdict::Incorrect => "✗",
            ReviewVerdict::Unanswered => "-",
            ReviewVerdict::Ungraded => "?",
        };
        println!("{mark} {}. {}", item.position, item.question.prompt());
        println!("    you:     {}", item.submitted.unwrap_or("(no answer)"));
        if let Some(correct) = item.question.correct_answer() {
            println!("    correct: {correct}");
        }
        if let Some(explanation) = item.question.explanation() {
            println!("    {explanation}");
        }
    }
}

fn print_notices(notices: &[Notice]) {
    for notice in notices {
        if notice.is_error() {
            println!("! {notice}");
        } else {
            println!("{notice}");
        }
    }
}

fn print_help() {
    println!("Answer with a choice number or type your answer.");
    println!("Commands: :hint :prev :next :done :retry :time :review :help :quit");
}
