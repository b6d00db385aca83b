use std::fmt;
use std::sync::Arc;

use backend::{HttpBackend, QuestApi};
use log::info;
use quest_core::model::{ClassroomId, Level, LevelGate, MistakeScope, RemedialPlan};
use services::{Clock, QuestConfig, QuestMapService};
use tokio::io::{AsyncBufReadExt, BufReader};

mod input;
mod play;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { name: &'static str },
    UnknownArg(String),
    InvalidClassroom { raw: String },
    InvalidLevel { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { name } => write!(f, "missing <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidClassroom { raw } => write!(f, "invalid classroom id: {raw:?}"),
            ArgsError::InvalidLevel { raw } => write!(f, "invalid level: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quest [--api <url>] classrooms");
    eprintln!("  quest [--api <url>] progress  <classroom>");
    eprintln!("  quest [--api <url>] play      <classroom> <level>");
    eprintln!("  quest [--api <url>] practice  <classroom>   # remedial question while cooling down");
    eprintln!("  quest [--api <url>] mistakes  [<classroom>]   # all classrooms when omitted");
    eprintln!("  quest [--api <url>] analytics <classroom>");
    eprintln!();
    eprintln!("Environment (also read from .env):");
    eprintln!("  QUEST_API_URL, QUEST_TIME_BUDGET_SECS, QUEST_FEEDBACK_DELAY_MS,");
    eprintln!("  QUEST_HTTP_TIMEOUT_SECS, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Classrooms,
    Progress(ClassroomId),
    Play(ClassroomId, Level),
    Practice(ClassroomId),
    Mistakes(MistakeScope),
    Analytics(ClassroomId),
}

struct Args {
    api_url: Option<String>,
    command: Command,
}

impl Args {
    fn parse(args: impl Iterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut api_url = None;
        let mut positional = Vec::new();
        let mut args = args;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--api" => api_url = Some(require_value(&mut args, "--api")?),
                "--help" | "-h" => return Ok(None),
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let Some(name) = positional.next() else {
            return Ok(None);
        };
        let command = match name.as_str() {
            "classrooms" => Command::Classrooms,
            "progress" => Command::Progress(classroom_arg(&mut positional)?),
            "play" => {
                let classroom = classroom_arg(&mut positional)?;
                let raw = positional
                    .next()
                    .ok_or(ArgsError::MissingArgument { name: "level" })?;
                let level = raw
                    .parse::<Level>()
                    .map_err(|_| ArgsError::InvalidLevel { raw: raw.clone() })?;
                Command::Play(classroom, level)
            }
            "practice" => Command::Practice(classroom_arg(&mut positional)?),
            "mistakes" => match positional.next() {
                None => Command::Mistakes(MistakeScope::All),
                Some(raw) => Command::Mistakes(MistakeScope::Classroom(parse_classroom(raw)?)),
            },
            "analytics" => Command::Analytics(classroom_arg(&mut positional)?),
            _ => return Err(ArgsError::UnknownArg(name)),
        };

        if let Some(extra) = positional.next() {
            return Err(ArgsError::UnknownArg(extra));
        }
        Ok(Some(Self { api_url, command }))
    }
}

fn classroom_arg(args: &mut impl Iterator<Item = String>) -> Result<ClassroomId, ArgsError> {
    let raw = args
        .next()
        .ok_or(ArgsError::MissingArgument { name: "classroom" })?;
    parse_classroom(raw)
}

fn parse_classroom(raw: String) -> Result<ClassroomId, ArgsError> {
    ClassroomId::new(raw.as_str()).map_err(|_| ArgsError::InvalidClassroom { raw })
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let Some(args) = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?
    else {
        print_usage();
        return Ok(());
    };

    let mut config = QuestConfig::from_env()?;
    if let Some(url) = args.api_url {
        config = config.with_api_url(url);
    }
    info!("using backend at {}", config.api_url);

    let api: Arc<dyn QuestApi> = Arc::new(HttpBackend::new(&config.http_config()?)?);
    let service = QuestMapService::new(api, Clock::default_clock(), config.session_config()?);

    match args.command {
        Command::Classrooms => {
            let classrooms = service.list_classrooms().await?;
            if classrooms.is_empty() {
                println!("No classrooms joined yet.");
            }
            for classroom in classrooms {
                println!("{classroom}");
            }
        }
        Command::Progress(classroom) => {
            let progress = service.progress(&classroom).await?;
            println!("{classroom}: {} XP, unlocked level {}", progress.xp, progress.unlocked_level);
            if let Some(title) = &progress.current_chapter_title {
                println!("Chapter: {title}");
            }
            if let Some(message) = &progress.deadline_message {
                println!("{message}");
            }
            if let LevelGate::CoolingDown {
                remaining_secs,
                remedial_plan,
            } = progress.gate(progress.unlocked_level)
            {
                println!(
                    "Level {} reopens in {}.",
                    progress.unlocked_level,
                    services::format_countdown(remaining_secs)
                );
                if let Some(plan) = remedial_plan {
                    println!("Diagnosis: {}", plan.diagnosis);
                    println!("{}", plan.explanation);
                    if plan.practice_question.is_some() {
                        println!("Try the practice question: quest practice {classroom}");
                    }
                }
            }
        }
        Command::Play(classroom, level) => {
            let controller = service.open_session(classroom, level).await?;
            play::run(controller).await?;
        }
        Command::Practice(classroom) => match service.remedial_plan(&classroom).await? {
            Some(plan) => practice(&plan).await?,
            None => println!("No remedial practice for {classroom} right now."),
        },
        Command::Mistakes(scope) => {
            let entries = service.mistakes(&scope).await?;
            if entries.is_empty() {
                println!("No mistakes recorded.");
            }
            for entry in entries {
                let place = match (&entry.classroom, entry.level) {
                    (Some(classroom), Some(level)) => format!("[{classroom} L{level}] "),
                    (None, Some(level)) => format!("[L{level}] "),
                    (Some(classroom), None) => format!("[{classroom}] "),
                    (None, None) => String::new(),
                };
                println!("{place}{}", entry.question);
                if let Some(answer) = &entry.submitted_answer {
                    println!("  you answered: {answer}");
                }
                if let Some(correct) = &entry.correct_answer {
                    println!("  correct:      {correct}");
                }
                if let Some(explanation) = &entry.explanation {
                    println!("  {explanation}");
                }
            }
        }
        Command::Analytics(classroom) => {
            let analytics = service.analytics(&classroom).await?;
            println!("{classroom}: {} students", analytics.total_students);
            for (level, count) in &analytics.level_distribution {
                let attempts = analytics.average_attempts.get(level).copied().unwrap_or(0.0);
                println!("  level {level}: {count} (avg attempts {attempts:.1})");
            }
            println!("  completed: {}", analytics.completed);
            println!("  stuck: {}%", analytics.stuck_percent);
            for mistake in &analytics.common_mistakes {
                println!("  common mistake: {} (x{})", mistake.concept, mistake.frequency);
            }
        }
    }
    Ok(())
}

/// Ask the plan's practice question once and check the answer locally.
async fn practice(plan: &RemedialPlan) -> Result<(), Box<dyn std::error::Error>> {
    println!("Diagnosis: {}", plan.diagnosis);
    println!("{}", plan.explanation);
    let Some(question) = &plan.practice_question else {
        return Ok(());
    };

    println!();
    println!("{}", question.prompt);
    for (i, choice) in question.choices.iter().enumerate() {
        println!("  {}) {choice}", i + 1);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let Some(line) = lines.next_line().await? else {
        return Ok(());
    };
    let answer = input::pick_choice(&question.choices, &line)
        .and_then(|index| question.choices.get(index))
        .map_or_else(|| line.trim().to_string(), Clone::clone);

    if question.check(&answer) {
        println!("Correct!");
    } else if let Some(correct) = &question.correct_answer {
        println!("Not quite. The answer is: {correct}");
    } else {
        println!("Answer noted.");
    }
    if let Some(explanation) = &question.explanation {
        println!("{explanation}");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
