use std::{fmt::Display, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    config::{load_settings, normalize_base_url, DEFAULT_SETTINGS_FILE},
    controller::option_letter,
    http_controller, QuizClientError, QuizController, QuizResult, SessionStore,
};
use futures::StreamExt;
use shared::{
    domain::{GradeLevel, Subject},
    protocol::QuizQuestion,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "quiz-cli", about = "Take a generated multiple-choice quiz in the terminal")]
struct Args {
    /// Quiz backend base url, e.g. http://localhost:3001/api
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,
    /// Grade level label or menu number; prompts when omitted
    #[arg(long)]
    grade_level: Option<GradeLevel>,
    /// Subject label or menu number; prompts when omitted
    #[arg(long)]
    subject: Option<Subject>,
}

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config)?;
    if let Some(base_url) = &args.base_url {
        settings.api_base_url = normalize_base_url(base_url)?;
    }
    debug!(api_base_url = %settings.api_base_url, "settings loaded");

    let mut controller = http_controller(&settings).context("failed to build quiz client")?;
    spawn_loading_printer(controller.store());

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut preset = (args.grade_level, args.subject);

    loop {
        controller.show_quiz_form();
        let grade_level = match preset.0.take() {
            Some(grade_level) => grade_level,
            None => match choose(&mut input, "Grade level", GradeLevel::ALL).await? {
                Some(grade_level) => grade_level,
                None => break,
            },
        };
        let subject = match preset.1.take() {
            Some(subject) => subject,
            None => match choose(&mut input, "Subject", Subject::ALL).await? {
                Some(subject) => subject,
                None => break,
            },
        };
        controller.set_grade_level(Some(grade_level));
        controller.set_subject(Some(subject));

        if let Err(err) = controller.submit().await {
            debug!(error = %err, "quiz could not be prepared");
            eprintln!("{}", failure_message(controller.store(), &err));
            controller.go_back();
            if confirm(&mut input, "Try again?").await? {
                continue;
            }
            break;
        }

        if !take_quiz(&mut input, &controller).await? {
            break;
        }

        controller.go_back();
        if !confirm(&mut input, "Take another quiz?").await? {
            break;
        }
    }

    Ok(())
}

fn spawn_loading_printer(store: &SessionStore) {
    let mut loading = store.loading_stream().skip(1);
    tokio::spawn(async move {
        while let Some(is_loading) = loading.next().await {
            if is_loading {
                println!("Preparing your quiz...");
            }
        }
    });
}

/// The message published for a failed run, falling back to the error itself.
fn failure_message(store: &SessionStore, err: &QuizClientError) -> String {
    store.current_error().unwrap_or_else(|| err.to_string())
}

/// Returns `false` when input ends before the quiz is finished.
async fn take_quiz(input: &mut Input, controller: &QuizController) -> Result<bool> {
    let questions = controller.questions();
    if let Some(config) = controller.store().current_config() {
        println!(
            "\n{} {} quiz ({}) - {} questions, {} minutes",
            config.grade_level,
            config.subject,
            config.difficulty,
            questions.len(),
            config.time_limit
        );
    }

    for (index, question) in questions.iter().enumerate() {
        println!("\n{}. {}", index + 1, question.question);
        for option in &question.options {
            println!("   {option}");
        }
        loop {
            let Some(line) = read_line(input, "Your answer: ").await? else {
                return Ok(false);
            };
            match resolve_option(question, &line) {
                Some(option) => {
                    controller.record_answer(index, option)?;
                    break;
                }
                None => println!("Pick one of the listed options."),
            }
        }
    }

    let result = controller.submit_answers()?;
    print_result(&questions, &result);
    Ok(true)
}

/// Maps a typed letter, option number, or full option text to the option text.
fn resolve_option(question: &QuizQuestion, input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(position) = trimmed.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|index| question.options.get(index))
            .cloned();
    }
    if let Some(option) = question
        .options
        .iter()
        .find(|option| option.trim().eq_ignore_ascii_case(trimmed))
    {
        return Some(option.clone());
    }
    if trimmed.chars().count() != 1 {
        return None;
    }
    let letter = option_letter(trimmed)?;
    question
        .options
        .iter()
        .find(|option| option_letter(option) == Some(letter))
        .cloned()
}

fn print_result(questions: &[QuizQuestion], result: &QuizResult) {
    println!(
        "\nScore: {}/{} ({}%)",
        result.score, result.total, result.percentage
    );
    for (index, (question, review)) in questions.iter().zip(&result.review).enumerate() {
        let mark = if review.is_correct { "correct" } else { "wrong" };
        println!(
            "{}. {mark}: you chose {}, answer {}",
            index + 1,
            letter_or_dash(review.chosen),
            question.correct_answer
        );
        if !review.explanation.is_empty() {
            println!("   {}", review.explanation);
        }
    }
}

fn letter_or_dash(letter: Option<char>) -> String {
    letter.map_or_else(|| "-".to_string(), |letter| letter.to_string())
}

async fn choose<T: Copy + Display>(
    input: &mut Input,
    label: &str,
    choices: &[T],
) -> Result<Option<T>> {
    println!("\n{label}:");
    for (index, choice) in choices.iter().enumerate() {
        println!("  {:>2}. {choice}", index + 1);
    }
    loop {
        let Some(line) = read_line(input, &format!("{label} number: ")).await? else {
            return Ok(None);
        };
        let picked = line
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|position| position.checked_sub(1))
            .and_then(|index| choices.get(index));
        match picked {
            Some(choice) => return Ok(Some(*choice)),
            None => println!("Enter a number between 1 and {}.", choices.len()),
        }
    }
}

async fn confirm(input: &mut Input, question: &str) -> Result<bool> {
    let answer = read_line(input, &format!("{question} [y/N] ")).await?;
    Ok(answer.is_some_and(|answer| answer.trim().eq_ignore_ascii_case("y")))
}

async fn read_line(input: &mut Input, prompt: &str) -> Result<Option<String>> {
    use std::io::Write as _;

    print!("{prompt}");
    std::io::stdout().flush().context("failed to flush stdout")?;
    input.next_line().await.context("failed to read stdin")
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
