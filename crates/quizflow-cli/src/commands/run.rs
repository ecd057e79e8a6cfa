//! The `quizflow run` command.
//!
//! Drives an interactive session: renders awareness cards and questions as
//! the store changes, feeds ratings and answers back into the flow, and
//! prints the review table when the topic is exhausted. Countdown expiries
//! arrive through the session context, so an idle learner sees the neutral
//! auto-rating and the timed-out answer happen on their own.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use tokio::io::{AsyncBufReadExt, BufReader};

use quizflow_client::{create_service, load_config_from, QuizflowConfig};
use quizflow_core::flow::{FlowObserver, Notice, QuizFlow};
use quizflow_core::model::{AnswerRecord, FlowPhase, Rating, SessionReview};
use quizflow_core::session::QuizSession;
use quizflow_core::store::{SessionState, SessionStore};
use quizflow_core::timer::{TimerSnapshot, Urgency};
use quizflow_core::traits::QuizService;

pub async fn execute(
    subject: String,
    backend: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let name = backend.as_deref().unwrap_or(&config.default_backend);
    let backend_config = config
        .backends
        .get(name)
        .with_context(|| format!("backend '{name}' is not configured"))?;
    let service: Arc<dyn QuizService> = Arc::from(create_service(name, backend_config)?);

    let flow = QuizFlow::new(
        service,
        SessionStore::new(),
        Arc::new(ConsoleObserver),
        config.flow_config(),
    );
    let session = QuizSession::new(flow);

    session.start(&subject).await?;
    drive(&session, &config).await
}

/// Prints flow events as they happen.
struct ConsoleObserver;

impl FlowObserver for ConsoleObserver {
    fn on_notice(&self, notice: &Notice) {
        println!("\n{} {}", notice.title, notice.body);
    }

    fn on_feedback(&self, record: &AnswerRecord) {
        println!("Correct answer: {}", record.correct_option_id);
        if !record.explanation.is_empty() {
            println!("{}", record.explanation);
        }
    }

    fn on_session_complete(&self, score: u32, total: usize) {
        println!("\nSession complete. Score: {score}/{total}");
    }
}

/// What the driver has already shown, so store updates that change nothing
/// visible do not reprint the screen.
#[derive(Default)]
struct ViewTracker {
    concept_id: Option<String>,
    question_id: Option<String>,
    prompted_retry: bool,
    awareness_urgency: Option<Urgency>,
    question_urgency: Option<Urgency>,
}

async fn drive(session: &QuizSession, config: &QuizflowConfig) -> Result<()> {
    let mut store_rx = session.store().watch();
    let mut awareness_rx = session.awareness_timer();
    let mut question_rx = session.question_timer();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut view = ViewTracker::default();

    loop {
        let done = {
            let state = store_rx.borrow_and_update();
            render(&state, &mut view, config)
        };
        if done {
            return Ok(());
        }

        tokio::select! {
            changed = store_rx.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            changed = awareness_rx.changed() => {
                if changed.is_ok() {
                    note_urgency(*awareness_rx.borrow_and_update(), &mut view.awareness_urgency);
                }
            }
            changed = question_rx.changed() => {
                if changed.is_ok() {
                    note_urgency(*question_rx.borrow_and_update(), &mut view.question_urgency);
                }
            }
            line = lines.next_line() => {
                match line.context("failed to read input")? {
                    Some(input) => {
                        if handle_input(session, input.trim()).await? {
                            session.reset();
                            return Ok(());
                        }
                    }
                    None => {
                        session.reset();
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Render whatever is newly visible. Returns true once the session is over.
fn render(state: &SessionState, view: &mut ViewTracker, config: &QuizflowConfig) -> bool {
    match state.phase {
        // Start failures and terminations land back in idle.
        FlowPhase::Idle => true,
        FlowPhase::Loading => false,
        FlowPhase::Awareness => {
            if state.advance_pending {
                if !view.prompted_retry {
                    view.prompted_retry = true;
                    println!("Press Enter to retry.");
                }
                return false;
            }
            view.prompted_retry = false;

            if let Some(concept) = &state.current_concept {
                if view.concept_id.as_deref() != Some(concept.id.as_str()) {
                    view.concept_id = Some(concept.id.clone());
                    println!();
                    println!("=== {} ===", concept.name);
                    println!("{}", concept.prompt);
                    println!("{}", concept.explanation);
                    println!(
                        "Rate your familiarity from 1 (new) to 5 (solid). You have {}s.",
                        config.awareness_secs
                    );
                }
            }
            false
        }
        FlowPhase::Questioning => {
            if let Some(question) = &state.current_question {
                if view.question_id.as_deref() != Some(question.id.as_str()) {
                    view.question_id = Some(question.id.clone());
                    println!();
                    println!("[{}] {}", question.difficulty, question.text);
                    for option in &question.options {
                        println!("  {}) {}", option.id, option.text);
                    }
                    println!(
                        "Answer with an option id. You have {}s.",
                        config.question_secs
                    );
                }
            }
            false
        }
        FlowPhase::Reviewing => {
            print_review(&state.review());
            true
        }
    }
}

/// Feed one line of input into the flow. Returns true on a quit request.
async fn handle_input(session: &QuizSession, input: &str) -> Result<bool> {
    if input.eq_ignore_ascii_case("q") || input.eq_ignore_ascii_case("quit") {
        return Ok(true);
    }

    let state = session.store().snapshot();
    match state.phase {
        FlowPhase::Awareness if state.advance_pending => {
            session.retry().await?;
        }
        FlowPhase::Awareness => match input.parse::<Rating>() {
            Ok(rating) => session.rate(rating).await?,
            Err(_) => println!("Enter a rating from 1 to 5."),
        },
        FlowPhase::Questioning => {
            let valid = state
                .current_question
                .as_ref()
                .is_some_and(|q| q.options.iter().any(|o| o.id == input));
            if valid {
                session.answer(input).await?;
            } else {
                println!("Pick one of the listed options.");
            }
        }
        _ => {}
    }
    Ok(false)
}

/// Announce urgency escalations without spamming every tick.
fn note_urgency(snapshot: TimerSnapshot, last: &mut Option<Urgency>) {
    if !snapshot.armed {
        *last = None;
        return;
    }
    let previous = last.replace(snapshot.urgency);
    match previous {
        Some(p) if p != snapshot.urgency && snapshot.urgency != Urgency::Normal => {
            println!("  {}s left!", snapshot.remaining_secs);
        }
        _ => {}
    }
}

fn print_review(review: &SessionReview) {
    let mut table = Table::new();
    table.set_header(vec!["Question", "Your answer", "Correct", "Result"]);
    for entry in &review.entries {
        table.add_row(vec![
            Cell::new(&entry.question_text),
            Cell::new(entry.selected_option_id.as_deref().unwrap_or("(timed out)")),
            Cell::new(&entry.correct_option_id),
            Cell::new(if entry.correct { "correct" } else { "incorrect" }),
        ]);
    }
    println!("\n{table}");
    println!("Score: {}/{}", review.score, review.total);
}
