//! Quiz flow controller.
//!
//! Owns every phase transition of a quiz session: starting a subject,
//! turning awareness ratings into calibrated questions, grading answers,
//! dwelling on feedback, and advancing to the next concept until the backend
//! reports the subject exhausted. Remote failures are recovered locally by
//! reverting to the last stable phase and surfacing a notice; the flow never
//! leaves the store in a loading phase with no way out.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::instrument;

use crate::model::{normalize_options, AnswerRecord, Difficulty, FlowPhase, Question, Rating};
use crate::store::SessionStore;
use crate::timer::TimerConfig;
use crate::traits::{
    NextCardOutcome, QuestionOutcome, QuizService, ServedQuestion, StartOutcome, SubmitRequest,
};

/// Configuration for the quiz flow.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Pause after feedback on an answered question, before auto-advancing.
    pub feedback_dwell: Duration,
    /// Shorter pause after a timed-out question.
    pub timeout_dwell: Duration,
    /// Rating auto-submitted when the awareness countdown expires.
    pub auto_rating: Rating,
    /// Awareness-phase countdown parameters.
    pub awareness_timer: TimerConfig,
    /// Questioning-phase countdown parameters.
    pub question_timer: TimerConfig,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            feedback_dwell: Duration::from_millis(2000),
            timeout_dwell: Duration::from_millis(1000),
            auto_rating: Rating::NEUTRAL,
            awareness_timer: TimerConfig::new(30),
            question_timer: TimerConfig::new(60),
        }
    }
}

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

/// A user-facing notice. Embedders surface these as toasts or log lines.
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn info(title: &str, body: &str) -> Self {
        Self {
            kind: NoticeKind::Info,
            title: title.to_string(),
            body: body.to_string(),
        }
    }

    pub fn success(title: &str, body: &str) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: title.to_string(),
            body: body.to_string(),
        }
    }

    pub fn error(title: &str, body: &str) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: title.to_string(),
            body: body.to_string(),
        }
    }
}

/// Presentation-side hooks for flow events.
pub trait FlowObserver: Send + Sync {
    /// A notice should be shown to the learner.
    fn on_notice(&self, notice: &Notice);
    /// A graded answer became visible as feedback.
    fn on_feedback(&self, record: &AnswerRecord);
    /// The session finished; the reviewing phase is active.
    fn on_session_complete(&self, score: u32, total: usize);
}

/// No-op observer.
pub struct NoopObserver;

impl FlowObserver for NoopObserver {
    fn on_notice(&self, _: &Notice) {}
    fn on_feedback(&self, _: &AnswerRecord) {}
    fn on_session_complete(&self, _: u32, _: usize) {}
}

/// The quiz flow controller. Cloning shares the underlying session.
#[derive(Clone)]
pub struct QuizFlow {
    service: Arc<dyn QuizService>,
    store: SessionStore,
    observer: Arc<dyn FlowObserver>,
    config: FlowConfig,
}

impl QuizFlow {
    pub fn new(
        service: Arc<dyn QuizService>,
        store: SessionStore,
        observer: Arc<dyn FlowObserver>,
        config: FlowConfig,
    ) -> Self {
        Self {
            service,
            store,
            observer,
            config,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Start a session for a subject and load its first awareness card.
    ///
    /// Only valid from the idle phase. An empty subject or a failed start
    /// returns the flow to idle with a notice.
    #[instrument(skip(self))]
    pub async fn start_session(&self, subject_id: &str) -> Result<()> {
        let mut claim = None;
        self.store.update(|s| {
            if s.phase == FlowPhase::Idle {
                s.select_subject(subject_id);
                claim = Some(s.generation);
            }
        });
        let Some(generation) = claim else {
            tracing::warn!("start_session invoked outside the idle phase, ignoring");
            return Ok(());
        };

        match self.service.start_session(subject_id).await {
            Ok(StartOutcome::Card { handle, concept }) => {
                self.store.apply_if_current(generation, |s| {
                    s.set_handle(handle);
                    s.set_concepts(vec![concept.clone()]);
                    s.set_current_concept(Some(concept));
                });
                Ok(())
            }
            Ok(StartOutcome::Exhausted) => {
                let applied = self
                    .store
                    .apply_if_current(generation, |s| s.set_phase(FlowPhase::Idle));
                if applied {
                    self.notify(Notice::error(
                        "No flashcards found",
                        "This topic has no available concepts.",
                    ));
                }
                Ok(())
            }
            Err(err) => {
                let applied = self
                    .store
                    .apply_if_current(generation, |s| s.set_phase(FlowPhase::Idle));
                if !applied {
                    return Ok(());
                }
                self.notify(Notice::error("Failed to start quiz", "Please try again later."));
                Err(err).with_context(|| format!("failed to start a session for '{subject_id}'"))
            }
        }
    }

    /// Submit the learner's familiarity rating for the current concept and
    /// fetch a question calibrated to it.
    ///
    /// Only valid from the awareness phase with no rating submitted yet. A
    /// missing question or a failed fetch returns the flow to awareness with
    /// a notice, clearing the rating so it can be submitted again.
    #[instrument(skip(self), fields(rating = %rating))]
    pub async fn submit_awareness_rating(&self, rating: Rating) -> Result<()> {
        let mut claim = None;
        self.store
            .update(|s| claim = s.begin_rating(rating).map(|concept| (concept, s.generation)));
        let Some((concept, generation)) = claim else {
            tracing::warn!("no rateable concept is active, ignoring rating");
            return Ok(());
        };

        match self.service.question_by_rating(&concept.id, rating).await {
            Ok(QuestionOutcome::Presented(served)) => match build_question(served) {
                Some(question) => {
                    self.store.apply_if_current(generation, |s| {
                        s.set_current_question(Some(question), None)
                    });
                    Ok(())
                }
                None => {
                    self.reject_question(generation);
                    Ok(())
                }
            },
            Ok(QuestionOutcome::Unavailable) => {
                self.reject_question(generation);
                Ok(())
            }
            Err(err) => {
                let applied = self
                    .store
                    .apply_if_current(generation, |s| s.revert_to_awareness());
                if !applied {
                    return Ok(());
                }
                self.notify(Notice::error(
                    "Error fetching question",
                    "Please retry your awareness submission.",
                ));
                Err(err).with_context(|| format!("failed to fetch a question for '{}'", concept.id))
            }
        }
    }

    /// Submit an answer for the current question, show its feedback for the
    /// dwell period, then advance the session. `None` denotes a timeout.
    ///
    /// Only valid from the questioning phase with no submission in flight.
    /// A failed submit releases the question for another attempt; a failed
    /// advance keeps the recorded answer and waits for [`retry_advance`].
    ///
    /// [`retry_advance`]: QuizFlow::retry_advance
    #[instrument(skip(self))]
    pub async fn submit_answer(&self, selected: Option<&str>) -> Result<()> {
        let mut claim = None;
        self.store.update(|s| {
            claim = s
                .begin_answer()
                .map(|(question, handle)| (question, handle, s.generation));
        });
        let Some((question, handle, generation)) = claim else {
            tracing::warn!("no answerable question is active, ignoring submission");
            return Ok(());
        };

        let request = SubmitRequest {
            question_id: question.id.clone(),
            selected_option_id: selected.unwrap_or_default().to_string(),
            handle,
        };
        let response = match self.service.submit_answer(&request).await {
            Ok(response) => response,
            Err(err) => {
                let applied = self
                    .store
                    .apply_if_current(generation, |s| s.abort_answer());
                if !applied {
                    return Ok(());
                }
                self.notify(Notice::error("Error submitting answer", "Please try again."));
                return Err(err)
                    .with_context(|| format!("failed to submit an answer for '{}'", question.id));
            }
        };

        let record = AnswerRecord {
            question_id: question.id,
            question_text: question.text,
            selected_option_id: selected.map(str::to_string),
            correct_option_id: response.correct_option_id,
            explanation: response.explanation,
            correct: response.correct,
        };

        let shown = self
            .store
            .apply_if_current(generation, |s| s.set_feedback(record.clone()));
        if !shown {
            return Ok(());
        }
        self.observer.on_feedback(&record);
        if selected.is_none() {
            self.notify(Notice::error("Time's up!", "Moving to next concept..."));
        } else if record.correct {
            self.notify(Notice::success("Correct!", "Excellent recall!"));
        } else {
            self.notify(Notice::error(
                "Incorrect",
                "Review the concept and try again later.",
            ));
        }

        // Leave the feedback visible before moving on. The sleep is aborted
        // with the owning task; a reset during it is caught by the
        // generation check below.
        let dwell = if selected.is_none() {
            self.config.timeout_dwell
        } else {
            self.config.feedback_dwell
        };
        tokio::time::sleep(dwell).await;

        let new_handle = response.handle;
        let recorded = self.store.apply_if_current(generation, |s| {
            s.record_answer(record);
            s.set_handle(new_handle);
            s.set_phase(FlowPhase::Loading);
        });
        if !recorded {
            return Ok(());
        }

        self.advance(generation).await
    }

    /// Timer-expiry entry point: submit the current question as unanswered.
    pub async fn handle_timeout(&self) -> Result<()> {
        self.submit_answer(None).await
    }

    /// Retry a post-answer advance that failed.
    ///
    /// Only valid while an advance is pending; the recorded answer and the
    /// session handle are untouched, so the retried fetch continues exactly
    /// where the session stopped.
    #[instrument(skip(self))]
    pub async fn retry_advance(&self) -> Result<()> {
        let mut claim = None;
        self.store.update(|s| {
            if s.advance_pending {
                s.set_phase(FlowPhase::Loading);
                claim = Some(s.generation);
            }
        });
        let Some(generation) = claim else {
            tracing::warn!("no advance is pending, ignoring retry");
            return Ok(());
        };

        self.advance(generation).await
    }

    /// Tear the session down in response to a policy violation (the focus
    /// guard) and tell the learner why.
    pub fn terminate(&self) {
        tracing::warn!("terminating the active session");
        self.store.update(|s| s.reset());
        self.notify(Notice::error(
            "Quiz Terminated",
            "You switched tabs or minimized the window. The quiz has been terminated for fairness.",
        ));
    }

    /// Discard the session and return to idle. Required before starting a
    /// new subject; in-flight work from the old session is discarded.
    pub fn reset(&self) {
        self.store.update(|s| s.reset());
    }

    /// Fetch the next awareness card and reconcile the outcome: a new
    /// concept re-enters awareness, exhaustion completes the session, and a
    /// failure parks the flow in awareness with an advance pending.
    async fn advance(&self, generation: u64) -> Result<()> {
        let Some(handle) = self.store.snapshot().handle else {
            tracing::warn!("advance requested without a session handle, ignoring");
            return Ok(());
        };

        match self.service.next_card(&handle).await {
            Ok(NextCardOutcome::Card(concept)) => {
                self.store.apply_if_current(generation, |s| {
                    s.set_advance_pending(false);
                    s.set_current_concept(Some(concept));
                });
                Ok(())
            }
            Ok(NextCardOutcome::Exhausted) => {
                let mut completed = None;
                self.store.apply_if_current(generation, |s| {
                    s.set_advance_pending(false);
                    s.set_current_concept(None);
                    completed = Some((s.score, s.history.len()));
                });
                if let Some((score, total)) = completed {
                    self.observer.on_session_complete(score, total);
                }
                Ok(())
            }
            Err(err) => {
                let applied = self.store.apply_if_current(generation, |s| {
                    s.set_advance_pending(true);
                    s.set_phase(FlowPhase::Awareness);
                });
                if !applied {
                    return Ok(());
                }
                self.notify(Notice::error(
                    "Connection lost",
                    "Your answer was saved. Retry to continue.",
                ));
                Err(err).context("failed to fetch the next awareness card")
            }
        }
    }

    fn reject_question(&self, generation: u64) {
        let applied = self
            .store
            .apply_if_current(generation, |s| s.revert_to_awareness());
        if applied {
            self.notify(Notice::error(
                "No question found",
                "No suitable question for this awareness rating.",
            ));
        }
    }

    fn notify(&self, notice: Notice) {
        tracing::debug!(title = %notice.title, "notice raised");
        self.observer.on_notice(&notice);
    }
}

/// Canonicalize a served question. Questions with no usable options are
/// rejected; an unknown difficulty label falls back to medium.
fn build_question(served: ServedQuestion) -> Option<Question> {
    let options = normalize_options(served.options);
    if options.is_empty() {
        tracing::warn!(
            question = %served.question_id,
            "served question has no options, treating it as unavailable"
        );
        return None;
    }
    Some(Question {
        id: served.question_id,
        concept_id: served.concept_id,
        text: served.text,
        options,
        difficulty: Difficulty::from_wire(served.difficulty.as_deref()),
    })
}
