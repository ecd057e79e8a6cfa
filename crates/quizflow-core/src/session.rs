//! Session context: wires the flow controller to the countdown timers.
//!
//! A [`QuizSession`] watches the store and keeps the two countdowns in step
//! with it. Entering awareness arms the awareness timer against the wall
//! clock; entering questioning arms the question timer against the stamp the
//! store recorded when the question was presented. Expiries feed back into
//! the flow as the auto-submitted neutral rating and the timed-out answer,
//! and the flow's claim methods make a late expiry racing a user action a
//! no-op.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::flow::QuizFlow;
use crate::model::{FlowPhase, Rating};
use crate::store::{SessionState, SessionStore};
use crate::timer::{Countdown, TimerSnapshot};

/// The slice of session state the watcher reacts to.
struct WatchView {
    phase: FlowPhase,
    advance_pending: bool,
    concept_id: Option<String>,
    question_id: Option<String>,
    question_started_at: Option<chrono::DateTime<Utc>>,
}

impl WatchView {
    fn of(state: &SessionState) -> Self {
        Self {
            phase: state.phase,
            advance_pending: state.advance_pending,
            concept_id: state.current_concept.as_ref().map(|c| c.id.clone()),
            question_id: state.current_question.as_ref().map(|q| q.id.clone()),
            question_started_at: state.question_started_at,
        }
    }
}

/// An interactive quiz session. Must be created inside a Tokio runtime.
pub struct QuizSession {
    flow: QuizFlow,
    store: SessionStore,
    awareness_timer: Arc<Mutex<Countdown>>,
    question_timer: Arc<Mutex<Countdown>>,
    watcher: JoinHandle<()>,
}

impl QuizSession {
    pub fn new(flow: QuizFlow) -> Self {
        let store = flow.store().clone();
        let config = flow.config().clone();
        let awareness_timer = Arc::new(Mutex::new(Countdown::new(config.awareness_timer)));
        let question_timer = Arc::new(Mutex::new(Countdown::new(config.question_timer)));

        let watcher = tokio::spawn(watch_store(
            flow.clone(),
            store.clone(),
            awareness_timer.clone(),
            question_timer.clone(),
            config.auto_rating,
        ));

        Self {
            flow,
            store,
            awareness_timer,
            question_timer,
            watcher,
        }
    }

    pub fn flow(&self) -> &QuizFlow {
        &self.flow
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Subscribe to the awareness countdown.
    pub fn awareness_timer(&self) -> watch::Receiver<TimerSnapshot> {
        self.awareness_timer.lock().unwrap().subscribe()
    }

    /// Subscribe to the question countdown.
    pub fn question_timer(&self) -> watch::Receiver<TimerSnapshot> {
        self.question_timer.lock().unwrap().subscribe()
    }

    /// Start a session for a subject.
    pub async fn start(&self, subject_id: &str) -> Result<()> {
        self.flow.start_session(subject_id).await
    }

    /// Submit a familiarity rating for the current awareness card.
    pub async fn rate(&self, rating: Rating) -> Result<()> {
        self.flow.submit_awareness_rating(rating).await
    }

    /// Answer the current question.
    pub async fn answer(&self, option_id: &str) -> Result<()> {
        self.flow.submit_answer(Some(option_id)).await
    }

    /// Retry a failed post-answer advance.
    pub async fn retry(&self) -> Result<()> {
        self.flow.retry_advance().await
    }

    /// Discard the session and return to idle.
    pub fn reset(&self) {
        self.flow.reset();
    }

    /// Stop the watcher and both countdowns.
    pub fn shutdown(&self) {
        self.watcher.abort();
        self.awareness_timer.lock().unwrap().disarm();
        self.question_timer.lock().unwrap().disarm();
    }
}

impl Drop for QuizSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Keep the countdowns in step with the store.
///
/// Each awareness card and each question arms its countdown exactly once;
/// the keys tracked here make redundant store updates (feedback, rating
/// claims) leave an already-armed countdown running.
async fn watch_store(
    flow: QuizFlow,
    store: SessionStore,
    awareness_timer: Arc<Mutex<Countdown>>,
    question_timer: Arc<Mutex<Countdown>>,
    auto_rating: Rating,
) {
    let mut rx = store.watch();
    let mut armed_concept: Option<String> = None;
    let mut armed_question: Option<String> = None;

    loop {
        let view = WatchView::of(&rx.borrow_and_update());

        match view.phase {
            FlowPhase::Awareness => {
                question_timer.lock().unwrap().disarm();
                armed_question = None;

                if !view.advance_pending {
                    if let Some(concept_id) = view.concept_id {
                        if armed_concept.as_deref() != Some(concept_id.as_str()) {
                            let flow = flow.clone();
                            awareness_timer.lock().unwrap().arm(Utc::now(), move || {
                                tokio::spawn(async move {
                                    if let Err(err) =
                                        flow.submit_awareness_rating(auto_rating).await
                                    {
                                        tracing::warn!("auto-rating submission failed: {err:#}");
                                    }
                                });
                            });
                            armed_concept = Some(concept_id);
                        }
                    }
                }
            }
            FlowPhase::Questioning => {
                awareness_timer.lock().unwrap().disarm();
                armed_concept = None;

                if let Some(question_id) = view.question_id {
                    if armed_question.as_deref() != Some(question_id.as_str()) {
                        let anchor = view.question_started_at.unwrap_or_else(Utc::now);
                        let flow = flow.clone();
                        question_timer.lock().unwrap().arm(anchor, move || {
                            tokio::spawn(async move {
                                if let Err(err) = flow.handle_timeout().await {
                                    tracing::warn!("timeout submission failed: {err:#}");
                                }
                            });
                        });
                        armed_question = Some(question_id);
                    }
                }
            }
            _ => {
                awareness_timer.lock().unwrap().disarm();
                question_timer.lock().unwrap().disarm();
                armed_concept = None;
                armed_question = None;
            }
        }

        if rx.changed().await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::flow::{FlowConfig, NoopObserver, QuizFlow};
    use crate::model::{AnswerOption, Concept, Difficulty, Question, Subject};
    use crate::timer::Urgency;
    use crate::traits::{
        NextCardOutcome, QuestionOutcome, QuizService, StartOutcome, SubmitRequest, SubmitResponse,
    };
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;

    struct NoBackend;

    #[async_trait]
    impl QuizService for NoBackend {
        fn name(&self) -> &str {
            "none"
        }

        async fn list_subjects(&self) -> Result<Vec<Subject>, ServiceError> {
            panic!("unexpected list_subjects call");
        }

        async fn start_session(&self, _: &str) -> Result<StartOutcome, ServiceError> {
            panic!("unexpected start_session call");
        }

        async fn question_by_rating(
            &self,
            _: &str,
            _: Rating,
        ) -> Result<QuestionOutcome, ServiceError> {
            panic!("unexpected question_by_rating call");
        }

        async fn submit_answer(&self, _: &SubmitRequest) -> Result<SubmitResponse, ServiceError> {
            panic!("unexpected submit_answer call");
        }

        async fn next_card(
            &self,
            _: &crate::model::SessionHandle,
        ) -> Result<NextCardOutcome, ServiceError> {
            panic!("unexpected next_card call");
        }
    }

    fn offline_session() -> QuizSession {
        let flow = QuizFlow::new(
            Arc::new(NoBackend),
            SessionStore::new(),
            Arc::new(NoopObserver),
            FlowConfig::default(),
        );
        QuizSession::new(flow)
    }

    fn concept(id: &str) -> Concept {
        Concept {
            id: id.to_string(),
            name: "Newton's second law".to_string(),
            prompt: "F = ma".to_string(),
            explanation: "Force equals mass times acceleration.".to_string(),
        }
    }

    fn question(id: &str) -> Question {
        Question {
            id: id.to_string(),
            concept_id: "c1".to_string(),
            text: "Which?".to_string(),
            options: vec![AnswerOption {
                id: "0".to_string(),
                text: "X".to_string(),
            }],
            difficulty: Difficulty::Medium,
        }
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn entering_awareness_arms_the_awareness_countdown() {
        let session = offline_session();
        let timer = session.awareness_timer();
        assert!(!timer.borrow().armed);

        session
            .store()
            .update(|s| s.set_current_concept(Some(concept("c1"))));
        settle().await;

        let snapshot = *session.awareness_timer().borrow();
        assert!(snapshot.armed);
        assert!((29..=30).contains(&snapshot.remaining_secs));
        assert_eq!(snapshot.urgency, Urgency::Warning);
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_awareness_disarms_the_countdown() {
        let session = offline_session();
        session
            .store()
            .update(|s| s.set_current_concept(Some(concept("c1"))));
        settle().await;
        assert!(session.awareness_timer().borrow().armed);

        session.store().update(|s| s.set_current_concept(None));
        settle().await;

        assert!(!session.awareness_timer().borrow().armed);
        assert_eq!(session.store().snapshot().phase, FlowPhase::Reviewing);
    }

    #[tokio::test(start_paused = true)]
    async fn question_countdown_is_anchored_to_the_presentation_stamp() {
        let session = offline_session();
        let started = Utc::now() - ChronoDuration::seconds(50);
        session
            .store()
            .update(|s| s.set_current_question(Some(question("q1")), Some(started)));
        settle().await;

        let snapshot = *session.question_timer().borrow();
        assert!(snapshot.armed);
        assert!((9..=10).contains(&snapshot.remaining_secs));
        assert_eq!(snapshot.urgency, Urgency::Critical);
    }

    #[tokio::test(start_paused = true)]
    async fn feedback_updates_do_not_rearm_the_question_countdown() {
        let session = offline_session();
        session
            .store()
            .update(|s| s.set_current_question(Some(question("q1")), None));
        settle().await;

        tokio::time::advance(std::time::Duration::from_secs(20)).await;
        settle().await;
        let before = session.question_timer().borrow().remaining_secs;
        assert!(before <= 40);

        // A store update that keeps the same question must not reset the
        // countdown to its full duration.
        session.store().update(|s| {
            s.set_feedback(crate::model::AnswerRecord {
                question_id: "q1".to_string(),
                question_text: "Which?".to_string(),
                selected_option_id: Some("0".to_string()),
                correct_option_id: "0".to_string(),
                explanation: String::new(),
                correct: true,
            });
        });
        settle().await;

        assert!(session.question_timer().borrow().remaining_secs <= before);
    }

    #[tokio::test(start_paused = true)]
    async fn awareness_is_not_armed_while_an_advance_is_pending() {
        let session = offline_session();
        session.store().update(|s| {
            s.set_current_concept(Some(concept("c1")));
            s.set_advance_pending(true);
        });
        settle().await;

        assert!(!session.awareness_timer().borrow().armed);
    }
}
