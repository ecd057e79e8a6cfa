//! Process-wide session store.
//!
//! A single mutable container for everything one quiz session needs: the flow
//! phase, current concept and question, feedback, score history, and the
//! opaque session handle. The flow controller is the only writer; views and
//! the session context read snapshots or subscribe to changes.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

use crate::model::{
    AnswerRecord, Concept, FlowPhase, Question, Rating, SessionHandle, SessionReview,
};

/// Everything the quiz UI needs to render one moment of a session.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Current stage of the flow state machine.
    pub phase: FlowPhase,
    /// Subject the session was started for.
    pub subject_id: Option<String>,
    /// Concepts loaded for the session so far.
    pub concepts: Vec<Concept>,
    /// Concept shown during the awareness phase.
    pub current_concept: Option<Concept>,
    /// Question shown during the questioning phase.
    pub current_question: Option<Question>,
    /// Graded result currently displayed as feedback, if any.
    pub feedback: Option<AnswerRecord>,
    /// Familiarity rating submitted for the current concept.
    pub awareness_rating: Option<Rating>,
    /// Count of correctly answered questions.
    pub score: u32,
    /// Every graded answer, in submission order. Append-only.
    pub history: Vec<AnswerRecord>,
    /// Opaque server-issued session token.
    pub handle: Option<SessionHandle>,
    /// When the current question was presented; anchors its countdown.
    pub question_started_at: Option<DateTime<Utc>>,
    /// Set while an answer is being graded; gates re-submission.
    pub answer_submitted: bool,
    /// Set when the post-answer advance failed and an explicit retry is
    /// required to continue the session.
    pub advance_pending: bool,
    /// Bumped by every reset; in-flight work from an older generation must
    /// not touch the store.
    pub generation: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: FlowPhase::Idle,
            subject_id: None,
            concepts: Vec::new(),
            current_concept: None,
            current_question: None,
            feedback: None,
            awareness_rating: None,
            score: 0,
            history: Vec::new(),
            handle: None,
            question_started_at: None,
            answer_submitted: false,
            advance_pending: false,
            generation: 0,
        }
    }
}

impl SessionState {
    pub fn set_phase(&mut self, phase: FlowPhase) {
        self.phase = phase;
    }

    /// Select a subject and enter the loading phase.
    pub fn select_subject(&mut self, subject_id: &str) {
        self.subject_id = Some(subject_id.to_string());
        self.phase = FlowPhase::Loading;
    }

    pub fn set_concepts(&mut self, concepts: Vec<Concept>) {
        self.concepts = concepts;
    }

    /// Replace the current concept. A concept puts the flow in the awareness
    /// phase; clearing it means no concepts remain, so the session moves to
    /// reviewing. The previous concept's rating is discarded either way.
    pub fn set_current_concept(&mut self, concept: Option<Concept>) {
        self.phase = if concept.is_some() {
            FlowPhase::Awareness
        } else {
            FlowPhase::Reviewing
        };
        self.current_concept = concept;
        self.awareness_rating = None;
    }

    /// Replace the current question. A question puts the flow in the
    /// questioning phase and stamps the question-start time (defaulting to
    /// now); clearing it moves the session to reviewing.
    pub fn set_current_question(
        &mut self,
        question: Option<Question>,
        started_at: Option<DateTime<Utc>>,
    ) {
        self.phase = if question.is_some() {
            FlowPhase::Questioning
        } else {
            FlowPhase::Reviewing
        };
        self.question_started_at = question
            .as_ref()
            .map(|_| started_at.unwrap_or_else(Utc::now));
        self.current_question = question;
    }

    pub fn set_rating(&mut self, rating: Rating) {
        self.awareness_rating = Some(rating);
    }

    pub fn set_feedback(&mut self, record: AnswerRecord) {
        self.feedback = Some(record);
    }

    pub fn clear_feedback(&mut self) {
        self.feedback = None;
    }

    pub fn set_handle(&mut self, handle: SessionHandle) {
        self.handle = Some(handle);
    }

    pub fn set_advance_pending(&mut self, pending: bool) {
        self.advance_pending = pending;
    }

    /// Claim the awareness submission slot. Succeeds only while the flow is
    /// in the awareness phase with a concept shown, no rating submitted yet,
    /// and no advance retry pending; on success the rating is recorded, the
    /// flow enters loading, and the claimed concept is returned.
    pub fn begin_rating(&mut self, rating: Rating) -> Option<Concept> {
        if self.phase != FlowPhase::Awareness
            || self.awareness_rating.is_some()
            || self.advance_pending
        {
            return None;
        }
        let concept = self.current_concept.clone()?;
        self.awareness_rating = Some(rating);
        self.phase = FlowPhase::Loading;
        Some(concept)
    }

    /// Return to the awareness phase after a failed question fetch, clearing
    /// the rating so the learner can submit again.
    pub fn revert_to_awareness(&mut self) {
        self.phase = FlowPhase::Awareness;
        self.awareness_rating = None;
    }

    /// Claim the answer submission slot. Succeeds only while a question is
    /// active, a handle is held, and no submission is already in flight; on
    /// success returns the question and handle to submit with.
    pub fn begin_answer(&mut self) -> Option<(Question, SessionHandle)> {
        if self.phase != FlowPhase::Questioning || self.answer_submitted {
            return None;
        }
        let question = self.current_question.clone()?;
        let handle = self.handle.clone()?;
        self.answer_submitted = true;
        Some((question, handle))
    }

    /// Release the answer submission slot after a failed submit so the
    /// learner can answer again.
    pub fn abort_answer(&mut self) {
        self.answer_submitted = false;
        self.feedback = None;
    }

    /// Record a graded answer: append it to history, bump the score iff
    /// correct, and clear the spent question, feedback, and start stamp. One
    /// compound mutation so no reader sees history and score disagree.
    pub fn record_answer(&mut self, record: AnswerRecord) {
        if record.correct {
            self.score += 1;
        }
        self.history.push(record);
        self.current_question = None;
        self.feedback = None;
        self.question_started_at = None;
        self.answer_submitted = false;
    }

    /// Restore the initial idle state, discarding the session handle. The
    /// generation is bumped so stale in-flight work is discarded.
    pub fn reset(&mut self) {
        *self = SessionState {
            generation: self.generation + 1,
            ..SessionState::default()
        };
    }

    /// Scored summary for the reviewing phase.
    pub fn review(&self) -> SessionReview {
        SessionReview::new(self.score, self.history.clone())
    }
}

/// Shared handle to the session state.
///
/// Writes go through [`update`](SessionStore::update) and are atomic with
/// respect to readers: a snapshot always reflects a complete mutation, never
/// a partial one. Readers either take snapshots or subscribe via
/// [`watch`](SessionStore::watch).
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// Apply a mutation and notify subscribers.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut SessionState),
    {
        self.tx.send_modify(f);
    }

    /// Apply a mutation only if the store still belongs to the given
    /// generation. Returns whether the mutation was applied. Responses and
    /// dwell continuations that resolve after a reset land here and are
    /// discarded without touching the store.
    pub fn apply_if_current<F>(&self, generation: u64, f: F) -> bool
    where
        F: FnOnce(&mut SessionState),
    {
        self.tx.send_if_modified(|state| {
            if state.generation == generation {
                f(state);
                true
            } else {
                tracing::debug!(
                    stale = generation,
                    current = state.generation,
                    "discarding update from a reset session"
                );
                false
            }
        })
    }

    pub fn generation(&self) -> u64 {
        self.tx.borrow().generation
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept() -> Concept {
        Concept {
            id: "c1".into(),
            name: "Newton's Second Law".into(),
            prompt: "F = ma".into(),
            explanation: "Force equals mass times acceleration.".into(),
        }
    }

    fn question() -> Question {
        Question {
            id: "q1".into(),
            concept_id: "c1".into(),
            text: "What does m stand for?".into(),
            options: vec![],
            difficulty: crate::model::Difficulty::Medium,
        }
    }

    fn record(correct: bool) -> AnswerRecord {
        AnswerRecord {
            question_id: "q1".into(),
            question_text: "What does m stand for?".into(),
            selected_option_id: Some("0".into()),
            correct_option_id: "0".into(),
            explanation: String::new(),
            correct,
        }
    }

    #[test]
    fn concept_drives_phase() {
        let mut state = SessionState::default();
        state.set_current_concept(Some(concept()));
        assert_eq!(state.phase, FlowPhase::Awareness);

        state.set_rating(Rating::new(4).unwrap());
        state.set_current_concept(None);
        assert_eq!(state.phase, FlowPhase::Reviewing);
        assert!(state.awareness_rating.is_none(), "rating cleared with concept");
    }

    #[test]
    fn question_drives_phase_and_stamps_start() {
        let mut state = SessionState::default();
        state.set_current_question(Some(question()), None);
        assert_eq!(state.phase, FlowPhase::Questioning);
        assert!(state.question_started_at.is_some());

        let anchor = Utc::now();
        state.set_current_question(Some(question()), Some(anchor));
        assert_eq!(state.question_started_at, Some(anchor));
    }

    #[test]
    fn record_answer_is_one_compound_mutation() {
        let mut state = SessionState::default();
        state.set_current_question(Some(question()), None);
        state.set_feedback(record(true));
        state.answer_submitted = true;

        state.record_answer(record(true));
        state.record_answer(record(false));

        assert_eq!(state.history.len(), 2);
        assert_eq!(state.score, 1);
        assert!(state.current_question.is_none());
        assert!(state.feedback.is_none());
        assert!(state.question_started_at.is_none());
        assert!(!state.answer_submitted);
    }

    #[test]
    fn score_matches_correct_entries() {
        let mut state = SessionState::default();
        for correct in [true, false, true, true, false] {
            state.record_answer(record(correct));
        }
        let expected = state.history.iter().filter(|r| r.correct).count() as u32;
        assert_eq!(state.score, expected);
        assert_eq!(state.review().total, 5);
    }

    #[test]
    fn begin_rating_claims_once() {
        let mut state = SessionState::default();
        state.set_current_concept(Some(concept()));

        let first = state.begin_rating(Rating::NEUTRAL);
        assert_eq!(first.map(|c| c.id), Some("c1".to_string()));
        assert_eq!(state.phase, FlowPhase::Loading);

        // second claim loses: the rating is already taken
        state.phase = FlowPhase::Awareness;
        assert!(state.begin_rating(Rating::NEUTRAL).is_none());
    }

    #[test]
    fn begin_answer_claims_once() {
        let mut state = SessionState::default();
        state.set_handle(SessionHandle::new(serde_json::json!("s1")));
        state.set_current_question(Some(question()), None);

        assert!(state.begin_answer().is_some());
        assert!(state.begin_answer().is_none(), "slot already claimed");

        state.abort_answer();
        assert!(state.begin_answer().is_some(), "slot released by abort");
    }

    #[test]
    fn begin_answer_requires_handle() {
        let mut state = SessionState::default();
        state.set_current_question(Some(question()), None);
        assert!(state.begin_answer().is_none());
    }

    #[test]
    fn reset_restores_initial_state_and_bumps_generation() {
        let mut state = SessionState::default();
        state.select_subject("physics");
        state.set_handle(SessionHandle::new(serde_json::json!({"cursor": 3})));
        state.set_current_concept(Some(concept()));
        state.record_answer(record(true));

        state.reset();

        assert_eq!(state.phase, FlowPhase::Idle);
        assert!(state.subject_id.is_none());
        assert!(state.handle.is_none(), "handle discarded on reset");
        assert!(state.history.is_empty());
        assert_eq!(state.score, 0);
        assert_eq!(state.generation, 1);
    }

    #[test]
    fn stale_generation_updates_are_discarded() {
        let store = SessionStore::new();
        let stale = store.generation();
        store.update(|s| s.reset());

        let applied = store.apply_if_current(stale, |s| s.select_subject("physics"));
        assert!(!applied);
        assert!(store.snapshot().subject_id.is_none());

        let applied = store.apply_if_current(store.generation(), |s| s.select_subject("physics"));
        assert!(applied);
        assert_eq!(store.snapshot().subject_id.as_deref(), Some("physics"));
    }

    #[tokio::test]
    async fn subscribers_observe_compound_updates_atomically() {
        let store = SessionStore::new();
        let mut rx = store.watch();

        store.update(|s| {
            s.set_current_question(Some(question()), None);
            s.record_answer(record(true));
        });

        rx.changed().await.unwrap();
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.history.len(), 1);
        assert_eq!(seen.score, 1);
        assert!(seen.current_question.is_none());
    }
}
