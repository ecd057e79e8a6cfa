//! Core trait definition for quiz service backends.
//!
//! This async trait is implemented by the `quizflow-client` crate for the
//! HTTP backend, the bundled offline catalog, and the scripted test double.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::model::{Concept, RawOption, Rating, SessionHandle, Subject};

// ---------------------------------------------------------------------------
// Quiz service trait
// ---------------------------------------------------------------------------

/// Trait for backends that drive an adaptive quiz session.
///
/// Every session-scoped call threads the opaque [`SessionHandle`] issued by
/// the backend; the flow controller forwards it verbatim and replaces it
/// wholesale from each response that carries a new one.
#[async_trait]
pub trait QuizService: Send + Sync {
    /// Human-readable backend name (e.g. "http").
    fn name(&self) -> &str;

    /// List subjects available for quizzing.
    async fn list_subjects(&self) -> Result<Vec<Subject>, ServiceError>;

    /// Open a session for a subject and fetch its first awareness card.
    async fn start_session(&self, subject_id: &str) -> Result<StartOutcome, ServiceError>;

    /// Fetch a question for a concept, calibrated to the learner's rating.
    async fn question_by_rating(
        &self,
        concept_id: &str,
        rating: Rating,
    ) -> Result<QuestionOutcome, ServiceError>;

    /// Submit an answer (empty selection denotes a timeout) for grading.
    async fn submit_answer(&self, request: &SubmitRequest)
        -> Result<SubmitResponse, ServiceError>;

    /// Fetch the next awareness card for an ongoing session.
    async fn next_card(&self, handle: &SessionHandle) -> Result<NextCardOutcome, ServiceError>;
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Outcome of opening a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StartOutcome {
    /// The subject has concepts; the session is live.
    Card {
        handle: SessionHandle,
        concept: Concept,
    },
    /// The subject has no concepts to quiz on.
    Exhausted,
}

/// Outcome of requesting a calibrated question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuestionOutcome {
    Presented(ServedQuestion),
    /// No suitable question exists for this concept and rating.
    Unavailable,
}

/// A question as served by the backend, before option normalization.
///
/// Options arrive either as bare strings or as `{id, text}` pairs; the flow
/// controller canonicalizes them via [`crate::model::normalize_options`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServedQuestion {
    /// Question identifier.
    pub question_id: String,
    /// The concept this question was generated for.
    pub concept_id: String,
    /// Question text.
    pub text: String,
    /// Raw answer options.
    #[serde(default)]
    pub options: Vec<RawOption>,
    /// Difficulty label as served; lenient-parsed, absent maps to medium.
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// Request to grade an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// The question being answered.
    pub question_id: String,
    /// Selected option id; empty string denotes a timeout.
    pub selected_option_id: String,
    /// Opaque session token, forwarded verbatim.
    pub handle: SessionHandle,
}

/// Graded answer plus the replacement session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Whether the submitted answer was correct.
    pub correct: bool,
    /// Identifier of the correct option, copied verbatim from the backend.
    pub correct_option_id: String,
    /// Explanation of the correct answer.
    #[serde(default)]
    pub explanation: String,
    /// The new session token; replaces the stored one wholesale.
    pub handle: SessionHandle,
}

/// Outcome of advancing to the next awareness card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NextCardOutcome {
    Card(Concept),
    /// No concepts remain; the session is complete.
    Exhausted,
}
