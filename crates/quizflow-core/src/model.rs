//! Core data model types for quizflow.
//!
//! These are the fundamental types the entire quizflow system uses to
//! represent subjects, concepts, calibrated questions, and graded answers.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A quizzable subject (topic) as returned by the listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    /// Unique identifier for this subject.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Short description shown on the landing view.
    #[serde(default)]
    pub description: String,
}

/// A learning unit surfaced during the awareness phase.
///
/// The prompt is usually a formula or short statement; the explanation is the
/// flashcard answer the learner rates their familiarity with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    /// Unique identifier for this concept.
    pub id: String,
    /// Subtopic name the concept belongs to.
    pub name: String,
    /// The flashcard front (often a formula).
    pub prompt: String,
    /// The flashcard back.
    pub explanation: String,
}

/// A single answer choice in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    /// Identifier unique within the question.
    pub id: String,
    /// Display text.
    pub text: String,
}

/// An answer choice as served on the wire: either a bare string or an
/// already-structured `{id, text}` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawOption {
    Text(String),
    Entry { id: String, text: String },
}

/// Normalize served options into canonical `{id, text}` form.
///
/// Bare strings receive positional ids `"0", "1", ...`; structured pairs pass
/// through unchanged. If the served pairs carry duplicate ids, every option is
/// reassigned a positional id so the canonical invariant (ids unique within
/// the question) holds.
pub fn normalize_options(raw: Vec<RawOption>) -> Vec<AnswerOption> {
    let mut options: Vec<AnswerOption> = raw
        .into_iter()
        .enumerate()
        .map(|(i, opt)| match opt {
            RawOption::Text(text) => AnswerOption {
                id: i.to_string(),
                text,
            },
            RawOption::Entry { id, text } => AnswerOption { id, text },
        })
        .collect();

    let mut seen = HashSet::new();
    if !options.iter().all(|o| seen.insert(o.id.clone())) {
        tracing::warn!("served question has duplicate option ids, reassigning positionally");
        for (i, opt) in options.iter_mut().enumerate() {
            opt.id = i.to_string();
        }
    }

    options
}

/// Question difficulty bands used for rating calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Lenient parse for wire payloads: case-insensitive, with absent or
    /// unrecognized values mapping to `Medium`.
    pub fn from_wire(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or(Difficulty::Medium)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// A learner's self-reported familiarity with a concept, 1 (never seen)
/// through 5 (expert).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// The neutral "somewhat familiar" rating auto-submitted when the
    /// awareness timer expires.
    pub const NEUTRAL: Rating = Rating(3);

    pub fn new(value: u8) -> Result<Self, String> {
        if (1..=5).contains(&value) {
            Ok(Rating(value))
        } else {
            Err(format!("rating must be between 1 and 5, got {value}"))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        rating.0
    }
}

impl FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid rating: '{s}'"))?;
        Rating::new(value)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A question calibrated to an awareness rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier for this question.
    pub id: String,
    /// The concept this question was generated for.
    pub concept_id: String,
    /// Question text.
    pub text: String,
    /// Answer choices in canonical form, at least one.
    pub options: Vec<AnswerOption>,
    /// Difficulty band the question was served at.
    pub difficulty: Difficulty,
}

/// The graded outcome of one answered (or timed-out) question.
///
/// Appended to the session history on submission and never mutated after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    pub question_text: String,
    /// `None` denotes a timeout: the question expired unanswered.
    pub selected_option_id: Option<String>,
    pub correct_option_id: String,
    pub explanation: String,
    pub correct: bool,
}

impl AnswerRecord {
    /// Whether this entry was produced by a timer expiry rather than a
    /// learner selection.
    pub fn timed_out(&self) -> bool {
        self.selected_option_id.is_none()
    }
}

/// The stage the quiz flow state machine is in. Exactly one phase is active
/// at a time and it alone decides which view renders and which user inputs
/// are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowPhase {
    Idle,
    Loading,
    Awareness,
    Questioning,
    Reviewing,
}

impl FlowPhase {
    /// Phases during which losing focus terminates the session.
    pub fn is_in_progress(self) -> bool {
        matches!(self, FlowPhase::Awareness | FlowPhase::Questioning)
    }
}

impl fmt::Display for FlowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowPhase::Idle => write!(f, "idle"),
            FlowPhase::Loading => write!(f, "loading"),
            FlowPhase::Awareness => write!(f, "awareness"),
            FlowPhase::Questioning => write!(f, "questioning"),
            FlowPhase::Reviewing => write!(f, "reviewing"),
        }
    }
}

/// Opaque server-issued token threading adaptive state across calls within
/// one subject session.
///
/// The client stores it, forwards it unchanged on every subsequent call, and
/// replaces it wholesale with the value returned by each response. It is
/// never parsed or mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(serde_json::Value);

impl SessionHandle {
    pub fn new(value: serde_json::Value) -> Self {
        SessionHandle(value)
    }
}

/// Scored summary of a finished session, consumed by the reviewing view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReview {
    /// Count of correctly answered questions.
    pub score: u32,
    /// Total questions answered or timed out.
    pub total: usize,
    /// Per-question detail, in answer order.
    pub entries: Vec<AnswerRecord>,
}

impl SessionReview {
    pub fn new(score: u32, entries: Vec<AnswerRecord>) -> Self {
        SessionReview {
            score,
            total: entries.len(),
            entries,
        }
    }
}
