//! Local offline quiz backend.
//!
//! Serves the built-in catalog through the same interface as the HTTP
//! backend. The service itself is stateless; the whole session cursor rides
//! in the opaque handle, exactly as the remote backend threads its session
//! state through the client.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use quizflow_core::error::ServiceError;
use quizflow_core::model::{Difficulty, Rating, RawOption, SessionHandle, Subject};
use quizflow_core::traits::{
    NextCardOutcome, QuestionOutcome, QuizService, ServedQuestion, StartOutcome, SubmitRequest,
    SubmitResponse,
};

use crate::catalog;

/// Session position carried inside the opaque handle.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalCursor {
    session_id: Uuid,
    subject_id: String,
    position: usize,
}

impl LocalCursor {
    fn encode(&self) -> SessionHandle {
        SessionHandle::new(serde_json::json!({
            "sessionId": self.session_id,
            "subjectId": self.subject_id,
            "position": self.position,
        }))
    }

    fn decode(handle: &SessionHandle) -> Result<Self, ServiceError> {
        serde_json::to_value(handle)
            .ok()
            .and_then(|value| serde_json::from_value(value).ok())
            .ok_or_else(|| ServiceError::Api {
                status: 400,
                message: "unrecognized session state".to_string(),
            })
    }
}

/// Offline quiz backend over the built-in catalog.
#[derive(Debug, Default)]
pub struct LocalQuizService;

impl LocalQuizService {
    pub fn new() -> Self {
        Self
    }
}

/// Map an awareness rating to the difficulty band served next. Low
/// familiarity gets an easy question, high familiarity a hard one.
fn band_for(rating: Rating) -> Difficulty {
    match rating.value() {
        1 | 2 => Difficulty::Easy,
        3 => Difficulty::Medium,
        _ => Difficulty::Hard,
    }
}

#[async_trait]
impl QuizService for LocalQuizService {
    fn name(&self) -> &str {
        "local"
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, ServiceError> {
        Ok(catalog::subjects())
    }

    #[instrument(skip(self))]
    async fn start_session(&self, subject_id: &str) -> Result<StartOutcome, ServiceError> {
        if !catalog::subjects().iter().any(|s| s.id == subject_id) {
            return Err(ServiceError::Api {
                status: 404,
                message: format!("unknown topic: {subject_id}"),
            });
        }

        let concepts = catalog::concepts(subject_id);
        let Some(first) = concepts.first() else {
            return Ok(StartOutcome::Exhausted);
        };

        let cursor = LocalCursor {
            session_id: Uuid::new_v4(),
            subject_id: subject_id.to_string(),
            position: 0,
        };
        Ok(StartOutcome::Card {
            handle: cursor.encode(),
            concept: first.clone(),
        })
    }

    #[instrument(skip(self), fields(rating = %rating))]
    async fn question_by_rating(
        &self,
        concept_id: &str,
        rating: Rating,
    ) -> Result<QuestionOutcome, ServiceError> {
        let band = band_for(rating);
        let Some(entry) = catalog::question(concept_id, band) else {
            return Ok(QuestionOutcome::Unavailable);
        };

        let question = entry.question;
        Ok(QuestionOutcome::Presented(ServedQuestion {
            question_id: question.id,
            concept_id: question.concept_id,
            text: question.text,
            options: question
                .options
                .into_iter()
                .map(|o| RawOption::Entry {
                    id: o.id,
                    text: o.text,
                })
                .collect(),
            difficulty: Some(question.difficulty.to_string()),
        }))
    }

    #[instrument(skip(self, request), fields(question = %request.question_id))]
    async fn submit_answer(&self, request: &SubmitRequest) -> Result<SubmitResponse, ServiceError> {
        let cursor = LocalCursor::decode(&request.handle)?;
        let Some(entry) = catalog::question_by_id(&request.question_id) else {
            return Err(ServiceError::Api {
                status: 404,
                message: format!("unknown question: {}", request.question_id),
            });
        };

        let correct = request.selected_option_id == entry.correct_option_id;
        let advanced = LocalCursor {
            position: cursor.position + 1,
            ..cursor
        };
        Ok(SubmitResponse {
            correct,
            correct_option_id: entry.correct_option_id,
            explanation: entry.explanation,
            handle: advanced.encode(),
        })
    }

    #[instrument(skip(self, handle))]
    async fn next_card(&self, handle: &SessionHandle) -> Result<NextCardOutcome, ServiceError> {
        let cursor = LocalCursor::decode(handle)?;
        let concepts = catalog::concepts(&cursor.subject_id);
        match concepts.into_iter().nth(cursor.position) {
            Some(concept) => Ok(NextCardOutcome::Card(concept)),
            None => Ok(NextCardOutcome::Exhausted),
        }
    }
}
