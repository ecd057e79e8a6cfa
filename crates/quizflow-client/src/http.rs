//! HTTP quiz backend implementation.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use quizflow_core::error::ServiceError;
use quizflow_core::model::{Concept, RawOption, Rating, SessionHandle, Subject};
use quizflow_core::traits::{
    NextCardOutcome, QuestionOutcome, QuizService, ServedQuestion, StartOutcome, SubmitRequest,
    SubmitResponse,
};

pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/quizzes";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const STATUS_AWARENESS_CARD: &str = "AWARENESS_CARD";
const STATUS_QUESTION_PRESENTED: &str = "QUESTION_PRESENTED";

/// Quiz backend speaking the remote REST API.
pub struct HttpQuizService {
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpQuizService {
    pub fn new(
        base_url: Option<String>,
        api_key: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Self {
        let timeout_secs = timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            timeout_secs,
            client,
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.get(format!("{}{}", self.base_url, path)))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.post(format!("{}{}", self.base_url, path)))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("Authorization", format!("Bearer {key}")),
            None => req,
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ServiceError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout(self.timeout_secs)
            } else {
                ServiceError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                status,
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::MalformedResponse(format!("failed to parse response: {e}")))
    }
}

// --- Wire types ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopicResponse {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest {
    topic_id: String,
}

/// Response shared by the start and next-card endpoints. A status other
/// than `AWARENESS_CARD` means the topic has no cards left.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardEnvelope {
    status: String,
    #[serde(default)]
    session_state: Option<serde_json::Value>,
    #[serde(default)]
    subtopic_name: Option<String>,
    #[serde(default)]
    flashcard: Option<WireFlashcard>,
}

#[derive(Deserialize)]
struct WireFlashcard {
    id: String,
    question: String,
    answer: String,
}

#[derive(Serialize)]
struct RatingRequest {
    rating: u8,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionEnvelope {
    status: String,
    #[serde(default)]
    question_id: Option<String>,
    #[serde(default)]
    flashcard_id: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    options: Vec<RawOption>,
    #[serde(default)]
    difficulty: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitWireRequest {
    question_id: String,
    selected_option: String,
    session_state: SessionHandle,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitWireResponse {
    correct_option: String,
    #[serde(default)]
    explanation: String,
    correct: bool,
    session_state: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NextCardRequest {
    session_state: SessionHandle,
}

fn card_concept(
    subtopic_name: Option<String>,
    flashcard: Option<WireFlashcard>,
) -> Result<Concept, ServiceError> {
    let flashcard = flashcard.ok_or_else(|| {
        ServiceError::MalformedResponse("awareness card without a flashcard".to_string())
    })?;
    Ok(Concept {
        id: flashcard.id,
        name: subtopic_name.unwrap_or_default(),
        prompt: flashcard.question,
        explanation: flashcard.answer,
    })
}

#[async_trait]
impl QuizService for HttpQuizService {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self))]
    async fn list_subjects(&self) -> Result<Vec<Subject>, ServiceError> {
        let topics: Vec<TopicResponse> = self.execute(self.get("/topics")).await?;
        Ok(topics
            .into_iter()
            .map(|t| Subject {
                id: t.id,
                name: t.name,
                description: t.description.unwrap_or_default(),
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn start_session(&self, subject_id: &str) -> Result<StartOutcome, ServiceError> {
        let body = StartRequest {
            topic_id: subject_id.to_string(),
        };
        let response: CardEnvelope = self.execute(self.post("/start").json(&body)).await?;

        if response.status != STATUS_AWARENESS_CARD {
            return Ok(StartOutcome::Exhausted);
        }
        let handle = response.session_state.map(SessionHandle::new).ok_or_else(|| {
            ServiceError::MalformedResponse("awareness card without session state".to_string())
        })?;
        let concept = card_concept(response.subtopic_name, response.flashcard)?;
        Ok(StartOutcome::Card { handle, concept })
    }

    #[instrument(skip(self), fields(rating = %rating))]
    async fn question_by_rating(
        &self,
        concept_id: &str,
        rating: Rating,
    ) -> Result<QuestionOutcome, ServiceError> {
        let body = RatingRequest {
            rating: rating.value(),
        };
        let response: QuestionEnvelope = self
            .execute(
                self.post(&format!("/flashcards/{concept_id}/questions/by-rating"))
                    .json(&body),
            )
            .await?;

        if response.status != STATUS_QUESTION_PRESENTED {
            return Ok(QuestionOutcome::Unavailable);
        }
        let question_id = response.question_id.ok_or_else(|| {
            ServiceError::MalformedResponse("presented question without an id".to_string())
        })?;
        let text = response.text.ok_or_else(|| {
            ServiceError::MalformedResponse("presented question without text".to_string())
        })?;
        Ok(QuestionOutcome::Presented(ServedQuestion {
            question_id,
            concept_id: response.flashcard_id.unwrap_or_else(|| concept_id.to_string()),
            text,
            options: response.options,
            difficulty: response.difficulty,
        }))
    }

    #[instrument(skip(self, request), fields(question = %request.question_id))]
    async fn submit_answer(&self, request: &SubmitRequest) -> Result<SubmitResponse, ServiceError> {
        let body = SubmitWireRequest {
            question_id: request.question_id.clone(),
            selected_option: request.selected_option_id.clone(),
            session_state: request.handle.clone(),
        };
        let response: SubmitWireResponse =
            self.execute(self.post("/questions/submit").json(&body)).await?;

        Ok(SubmitResponse {
            correct: response.correct,
            correct_option_id: response.correct_option,
            explanation: response.explanation,
            handle: SessionHandle::new(response.session_state),
        })
    }

    #[instrument(skip(self, handle))]
    async fn next_card(&self, handle: &SessionHandle) -> Result<NextCardOutcome, ServiceError> {
        let body = NextCardRequest {
            session_state: handle.clone(),
        };
        let response: CardEnvelope = self.execute(self.post("/awareness/next").json(&body)).await?;

        if response.status != STATUS_AWARENESS_CARD {
            return Ok(NextCardOutcome::Exhausted);
        }
        let concept = card_concept(response.subtopic_name, response.flashcard)?;
        Ok(NextCardOutcome::Card(concept))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer) -> HttpQuizService {
        HttpQuizService::new(Some(server.uri()), None, None)
    }

    #[tokio::test]
    async fn lists_topics() {
        let server = MockServer::start().await;
        let body = serde_json::json!([
            {"id": "physics", "name": "Physics", "description": "Laws of nature"},
            {"id": "mathematics", "name": "Mathematics"}
        ]);
        Mock::given(method("GET"))
            .and(path("/topics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let subjects = service(&server).list_subjects().await.unwrap();
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].id, "physics");
        assert_eq!(subjects[0].description, "Laws of nature");
        assert_eq!(subjects[1].description, "");
    }

    #[tokio::test]
    async fn starts_a_session_and_maps_the_first_card() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "status": "AWARENESS_CARD",
            "sessionState": {"cursor": 0},
            "subtopicName": "Newton's Laws",
            "flashcard": {
                "id": "c1",
                "question": "F = ma",
                "answer": "Force equals mass times acceleration."
            }
        });
        Mock::given(method("POST"))
            .and(path("/start"))
            .and(body_json(serde_json::json!({"topicId": "physics"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let outcome = service(&server).start_session("physics").await.unwrap();
        match outcome {
            StartOutcome::Card { handle, concept } => {
                assert_eq!(concept.id, "c1");
                assert_eq!(concept.name, "Newton's Laws");
                assert_eq!(concept.prompt, "F = ma");
                assert_eq!(concept.explanation, "Force equals mass times acceleration.");
                assert_eq!(
                    serde_json::to_value(&handle).unwrap(),
                    serde_json::json!({"cursor": 0})
                );
            }
            other => panic!("expected a card, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn start_without_cards_is_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/start"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "NO_CARDS"})),
            )
            .mount(&server)
            .await;

        let outcome = service(&server).start_session("chemistry").await.unwrap();
        assert_eq!(outcome, StartOutcome::Exhausted);
    }

    #[tokio::test]
    async fn card_status_without_a_flashcard_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "AWARENESS_CARD",
                "sessionState": {}
            })))
            .mount(&server)
            .await;

        let err = service(&server).start_session("physics").await.unwrap_err();
        assert!(matches!(err, ServiceError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn question_by_rating_maps_the_served_question() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "status": "QUESTION_PRESENTED",
            "questionId": "q1",
            "flashcardId": "c1",
            "text": "Which quantity does m denote?",
            "options": ["Mass", "Momentum"],
            "difficulty": "hard"
        });
        Mock::given(method("POST"))
            .and(path("/flashcards/c1/questions/by-rating"))
            .and(body_json(serde_json::json!({"rating": 4})))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let outcome = service(&server)
            .question_by_rating("c1", Rating::new(4).unwrap())
            .await
            .unwrap();
        match outcome {
            QuestionOutcome::Presented(question) => {
                assert_eq!(question.question_id, "q1");
                assert_eq!(question.concept_id, "c1");
                assert_eq!(question.options.len(), 2);
                assert_eq!(question.difficulty.as_deref(), Some("hard"));
            }
            other => panic!("expected a question, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_question_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/flashcards/c9/questions/by-rating"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "NO_QUESTION"})),
            )
            .mount(&server)
            .await;

        let outcome = service(&server)
            .question_by_rating("c9", Rating::NEUTRAL)
            .await
            .unwrap();
        assert_eq!(outcome, QuestionOutcome::Unavailable);
    }

    #[tokio::test]
    async fn submit_grades_and_replaces_the_handle() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "correctOption": "0",
            "explanation": "Mass is the m in F = ma.",
            "correct": true,
            "sessionState": "s2"
        });
        Mock::given(method("POST"))
            .and(path("/questions/submit"))
            .and(body_json(serde_json::json!({
                "questionId": "q1",
                "selectedOption": "0",
                "sessionState": "s1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let request = SubmitRequest {
            question_id: "q1".to_string(),
            selected_option_id: "0".to_string(),
            handle: SessionHandle::new(serde_json::json!("s1")),
        };
        let response = service(&server).submit_answer(&request).await.unwrap();
        assert!(response.correct);
        assert_eq!(response.correct_option_id, "0");
        assert_eq!(
            serde_json::to_value(&response.handle).unwrap(),
            serde_json::json!("s2")
        );
    }

    #[tokio::test]
    async fn next_card_exhaustion_finishes_the_topic() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/awareness/next"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "SESSION_COMPLETE"})),
            )
            .mount(&server)
            .await;

        let outcome = service(&server)
            .next_card(&SessionHandle::new(serde_json::json!("s2")))
            .await
            .unwrap();
        assert_eq!(outcome, NextCardOutcome::Exhausted);
    }

    #[tokio::test]
    async fn server_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/start"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = service(&server).start_session("physics").await.unwrap_err();
        match err {
            ServiceError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected an API error, got {other}"),
        }
    }

    #[tokio::test]
    async fn api_key_is_sent_as_a_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/topics"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let service = HttpQuizService::new(Some(server.uri()), Some("secret".to_string()), None);
        let subjects = service.list_subjects().await.unwrap();
        assert!(subjects.is_empty());
    }
}
