//! Mock quiz backend for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use quizflow_core::error::ServiceError;
use quizflow_core::model::{Rating, SessionHandle, Subject};
use quizflow_core::traits::{
    NextCardOutcome, QuestionOutcome, QuizService, StartOutcome, SubmitRequest, SubmitResponse,
};

/// One observed call, with the arguments the flow passed in.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    ListSubjects,
    StartSession {
        subject_id: String,
    },
    QuestionByRating {
        concept_id: String,
        rating: u8,
    },
    SubmitAnswer {
        question_id: String,
        selected_option_id: String,
        handle: SessionHandle,
    },
    NextCard {
        handle: SessionHandle,
    },
}

/// A mock quiz backend for testing the flow without real API calls.
///
/// Responses are scripted per operation and played back in order; an empty
/// queue yields a benign default so scenarios only script the steps they
/// care about.
#[derive(Default)]
pub struct MockQuizService {
    subjects: Mutex<VecDeque<Result<Vec<Subject>, ServiceError>>>,
    starts: Mutex<VecDeque<Result<StartOutcome, ServiceError>>>,
    questions: Mutex<VecDeque<Result<QuestionOutcome, ServiceError>>>,
    submissions: Mutex<VecDeque<Result<SubmitResponse, ServiceError>>>,
    next_cards: Mutex<VecDeque<Result<NextCardOutcome, ServiceError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    call_count: AtomicU32,
}

impl MockQuizService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_subjects(&self, response: Result<Vec<Subject>, ServiceError>) {
        self.subjects.lock().unwrap().push_back(response);
    }

    pub fn enqueue_start(&self, response: Result<StartOutcome, ServiceError>) {
        self.starts.lock().unwrap().push_back(response);
    }

    pub fn enqueue_question(&self, response: Result<QuestionOutcome, ServiceError>) {
        self.questions.lock().unwrap().push_back(response);
    }

    pub fn enqueue_submission(&self, response: Result<SubmitResponse, ServiceError>) {
        self.submissions.lock().unwrap().push_back(response);
    }

    pub fn enqueue_next_card(&self, response: Result<NextCardOutcome, ServiceError>) {
        self.next_cards.lock().unwrap().push_back(response);
    }

    /// All calls observed so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Get the number of calls made to this backend.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    fn record(&self, call: RecordedCall) {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl QuizService for MockQuizService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, ServiceError> {
        self.record(RecordedCall::ListSubjects);
        self.subjects
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn start_session(&self, subject_id: &str) -> Result<StartOutcome, ServiceError> {
        self.record(RecordedCall::StartSession {
            subject_id: subject_id.to_string(),
        });
        self.starts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(StartOutcome::Exhausted))
    }

    async fn question_by_rating(
        &self,
        concept_id: &str,
        rating: Rating,
    ) -> Result<QuestionOutcome, ServiceError> {
        self.record(RecordedCall::QuestionByRating {
            concept_id: concept_id.to_string(),
            rating: rating.value(),
        });
        self.questions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(QuestionOutcome::Unavailable))
    }

    async fn submit_answer(&self, request: &SubmitRequest) -> Result<SubmitResponse, ServiceError> {
        self.record(RecordedCall::SubmitAnswer {
            question_id: request.question_id.clone(),
            selected_option_id: request.selected_option_id.clone(),
            handle: request.handle.clone(),
        });
        self.submissions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Network("no scripted submission".to_string())))
    }

    async fn next_card(&self, handle: &SessionHandle) -> Result<NextCardOutcome, ServiceError> {
        self.record(RecordedCall::NextCard {
            handle: handle.clone(),
        });
        self.next_cards
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(NextCardOutcome::Exhausted))
    }
}
