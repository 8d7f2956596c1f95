use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use reqwest::StatusCode;
use shared::{
    domain::{GradeLevel, QuizSelection, SessionId, Subject},
    protocol::{
        GenerateQuizRequest, QuestionSet, QuizConfig, QuizData, QuizQuestion, QuizResponse,
        StartQuizResponse,
    },
};
use tokio::sync::Notify;

use crate::{
    backend::QuizBackend,
    error::{QuizClientError, Result},
    session_store::SessionStore,
    workflow::QuizWorkflow,
};

pub fn selection() -> QuizSelection {
    QuizSelection::new(GradeLevel::Fourth, Subject::Mathematics)
}

pub fn sample_config() -> QuizConfig {
    QuizConfig {
        grade_level: GradeLevel::Fourth.label().to_string(),
        subject: Subject::Mathematics.label().to_string(),
        difficulty: "easy".to_string(),
        question_count: 3,
        time_limit: 10.0,
    }
}

pub fn sample_start(session_id: Option<&str>) -> StartQuizResponse {
    StartQuizResponse {
        quiz_config: sample_config(),
        session_id: session_id.map(|id| SessionId(id.to_string())),
        message: None,
    }
}

pub fn question(correct_answer: &str) -> QuizQuestion {
    QuizQuestion {
        question: format!("Which option is {correct_answer}?"),
        options: vec![
            "A. first".to_string(),
            "B. second".to_string(),
            "C. third".to_string(),
            "D. fourth".to_string(),
        ],
        correct_answer: correct_answer.to_string(),
        explanation: format!("The answer is {correct_answer}."),
    }
}

pub fn sample_response(correct_answers: &[&str]) -> QuizResponse {
    QuizResponse {
        success: true,
        message: "Quiz generated".to_string(),
        quiz_questions: QuestionSet {
            questions: correct_answers.iter().map(|c| question(c)).collect(),
        },
        quiz_data: QuizData::default(),
    }
}

pub fn server_error(message: &str) -> QuizClientError {
    QuizClientError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: message.to_string(),
    }
}

#[derive(Clone)]
pub enum Outcome<T> {
    Ok(T),
    Fail(String),
    /// Waits for the gate before answering with the value.
    Gated(Arc<Notify>, T),
}

impl<T: Clone> Outcome<T> {
    async fn resolve(&self) -> Result<T> {
        match self {
            Self::Ok(value) => Ok(value.clone()),
            Self::Fail(message) => Err(server_error(message)),
            Self::Gated(gate, value) => {
                gate.notified().await;
                Ok(value.clone())
            }
        }
    }
}

pub struct ScriptedBackend {
    pub start: Outcome<StartQuizResponse>,
    pub generate: Outcome<QuizResponse>,
    pub start_calls: AtomicUsize,
    pub generate_requests: Mutex<Vec<GenerateQuizRequest>>,
}

impl ScriptedBackend {
    pub fn new(start: Outcome<StartQuizResponse>, generate: Outcome<QuizResponse>) -> Arc<Self> {
        Arc::new(Self {
            start,
            generate,
            start_calls: AtomicUsize::new(0),
            generate_requests: Mutex::new(Vec::new()),
        })
    }

    pub fn ok(correct_answers: &[&str]) -> Arc<Self> {
        Self::new(
            Outcome::Ok(sample_start(None)),
            Outcome::Ok(sample_response(correct_answers)),
        )
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn generate_requests(&self) -> Vec<GenerateQuizRequest> {
        self.generate_requests.lock().expect("requests").clone()
    }
}

#[async_trait]
impl QuizBackend for ScriptedBackend {
    async fn start_quiz(&self, _selection: &QuizSelection) -> Result<StartQuizResponse> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.start.resolve().await
    }

    async fn generate_questions(&self, request: &GenerateQuizRequest) -> Result<QuizResponse> {
        self.generate_requests
            .lock()
            .expect("requests")
            .push(request.clone());
        self.generate.resolve().await
    }
}

pub fn workflow_with(backend: Arc<ScriptedBackend>) -> QuizWorkflow {
    QuizWorkflow::new(backend, Arc::new(SessionStore::new()))
}
