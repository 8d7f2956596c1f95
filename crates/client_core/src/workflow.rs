use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use shared::{
    domain::{QuizSelection, SessionId},
    protocol::{GenerateQuizRequest, QuizConfig, QuizResponse},
};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    backend::QuizBackend,
    error::{QuizClientError, Result},
    session_store::SessionStore,
};

pub const START_FAILURE_PREFIX: &str = "Failed to start quiz";
pub const GENERATE_FAILURE_PREFIX: &str = "Failed to generate quiz questions";

/// Holds `loading` true for its lifetime, including when the owning future is dropped.
struct LoadingGuard<'a> {
    store: &'a SessionStore,
}

impl<'a> LoadingGuard<'a> {
    fn engage(store: &'a SessionStore) -> Self {
        store.set_loading(true);
        Self { store }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.set_loading(false);
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct QuizWorkflow {
    backend: Arc<dyn QuizBackend>,
    store: Arc<SessionStore>,
    session_id: Mutex<Option<SessionId>>,
    in_flight: AtomicBool,
}

impl QuizWorkflow {
    pub fn new(backend: Arc<dyn QuizBackend>, store: Arc<SessionStore>) -> Self {
        Self {
            backend,
            store,
            session_id: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Runs start then generate. Loading is false again whenever this returns.
    pub async fn start_quiz_and_generate(
        &self,
        selection: QuizSelection,
    ) -> Result<Arc<QuizResponse>> {
        let _in_flight = self.acquire_in_flight()?;
        let span = info_span!(
            "quiz_workflow",
            run_id = %Uuid::new_v4(),
            grade_level = %selection.grade_level,
            subject = %selection.subject,
        );
        self.run_chained(selection).instrument(span).await
    }

    pub async fn start_quiz(&self, selection: QuizSelection) -> Result<Arc<QuizConfig>> {
        let _in_flight = self.acquire_in_flight()?;
        self.store.clear_error();
        let _loading = LoadingGuard::engage(&self.store);
        self.run_start(selection).await
    }

    pub async fn generate_questions(&self) -> Result<Arc<QuizResponse>> {
        let _in_flight = self.acquire_in_flight()?;
        let _loading = LoadingGuard::engage(&self.store);
        self.run_generate().await
    }

    pub fn reset(&self) {
        self.lock_session_id().take();
        self.store.reset();
    }

    pub fn clear_error(&self) {
        self.store.clear_error();
    }

    async fn run_chained(&self, selection: QuizSelection) -> Result<Arc<QuizResponse>> {
        info!("quiz workflow: starting");
        self.store.clear_error();
        let _loading = LoadingGuard::engage(&self.store);
        self.run_start(selection).await?;
        info!("quiz workflow: quiz started, generating questions");
        self.run_generate().await
    }

    async fn run_start(&self, selection: QuizSelection) -> Result<Arc<QuizConfig>> {
        match self.backend.start_quiz(&selection).await {
            Ok(response) => {
                *self.lock_session_id() = response.session_id;
                let config = self.store.publish_config(response.quiz_config);
                info!(
                    difficulty = %config.difficulty,
                    question_count = config.question_count,
                    time_limit = config.time_limit,
                    "quiz workflow: quiz config received"
                );
                Ok(config)
            }
            Err(err) => Err(self.fail(START_FAILURE_PREFIX, err)),
        }
    }

    async fn run_generate(&self) -> Result<Arc<QuizResponse>> {
        if self.store.current_config().is_none() {
            return Err(self.fail(
                GENERATE_FAILURE_PREFIX,
                QuizClientError::InvalidState("no quiz started"),
            ));
        }

        let request = GenerateQuizRequest {
            session_id: self.lock_session_id().clone(),
        };
        let response = match self.backend.generate_questions(&request).await {
            Ok(response) if !response.success => {
                let message = if response.message.trim().is_empty() {
                    "question generation was not successful".to_string()
                } else {
                    response.message
                };
                return Err(self.fail(GENERATE_FAILURE_PREFIX, QuizClientError::Rejected(message)));
            }
            Ok(response) if response.questions().is_empty() => {
                return Err(self.fail(
                    GENERATE_FAILURE_PREFIX,
                    QuizClientError::Rejected("no questions were generated".to_string()),
                ));
            }
            Ok(response) => response,
            Err(err) => return Err(self.fail(GENERATE_FAILURE_PREFIX, err)),
        };

        match self.store.publish_questions(response) {
            Ok(questions) => {
                info!(
                    question_count = questions.questions().len(),
                    "quiz workflow: questions ready"
                );
                Ok(questions)
            }
            Err(err) => Err(self.fail(GENERATE_FAILURE_PREFIX, err)),
        }
    }

    fn acquire_in_flight(&self) -> Result<InFlightGuard<'_>> {
        InFlightGuard::acquire(&self.in_flight).ok_or_else(|| {
            warn!("quiz workflow: call ignored while a quiz is being prepared");
            QuizClientError::WorkflowInFlight
        })
    }

    fn fail(&self, prefix: &str, err: QuizClientError) -> QuizClientError {
        error!(error = %err, server_reported = err.is_server_reported(), "{prefix}");
        self.store.publish_error(format!("{prefix}: {err}"));
        err
    }

    fn lock_session_id(&self) -> std::sync::MutexGuard<'_, Option<SessionId>> {
        self.session_id
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
