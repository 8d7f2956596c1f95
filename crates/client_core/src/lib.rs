use std::sync::Arc;

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod session_store;
pub mod workflow;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

pub use backend::{HttpQuizBackend, QuizBackend};
pub use config::{load_settings, ClientSettings};
pub use controller::{QuestionReview, QuizController, QuizResult};
pub use error::QuizClientError;
pub use session_store::{SessionSnapshot, SessionStore};
pub use workflow::QuizWorkflow;

pub fn http_controller(settings: &ClientSettings) -> error::Result<QuizController> {
    let backend = Arc::new(HttpQuizBackend::new(settings)?);
    let store = Arc::new(SessionStore::new());
    Ok(QuizController::new(QuizWorkflow::new(backend, store)))
}
