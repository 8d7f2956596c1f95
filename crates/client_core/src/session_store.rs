use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::protocol::{QuizConfig, QuizResponse};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::error::{QuizClientError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub config: Option<Arc<QuizConfig>>,
    pub questions: Option<Arc<QuizResponse>>,
    pub loading: bool,
    pub error: Option<String>,
    pub answers: Vec<String>,
    pub submitted: bool,
}

impl SessionSnapshot {
    pub fn question_count(&self) -> usize {
        self.questions
            .as_ref()
            .map_or(0, |questions| questions.questions().len())
    }
}

pub struct SessionStore {
    config: watch::Sender<Option<Arc<QuizConfig>>>,
    questions: watch::Sender<Option<Arc<QuizResponse>>>,
    loading: watch::Sender<bool>,
    error: watch::Sender<Option<String>>,
    answers: watch::Sender<Vec<String>>,
    submitted: watch::Sender<bool>,
    // Held by every writer that touches questions and answers together.
    answer_writes: Mutex<()>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            config: watch::channel(None).0,
            questions: watch::channel(None).0,
            loading: watch::channel(false).0,
            error: watch::channel(None).0,
            answers: watch::channel(Vec::new()).0,
            submitted: watch::channel(false).0,
            answer_writes: Mutex::new(()),
        }
    }

    pub fn subscribe_config(&self) -> watch::Receiver<Option<Arc<QuizConfig>>> {
        self.config.subscribe()
    }

    pub fn subscribe_questions(&self) -> watch::Receiver<Option<Arc<QuizResponse>>> {
        self.questions.subscribe()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<String>> {
        self.error.subscribe()
    }

    pub fn subscribe_answers(&self) -> watch::Receiver<Vec<String>> {
        self.answers.subscribe()
    }

    pub fn subscribe_submitted(&self) -> watch::Receiver<bool> {
        self.submitted.subscribe()
    }

    pub fn loading_stream(&self) -> WatchStream<bool> {
        WatchStream::new(self.loading.subscribe())
    }

    pub fn error_stream(&self) -> WatchStream<Option<String>> {
        WatchStream::new(self.error.subscribe())
    }

    pub fn questions_stream(&self) -> WatchStream<Option<Arc<QuizResponse>>> {
        WatchStream::new(self.questions.subscribe())
    }

    pub fn publish_config(&self, config: QuizConfig) -> Arc<QuizConfig> {
        let config = Arc::new(config);
        debug!(
            grade_level = %config.grade_level,
            subject = %config.subject,
            question_count = config.question_count,
            "session: config published"
        );
        self.config.send_replace(Some(Arc::clone(&config)));
        config
    }

    pub fn publish_questions(&self, questions: QuizResponse) -> Result<Arc<QuizResponse>> {
        if self.config.borrow().is_none() {
            return Err(QuizClientError::InvalidState(
                "questions published before a quiz config",
            ));
        }
        let questions = Arc::new(questions);
        let _writes = self.lock_answer_writes();
        debug!(
            question_count = questions.questions().len(),
            "session: questions published"
        );
        self.answers.send_replace(Vec::new());
        self.submitted.send_replace(false);
        self.questions.send_replace(Some(Arc::clone(&questions)));
        Ok(questions)
    }

    pub fn set_loading(&self, loading: bool) {
        self.loading.send_replace(loading);
    }

    pub fn publish_error(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(%message, "session: error published");
        self.error.send_replace(Some(message));
    }

    pub fn clear_error(&self) {
        self.error.send_replace(None);
    }

    /// Stores `answer` at `index`, padding skipped slots with empty answers.
    pub fn record_answer(&self, index: usize, answer: impl Into<String>) -> Result<()> {
        let _writes = self.lock_answer_writes();
        let question_count = self.current_question_count();
        if question_count == 0 {
            return Err(QuizClientError::InvalidState("no questions to answer"));
        }
        if index >= question_count {
            return Err(QuizClientError::Validation(format!(
                "question {} does not exist; quiz has {question_count} questions",
                index + 1
            )));
        }
        let answer = answer.into();
        self.answers.send_modify(|answers| {
            if answers.len() <= index {
                answers.resize(index + 1, String::new());
            }
            answers[index] = answer;
        });
        Ok(())
    }

    pub fn set_submitted(&self, submitted: bool) {
        self.submitted.send_replace(submitted);
    }

    pub fn reset(&self) {
        let _writes = self.lock_answer_writes();
        self.config.send_replace(None);
        self.questions.send_replace(None);
        self.loading.send_replace(false);
        self.answers.send_replace(Vec::new());
        self.submitted.send_replace(false);
        debug!("session: reset");
    }

    pub fn current_config(&self) -> Option<Arc<QuizConfig>> {
        self.config.borrow().clone()
    }

    pub fn current_questions(&self) -> Option<Arc<QuizResponse>> {
        self.questions.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn current_error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub fn answers(&self) -> Vec<String> {
        self.answers.borrow().clone()
    }

    pub fn is_submitted(&self) -> bool {
        *self.submitted.borrow()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            config: self.current_config(),
            questions: self.current_questions(),
            loading: self.is_loading(),
            error: self.current_error(),
            answers: self.answers(),
            submitted: self.is_submitted(),
        }
    }

    fn lock_answer_writes(&self) -> MutexGuard<'_, ()> {
        self.answer_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn current_question_count(&self) -> usize {
        self.questions
            .borrow()
            .as_ref()
            .map_or(0, |questions| questions.questions().len())
    }
}

#[cfg(test)]
#[path = "tests/session_store_tests.rs"]
mod tests;
