use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::QuizSelection,
    error::ApiError,
    protocol::{GenerateQuizRequest, QuizResponse, StartQuizResponse},
};
use tracing::{debug, warn};

use crate::{
    config::{normalize_base_url, ClientSettings},
    error::{QuizClientError, Result},
};

#[async_trait]
pub trait QuizBackend: Send + Sync {
    async fn start_quiz(&self, selection: &QuizSelection) -> Result<StartQuizResponse>;
    async fn generate_questions(&self, request: &GenerateQuizRequest) -> Result<QuizResponse>;
}

pub struct HttpQuizBackend {
    http: Client,
    base_url: String,
}

impl HttpQuizBackend {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let base_url = normalize_base_url(&settings.api_base_url)
            .map_err(|err| QuizClientError::Config(format!("{err:#}")))?;
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|err| QuizClientError::Config(err.to_string()))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| QuizClientError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| QuizClientError::Transport {
                url: url.clone(),
                source,
            })?;

        if !status.is_success() {
            let message = ApiError::from_body(&text)
                .and_then(|body| body.reason().map(str::to_string))
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unexpected status")
                        .to_string()
                });
            warn!(%url, %status, %message, "quiz backend returned failure status");
            return Err(QuizClientError::Status { status, message });
        }

        debug!(%url, %status, bytes = text.len(), "quiz backend responded");
        serde_json::from_str(&text).map_err(|source| QuizClientError::Decode { url, source })
    }
}

#[async_trait]
impl QuizBackend for HttpQuizBackend {
    async fn start_quiz(&self, selection: &QuizSelection) -> Result<StartQuizResponse> {
        self.post_json("quiz/start", selection).await
    }

    async fn generate_questions(&self, request: &GenerateQuizRequest) -> Result<QuizResponse> {
        self.post_json("quiz/generate", request).await
    }
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
