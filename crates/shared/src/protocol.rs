use serde::{Deserialize, Serialize};

use crate::domain::SessionId;

pub type StartQuizRequest = crate::domain::QuizSelection;

/// Echoed back by the backend as-is; labels are not checked against the menus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizConfig {
    pub grade_level: String,
    pub subject: String,
    pub difficulty: String,
    pub question_count: u32,
    /// Minutes.
    pub time_limit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizResponse {
    pub quiz_config: QuizConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Serialises to `{}` when the backend keeps the session implicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuizRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

/// Questions as returned by the generate call.
///
/// Backends built on text generation frequently hand the question list back as a
/// JSON document embedded in a string (sometimes inside a markdown code fence), so
/// decoding accepts an object with a `questions` field, a bare array, or a string
/// holding either of those.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQuestionSet")]
pub struct QuestionSet {
    pub questions: Vec<QuizQuestion>,
}

impl QuestionSet {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawQuestionSet {
    Embedded { questions: Vec<QuizQuestion> },
    List(Vec<QuizQuestion>),
    Encoded(String),
}

impl TryFrom<RawQuestionSet> for QuestionSet {
    type Error = serde_json::Error;

    fn try_from(raw: RawQuestionSet) -> Result<Self, Self::Error> {
        match raw {
            RawQuestionSet::Embedded { questions } | RawQuestionSet::List(questions) => {
                Ok(Self { questions })
            }
            RawQuestionSet::Encoded(text) => {
                match serde_json::from_str::<RawQuestionSet>(strip_code_fence(&text))? {
                    RawQuestionSet::Encoded(_) => Err(serde::de::Error::custom(
                        "question set is encoded more than once",
                    )),
                    inner => Self::try_from(inner),
                }
            }
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub quiz_questions: QuestionSet,
    #[serde(default)]
    pub quiz_data: QuizData,
}

impl QuizResponse {
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.quiz_questions.questions
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
