use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{
    domain::{GradeLevel, QuizSelection, Subject},
    protocol::{QuizQuestion, QuizResponse},
};
use tracing::info;

use crate::{
    error::{QuizClientError, Result},
    session_store::SessionStore,
    workflow::QuizWorkflow,
};

/// Leading option identifier of an answer such as `"B. 42"`, `"b) 42"` or `"(B) 42"`.
pub fn option_letter(answer: &str) -> Option<char> {
    answer
        .trim_start()
        .trim_start_matches(['(', '['])
        .chars()
        .next()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
}

pub fn is_correct(question: &QuizQuestion, answer: &str) -> bool {
    match (option_letter(answer), option_letter(&question.correct_answer)) {
        (Some(chosen), Some(correct)) => chosen == correct,
        _ => false,
    }
}

pub fn score_answers(questions: &[QuizQuestion], answers: &[String]) -> usize {
    questions
        .iter()
        .zip(answers)
        .filter(|(question, answer)| is_correct(question, answer))
        .count()
}

pub fn percentage(score: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((score as f64 / total as f64) * 100.0).round() as u32
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionReview {
    pub question: String,
    pub chosen: Option<char>,
    pub correct: Option<char>,
    pub is_correct: bool,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    pub score: usize,
    pub total: usize,
    pub percentage: u32,
    pub review: Vec<QuestionReview>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SelectionForm {
    visible: bool,
    grade_level: Option<GradeLevel>,
    subject: Option<Subject>,
}

pub struct QuizController {
    workflow: QuizWorkflow,
    store: Arc<SessionStore>,
    form: SelectionForm,
}

impl QuizController {
    pub fn new(workflow: QuizWorkflow) -> Self {
        let store = Arc::clone(workflow.store());
        Self {
            workflow,
            store,
            form: SelectionForm::default(),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn show_quiz_form(&mut self) {
        self.form.visible = true;
    }

    pub fn is_form_visible(&self) -> bool {
        self.form.visible
    }

    pub fn set_grade_level(&mut self, grade_level: Option<GradeLevel>) {
        self.form.grade_level = grade_level;
    }

    pub fn set_subject(&mut self, subject: Option<Subject>) {
        self.form.subject = subject;
    }

    pub fn selection(&self) -> Option<QuizSelection> {
        Some(QuizSelection::new(self.form.grade_level?, self.form.subject?))
    }

    pub fn can_submit(&self) -> bool {
        self.selection().is_some() && !self.workflow.is_in_flight()
    }

    pub async fn submit(&mut self) -> Result<Arc<QuizResponse>> {
        let selection = self.selection().ok_or_else(|| {
            QuizClientError::Validation("choose both a grade level and a subject".to_string())
        })?;
        let questions = self.workflow.start_quiz_and_generate(selection).await?;
        self.form.visible = false;
        Ok(questions)
    }

    /// Config and questions are both present; a failed generate step leaves this false.
    pub fn is_quiz_ready(&self) -> bool {
        self.store.current_config().is_some() && self.store.current_questions().is_some()
    }

    pub fn questions(&self) -> Vec<QuizQuestion> {
        self.store
            .current_questions()
            .map(|response| response.questions().to_vec())
            .unwrap_or_default()
    }

    pub fn question_count(&self) -> usize {
        self.store
            .current_questions()
            .map_or(0, |response| response.questions().len())
    }

    pub fn record_answer(&self, index: usize, answer: impl Into<String>) -> Result<()> {
        if self.store.is_submitted() {
            return Err(QuizClientError::InvalidState("answers were already submitted"));
        }
        self.store.record_answer(index, answer)
    }

    pub fn answers(&self) -> Vec<String> {
        self.store.answers()
    }

    pub fn is_complete(&self) -> bool {
        let total = self.question_count();
        let answers = self.store.answers();
        total > 0
            && answers.len() == total
            && answers.iter().all(|answer| !answer.trim().is_empty())
    }

    pub fn submit_answers(&self) -> Result<QuizResult> {
        if !self.is_complete() {
            return Err(QuizClientError::Validation(
                "answer every question before submitting".to_string(),
            ));
        }
        self.store.set_submitted(true);
        let result = self.build_result();
        info!(
            score = result.score,
            total = result.total,
            percentage = result.percentage,
            "quiz submitted"
        );
        Ok(result)
    }

    pub fn is_submitted(&self) -> bool {
        self.store.is_submitted()
    }

    pub fn score(&self) -> usize {
        score_answers(&self.questions(), &self.store.answers())
    }

    pub fn percentage(&self) -> u32 {
        percentage(self.score(), self.question_count())
    }

    pub fn result(&self) -> Option<QuizResult> {
        self.store.is_submitted().then(|| self.build_result())
    }

    pub fn clear_error(&self) {
        self.workflow.clear_error();
    }

    pub fn go_back(&mut self) {
        self.form = SelectionForm::default();
        self.workflow.reset();
        self.workflow.clear_error();
    }

    fn build_result(&self) -> QuizResult {
        let questions = self.questions();
        let answers = self.store.answers();
        let review: Vec<QuestionReview> = questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let answer = answers.get(index).map(String::as_str).unwrap_or_default();
                QuestionReview {
                    question: question.question.clone(),
                    chosen: option_letter(answer),
                    correct: option_letter(&question.correct_answer),
                    is_correct: is_correct(question, answer),
                    explanation: question.explanation.clone(),
                }
            })
            .collect();
        let score = review.iter().filter(|item| item.is_correct).count();
        QuizResult {
            score,
            total: questions.len(),
            percentage: percentage(score, questions.len()),
            review,
            completed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
