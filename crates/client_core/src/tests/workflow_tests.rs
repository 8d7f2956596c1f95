use std::time::Duration;

use super::*;
use crate::session_store::SessionSnapshot;
use crate::test_support::{
    sample_response, sample_start, selection, workflow_with, Outcome, ScriptedBackend,
};
use tokio::sync::Notify;

fn assert_settled(store: &SessionStore) {
    assert!(!store.is_loading(), "loading must be cleared");
}

#[tokio::test]
async fn publishes_config_then_questions() {
    let backend = ScriptedBackend::ok(&["A", "B", "C"]);
    let workflow = workflow_with(backend.clone());

    let questions = workflow
        .start_quiz_and_generate(selection())
        .await
        .expect("workflow");

    let store = workflow.store();
    assert_settled(store);
    assert_eq!(questions.questions().len(), 3);
    assert!(store.current_config().is_some());
    assert_eq!(store.current_questions(), Some(questions));
    assert!(store.current_error().is_none());
    assert_eq!(
        backend.generate_requests(),
        vec![GenerateQuizRequest::default()]
    );
}

#[tokio::test]
async fn start_failure_skips_generate() {
    let backend = ScriptedBackend::new(
        Outcome::Fail("database offline".to_string()),
        Outcome::Ok(sample_response(&["A"])),
    );
    let workflow = workflow_with(backend.clone());

    let err = workflow
        .start_quiz_and_generate(selection())
        .await
        .expect_err("start fails");

    assert!(err.is_server_reported());
    assert!(backend.generate_requests().is_empty());
    let store = workflow.store();
    assert_settled(store);
    assert!(store.current_config().is_none());
    assert_eq!(
        store.current_error().as_deref(),
        Some("Failed to start quiz: server returned 500 Internal Server Error: database offline")
    );
}

#[tokio::test]
async fn generate_failure_leaves_config_without_questions() {
    let backend = ScriptedBackend::new(
        Outcome::Ok(sample_start(None)),
        Outcome::Fail("model unavailable".to_string()),
    );
    let workflow = workflow_with(backend);

    workflow
        .start_quiz_and_generate(selection())
        .await
        .expect_err("generate fails");

    let store = workflow.store();
    assert_settled(store);
    assert!(store.current_config().is_some());
    assert!(store.current_questions().is_none());
    let error = store.current_error().expect("error published");
    assert!(error.starts_with(GENERATE_FAILURE_PREFIX), "{error}");
    assert!(error.contains("model unavailable"), "{error}");
}

#[tokio::test]
async fn unsuccessful_generate_response_is_rejected() {
    let mut response = sample_response(&["A"]);
    response.success = false;
    response.message = "quota exceeded".to_string();
    let backend = ScriptedBackend::new(Outcome::Ok(sample_start(None)), Outcome::Ok(response));
    let workflow = workflow_with(backend);

    let err = workflow
        .start_quiz_and_generate(selection())
        .await
        .expect_err("rejected");

    assert!(matches!(err, QuizClientError::Rejected(ref message) if message == "quota exceeded"));
    assert!(workflow.store().current_questions().is_none());
    assert_settled(workflow.store());
}

#[tokio::test]
async fn forwards_session_id_from_start_to_generate() {
    let backend = ScriptedBackend::new(
        Outcome::Ok(sample_start(Some("session-42"))),
        Outcome::Ok(sample_response(&["A"])),
    );
    let workflow = workflow_with(backend.clone());

    workflow
        .start_quiz_and_generate(selection())
        .await
        .expect("workflow");

    assert_eq!(
        backend.generate_requests()[0].session_id,
        Some(SessionId("session-42".to_string()))
    );
}

#[tokio::test]
async fn generate_without_started_quiz_does_not_call_backend() {
    let backend = ScriptedBackend::ok(&["A"]);
    let workflow = workflow_with(backend.clone());

    let err = workflow.generate_questions().await.expect_err("no quiz");

    assert!(matches!(err, QuizClientError::InvalidState(_)));
    assert!(backend.generate_requests().is_empty());
    assert_settled(workflow.store());
    assert!(workflow.store().current_error().is_some());
}

#[tokio::test]
async fn phases_can_run_separately() {
    let backend = ScriptedBackend::ok(&["B", "D"]);
    let workflow = workflow_with(backend);

    let config = workflow.start_quiz(selection()).await.expect("start");
    assert_eq!(config.question_count, 3);
    assert_settled(workflow.store());
    assert!(workflow.store().current_questions().is_none());

    let questions = workflow.generate_questions().await.expect("generate");
    assert_eq!(questions.questions().len(), 2);
    assert_settled(workflow.store());
}

#[tokio::test]
async fn loading_is_visible_while_waiting_and_duplicates_are_rejected() {
    let gate = Arc::new(Notify::new());
    let backend = ScriptedBackend::new(
        Outcome::Gated(gate.clone(), sample_start(None)),
        Outcome::Ok(sample_response(&["A"])),
    );
    let workflow = Arc::new(workflow_with(backend.clone()));
    let mut loading = workflow.store().subscribe_loading();

    let running = {
        let workflow = Arc::clone(&workflow);
        tokio::spawn(async move { workflow.start_quiz_and_generate(selection()).await })
    };

    loading
        .wait_for(|loading| *loading)
        .await
        .expect("loading raised");
    assert!(workflow.is_in_flight());

    let duplicate = workflow.start_quiz_and_generate(selection()).await;
    assert!(matches!(duplicate, Err(QuizClientError::WorkflowInFlight)));
    assert!(workflow.store().is_loading());

    gate.notify_one();
    running
        .await
        .expect("task joined")
        .expect("workflow completes");

    assert_eq!(backend.start_calls(), 1);
    assert!(!workflow.is_in_flight());
    assert_settled(workflow.store());
}

#[tokio::test]
async fn abandoned_run_does_not_leave_loading_set() {
    let backend = ScriptedBackend::new(
        Outcome::Gated(Arc::new(Notify::new()), sample_start(None)),
        Outcome::Ok(sample_response(&["A"])),
    );
    let workflow = workflow_with(backend);

    let timed_out = tokio::time::timeout(
        Duration::from_millis(50),
        workflow.start_quiz_and_generate(selection()),
    )
    .await;

    assert!(timed_out.is_err());
    assert!(!workflow.is_in_flight());
    assert_settled(workflow.store());
}

#[tokio::test]
async fn reset_then_rerun_matches_a_fresh_session() {
    let backend = ScriptedBackend::new(
        Outcome::Ok(sample_start(Some("first"))),
        Outcome::Ok(sample_response(&["A", "B"])),
    );
    let workflow = workflow_with(backend.clone());

    workflow
        .start_quiz_and_generate(selection())
        .await
        .expect("first run");
    workflow.store().record_answer(0, "A").expect("answer");
    workflow.reset();
    assert_eq!(workflow.store().snapshot(), SessionSnapshot::default());

    let second = workflow
        .start_quiz_and_generate(selection())
        .await
        .expect("second run");

    let fresh = workflow_with(ScriptedBackend::new(
        Outcome::Ok(sample_start(Some("first"))),
        Outcome::Ok(sample_response(&["A", "B"])),
    ));
    let expected = fresh
        .start_quiz_and_generate(selection())
        .await
        .expect("fresh run");

    assert_eq!(second, expected);
    assert_eq!(workflow.store().snapshot(), fresh.store().snapshot());
}

#[tokio::test]
async fn empty_question_set_is_a_generate_failure() {
    let backend = ScriptedBackend::ok(&[]);
    let workflow = workflow_with(backend);

    let err = workflow
        .start_quiz_and_generate(selection())
        .await
        .expect_err("no questions");

    assert!(matches!(err, QuizClientError::Rejected(_)));
    let store = workflow.store();
    assert_settled(store);
    assert!(store.current_config().is_some());
    assert!(store.current_questions().is_none());
    assert!(store
        .current_error()
        .is_some_and(|error| error.starts_with(GENERATE_FAILURE_PREFIX)));
}

#[tokio::test]
async fn single_phases_are_rejected_while_a_run_is_in_flight() {
    let gate = Arc::new(Notify::new());
    let backend = ScriptedBackend::new(
        Outcome::Ok(sample_start(Some("chained"))),
        Outcome::Gated(gate.clone(), sample_response(&["A"])),
    );
    let workflow = Arc::new(workflow_with(backend.clone()));
    let mut config_updates = workflow.store().subscribe_config();

    let running = {
        let workflow = Arc::clone(&workflow);
        tokio::spawn(async move { workflow.start_quiz_and_generate(selection()).await })
    };

    config_updates
        .wait_for(|config| config.is_some())
        .await
        .expect("config published");
    assert!(workflow.is_in_flight());

    let start = workflow.start_quiz(selection()).await;
    assert!(matches!(start, Err(QuizClientError::WorkflowInFlight)));
    let generate = workflow.generate_questions().await;
    assert!(matches!(generate, Err(QuizClientError::WorkflowInFlight)));
    assert_eq!(backend.start_calls(), 1);
    assert!(workflow.store().is_loading());

    gate.notify_one();
    running
        .await
        .expect("task joined")
        .expect("workflow completes");

    assert_eq!(backend.generate_requests().len(), 1);
    assert_eq!(
        backend.generate_requests()[0].session_id,
        Some(SessionId("chained".to_string()))
    );
    assert_settled(workflow.store());
}
