//! Submission client tests against an in-process stub backend.

mod common;

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use common::{unreachable_url, Reply, StubBackend};
use revlight_client::{Error, ReviewClient};
use revlight_core::{Backoff, PollPolicy, ReviewBackend, Severity, SubmissionId};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

fn fast_policy() -> PollPolicy {
    PollPolicy::new()
        .with_interval(Duration::from_millis(10))
        .with_max_attempts(Some(50))
}

fn client(url: &str) -> ReviewClient {
    ReviewClient::with_timeout(url, Duration::from_secs(5))
        .unwrap()
        .with_poll_policy(fast_policy())
}

/// Stub that answers GET /get-feedback from a script, repeating the last entry
async fn scripted_feedback(script: Vec<Reply>) -> StubBackend {
    let script = Mutex::new(VecDeque::from(script));
    StubBackend::start(move |_| {
        let mut script = script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        }
    })
    .await
}

// ---------------------------------------------------------------------------
// submit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_submit_then_poll_echoes_submission_id() {
    let stub = StubBackend::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/submit-code") => {
            let body: Value = serde_json::from_str(&req.body).unwrap();
            assert_eq!(body["code"], "def f():\n    return 1\n");
            Reply::json(200, json!({"submission_id": 17, "status": "queued"}))
        }
        ("GET", "/get-feedback/17") => Reply::json(
            200,
            json!({
                "submission_id": 17,
                "status": "done",
                "feedback": [{"line": 3, "severity": "high", "message": "X"}]
            }),
        ),
        _ => Reply::json(404, json!({"error": "not found"})),
    })
    .await;
    let client = client(&stub.url());

    let id = client.submit_code("def f():\n    return 1\n").await.unwrap();
    assert_eq!(id, SubmissionId(17));

    let items = client
        .wait_for_feedback(id, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].line, Some(3));
    assert_eq!(items[0].severity, Severity::High);
    assert_eq!(items[0].message, "X");
    assert_eq!(stub.count("GET", "/get-feedback/17"), 1);
}

#[tokio::test]
async fn test_submit_reports_backend_error_message() {
    let stub = StubBackend::start(|_| Reply::json(400, json!({"error": "No code provided"}))).await;
    let client = client(&stub.url());

    let err = client.submit_code("x = 1").await.unwrap_err();
    match &err {
        Error::Status {
            status, message, ..
        } => {
            assert_eq!(status.as_u16(), 400);
            assert_eq!(message, "No code provided");
        }
        other => panic!("expected status error, got {:?}", other),
    }
    assert!(matches!(
        revlight_core::Error::from(err),
        revlight_core::Error::Network(_)
    ));
    assert_eq!(stub.count("POST", "/submit-code"), 1);
}

#[tokio::test]
async fn test_submit_without_id_is_protocol_error() {
    let stub = StubBackend::start(|_| Reply::json(200, json!({"status": "queued"}))).await;
    let client = client(&stub.url());

    let err = client.submit_code("x = 1").await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
}

#[tokio::test]
async fn test_submit_with_malformed_body_is_protocol_error() {
    let stub = StubBackend::start(|_| Reply::raw(200, "<html>oops</html>")).await;
    let client = client(&stub.url());

    let err = client.submit_code("x = 1").await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
}

#[tokio::test]
async fn test_whitespace_only_code_is_sent_unchanged() {
    let stub = StubBackend::start(|_| Reply::json(200, json!({"submission_id": 4}))).await;
    let client = client(&stub.url());

    let id = client.submit_code(" \r\n\t").await.unwrap();
    assert_eq!(id, SubmissionId(4));

    let body: Value = serde_json::from_str(&stub.requests()[0].body).unwrap();
    assert_eq!(body["code"], " \r\n\t");
}

#[tokio::test]
async fn test_submit_to_unreachable_backend_fails_once() {
    let client = client(&unreachable_url().await);

    let started = Instant::now();
    let err = client.submit_code("x = 1").await.unwrap_err();

    assert!(matches!(err, Error::Http(_)), "got {:?}", err);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(
        revlight_core::Error::from(err),
        revlight_core::Error::Network(_)
    ));
}

// ---------------------------------------------------------------------------
// wait_for_feedback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_polls_once_per_pending_answer_and_stops_at_done() {
    let stub = scripted_feedback(vec![
        Reply::json(202, json!({"status": "processing"})),
        Reply::json(200, json!({"status": "pending"})),
        Reply::json(202, json!({"status": "processing"})),
        Reply::json(
            200,
            json!({"status": "done", "feedback": [{"line": 1, "message": "first"}]}),
        ),
        Reply::json(
            200,
            json!({"status": "done", "feedback": [{"line": 2, "message": "second"}]}),
        ),
    ])
    .await;
    let client = client(&stub.url());

    let items = client
        .wait_for_feedback(SubmissionId(5), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].message, "first");
    assert_eq!(stub.count("GET", "/get-feedback/5"), 4);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(stub.count("GET", "/get-feedback/5"), 4);
}

#[tokio::test]
async fn test_poll_error_terminates_loop() {
    let stub = scripted_feedback(vec![
        Reply::json(202, json!({"status": "processing"})),
        Reply::json(500, json!({"error": "database locked"})),
        Reply::json(200, json!({"status": "done", "feedback": []})),
    ])
    .await;
    let client = client(&stub.url());

    let err = client
        .wait_for_feedback(SubmissionId(5), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Status { .. }));
    assert!(err.to_string().contains("database locked"));
    assert_eq!(stub.count("GET", "/get-feedback/5"), 2);
}

#[tokio::test]
async fn test_poll_unreachable_backend_fails_without_retry() {
    let client = client(&unreachable_url().await);

    let err = client
        .wait_for_feedback(SubmissionId(1), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Http(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_poll_gives_up_after_max_attempts() {
    let stub = scripted_feedback(vec![Reply::json(202, json!({"status": "processing"}))]).await;
    let client = client(&stub.url()).with_poll_policy(fast_policy().with_max_attempts(Some(3)));

    let err = client
        .wait_for_feedback(SubmissionId(9), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { attempts: 3, .. }), "got {:?}", err);
    assert_eq!(stub.count("GET", "/get-feedback/9"), 3);
    assert!(matches!(
        revlight_core::Error::from(err),
        revlight_core::Error::PollTimeout { attempts: 3, .. }
    ));
}

#[tokio::test]
async fn test_poll_gives_up_after_max_wait() {
    let stub = scripted_feedback(vec![Reply::json(202, json!({"status": "processing"}))]).await;
    let client = client(&stub.url()).with_poll_policy(
        fast_policy()
            .with_max_attempts(None)
            .with_max_wait(Some(Duration::from_millis(100))),
    );

    let err = client
        .wait_for_feedback(SubmissionId(9), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_backoff_does_not_sleep_past_max_wait() {
    let stub = scripted_feedback(vec![Reply::json(202, json!({"status": "processing"}))]).await;
    let client = client(&stub.url()).with_poll_policy(
        fast_policy()
            .with_backoff(Backoff::Exponential {
                factor: 10.0,
                max_interval: Duration::from_secs(5),
            })
            .with_max_attempts(None)
            .with_max_wait(Some(Duration::from_millis(150))),
    );

    let started = Instant::now();
    let err = client
        .wait_for_feedback(SubmissionId(9), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { .. }), "got {:?}", err);
    assert!(started.elapsed() < Duration::from_millis(900));
}

#[tokio::test]
async fn test_cancel_stops_polling() {
    let stub = scripted_feedback(vec![Reply::json(202, json!({"status": "processing"}))]).await;
    let client = client(&stub.url()).with_poll_policy(fast_policy().with_max_attempts(None));
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        canceller.cancel();
    });

    let err = client
        .wait_for_feedback(SubmissionId(3), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));

    // let a request that was already on the wire land before counting
    tokio::time::sleep(Duration::from_millis(20)).await;
    let polls = stub.count("GET", "/get-feedback/3");
    assert!(polls >= 1);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(stub.count("GET", "/get-feedback/3"), polls);
}

#[tokio::test]
async fn test_already_cancelled_token_sends_nothing() {
    let stub = scripted_feedback(vec![Reply::json(200, json!({"status": "done"}))]).await;
    let client = client(&stub.url());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client
        .wait_for_feedback(SubmissionId(3), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn test_non_list_feedback_is_protocol_error() {
    let stub = scripted_feedback(vec![Reply::json(
        200,
        json!({"status": "done", "feedback": "LGTM"}),
    )])
    .await;
    let client = client(&stub.url());

    let err = client
        .wait_for_feedback(SubmissionId(2), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
}

// ---------------------------------------------------------------------------
// ReviewBackend seam
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_review_backend_maps_errors_to_core_taxonomy() {
    let stub = StubBackend::start(|req| match req.method.as_str() {
        "POST" => Reply::json(200, json!({"submission_id": 8})),
        _ => Reply::json(200, json!({"status": "done", "feedback": [{"severity": "low"}]})),
    })
    .await;
    let backend = client(&stub.url());

    let id = ReviewBackend::submit(&backend, "x = 1").await.unwrap();
    let items = backend
        .await_feedback(id, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(items[0].severity, Severity::Low);

    let err = ReviewBackend::submit(&backend, "").await.unwrap_err();
    assert!(matches!(err, revlight_core::Error::EmptySubmission));
}
