// tests/test_chat_api.rs


use axum::http::StatusCode;
use std::sync::atomic::Ordering;
use tower::ServiceExt;

use sagealpha::error::Step;
use sagealpha::state::FALLBACK_REPLY;
use test_helpers::{Canned, StubBackend, body_json, body_text, create_test_app, get, post_json};

#[tokio::test]
async fn test_chat_returns_reply() {
    let backend = StubBackend::new(Canned::Reply("Net margin is 18%.".into()));
    let app = create_test_app(backend.clone());

    let response = app
        .oneshot(post_json("/chat", r#"{"message": "  What is the net margin?  "}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["response"], "Net margin is 18%.");
    assert_eq!(body["status"], "success");
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_chat_accepts_history_field() {
    let app = create_test_app(StubBackend::new(Canned::Reply("ok".into())));

    let response = app
        .oneshot(post_json(
            "/chat",
            r#"{"message": "next", "history": [{"role": "user", "content": "prev"}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_empty_message_rejected() {
    for body in [r#"{"message": "   "}"#, r#"{}"#, "not json at all"] {
        let backend = StubBackend::new(Canned::Reply("unused".into()));
        let app = create_test_app(backend.clone());

        let response = app.oneshot(post_json("/chat", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let json = body_json(response).await;
        assert_eq!(json["error"], "Message is required");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_no_text_uses_fallback_reply() {
    let app = create_test_app(StubBackend::new(Canned::Nothing));

    let response = app
        .oneshot(post_json("/chat", r#"{"message": "hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["response"], FALLBACK_REPLY);
}

#[tokio::test]
async fn test_failed_run_reports_agent_error() {
    let app = create_test_app(StubBackend::new(Canned::RunFailed(
        "rate_limit_exceeded: Rate limit reached".into(),
    )));

    let response = app
        .oneshot(post_json("/chat", r#"{"message": "hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Agent error: rate_limit_exceeded: Rate limit reached");
}

#[tokio::test]
async fn test_step_failures_map_to_messages() {
    let cases = [
        (Step::CreateThread, "Failed to create conversation thread"),
        (Step::SendMessage, "Failed to send message to agent"),
        (Step::RunAgent, "Failed to run agent"),
        (Step::ListMessages, "Failed to retrieve agent response"),
    ];

    for (step, expected) in cases {
        let app = create_test_app(StubBackend::new(Canned::StepFailed(step)));
        let response = app
            .oneshot(post_json("/chat", r#"{"message": "hello"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], expected);
    }
}

#[tokio::test]
async fn test_health() {
    let app = create_test_app(StubBackend::new(Canned::Nothing));

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "SageAlpha.ai");
}

#[tokio::test]
async fn test_index_page() {
    let app = create_test_app(StubBackend::new(Canned::Nothing));

    let response = app.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<title>SageAlpha.ai</title>"));
}

#[tokio::test]
async fn test_unknown_route() {
    let app = create_test_app(StubBackend::new(Canned::Nothing));

    let response = app.oneshot(get("/nope")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Endpoint not found");
}
