// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request-level tests of the credential and usage API.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use hark_core::UserIdentifier;
use hark_credential::Fingerprinter;
use hark_test_utils::{FailingTranscriptStore, FailingUsageStore, TestHarness};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1");
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, value)
}

async fn post(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    call(router, Method::POST, uri, Some(body)).await
}

fn caller() -> UserIdentifier {
    Fingerprinter::unkeyed().fingerprint("203.0.113.7")
}

#[tokio::test]
async fn generate_token_returns_identifiers_and_allowance() {
    let harness = TestHarness::new().await.unwrap();
    let router = harness.router();

    let (status, body) = post(
        &router,
        "/prod/generate-token",
        json!({ "roomName": "room-1", "participantName": "Web User" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Token generated successfully");
    let data = &body["data"];
    assert_eq!(data["sessionIdentifier"], data["tokenIdentifier"]);
    assert_eq!(data["agentIdentifier"], "hark-faq-agent");
    assert_eq!(data["remainingMinutes"], 100);

    let claims = harness.signer().inspect(data["token"].as_str().unwrap()).unwrap();
    assert_eq!(claims.video.room, "room-1");
    assert_eq!(claims.attributes["userIdentifier"], caller().0);
    assert_eq!(
        claims.attributes["sessionIdentifier"],
        data["sessionIdentifier"].as_str().unwrap()
    );

    // Session start wrote a zeroed record for today.
    let report = harness.ledger.get_usage(&caller()).await;
    assert_eq!(report.used_minutes, 0);
}

#[tokio::test]
async fn generate_token_requires_both_names() {
    let harness = TestHarness::new().await.unwrap();
    let (status, body) = post(&harness.router(), "/generate-token", json!({ "roomName": "r" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Missing required parameters: roomName and participantName");
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn exhausted_allowance_is_429() {
    let harness = TestHarness::builder().with_daily_limit(10).build().await.unwrap();
    harness.ledger.add_minutes(&caller(), 10, None, None).await.unwrap();

    let (status, body) = post(
        &harness.router(),
        "/generate-token",
        json!({ "roomName": "r", "participantName": "p" }),
    )
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body["error"],
        "Daily usage limit exceeded. You have used 10 minutes today. Limit: 10 minutes."
    );
}

#[tokio::test]
async fn store_then_check_usage() {
    let harness = TestHarness::new().await.unwrap();
    let router = harness.router();
    let user = caller();

    let (status, body) = post(
        &router,
        "/api/store-transcription",
        json!({
            "transcription": { "messages": [], "sessionInfo": { "totalMessages": 0 } },
            "roomName": "room-1",
            "userIdentifier": user.0,
            "tokenIdentifier": "sess-1",
            "duration": 125.0,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Transcription stored successfully");
    assert_eq!(
        body["data"]["transcriptionKey"],
        format!("transcriptions/{}/room-1/sess-1.json", user.0)
    );

    let (status, body) = post(&router, "/check-usage", json!({ "userIdentifier": user.0 })).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["usedMinutes"], 3);
    assert_eq!(data["remainingMinutes"], 97);
    assert_eq!(data["dailyLimit"], 100);
    assert_eq!(data["allowed"], true);
    assert!(data["resetTime"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn store_transcription_validates_fields() {
    let harness = TestHarness::new().await.unwrap();
    let router = harness.router();

    let (status, body) = post(&router, "/store-transcription", json!({ "roomName": "r" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required parameters for transcription storage");

    let (status, _) = post(
        &router,
        "/store-transcription",
        json!({ "transcription": 42, "roomName": "r", "userIdentifier": "u", "sessionIdentifier": "s" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn usage_failure_after_store_is_surfaced() {
    let backing = TestHarness::new().await.unwrap();
    let failing = Arc::new(FailingUsageStore::new(backing.storage.clone()));
    failing.fail_writes(true);
    let harness = TestHarness::builder()
        .with_usage_store(failing.clone())
        .build()
        .await
        .unwrap();

    let (status, body) = post(
        &harness.router(),
        "/store-transcription",
        json!({
            "transcription": "agent: hello",
            "roomName": "r",
            "userIdentifier": "u",
            "sessionIdentifier": "s",
            "duration": 30,
        }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Transcription stored but usage could not be recorded");
    assert_eq!(failing.add_calls(), 1);
    let stored = harness.archive.fetch("transcriptions/u/r/s.json").await.unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn transcript_write_failure_is_500_and_charges_nothing() {
    let harness = TestHarness::builder()
        .with_transcript_store(Arc::new(FailingTranscriptStore))
        .build()
        .await
        .unwrap();
    let user = caller();

    let (status, body) = post(
        &harness.router(),
        "/store-transcription",
        json!({
            "transcription": "agent: hello",
            "roomName": "r",
            "userIdentifier": user.0,
            "sessionIdentifier": "s",
            "duration": 300,
        }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to store transcription");
    assert_eq!(harness.ledger.get_usage(&user).await.used_minutes, 0);
}

#[tokio::test]
async fn check_usage_allows_when_reads_fail() {
    let backing = TestHarness::new().await.unwrap();
    let failing = Arc::new(FailingUsageStore::new(backing.storage.clone()));
    let harness = TestHarness::builder()
        .with_usage_store(failing.clone())
        .build()
        .await
        .unwrap();
    let router = harness.router();
    let user = caller();

    let (status, _) = post(
        &router,
        "/store-transcription",
        json!({
            "transcription": "agent: hello",
            "roomName": "r",
            "userIdentifier": user.0,
            "sessionIdentifier": "s",
            "duration": 600,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = post(&router, "/check-usage", json!({ "userIdentifier": user.0 })).await;
    assert_eq!(body["data"]["usedMinutes"], 10);

    failing.fail_reads(true);
    let (status, body) = post(&router, "/check-usage", json!({ "userIdentifier": user.0 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["usedMinutes"], 0);
    assert_eq!(body["data"]["remainingMinutes"], 100);
    assert_eq!(body["data"]["allowed"], true);
}

#[tokio::test]
async fn check_usage_requires_user() {
    let harness = TestHarness::new().await.unwrap();
    let (status, body) = post(&harness.router(), "/check-usage", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "userIdentifier is required");
}

#[tokio::test]
async fn unknown_segment_and_bad_json() {
    let harness = TestHarness::new().await.unwrap();
    let router = harness.router();

    let (status, body) = post(&router, "/nope", json!({})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Invalid path: nope");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/check-usage")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn preflight_and_cors_headers() {
    let harness = TestHarness::new().await.unwrap();
    let router = harness.router();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/anything/at/all")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type, Authorization");
    assert_eq!(headers["access-control-allow-methods"], "OPTIONS,POST,GET");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/check-usage")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn health_reports_storage() {
    let harness = TestHarness::new().await.unwrap();
    let (status, body) = call(&harness.router(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "healthy");
}

#[tokio::test]
async fn metrics_route_follows_configuration() {
    let harness = TestHarness::new().await.unwrap();
    let (status, _) = call(&harness.router(), Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let harness = TestHarness::builder()
        .with_metrics(Arc::new(|| "hark_up 1\n".to_string()))
        .build()
        .await
        .unwrap();
    let (status, body) = call(&harness.router(), Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("hark_up 1\n".into()));
}

#[tokio::test]
async fn served_over_tcp_with_graceful_shutdown() {
    let harness = TestHarness::new().await.unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(hark_gateway::serve(listener, harness.gateway_state(), async move {
        let _ = stop_rx.await;
    }));

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{addr}/generate-token"))
        .json(&json!({ "roomName": "r", "participantName": "p" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    let token = body["data"]["token"].as_str().unwrap();

    // No forwarding headers: the peer address is fingerprinted.
    let claims = harness.signer().inspect(token).unwrap();
    assert_eq!(
        claims.attributes["userIdentifier"],
        Fingerprinter::unkeyed().fingerprint("127.0.0.1").0
    );

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}
