//! Endpoint tests for `/slack/events`: gate ordering, the URL
//! verification handshake, deduplication, and the classify-and-prompt
//! flow.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::util::ServiceExt;

use tracker_bot::server::{build_router, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use tracker_bot::slack::payloads::PendingInteraction;

use super::test_helpers::{
    body_json, default_harness, harness, sign, signed_event_request, signed_request,
    StubClassifier, StubSlack, StubTracker,
};

/// A message-event delivery containing an `@` mention.
fn mention_event_body(event_id: &str) -> String {
    json!({
        "type": "event_callback",
        "event_id": event_id,
        "event": {
            "type": "message",
            "channel": "C123",
            "text": "@ana prepara el informe para el viernes",
            "ts": "1714000000.000100"
        }
    })
    .to_string()
}

#[tokio::test]
async fn url_verification_echoes_the_challenge() {
    let h = default_harness();
    let app = build_router(h.state.clone());
    let body = r#"{"type":"url_verification","challenge":"abc123"}"#;

    let response = app
        .oneshot(signed_event_request(body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "challenge": "abc123" }));
}

#[tokio::test]
async fn non_json_content_type_is_rejected() {
    let h = default_harness();
    let app = build_router(h.state.clone());

    let response = app
        .oneshot(signed_request("/slack/events", "{}", "text/plain"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Content-Type must be application/json"
    );
}

#[tokio::test]
async fn stale_timestamp_is_rejected_with_400() {
    let h = default_harness();
    let app = build_router(h.state.clone());
    let body = mention_event_body("Ev001");
    let old_ts = (chrono::Utc::now().timestamp() - 600).to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/slack/events")
        .header("content-type", "application/json")
        .header(TIMESTAMP_HEADER, &old_ts)
        .header(SIGNATURE_HEADER, sign(&old_ts, &body))
        .body(Body::from(body))
        .expect("request");

    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Request timestamp too old");
    assert_eq!(h.classifier.call_count(), 0);
}

#[tokio::test]
async fn invalid_signature_is_rejected_with_403() {
    let h = default_harness();
    let app = build_router(h.state.clone());
    let body = mention_event_body("Ev001");
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/slack/events")
        .header("content-type", "application/json")
        .header(TIMESTAMP_HEADER, &timestamp)
        .header(SIGNATURE_HEADER, "v0=0000000000000000")
        .body(Body::from(body))
        .expect("request");

    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "Invalid signature");
    assert_eq!(h.classifier.call_count(), 0);
}

#[tokio::test]
async fn missing_signature_headers_are_rejected() {
    let h = default_harness();
    let app = build_router(h.state.clone());
    let request = Request::builder()
        .method("POST")
        .uri("/slack/events")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .expect("request");

    let response = app.oneshot(request).await.expect("response");

    // No timestamp header at all fails the freshness gate first.
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signed_garbage_body_is_rejected_as_invalid_json() {
    let h = default_harness();
    let app = build_router(h.state.clone());

    let response = app
        .oneshot(signed_event_request("{not json"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid JSON");
}

/// The full positive path: mention → classifier → one prompt post whose
/// button value round-trips the original text and thread reference.
#[tokio::test]
async fn commitment_message_posts_exactly_one_prompt() {
    let h = default_harness();
    let app = build_router(h.state.clone());

    let response = app
        .oneshot(signed_event_request(&mention_event_body("Ev001")))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));

    let posts = h.slack.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].channel, "C123");
    assert_eq!(posts[0].thread_ts.as_deref(), Some("1714000000.000100"));

    let attachments = posts[0].attachments.as_ref().expect("attachments");
    let value = attachments[0]["actions"][0]["value"]
        .as_str()
        .expect("button value");
    let pending: PendingInteraction = serde_json::from_str(value).expect("round-trip");
    assert_eq!(
        pending.original_text,
        "@ana prepara el informe para el viernes"
    );
    assert_eq!(pending.thread_ts, "1714000000.000100");
    assert!(pending.judgement.is_commitment);
}

/// A threaded reply prompts into its parent thread, not a new one.
#[tokio::test]
async fn threaded_reply_prompts_into_parent_thread() {
    let h = default_harness();
    let app = build_router(h.state.clone());
    let body = json!({
        "type": "event_callback",
        "event_id": "Ev010",
        "event": {
            "type": "message",
            "channel": "C123",
            "text": "@ana súmalo al plan",
            "ts": "1714000000.000300",
            "thread_ts": "1714000000.000100"
        }
    })
    .to_string();

    let response = app
        .oneshot(signed_event_request(&body))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let posts = h.slack.posts();
    assert_eq!(posts[0].thread_ts.as_deref(), Some("1714000000.000100"));
}

/// Delivering the same `event_id` twice triggers at most one classifier
/// invocation; the duplicate still gets its 2xx.
#[tokio::test]
async fn duplicate_event_id_is_processed_once() {
    let h = default_harness();
    let app = build_router(h.state.clone());
    let body = mention_event_body("Ev001");

    let first = app
        .clone()
        .oneshot(signed_event_request(&body))
        .await
        .expect("response");
    let second = app
        .oneshot(signed_event_request(&body))
        .await
        .expect("response");

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_json(second).await, json!({ "status": "ok" }));
    assert_eq!(h.classifier.call_count(), 1);
    assert_eq!(h.slack.posts().len(), 1);
}

#[tokio::test]
async fn message_without_mention_skips_the_classifier() {
    let h = default_harness();
    let app = build_router(h.state.clone());
    let body = json!({
        "type": "event_callback",
        "event_id": "Ev002",
        "event": {
            "type": "message",
            "channel": "C123",
            "text": "buenos días a todos",
            "ts": "1714000000.000200"
        }
    })
    .to_string();

    let response = app
        .oneshot(signed_event_request(&body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.classifier.call_count(), 0);
    assert!(h.slack.posts().is_empty());
}

#[tokio::test]
async fn bot_authored_message_is_ignored() {
    let h = default_harness();
    let app = build_router(h.state.clone());
    let body = json!({
        "type": "event_callback",
        "event_id": "Ev003",
        "event": {
            "type": "message",
            "channel": "C123",
            "text": "@ana recordatorio automático",
            "ts": "1714000000.000300",
            "bot_id": "B99"
        }
    })
    .to_string();

    let response = app
        .oneshot(signed_event_request(&body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.classifier.call_count(), 0);
}

#[tokio::test]
async fn non_message_event_is_acknowledged_without_processing() {
    let h = default_harness();
    let app = build_router(h.state.clone());
    let body = json!({
        "type": "event_callback",
        "event_id": "Ev004",
        "event": {"type": "reaction_added", "reaction": "thumbsup"}
    })
    .to_string();

    let response = app
        .oneshot(signed_event_request(&body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.classifier.call_count(), 0);
}

/// A negative judgement ends the flow with no user-visible action.
#[tokio::test]
async fn negative_judgement_stays_silent() {
    let h = harness(
        StubClassifier::negative(),
        StubSlack::with_email(Some("ana@example.com")),
        StubTracker::default(),
    );
    let app = build_router(h.state.clone());

    let response = app
        .oneshot(signed_event_request(&mention_event_body("Ev005")))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.classifier.call_count(), 1);
    assert!(h.slack.posts().is_empty());
}

/// A classifier outage fails closed: 2xx to Slack, nothing in-channel.
#[tokio::test]
async fn classifier_failure_stays_silent() {
    let h = harness(
        StubClassifier::failing(),
        StubSlack::with_email(Some("ana@example.com")),
        StubTracker::default(),
    );
    let app = build_router(h.state.clone());

    let response = app
        .oneshot(signed_event_request(&mention_event_body("Ev006")))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
    assert!(h.slack.posts().is_empty());
}

#[tokio::test]
async fn health_endpoint_reports_configuration() {
    let h = default_harness();
    let app = build_router(h.state.clone());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "tracker-bot");
    assert_eq!(body["bot_token_configured"], true);
    assert_eq!(body["signing_secret_configured"], true);
}
