//! HTTP boundary: webhook routes and gate ordering.
//!
//! Both webhook endpoints verify the raw body signature before any
//! parsing, and both acknowledge with 2xx whenever verification passes:
//! internal outcomes (dedup hits, negative classification, dropped
//! submissions) are never reflected to the sender, since Slack retries on
//! anything else.
//!
//! Gate order on `/slack/events`: content type (400) → timestamp
//! freshness (400) → signature (403) → JSON parse (400) → challenge echo
//! → dedup → flow.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::relay::{events, interactions, AppState};
use crate::slack::payloads::{extract_payload, EventEnvelope, InteractionPayload};
use crate::{AppError, Result};

/// Timestamp header stamped by Slack on every webhook delivery.
pub const TIMESTAMP_HEADER: &str = "X-Slack-Request-Timestamp";
/// Signature header stamped by Slack on every webhook delivery.
pub const SIGNATURE_HEADER: &str = "X-Slack-Signature";

/// Build the webhook router around shared state.
#[must_use]
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/slack/events", post(slack_events))
        .route("/slack/interactions", post(slack_interactions))
        .with_state(state)
}

/// Bind and serve the router until the cancellation token fires.
///
/// # Errors
///
/// Returns `AppError::Config` if the listener cannot bind or the server
/// fails.
pub async fn serve(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let bind = SocketAddr::from(([0, 0, 0, 0], state.config.http_port));
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind {bind}: {err}")))?;

    info!(%bind, "webhook server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Config(format!("server error: {err}")))?;

    info!("webhook server shut down");
    Ok(())
}

async fn home() -> &'static str {
    "tracker-bot is running!"
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "tracker-bot",
        "bot_token_configured": !state.config.slack.bot_token.is_empty(),
        "signing_secret_configured": !state.config.slack.signing_secret.is_empty(),
    }))
}

/// Events API endpoint: URL verification challenges and event deliveries.
async fn slack_events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if !is_json {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Content-Type must be application/json",
        );
    }

    let Ok(body) = std::str::from_utf8(&body) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid JSON");
    };

    if let Err(rejection) = verify_request(&state, &headers, body) {
        return rejection;
    }

    let Ok(envelope) = serde_json::from_str::<EventEnvelope>(body) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid JSON");
    };

    // One-time endpoint registration handshake.
    if envelope.kind.as_deref() == Some("url_verification") {
        let challenge = envelope.challenge.unwrap_or_default();
        return Json(json!({ "challenge": challenge })).into_response();
    }

    if let Some(event) = envelope.event {
        // Suppress at-least-once redeliveries before any side-effecting
        // work. Slack still gets its 2xx so it stops retrying.
        if let Some(event_id) = envelope.event_id.as_deref() {
            if !state.dedup.insert(event_id) {
                debug!(event_id, "duplicate event suppressed");
                return ok_response();
            }
        }

        events::handle_message_event(&event, &state).await;
    }

    ok_response()
}

/// Interactivity endpoint: button clicks, modal closure, form submission.
async fn slack_interactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Ok(body) = std::str::from_utf8(&body) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid payload");
    };

    if let Err(rejection) = verify_request(&state, &headers, body) {
        return rejection;
    }

    let Some(payload_json) = extract_payload(body) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid payload");
    };
    let Ok(payload) = serde_json::from_str::<InteractionPayload>(&payload_json) else {
        warn!("unparseable interaction payload");
        return error_response(StatusCode::BAD_REQUEST, "Invalid payload");
    };

    debug!(kind = %payload.kind, "interaction received");

    match payload.kind.as_str() {
        "interactive_message" => {
            interactions::handle_button_click(&payload, &state).await;
            // Empty 200; any body here would be echoed into the channel.
            StatusCode::OK.into_response()
        }
        "view_submission" => {
            // The modal stays open unless the acknowledgement is fast and
            // empty, so the work itself goes to the background queue.
            interactions::handle_view_submission(&payload, &state);
            StatusCode::OK.into_response()
        }
        // Operator dismissed the modal; the flow simply ends.
        "view_closed" => ok_response(),
        _ => ok_response(),
    }
}

/// Shared freshness + signature gate.
///
/// Staleness maps to 400, a signature mismatch to 403; missing headers
/// fall into whichever gate they fail first.
fn verify_request(
    state: &AppState,
    headers: &HeaderMap,
    body: &str,
) -> std::result::Result<(), Response> {
    let timestamp = header_str(headers, TIMESTAMP_HEADER);
    let signature = header_str(headers, SIGNATURE_HEADER);

    if !state.verifier.is_fresh(timestamp) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Request timestamp too old",
        ));
    }

    if !state.verifier.signature_matches(body, timestamp, signature) {
        return Err(error_response(StatusCode::FORBIDDEN, "Invalid signature"));
    }

    Ok(())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

fn ok_response() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
