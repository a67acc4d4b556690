//! Slack Web API client.
//!
//! Drives the three methods the relay needs: `chat.postMessage`,
//! `views.open`, and `users.info`. Slack reports method failures as
//! HTTP 200 with `ok: false`, so every response is checked for the `ok`
//! flag and the `error` field is surfaced as [`AppError::Slack`].

use std::future::Future;
use std::pin::Pin;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::{AppError, Result};

const API_BASE: &str = "https://slack.com/api";

/// Profile fields resolved for a Slack user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlackUserProfile {
    /// Display name, when set.
    pub real_name: Option<String>,
    /// Workspace email, when visible to the bot.
    pub email: Option<String>,
}

/// Interface between the relay and the Slack Web API.
///
/// Exists so handlers and the background worker can be exercised against
/// a recording stub; [`SlackWebClient`] is the production implementation.
pub trait SlackApi: Send + Sync {
    /// Post a message, optionally threaded and with legacy attachments.
    /// Returns the posted message's timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Slack`] on transport failure or `ok: false`.
    fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
        attachments: Option<Vec<Value>>,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>>;

    /// Open a modal view against a short-lived trigger id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Slack`] on transport failure or `ok: false`.
    fn open_view(
        &self,
        trigger_id: &str,
        view: Value,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Fetch a user's display name and email.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Slack`] on transport failure or `ok: false`.
    fn user_info(
        &self,
        user_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<SlackUserProfile>> + Send + '_>>;
}

/// Web API implementation of [`SlackApi`] authenticated with a bot token.
#[derive(Clone)]
pub struct SlackWebClient {
    client: reqwest::Client,
}

impl SlackWebClient {
    /// Create a client authenticated with the given bot token.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the token is not a valid header value
    /// or the HTTP client cannot be built.
    pub fn new(bot_token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {bot_token}"))
                .map_err(|err| AppError::Slack(format!("invalid bot token: {err}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| AppError::Slack(format!("failed to build http client: {err}")))?;

        Ok(Self { client })
    }

    async fn call(&self, method: &str, body: &Value) -> Result<Value> {
        let request = self.client.post(format!("{API_BASE}/{method}")).json(body);
        Self::dispatch(method, request).await
    }

    /// `users.info` and friends take query parameters, not a JSON body.
    async fn call_get(&self, method: &str, query: &[(&str, &str)]) -> Result<Value> {
        let request = self.client.get(format!("{API_BASE}/{method}")).query(query);
        Self::dispatch(method, request).await
    }

    async fn dispatch(method: &str, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|err| AppError::Slack(format!("{method} request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Slack(format!("{method} failed ({status}): {body}")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| AppError::Slack(format!("{method} returned invalid json: {err}")))?;

        if payload.get("ok").and_then(Value::as_bool) != Some(true) {
            let error = payload
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            return Err(AppError::Slack(format!("{method} returned error: {error}")));
        }

        debug!(method, "slack api call ok");
        Ok(payload)
    }
}

impl SlackApi for SlackWebClient {
    fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
        attachments: Option<Vec<Value>>,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        let mut body = json!({
            "channel": channel,
            "text": text,
            "link_names": true,
        });
        if let Some(ts) = thread_ts {
            body["thread_ts"] = json!(ts);
        }
        if let Some(attachments) = attachments {
            body["attachments"] = json!(attachments);
        }

        Box::pin(async move {
            let payload = self.call("chat.postMessage", &body).await?;
            Ok(payload
                .get("ts")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned())
        })
    }

    fn open_view(
        &self,
        trigger_id: &str,
        view: Value,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let body = json!({
            "trigger_id": trigger_id,
            "view": view,
        });

        Box::pin(async move {
            self.call("views.open", &body).await?;
            Ok(())
        })
    }

    fn user_info(
        &self,
        user_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<SlackUserProfile>> + Send + '_>> {
        let user_id = user_id.to_owned();

        Box::pin(async move {
            let payload = self
                .call_get("users.info", &[("user", user_id.as_str())])
                .await?;
            let user: UserInfo = serde_json::from_value(
                payload.get("user").cloned().unwrap_or(Value::Null),
            )
            .map_err(|err| AppError::Slack(format!("users.info returned invalid user: {err}")))?;

            Ok(SlackUserProfile {
                real_name: user.real_name.or(user.name),
                email: user.profile.and_then(|profile| profile.email),
            })
        })
    }
}

/// `users.info` user object, trimmed to the fields the relay reads.
#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    profile: Option<UserInfoProfile>,
}

#[derive(Debug, Deserialize)]
struct UserInfoProfile {
    #[serde(default)]
    email: Option<String>,
}
