//! Anthropic messages-API classifier.

use std::future::Future;
use std::pin::Pin;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{extract_judgement, instruction_prompt, Classifier, CommitmentJudgement};
use crate::{AppError, Result};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-opus-20240229";
const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f32 = 0.1;

/// Commitment classifier backed by the Anthropic messages API.
#[derive(Clone)]
pub struct AnthropicClassifier {
    client: reqwest::Client,
    model: String,
}

impl AnthropicClassifier {
    /// Create a classifier with the given API key and optional model
    /// override.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Classifier` if the key is not a valid header
    /// value or the HTTP client cannot be built.
    pub fn new(api_key: &str, model: Option<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|err| AppError::Classifier(format!("invalid api key: {err}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| AppError::Classifier(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
        })
    }

    async fn evaluate_inner(&self, text: &str) -> Result<Option<CommitmentJudgement>> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            messages: vec![Message {
                role: "user".to_owned(),
                content: format!(
                    "{}\n\nIMPORTANTE: Responde SOLO con el JSON solicitado, sin texto adicional.",
                    instruction_prompt(text)
                ),
            }],
        };

        let response = self
            .client
            .post(API_URL)
            .json(&request)
            .send()
            .await
            .map_err(|err| AppError::Classifier(format!("anthropic request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Classifier(format!(
                "anthropic api error ({status}): {body}"
            )));
        }

        let response: MessagesResponse = response
            .json()
            .await
            .map_err(|err| AppError::Classifier(format!("invalid anthropic response: {err}")))?;

        let content = response
            .content
            .into_iter()
            .map(|block| match block {
                ContentBlock::Text { text } => text,
            })
            .next()
            .unwrap_or_default();

        debug!(content_len = content.len(), "anthropic classifier response");
        Ok(extract_judgement(&content))
    }
}

impl Classifier for AnthropicClassifier {
    fn evaluate(
        &self,
        text: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<CommitmentJudgement>>> + Send + '_>> {
        let text = text.to_owned();
        Box::pin(async move { self.evaluate_inner(&text).await })
    }
}

/// Request body for the messages API.
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

/// A message in the request.
#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// Response from the messages API.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

/// Content block in the response.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
}
