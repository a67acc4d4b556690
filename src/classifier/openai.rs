//! OpenAI chat-completions classifier.

use std::future::Future;
use std::pin::Pin;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{extract_judgement, instruction_prompt, Classifier, CommitmentJudgement};
use crate::{AppError, Result};

const API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const TEMPERATURE: f32 = 0.1;

const SYSTEM_PROMPT: &str = "Eres un asistente que evalúa si los mensajes contienen \
                             compromisos de trabajo. Responde solo con JSON válido.";

/// Commitment classifier backed by the OpenAI chat-completions API.
#[derive(Clone)]
pub struct OpenAiClassifier {
    client: reqwest::Client,
    model: String,
}

impl OpenAiClassifier {
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
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|err| AppError::Classifier(format!("invalid api key: {err}")))?,
        );

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
        let request = CompletionsRequest {
            model: self.model.clone(),
            temperature: TEMPERATURE,
            messages: vec![
                Message {
                    role: "system".to_owned(),
                    content: SYSTEM_PROMPT.to_owned(),
                },
                Message {
                    role: "user".to_owned(),
                    content: instruction_prompt(text),
                },
            ],
        };

        let response = self
            .client
            .post(API_URL)
            .json(&request)
            .send()
            .await
            .map_err(|err| AppError::Classifier(format!("openai request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Classifier(format!(
                "openai api error ({status}): {body}"
            )));
        }

        let response: CompletionsResponse = response
            .json()
            .await
            .map_err(|err| AppError::Classifier(format!("invalid openai response: {err}")))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        debug!(content_len = content.len(), "openai classifier response");
        Ok(extract_judgement(&content))
    }
}

impl Classifier for OpenAiClassifier {
    fn evaluate(
        &self,
        text: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<CommitmentJudgement>>> + Send + '_>> {
        let text = text.to_owned();
        Box::pin(async move { self.evaluate_inner(&text).await })
    }
}

/// Request body for chat completions.
#[derive(Debug, Serialize)]
struct CompletionsRequest {
    model: String,
    temperature: f32,
    messages: Vec<Message>,
}

/// A chat message in the request.
#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// Response from chat completions.
#[derive(Debug, Deserialize)]
struct CompletionsResponse {
    choices: Vec<Choice>,
}

/// A completion choice.
#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

/// The assistant message inside a choice.
#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}
