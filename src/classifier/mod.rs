//! Commitment classification boundary.
//!
//! A classifier takes free message text and returns a structured judgement
//! of whether it encodes a work commitment. Two interchangeable LLM
//! providers implement the same contract; which one runs is fixed by
//! configuration at startup, never by runtime credential sniffing.

pub mod anthropic;
pub mod openai;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{ClassifierConfig, ClassifierProvider};
use crate::Result;

pub use anthropic::AnthropicClassifier;
pub use openai::OpenAiClassifier;

/// Structured judgement returned by the classifier.
///
/// The wire field names are the Spanish contract the providers are prompted
/// to produce; they round-trip unchanged through the confirmation button
/// payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitmentJudgement {
    /// Whether the message encodes a work commitment.
    #[serde(rename = "es_compromiso")]
    pub is_commitment: bool,
    /// Name or user id the commitment appears assigned to.
    #[serde(rename = "asignado_a", default)]
    pub assignee_hint: String,
    /// Short task description extracted from the message.
    #[serde(rename = "descripcion", default)]
    pub description: String,
    /// Due date as written in the message, if any.
    #[serde(rename = "fecha_limite", default)]
    pub due_date: Option<String>,
}

/// Interface between the relay and an LLM provider.
///
/// Implementations perform one synchronous provider round trip per call.
/// A provider error is an `Err`; a response that cannot be parsed into a
/// judgement is `Ok(None)`. Callers treat both as "not a commitment" and
/// end the flow silently.
pub trait Classifier: Send + Sync {
    /// Evaluate whether `text` encodes a work commitment.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Classifier`](crate::AppError::Classifier) when
    /// the provider call fails.
    fn evaluate(
        &self,
        text: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<CommitmentJudgement>>> + Send + '_>>;
}

/// Build the configured classifier implementation.
///
/// # Errors
///
/// Returns `AppError::Classifier` if the provider HTTP client cannot be
/// constructed (e.g. the API key is not a valid header value).
pub fn from_config(config: &ClassifierConfig) -> Result<Arc<dyn Classifier>> {
    match config.provider {
        ClassifierProvider::Openai => Ok(Arc::new(OpenAiClassifier::new(
            &config.api_key,
            config.model.clone(),
        )?)),
        ClassifierProvider::Anthropic => Ok(Arc::new(AnthropicClassifier::new(
            &config.api_key,
            config.model.clone(),
        )?)),
    }
}

/// Fixed instruction template both providers receive.
#[must_use]
pub fn instruction_prompt(message_text: &str) -> String {
    format!(
        "Este mensaje de Slack podría implicar un compromiso de trabajo. \
         Si lo es, devolvé un JSON con este formato:\n\
         {{\n\
         \x20\x20\"es_compromiso\": true|false,\n\
         \x20\x20\"asignado_a\": \"nombre o ID de usuario\",\n\
         \x20\x20\"descripcion\": \"tarea\",\n\
         \x20\x20\"fecha_limite\": \"fecha o null\"\n\
         }}\n\n\
         Mensaje: {message_text}"
    )
}

/// Best-effort extraction of a judgement from provider output.
///
/// Tries the whole content as JSON first, then the outermost `{...}`
/// substring when the model wrapped the object in prose. Returns `None`
/// when neither parses.
#[must_use]
pub fn extract_judgement(content: &str) -> Option<CommitmentJudgement> {
    if let Ok(judgement) = serde_json::from_str(content) {
        return Some(judgement);
    }
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&content[start..=end]).ok()
}
