//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Slack Web API failure.
    Slack(String),
    /// Asana REST API failure.
    Asana(String),
    /// Commitment classifier provider failure.
    Classifier(String),
    /// Task submission queue is full or closed.
    Queue(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Slack(msg) => write!(f, "slack: {msg}"),
            Self::Asana(msg) => write!(f, "asana: {msg}"),
            Self::Classifier(msg) => write!(f, "classifier: {msg}"),
            Self::Queue(msg) => write!(f, "queue: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}
