//! Global configuration parsing, validation, and credential loading.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Keyring service name under which credentials are stored.
const KEYRING_SERVICE: &str = "tracker-bot";

/// Nested Slack configuration.
///
/// The signing secret and bot token are loaded at runtime via OS keychain
/// or environment variables, never from the TOML config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SlackConfig {
    /// Shared secret used to verify inbound webhook signatures
    /// (populated at runtime).
    #[serde(skip)]
    pub signing_secret: String,
    /// Bot user token used for Web API calls (populated at runtime).
    #[serde(skip)]
    pub bot_token: String,
}

/// Which LLM provider evaluates candidate messages.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierProvider {
    /// OpenAI chat completions.
    Openai,
    /// Anthropic messages API.
    Anthropic,
}

/// Commitment classifier configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ClassifierConfig {
    /// Provider selected at startup; there is no runtime fallback between
    /// providers.
    pub provider: ClassifierProvider,
    /// Optional model override; each provider has its own default.
    #[serde(default)]
    pub model: Option<String>,
    /// Provider API key (populated at runtime).
    #[serde(skip)]
    pub api_key: String,
}

/// A project offered in the task form's project selector.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ProjectOption {
    /// Asana project gid.
    pub gid: String,
    /// Human-readable name shown in the selector.
    pub name: String,
}

/// Asana connectivity and project routing configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AsanaConfig {
    /// Personal access token (populated at runtime).
    #[serde(skip)]
    pub pat: String,
    /// Project used when a channel has no mapping and the form carries none.
    pub default_project: String,
    /// Slack channel id → Asana project gid routing map.
    #[serde(default)]
    pub channel_projects: HashMap<String, String>,
    /// Projects offered in the task form's selector.
    pub projects: Vec<ProjectOption>,
}

fn default_http_port() -> u16 {
    3000
}

fn default_dedup_capacity() -> usize {
    1000
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// HTTP port the webhook endpoints listen on.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Event-id cache bound; the cache is cleared in full once exceeded.
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
    /// Slack connectivity settings.
    #[serde(default)]
    pub slack: SlackConfig,
    /// Classifier provider selection.
    pub classifier: ClassifierConfig,
    /// Asana connectivity and project routing.
    pub asana: AsanaConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load credentials from OS keychain with env-var fallback.
    ///
    /// Tries the `tracker-bot` keyring service first, then falls back to
    /// `SLACK_SIGNING_SECRET` / `SLACK_BOT_TOKEN` / `ASANA_PAT` and the
    /// provider-specific API key environment variable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither keychain nor env vars provide
    /// a required credential.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.slack.signing_secret =
            load_credential("slack_signing_secret", "SLACK_SIGNING_SECRET").await?;
        self.slack.bot_token = load_credential("slack_bot_token", "SLACK_BOT_TOKEN").await?;
        self.asana.pat = load_credential("asana_pat", "ASANA_PAT").await?;
        self.classifier.api_key = match self.classifier.provider {
            ClassifierProvider::Openai => {
                load_credential("openai_api_key", "OPENAI_API_KEY").await?
            }
            ClassifierProvider::Anthropic => {
                load_credential("anthropic_api_key", "ANTHROPIC_API_KEY").await?
            }
        };
        Ok(())
    }

    /// Resolve the Asana project for a Slack channel.
    ///
    /// Falls back to `default_project` when the channel has no mapping.
    #[must_use]
    pub fn project_for_channel(&self, channel: &str) -> &str {
        self.asana
            .channel_projects
            .get(channel)
            .map_or(&self.asana.default_project, String::as_str)
    }

    fn validate(&self) -> Result<()> {
        if self.dedup_capacity == 0 {
            return Err(AppError::Config(
                "dedup_capacity must be greater than zero".into(),
            ));
        }

        if self.asana.default_project.is_empty() {
            return Err(AppError::Config(
                "asana.default_project must not be empty".into(),
            ));
        }

        if self.asana.projects.is_empty() {
            return Err(AppError::Config(
                "asana.projects must list at least one project".into(),
            ));
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // Try OS keychain first via spawn_blocking (keyring is synchronous I/O).
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    // Fallback to environment variable.
    env::var(env_key).map_err(|_| {
        AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))
    })
}
