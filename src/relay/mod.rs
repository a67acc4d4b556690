//! Interactive flow orchestration.
//!
//! Drives the multi-step human-in-the-loop flow: a message event passes
//! the cheap mention pre-filter, the classifier judges it, a confirmation
//! prompt is posted in-thread, the button click opens a pre-populated
//! form, and the form submission hands a [`TaskSubmission`] to the
//! background worker.

pub mod events;
pub mod interactions;
pub mod worker;

use std::sync::Arc;

use crate::asana::client::TaskTracker;
use crate::classifier::Classifier;
use crate::config::GlobalConfig;
use crate::dedup::EventCache;
use crate::signature::SignatureVerifier;
use crate::slack::client::SlackApi;

pub use worker::TaskWorker;

/// A fully resolved form submission, consumed exactly once by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSubmission {
    /// Channel the confirmation is posted in.
    pub channel: String,
    /// Thread the confirmation is posted in.
    pub thread_ts: String,
    /// Slack user picked as assignee.
    pub assignee_user_id: String,
    /// Due date as picked in the form, if any.
    pub due_date: Option<String>,
    /// Task title.
    pub title: String,
    /// Task description, if any.
    pub description: Option<String>,
    /// Subtask names, one per non-empty form line, in order.
    pub subtasks: Vec<String>,
    /// Project picked in the form; resolved via the channel map when absent.
    pub project_id: Option<String>,
}

/// Shared application state accessible by all request handlers.
pub struct AppState {
    /// Global configuration.
    pub config: Arc<GlobalConfig>,
    /// Inbound request signature verifier.
    pub verifier: SignatureVerifier,
    /// Processed event-id cache.
    pub dedup: EventCache,
    /// Commitment classifier (provider fixed at startup).
    pub classifier: Arc<dyn Classifier>,
    /// Slack Web API client.
    pub slack: Arc<dyn SlackApi>,
    /// Task-tracking client.
    pub tracker: Arc<dyn TaskTracker>,
    /// Background task-creation queue.
    pub worker: TaskWorker,
}
