//! Inbound Slack payload types.
//!
//! Covers the two webhook bodies: the Events API envelope and the
//! interactivity payload (button clicks, modal closure, modal submission).
//! Every field the relay does not read is left out; serde ignores the
//! rest of Slack's payload.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::classifier::CommitmentJudgement;

/// Events API delivery envelope.
///
/// Either a one-time `url_verification` challenge or an `event_callback`
/// wrapping the actual event.
#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    /// Envelope type; absent on some administrative deliveries.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Challenge string to echo during endpoint registration.
    #[serde(default)]
    pub challenge: Option<String>,
    /// Unique delivery id used for deduplication.
    #[serde(default)]
    pub event_id: Option<String>,
    /// The wrapped event, when present.
    #[serde(default)]
    pub event: Option<MessageEvent>,
}

/// A channel event. Fields all default so that non-message event shapes
/// deserialize too; the relay filters on `kind` afterwards.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageEvent {
    /// Event type, e.g. `message`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Channel the event happened in.
    #[serde(default)]
    pub channel: String,
    /// Message text.
    #[serde(default)]
    pub text: String,
    /// Message timestamp.
    #[serde(default)]
    pub ts: String,
    /// Parent thread timestamp when the message is a reply.
    #[serde(default)]
    pub thread_ts: Option<String>,
    /// Present when the message was authored by a bot.
    #[serde(default)]
    pub bot_id: Option<String>,
}

impl MessageEvent {
    /// Timestamp anchoring the thread replies should go to: the parent
    /// thread when replying, otherwise the message itself.
    #[must_use]
    pub fn thread_root(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }
}

/// Interactivity callback payload, dispatched on `kind`.
#[derive(Debug, Deserialize)]
pub struct InteractionPayload {
    /// Payload type: `interactive_message`, `view_closed`, or
    /// `view_submission`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Legacy attachment actions (button clicks).
    #[serde(default)]
    pub actions: Vec<LegacyAction>,
    /// Channel the interactive message lives in.
    #[serde(default)]
    pub channel: Option<ChannelRef>,
    /// Short-lived id required to open a modal.
    #[serde(default)]
    pub trigger_id: Option<String>,
    /// Modal view, on `view_closed` / `view_submission`.
    #[serde(default)]
    pub view: Option<ViewPayload>,
}

/// A clicked legacy attachment action.
#[derive(Debug, Deserialize)]
pub struct LegacyAction {
    /// Action name as posted in the attachment.
    pub name: String,
    /// Round-tripped action value.
    #[serde(default)]
    pub value: Option<String>,
}

/// Channel reference inside an interaction payload.
#[derive(Debug, Deserialize)]
pub struct ChannelRef {
    /// Channel id.
    pub id: String,
}

/// Modal view carried by `view_closed` / `view_submission` payloads.
#[derive(Debug, Deserialize)]
pub struct ViewPayload {
    /// View callback id.
    #[serde(default)]
    pub callback_id: String,
    /// Round-tripped metadata string set when the view was opened.
    #[serde(default)]
    pub private_metadata: String,
    /// Form state.
    #[serde(default)]
    pub state: ViewStateValues,
}

/// `view.state.values`: block id, then action id, then element value.
#[derive(Debug, Default, Deserialize)]
pub struct ViewStateValues {
    /// Submitted element values.
    #[serde(default)]
    pub values: HashMap<String, HashMap<String, ElementValue>>,
}

impl ViewStateValues {
    fn element(&self, block_id: &str, action_id: &str) -> Option<&ElementValue> {
        self.values.get(block_id)?.get(action_id)
    }

    /// Text typed into a plain-text input, when non-empty.
    #[must_use]
    pub fn input_value(&self, block_id: &str, action_id: &str) -> Option<&str> {
        self.element(block_id, action_id)?
            .value
            .as_deref()
            .filter(|value| !value.is_empty())
    }

    /// User picked in a user select.
    #[must_use]
    pub fn selected_user(&self, block_id: &str, action_id: &str) -> Option<&str> {
        self.element(block_id, action_id)?.selected_user.as_deref()
    }

    /// Date picked in a date picker.
    #[must_use]
    pub fn selected_date(&self, block_id: &str, action_id: &str) -> Option<&str> {
        self.element(block_id, action_id)?.selected_date.as_deref()
    }

    /// Value of the option picked in a static select.
    #[must_use]
    pub fn selected_option_value(&self, block_id: &str, action_id: &str) -> Option<&str> {
        self.element(block_id, action_id)?
            .selected_option
            .as_ref()
            .map(|option| option.value.as_str())
    }
}

/// One submitted form element. Slack varies the shape per element type,
/// so every variant field is optional and the accessors above pick the
/// right one.
#[derive(Debug, Default, Deserialize)]
pub struct ElementValue {
    /// `plain_text_input` value.
    #[serde(default)]
    pub value: Option<String>,
    /// `users_select` selection.
    #[serde(default)]
    pub selected_user: Option<String>,
    /// `datepicker` selection.
    #[serde(default)]
    pub selected_date: Option<String>,
    /// `static_select` selection.
    #[serde(default)]
    pub selected_option: Option<SelectedOption>,
}

/// A static-select option as submitted.
#[derive(Debug, Default, Deserialize)]
pub struct SelectedOption {
    /// Option value.
    #[serde(default)]
    pub value: String,
}

/// State round-tripped through the confirmation button's `value`.
///
/// Carrying the flow state in the payload itself keeps the server
/// stateless between the prompt and the click; the interaction endpoint's
/// signature check is what makes the round-tripped value trustworthy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingInteraction {
    /// Text of the message the judgement was made on.
    #[serde(rename = "original_message")]
    pub original_text: String,
    /// Thread the prompt was posted in.
    pub thread_ts: String,
    /// Timestamp of the originating message.
    #[serde(default)]
    pub message_ts: Option<String>,
    /// The classifier's judgement, carried as-is.
    #[serde(rename = "commitment_data")]
    pub judgement: CommitmentJudgement,
}

/// Metadata round-tripped through the modal's `private_metadata`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModalMetadata {
    /// Channel the confirmation will be posted in.
    pub channel: String,
    /// Thread the confirmation will be posted in.
    pub thread_ts: String,
}

/// Extract the interaction payload JSON from a request body.
///
/// Modern interactivity deliveries are form-encoded with a `payload`
/// field (spaces arrive as `+`, which `urlencoding` does not translate);
/// legacy deliveries are the bare JSON object.
#[must_use]
pub fn extract_payload(body: &str) -> Option<String> {
    for pair in body.split('&') {
        if let Some(value) = pair.strip_prefix("payload=") {
            let value = value.replace('+', "%20");
            return urlencoding::decode(&value).ok().map(|s| s.into_owned());
        }
    }
    // JSON body fallback for legacy interactive-message deliveries.
    let trimmed = body.trim_start();
    trimmed.starts_with('{').then(|| body.to_owned())
}
