//! Slack message and modal builders.
//!
//! Builds the confirmation prompt (a legacy attachment with one button
//! whose `value` round-trips the flow state) and the task form modal.
//! The block and action identifiers here are the fixed contract the
//! submission handler extracts values by.

use serde_json::{json, Value};

use crate::asana::dates::normalize_due_date;
use crate::config::ProjectOption;
use crate::slack::payloads::{ModalMetadata, PendingInteraction};
use crate::{AppError, Result};

/// Action name carried by the confirmation button.
pub const ACTION_CREATE_TASK: &str = "create_asana_task";
/// Callback id of the task form modal.
pub const CALLBACK_TASK_MODAL: &str = "create_asana_task_modal";

/// Block id of the assignee selector.
pub const BLOCK_ASSIGNEE: &str = "assignee_block";
/// Action id of the assignee selector.
pub const ACTION_ASSIGNEE: &str = "assignee_select";
/// Block id of the due-date picker.
pub const BLOCK_DUE_DATE: &str = "due_date_block";
/// Action id of the due-date picker.
pub const ACTION_DUE_DATE: &str = "due_date_picker";
/// Block id of the title input.
pub const BLOCK_TITLE: &str = "title_block";
/// Action id of the title input.
pub const ACTION_TITLE: &str = "title_input";
/// Block id of the description input.
pub const BLOCK_DESCRIPTION: &str = "description_block";
/// Action id of the description input.
pub const ACTION_DESCRIPTION: &str = "description_input";
/// Block id of the subtasks input.
pub const BLOCK_SUBTASKS: &str = "subtasks_block";
/// Action id of the subtasks input.
pub const ACTION_SUBTASKS: &str = "subtasks_input";
/// Block id of the project selector.
pub const BLOCK_PROJECT: &str = "project_block";
/// Action id of the project selector.
pub const ACTION_PROJECT: &str = "project_select";

/// Text body of the confirmation prompt message.
#[must_use]
pub fn prompt_text(pending: &PendingInteraction) -> String {
    let judgement = &pending.judgement;
    let mut text = format!(
        "\u{1f916} Posible compromiso detectado: *{}*",
        judgement.description
    );
    if !judgement.assignee_hint.is_empty() {
        text.push_str(&format!("\nAsignado a: {}", judgement.assignee_hint));
    }
    if let Some(ref due) = judgement.due_date {
        text.push_str(&format!("\nFecha límite: {due}"));
    }
    text
}

/// Legacy attachment carrying the confirmation button.
///
/// The button `value` is the serialized [`PendingInteraction`], so the
/// click callback can reconstruct the flow without server-side storage.
///
/// # Errors
///
/// Returns `AppError::Slack` if the pending state cannot be serialized.
pub fn prompt_attachment(pending: &PendingInteraction) -> Result<Value> {
    let value = serde_json::to_string(pending)
        .map_err(|err| AppError::Slack(format!("failed to serialize button state: {err}")))?;
    Ok(json!({
        "fallback": "Crear tarea en Asana",
        "callback_id": "commitment_prompt",
        "color": "#36a64f",
        "actions": [{
            "name": ACTION_CREATE_TASK,
            "text": "Crear tarea en Asana",
            "type": "button",
            "style": "primary",
            "value": value,
        }]
    }))
}

/// Task form modal, pre-populated from the classifier's judgement.
///
/// The assignee selector is pre-selected only when the hint contains a
/// Slack user id; the date picker only when the hinted date normalizes.
/// `private_metadata` carries the channel and thread the confirmation
/// must be posted back to.
///
/// # Errors
///
/// Returns `AppError::Slack` if the modal metadata cannot be serialized.
pub fn task_modal(
    pending: &PendingInteraction,
    channel: &str,
    projects: &[ProjectOption],
    preselected_project: Option<&str>,
) -> Result<Value> {
    let metadata = serde_json::to_string(&ModalMetadata {
        channel: channel.to_owned(),
        thread_ts: pending.thread_ts.clone(),
    })
    .map_err(|err| AppError::Slack(format!("failed to serialize modal metadata: {err}")))?;

    let judgement = &pending.judgement;

    let mut assignee_element = json!({
        "type": "users_select",
        "action_id": ACTION_ASSIGNEE,
        "placeholder": plain_text("Seleccionar persona"),
    });
    if let Some(user_id) = initial_user_from_hint(&judgement.assignee_hint) {
        assignee_element["initial_user"] = json!(user_id);
    }

    let mut due_date_element = json!({
        "type": "datepicker",
        "action_id": ACTION_DUE_DATE,
        "placeholder": plain_text("Seleccionar fecha"),
    });
    if let Some(due) = judgement.due_date.as_deref().and_then(normalize_due_date) {
        due_date_element["initial_date"] = json!(due);
    }

    let mut title_element = json!({
        "type": "plain_text_input",
        "action_id": ACTION_TITLE,
        "placeholder": plain_text("Título de la tarea"),
    });
    if !judgement.description.is_empty() {
        title_element["initial_value"] = json!(judgement.description);
    }

    let mut description_element = json!({
        "type": "plain_text_input",
        "action_id": ACTION_DESCRIPTION,
        "multiline": true,
        "placeholder": plain_text("Descripción"),
    });
    if !pending.original_text.is_empty() {
        description_element["initial_value"] = json!(pending.original_text);
    }

    let options: Vec<Value> = projects.iter().map(project_option).collect();
    let mut project_element = json!({
        "type": "static_select",
        "action_id": ACTION_PROJECT,
        "placeholder": plain_text("Seleccionar proyecto"),
        "options": options,
    });
    if let Some(selected) = preselected_project
        .and_then(|gid| projects.iter().find(|project| project.gid == gid))
    {
        project_element["initial_option"] = project_option(selected);
    }

    Ok(json!({
        "type": "modal",
        "callback_id": CALLBACK_TASK_MODAL,
        "notify_on_close": true,
        "private_metadata": metadata,
        "title": plain_text("Crear tarea en Asana"),
        "submit": plain_text("Crear"),
        "close": plain_text("Cancelar"),
        "blocks": [
            {
                "type": "input",
                "block_id": BLOCK_TITLE,
                "label": plain_text("Título"),
                "element": title_element,
            },
            {
                "type": "input",
                "block_id": BLOCK_ASSIGNEE,
                "label": plain_text("Asignar a"),
                "element": assignee_element,
            },
            {
                "type": "input",
                "block_id": BLOCK_PROJECT,
                "label": plain_text("Proyecto"),
                "element": project_element,
            },
            {
                "type": "input",
                "block_id": BLOCK_DUE_DATE,
                "optional": true,
                "label": plain_text("Fecha límite"),
                "element": due_date_element,
            },
            {
                "type": "input",
                "block_id": BLOCK_DESCRIPTION,
                "optional": true,
                "label": plain_text("Descripción"),
                "element": description_element,
            },
            {
                "type": "input",
                "block_id": BLOCK_SUBTASKS,
                "optional": true,
                "label": plain_text("Subtareas (una por línea)"),
                "element": {
                    "type": "plain_text_input",
                    "action_id": ACTION_SUBTASKS,
                    "multiline": true,
                    "placeholder": plain_text("Una subtarea por línea"),
                },
            },
        ],
    }))
}

/// Extract a Slack user id from a classifier assignee hint.
///
/// Accepts a mention token (`<@U123ABC>` with or without the `|name`
/// suffix) or a bare id (`U…`/`W…`, uppercase alphanumeric). Free-form
/// names yield `None` and the selector is left empty for the operator.
#[must_use]
pub fn initial_user_from_hint(hint: &str) -> Option<String> {
    let trimmed = hint.trim();

    if let Some(start) = trimmed.find("<@") {
        let rest = &trimmed[start + 2..];
        let end = rest.find(['>', '|'])?;
        let id = &rest[..end];
        return looks_like_user_id(id).then(|| id.to_owned());
    }

    looks_like_user_id(trimmed).then(|| trimmed.to_owned())
}

fn looks_like_user_id(candidate: &str) -> bool {
    (candidate.starts_with('U') || candidate.starts_with('W'))
        && candidate.len() >= 9
        && candidate
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
}

fn plain_text(text: &str) -> Value {
    json!({ "type": "plain_text", "text": text })
}

fn project_option(project: &ProjectOption) -> Value {
    json!({
        "text": plain_text(&project.name),
        "value": project.gid,
    })
}
