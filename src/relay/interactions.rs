//! Interactivity half of the interactive flow.
//!
//! Handles the confirmation button click (opens the task form modal),
//! modal dismissal (no-op), and form submission (hands the resolved
//! [`TaskSubmission`] to the background worker). Every handler swallows
//! its own failures after logging: the HTTP layer acknowledges Slack
//! regardless of internal outcome.

use tracing::{debug, info, warn};

use crate::slack::blocks;
use crate::slack::payloads::{InteractionPayload, ModalMetadata, PendingInteraction};

use super::{AppState, TaskSubmission};

/// Handle a confirmation button click: reconstruct the pending flow from
/// the round-tripped action value and open the task form modal.
pub async fn handle_button_click(payload: &InteractionPayload, state: &AppState) {
    let Some(action) = payload
        .actions
        .iter()
        .find(|action| action.name == blocks::ACTION_CREATE_TASK)
    else {
        debug!("interactive message without a task-creation action; ignoring");
        return;
    };

    let Some(pending) = action
        .value
        .as_deref()
        .and_then(|value| serde_json::from_str::<PendingInteraction>(value).ok())
    else {
        warn!("button value did not round-trip pending state; ignoring click");
        return;
    };

    let Some(channel) = payload.channel.as_ref().map(|channel| channel.id.clone()) else {
        warn!("button click without channel; ignoring");
        return;
    };

    let Some(trigger_id) = payload.trigger_id.as_deref() else {
        warn!("button click without trigger_id; cannot open modal");
        return;
    };

    let preselected = state.config.asana.channel_projects.get(&channel);
    let modal = match blocks::task_modal(
        &pending,
        &channel,
        &state.config.asana.projects,
        preselected.map(String::as_str),
    ) {
        Ok(modal) => modal,
        Err(err) => {
            warn!(%err, "failed to build task modal");
            return;
        }
    };

    match state.slack.open_view(trigger_id, modal).await {
        Ok(()) => info!(channel, "task form modal opened"),
        Err(err) => warn!(%err, channel, "failed to open task form modal"),
    }
}

/// Handle a form submission: extract the field values by their fixed
/// block/action identifiers and enqueue the background unit of work.
///
/// Returns immediately after the enqueue acknowledgement so the modal
/// closes without waiting on any third-party API.
pub fn handle_view_submission(payload: &InteractionPayload, state: &AppState) {
    let Some(view) = payload.view.as_ref() else {
        warn!("view submission without view; ignoring");
        return;
    };

    if view.callback_id != blocks::CALLBACK_TASK_MODAL {
        debug!(callback_id = %view.callback_id, "unrelated view submission; ignoring");
        return;
    }

    let Ok(metadata) = serde_json::from_str::<ModalMetadata>(&view.private_metadata) else {
        warn!("modal metadata did not round-trip; dropping submission");
        return;
    };

    let values = &view.state;

    let Some(title) = values.input_value(blocks::BLOCK_TITLE, blocks::ACTION_TITLE) else {
        warn!("submission without a title; dropping");
        return;
    };

    let Some(assignee) = values.selected_user(blocks::BLOCK_ASSIGNEE, blocks::ACTION_ASSIGNEE)
    else {
        warn!("submission without an assignee; dropping");
        return;
    };

    let subtasks: Vec<String> = values
        .input_value(blocks::BLOCK_SUBTASKS, blocks::ACTION_SUBTASKS)
        .map(|raw| {
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    let submission = TaskSubmission {
        channel: metadata.channel,
        thread_ts: metadata.thread_ts,
        assignee_user_id: assignee.to_owned(),
        due_date: values
            .selected_date(blocks::BLOCK_DUE_DATE, blocks::ACTION_DUE_DATE)
            .map(str::to_owned),
        title: title.to_owned(),
        description: values
            .input_value(blocks::BLOCK_DESCRIPTION, blocks::ACTION_DESCRIPTION)
            .map(str::to_owned),
        subtasks,
        project_id: values
            .selected_option_value(blocks::BLOCK_PROJECT, blocks::ACTION_PROJECT)
            .map(str::to_owned),
    };

    match state.worker.submit(submission) {
        Ok(()) => info!("task submission accepted"),
        Err(err) => warn!(%err, "task submission rejected"),
    }
}
