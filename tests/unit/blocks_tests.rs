//! Unit tests for the prompt attachment and task modal builders.
//!
//! The confirmation button must round-trip the flow state verbatim, and
//! the modal must carry the fixed block/action identifiers the submission
//! handler extracts values by.

use tracker_bot::classifier::CommitmentJudgement;
use tracker_bot::config::ProjectOption;
use tracker_bot::slack::blocks::{self, initial_user_from_hint};
use tracker_bot::slack::payloads::{ModalMetadata, PendingInteraction};

fn sample_pending() -> PendingInteraction {
    PendingInteraction {
        original_text: "@ana prepara el informe para el viernes".to_owned(),
        thread_ts: "1714000000.000100".to_owned(),
        message_ts: Some("1714000000.000100".to_owned()),
        judgement: CommitmentJudgement {
            is_commitment: true,
            assignee_hint: "<@U12345678>".to_owned(),
            description: "Preparar el informe".to_owned(),
            due_date: Some("05/03/2024".to_owned()),
        },
    }
}

fn sample_projects() -> Vec<ProjectOption> {
    vec![
        ProjectOption {
            gid: "800".to_owned(),
            name: "General".to_owned(),
        },
        ProjectOption {
            gid: "900".to_owned(),
            name: "Soporte".to_owned(),
        },
    ]
}

// ── prompt attachment ────────────────────────────────────────────────

#[test]
fn prompt_attachment_carries_one_button() {
    let attachment = blocks::prompt_attachment(&sample_pending()).expect("attachment");
    let actions = attachment["actions"].as_array().expect("actions array");

    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["name"], blocks::ACTION_CREATE_TASK);
    assert_eq!(actions[0]["type"], "button");
}

/// The button value must reconstruct the pending state exactly; it is
/// the only place the flow state lives between the prompt and the click.
#[test]
fn prompt_attachment_round_trips_pending_state() {
    let pending = sample_pending();
    let attachment = blocks::prompt_attachment(&pending).expect("attachment");

    let value = attachment["actions"][0]["value"]
        .as_str()
        .expect("string value");
    let restored: PendingInteraction = serde_json::from_str(value).expect("round-trip");

    assert_eq!(restored, pending);
}

#[test]
fn prompt_text_summarizes_the_judgement() {
    let text = blocks::prompt_text(&sample_pending());

    assert!(text.contains("Preparar el informe"));
    assert!(text.contains("<@U12345678>"));
    assert!(text.contains("05/03/2024"));
}

#[test]
fn prompt_text_omits_absent_hints() {
    let mut pending = sample_pending();
    pending.judgement.assignee_hint = String::new();
    pending.judgement.due_date = None;
    let text = blocks::prompt_text(&pending);

    assert!(!text.contains("Asignado a"));
    assert!(!text.contains("Fecha límite"));
}

// ── task modal ───────────────────────────────────────────────────────

#[test]
fn task_modal_has_fixed_callback_id() {
    let modal =
        blocks::task_modal(&sample_pending(), "C123", &sample_projects(), None).expect("modal");
    assert_eq!(modal["callback_id"], blocks::CALLBACK_TASK_MODAL);
    assert_eq!(modal["type"], "modal");
}

#[test]
fn task_modal_metadata_round_trips_channel_and_thread() {
    let pending = sample_pending();
    let modal = blocks::task_modal(&pending, "C123", &sample_projects(), None).expect("modal");

    let metadata: ModalMetadata =
        serde_json::from_str(modal["private_metadata"].as_str().expect("metadata"))
            .expect("round-trip");
    assert_eq!(metadata.channel, "C123");
    assert_eq!(metadata.thread_ts, pending.thread_ts);
}

#[test]
fn task_modal_contains_every_form_block() {
    let modal =
        blocks::task_modal(&sample_pending(), "C123", &sample_projects(), None).expect("modal");
    let serialized = modal.to_string();

    for block_id in [
        blocks::BLOCK_TITLE,
        blocks::BLOCK_ASSIGNEE,
        blocks::BLOCK_PROJECT,
        blocks::BLOCK_DUE_DATE,
        blocks::BLOCK_DESCRIPTION,
        blocks::BLOCK_SUBTASKS,
    ] {
        assert!(serialized.contains(block_id), "missing block {block_id}");
    }
    for action_id in [
        blocks::ACTION_TITLE,
        blocks::ACTION_ASSIGNEE,
        blocks::ACTION_PROJECT,
        blocks::ACTION_DUE_DATE,
        blocks::ACTION_DESCRIPTION,
        blocks::ACTION_SUBTASKS,
    ] {
        assert!(serialized.contains(action_id), "missing action {action_id}");
    }
}

/// The classifier's hints become editable defaults: title from the task
/// description, description from the original message, due date
/// normalized for the picker.
#[test]
fn task_modal_prefills_editable_defaults() {
    let pending = sample_pending();
    let modal = blocks::task_modal(&pending, "C123", &sample_projects(), None).expect("modal");
    let blocks_json = modal["blocks"].as_array().expect("blocks");

    let find = |block_id: &str| {
        blocks_json
            .iter()
            .find(|block| block["block_id"] == block_id)
            .expect("block present")
    };

    assert_eq!(
        find(blocks::BLOCK_TITLE)["element"]["initial_value"],
        "Preparar el informe"
    );
    assert_eq!(
        find(blocks::BLOCK_DESCRIPTION)["element"]["initial_value"],
        pending.original_text
    );
    assert_eq!(
        find(blocks::BLOCK_DUE_DATE)["element"]["initial_date"],
        "2024-03-05"
    );
    assert_eq!(
        find(blocks::BLOCK_ASSIGNEE)["element"]["initial_user"],
        "U12345678"
    );
}

#[test]
fn task_modal_leaves_unusable_hints_empty() {
    let mut pending = sample_pending();
    pending.judgement.assignee_hint = "ana maria".to_owned();
    pending.judgement.due_date = Some("el viernes".to_owned());
    let modal = blocks::task_modal(&pending, "C123", &sample_projects(), None).expect("modal");
    let serialized = modal.to_string();

    assert!(!serialized.contains("initial_user"));
    assert!(!serialized.contains("initial_date"));
}

#[test]
fn task_modal_preselects_mapped_project() {
    let modal = blocks::task_modal(&sample_pending(), "C123", &sample_projects(), Some("900"))
        .expect("modal");
    let blocks_json = modal["blocks"].as_array().expect("blocks");
    let project = blocks_json
        .iter()
        .find(|block| block["block_id"] == blocks::BLOCK_PROJECT)
        .expect("project block");

    assert_eq!(project["element"]["initial_option"]["value"], "900");
    assert_eq!(
        project["element"]["options"].as_array().expect("options").len(),
        2
    );
}

#[test]
fn task_modal_ignores_preselection_outside_the_option_list() {
    let modal = blocks::task_modal(&sample_pending(), "C123", &sample_projects(), Some("999"))
        .expect("modal");
    assert!(!modal.to_string().contains("initial_option"));
}

// ── assignee hint parsing ────────────────────────────────────────────

#[test]
fn hint_mention_token_yields_user_id() {
    assert_eq!(
        initial_user_from_hint("<@U12345678>"),
        Some("U12345678".to_owned())
    );
    assert_eq!(
        initial_user_from_hint("<@U12345678|juan>"),
        Some("U12345678".to_owned())
    );
}

#[test]
fn hint_bare_id_yields_user_id() {
    assert_eq!(
        initial_user_from_hint("U12345678"),
        Some("U12345678".to_owned())
    );
    assert_eq!(
        initial_user_from_hint("W87654321"),
        Some("W87654321".to_owned())
    );
}

#[test]
fn hint_free_form_name_yields_none() {
    assert_eq!(initial_user_from_hint("juan"), None);
    assert_eq!(initial_user_from_hint("ana maria"), None);
    assert_eq!(initial_user_from_hint(""), None);
}

#[test]
fn hint_lowercase_or_short_ids_yield_none() {
    assert_eq!(initial_user_from_hint("u12345678"), None);
    assert_eq!(initial_user_from_hint("U1234"), None);
}
