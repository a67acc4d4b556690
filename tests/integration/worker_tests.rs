//! Tests for the background task worker driven directly through
//! `TaskWorker::submit`: project routing, date normalization, and the
//! enqueue acknowledgement.

use tracker_bot::relay::TaskSubmission;

use super::test_helpers::{default_harness, wait_for};

fn submission() -> TaskSubmission {
    TaskSubmission {
        channel: "C123".to_owned(),
        thread_ts: "1714000000.000100".to_owned(),
        assignee_user_id: "U12345678".to_owned(),
        due_date: None,
        title: "Preparar informe".to_owned(),
        description: None,
        subtasks: Vec::new(),
        project_id: Some("800".to_owned()),
    }
}

/// `submit` is only the "accepted" acknowledgement; the work happens on
/// the consumer task afterwards.
#[tokio::test]
async fn submit_acknowledges_before_processing() {
    let h = default_harness();

    h.state.worker.submit(submission()).expect("accepted");

    assert!(wait_for(|| h.tracker.tasks().len() == 1).await);
    assert!(wait_for(|| h.slack.posts().len() == 1).await);
}

/// A submission without an explicit project resolves through the
/// channel→project map.
#[tokio::test]
async fn mapped_channel_routes_to_its_project() {
    let h = default_harness();
    let mut submission = submission();
    submission.channel = "C_MAPPED".to_owned();
    submission.project_id = None;

    h.state.worker.submit(submission).expect("accepted");

    assert!(wait_for(|| h.tracker.tasks().len() == 1).await);
    assert_eq!(h.tracker.tasks()[0].project_gid, "900");
}

/// An unmapped channel falls back to the default project.
#[tokio::test]
async fn unmapped_channel_falls_back_to_default_project() {
    let h = default_harness();
    let mut submission = submission();
    submission.channel = "C_UNMAPPED".to_owned();
    submission.project_id = None;

    h.state.worker.submit(submission).expect("accepted");

    assert!(wait_for(|| h.tracker.tasks().len() == 1).await);
    assert_eq!(h.tracker.tasks()[0].project_gid, "800");
}

/// The worker normalizes whatever date string the form carried; an
/// unparseable one is omitted rather than failing the task.
#[tokio::test]
async fn due_dates_are_normalized_or_omitted() {
    let h = default_harness();

    let mut with_date = submission();
    with_date.due_date = Some("05/03/2024".to_owned());
    h.state.worker.submit(with_date).expect("accepted");

    assert!(wait_for(|| h.tracker.tasks().len() == 1).await);
    assert_eq!(h.tracker.tasks()[0].due_on.as_deref(), Some("2024-03-05"));

    let mut without_date = submission();
    without_date.due_date = Some("mañana".to_owned());
    h.state.worker.submit(without_date).expect("accepted");

    assert!(wait_for(|| h.tracker.tasks().len() == 2).await);
    assert!(h.tracker.tasks()[1].due_on.is_none());
}

/// The confirmation mentions the due date only when one survived
/// normalization.
#[tokio::test]
async fn confirmation_mentions_normalized_due_date() {
    let h = default_harness();
    let mut submission = submission();
    submission.due_date = Some("05/03/2024".to_owned());

    h.state.worker.submit(submission).expect("accepted");

    assert!(wait_for(|| h.slack.posts().len() == 1).await);
    assert!(h.slack.posts()[0].text.contains("Fecha límite: 2024-03-05"));
}
