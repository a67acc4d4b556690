//! Background task-creation worker.
//!
//! Form submissions are acknowledged to Slack immediately; the actual
//! task creation (user lookup, task, subtasks, confirmation post) runs on
//! a single consumer task fed by a bounded queue. `submit` is the
//! "accepted" acknowledgement: a full queue rejects the submission
//! rather than delaying the HTTP response. No unit of work is retried;
//! a failure is reported in-thread and the flow ends.

use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};

use crate::asana::client::{NewTask, TaskTracker};
use crate::asana::dates::normalize_due_date;
use crate::config::GlobalConfig;
use crate::slack::client::SlackApi;
use crate::{AppError, Result};

use super::TaskSubmission;

const QUEUE_CAPACITY: usize = 64;

/// Handle for enqueueing task submissions to the background consumer.
#[derive(Clone)]
pub struct TaskWorker {
    queue_tx: mpsc::Sender<TaskSubmission>,
}

impl TaskWorker {
    /// Start the consumer task and return the enqueue handle alongside its
    /// join handle. The consumer exits once every `TaskWorker` clone is
    /// dropped and the queue drains.
    #[must_use]
    pub fn start(
        config: Arc<GlobalConfig>,
        slack: Arc<dyn SlackApi>,
        tracker: Arc<dyn TaskTracker>,
    ) -> (Self, JoinHandle<()>) {
        let (queue_tx, queue_rx) = mpsc::channel(QUEUE_CAPACITY);
        let handle = Self::spawn_consumer(config, slack, tracker, queue_rx);
        (Self { queue_tx }, handle)
    }

    /// Accept a submission for background processing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Queue` when the queue is full or the consumer
    /// has shut down. The caller logs and drops; the submission is not
    /// retried.
    pub fn submit(&self, submission: TaskSubmission) -> Result<()> {
        self.queue_tx.try_send(submission).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => {
                AppError::Queue("task queue is full; submission dropped".into())
            }
            mpsc::error::TrySendError::Closed(_) => {
                AppError::Queue("task queue is closed".into())
            }
        })
    }

    fn spawn_consumer(
        config: Arc<GlobalConfig>,
        slack: Arc<dyn SlackApi>,
        tracker: Arc<dyn TaskTracker>,
        mut queue_rx: mpsc::Receiver<TaskSubmission>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(submission) = queue_rx.recv().await {
                let channel = submission.channel.clone();
                let thread_ts = submission.thread_ts.clone();

                if let Err(err) =
                    process_submission(submission, &config, slack.as_ref(), tracker.as_ref()).await
                {
                    warn!(%err, channel, "task creation failed");
                    // Report the failure where the flow started; nothing is
                    // rolled back and nothing is retried.
                    let text = format!("\u{274c} Error al crear la tarea: {err}");
                    if let Err(post_err) = slack
                        .post_message(&channel, Some(&thread_ts), &text, None)
                        .await
                    {
                        warn!(%post_err, channel, "failed to post task-creation error");
                    }
                }
            }
            info!("task worker exiting");
        })
    }
}

/// One unit of work: resolve the project and assignee, create the task
/// and its subtasks, and post the in-thread confirmation.
async fn process_submission(
    submission: TaskSubmission,
    config: &GlobalConfig,
    slack: &dyn SlackApi,
    tracker: &dyn TaskTracker,
) -> Result<()> {
    let project_gid = submission
        .project_id
        .clone()
        .unwrap_or_else(|| config.project_for_channel(&submission.channel).to_owned());

    let profile = slack.user_info(&submission.assignee_user_id).await?;
    info!(
        user = %submission.assignee_user_id,
        name = profile.real_name.as_deref().unwrap_or("unknown"),
        project = %project_gid,
        "processing task submission"
    );

    let assignee_gid = match profile.email.as_deref() {
        Some(email) => tracker.find_user_by_email(email).await?,
        None => None,
    };

    let due_on = submission
        .due_date
        .as_deref()
        .and_then(normalize_due_date);

    let task = tracker
        .create_task(&NewTask {
            name: submission.title.clone(),
            project_gid,
            assignee_gid: assignee_gid.clone(),
            due_on: due_on.clone(),
            notes: submission.description.clone(),
        })
        .await?;

    // Subtask failures do not abort the unit of work: the parent task
    // exists and is reported, with the failed names surfaced visibly.
    let mut failed_subtasks = Vec::new();
    for name in &submission.subtasks {
        if let Err(err) = tracker
            .create_subtask(&task.gid, name, assignee_gid.as_deref())
            .await
        {
            warn!(%err, subtask = %name, task = %task.gid, "failed to create subtask");
            failed_subtasks.push(name.clone());
        }
    }

    let mut confirmation = format!(
        "\u{2705} Tarea creada: '{}' \u{2192} <{}|ver en Asana>",
        submission.title, task.url
    );
    if assignee_gid.is_some() {
        confirmation.push_str(&format!("\nAsignada a: <@{}>", submission.assignee_user_id));
    } else {
        let email = profile.email.as_deref().unwrap_or("sin email en Slack");
        confirmation.push_str(&format!(
            "\n\u{26a0}\u{fe0f} No se pudo asignar a <@{}> (email no encontrado en Asana: {email})",
            submission.assignee_user_id
        ));
    }
    if let Some(due) = due_on {
        confirmation.push_str(&format!("\nFecha límite: {due}"));
    }
    if !failed_subtasks.is_empty() {
        confirmation.push_str(&format!(
            "\n\u{26a0}\u{fe0f} Subtareas no creadas: {}",
            failed_subtasks.join(", ")
        ));
    }

    slack
        .post_message(
            &submission.channel,
            Some(&submission.thread_ts),
            &confirmation,
            None,
        )
        .await?;

    Ok(())
}
