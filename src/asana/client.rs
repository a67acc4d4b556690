//! Asana REST client.
//!
//! Wraps the handful of endpoints the relay needs: workspace discovery,
//! user lookup by email, task creation, and subtask creation. Every call
//! carries the personal access token as a bearer header; non-2xx responses
//! surface as [`AppError::Asana`] with the HTTP status and body text.

use std::future::Future;
use std::pin::Pin;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::{AppError, Result};

const API_BASE: &str = "https://app.asana.com/api/1.0";

/// Fields for a task about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Task title.
    pub name: String,
    /// Project the task is filed under.
    pub project_gid: String,
    /// Resolved assignee, when the email lookup succeeded.
    pub assignee_gid: Option<String>,
    /// Canonical `YYYY-MM-DD` due date.
    pub due_on: Option<String>,
    /// Free-form notes body.
    pub notes: Option<String>,
}

/// Reference to a created task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRef {
    /// Task gid.
    pub gid: String,
    /// Browser URL for the task.
    pub url: String,
}

/// Interface between the relay and the task-tracking service.
///
/// Exists so the background worker can be exercised against a recording
/// stub; [`AsanaClient`] is the production implementation.
pub trait TaskTracker: Send + Sync {
    /// Resolve a workspace user gid by case-insensitive exact email match.
    ///
    /// Not finding the user is `Ok(None)`, never an error.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Asana`] when the user enumeration itself fails.
    fn find_user_by_email(
        &self,
        email: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>>;

    /// Create a task and return its reference.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Asana`] on any non-2xx response.
    fn create_task(
        &self,
        task: &NewTask,
    ) -> Pin<Box<dyn Future<Output = Result<TaskRef>> + Send + '_>>;

    /// Create a subtask under an existing parent task.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Asana`] on any non-2xx response.
    fn create_subtask(
        &self,
        parent_gid: &str,
        name: &str,
        assignee_gid: Option<&str>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Asana REST implementation of [`TaskTracker`].
#[derive(Clone)]
pub struct AsanaClient {
    client: reqwest::Client,
}

impl AsanaClient {
    /// Create a client authenticated with the given personal access token.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Asana` if the token is not a valid header value
    /// or the HTTP client cannot be built.
    pub fn new(pat: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {pat}"))
                .map_err(|err| AppError::Asana(format!("invalid access token: {err}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| AppError::Asana(format!("failed to build http client: {err}")))?;

        Ok(Self { client })
    }

    /// Gid of the first workspace the token can see.
    async fn first_workspace_gid(&self) -> Result<String> {
        let envelope: DataEnvelope<Vec<Gid>> = self.get(&format!("{API_BASE}/workspaces")).await?;
        envelope
            .data
            .into_iter()
            .next()
            .map(|workspace| workspace.gid)
            .ok_or_else(|| AppError::Asana("no workspace visible to this token".into()))
    }

    async fn find_user_inner(&self, email: &str) -> Result<Option<String>> {
        if email.is_empty() {
            return Ok(None);
        }

        // A workspace lookup failure degrades to "no assignee" rather than
        // failing the whole task.
        let workspace_gid = match self.first_workspace_gid().await {
            Ok(gid) => gid,
            Err(err) => {
                warn!(%err, "workspace lookup failed; creating task unassigned");
                return Ok(None);
            }
        };

        // Member emails are only on the per-user detail resource, so this
        // is one GET per member until a match is found.
        let members: DataEnvelope<Vec<Gid>> = self
            .get(&format!("{API_BASE}/workspaces/{workspace_gid}/users"))
            .await?;
        debug!(
            count = members.data.len(),
            "enumerating workspace members for email match"
        );

        for member in members.data {
            let detail: DataEnvelope<UserDetail> = self
                .get(&format!("{API_BASE}/users/{}", member.gid))
                .await?;
            if detail
                .data
                .email
                .as_deref()
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(email))
            {
                return Ok(Some(detail.data.gid));
            }
        }

        Ok(None)
    }

    async fn create_task_inner(&self, task: &NewTask) -> Result<TaskRef> {
        let mut data = json!({
            "name": task.name,
            "projects": [task.project_gid],
        });
        if let Some(ref notes) = task.notes {
            data["notes"] = json!(notes);
        }
        if let Some(ref assignee) = task.assignee_gid {
            data["assignee"] = json!(assignee);
        }
        if let Some(ref due_on) = task.due_on {
            data["due_on"] = json!(due_on);
        }

        let envelope: DataEnvelope<Gid> = self
            .post(&format!("{API_BASE}/tasks"), &json!({ "data": data }))
            .await?;

        let gid = envelope.data.gid;
        let url = format!("https://app.asana.com/0/{}/{gid}", task.project_gid);
        Ok(TaskRef { gid, url })
    }

    async fn create_subtask_inner(
        &self,
        parent_gid: &str,
        name: &str,
        assignee_gid: Option<&str>,
    ) -> Result<()> {
        let mut data = json!({
            "name": name,
            "parent": parent_gid,
        });
        if let Some(assignee) = assignee_gid {
            data["assignee"] = json!(assignee);
        }

        let _: DataEnvelope<Gid> = self
            .post(&format!("{API_BASE}/tasks"), &json!({ "data": data }))
            .await?;
        Ok(())
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| AppError::Asana(format!("request failed: {err}")))?;
        Self::read_envelope(response).await
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| AppError::Asana(format!("request failed: {err}")))?;
        Self::read_envelope(response).await
    }

    async fn read_envelope<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Asana(format!("api error ({status}): {body}")));
        }
        response
            .json()
            .await
            .map_err(|err| AppError::Asana(format!("invalid response body: {err}")))
    }
}

impl TaskTracker for AsanaClient {
    fn find_user_by_email(
        &self,
        email: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>> {
        let email = email.to_owned();
        Box::pin(async move { self.find_user_inner(&email).await })
    }

    fn create_task(
        &self,
        task: &NewTask,
    ) -> Pin<Box<dyn Future<Output = Result<TaskRef>> + Send + '_>> {
        let task = task.clone();
        Box::pin(async move { self.create_task_inner(&task).await })
    }

    fn create_subtask(
        &self,
        parent_gid: &str,
        name: &str,
        assignee_gid: Option<&str>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let parent_gid = parent_gid.to_owned();
        let name = name.to_owned();
        let assignee_gid = assignee_gid.map(str::to_owned);
        Box::pin(async move {
            self.create_subtask_inner(&parent_gid, &name, assignee_gid.as_deref())
                .await
        })
    }
}

/// Asana wraps every response in a `data` envelope.
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// A resource reference carrying only its gid.
#[derive(Debug, Deserialize)]
struct Gid {
    gid: String,
}

/// Per-user detail resource; email is only present here, not in listings.
#[derive(Debug, Deserialize)]
struct UserDetail {
    gid: String,
    #[serde(default)]
    email: Option<String>,
}
