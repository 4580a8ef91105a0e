use reqwest::{header::CONTENT_TYPE, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    domain::{
        format_instant, CloseTimeEntry, NewTimeEntry, Project, TimeEntry, TimeEntryUpdate, User,
        UserId, Workspace,
    },
    ClockifyURL,
};

const API_KEY_HEADER: &str = "X-Api-Key";

/// Stateless wrapper over the Clockify REST API.
///
/// Every call is a single attempt: there are no retries and no idempotency
/// keys, so issuing the same create twice creates two entries.
#[derive(Debug, Clone)]
pub struct ClockifyClient {
    http: reqwest::Client,
    base_url: ClockifyURL,
    api_key: String,
}

impl ClockifyClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ClockifyError> {
        Self::with_base_url(api_key, ClockifyURL::default())
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: ClockifyURL,
    ) -> Result<Self, ClockifyError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ClockifyError::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ClockifyError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub fn base_url(&self) -> &ClockifyURL {
        &self.base_url
    }

    fn request(&self, method: Method, url: &ClockifyURL) -> RequestBuilder {
        self.http
            .request(method, url.as_ref())
            .header(API_KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, "application/json")
    }

    async fn send(&self, request: RequestBuilder, call_name: &str) -> Result<Vec<u8>, ClockifyError> {
        let response = request
            .send()
            .await
            .map_err(|e| ClockifyError::Network(format!("Failed to call {}: {}", call_name, e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClockifyError::Network(format!("Failed to read {} body: {}", call_name, e)))?;

        if !status.is_success() {
            tracing::debug!("{} returned {}", call_name, status);
            return Err(ClockifyError::remote(status, &body));
        }

        Ok(body.to_vec())
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        call_name: &str,
    ) -> Result<T, ClockifyError> {
        let body = self.send(request, call_name).await?;
        serde_json::from_slice(&body).map_err(|e| {
            ClockifyError::Parsing(format!("Failed to parse {} response as JSON: {}", call_name, e))
        })
    }

    #[instrument(skip(self))]
    pub async fn list_workspaces(&self) -> Result<Vec<Workspace>, ClockifyError> {
        let url = self.base_url.workspaces();
        self.fetch(self.request(Method::GET, &url), "GET /workspaces")
            .await
    }

    #[instrument(skip(self))]
    pub async fn list_projects(&self, workspace_id: &str) -> Result<Vec<Project>, ClockifyError> {
        let url = self.base_url.projects(workspace_id);
        self.fetch(
            self.request(Method::GET, &url),
            "GET /workspaces/:id/projects",
        )
        .await
    }

    /// Resolves the user owning the API key.
    ///
    /// An unauthenticated or unknown user is reported as `None` rather than an error.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<Option<UserId>, ClockifyError> {
        let url = self.base_url.user();
        match self
            .fetch::<User>(self.request(Method::GET, &url), "GET /user")
            .await
        {
            Ok(user) => Ok(Some(user.id)),
            Err(ClockifyError::Remote { status, .. })
                if matches!(status, 401 | 403 | 404) =>
            {
                tracing::debug!("GET /user returned {}, treating as no user", status);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Lists the user's entries whose start falls in the closed interval `[start, end]`.
    #[instrument(skip(self))]
    pub async fn list_time_entries(
        &self,
        workspace_id: &str,
        user_id: &UserId,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<TimeEntry>, ClockifyError> {
        let url = self
            .base_url
            .user_time_entries(workspace_id, user_id.as_str());
        let start = format_instant(start).map_err(|e| ClockifyError::Other(e.to_string()))?;
        let end = format_instant(end).map_err(|e| ClockifyError::Other(e.to_string()))?;

        self.fetch(
            self.request(Method::GET, &url)
                .query(&[("start", start.as_str()), ("end", end.as_str())]),
            "GET /workspaces/:id/user/:userId/time-entries",
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn create_time_entry(
        &self,
        workspace_id: &str,
        entry: &NewTimeEntry,
    ) -> Result<TimeEntry, ClockifyError> {
        let url = self.base_url.time_entries(workspace_id);
        self.fetch(
            self.request(Method::POST, &url).json(entry),
            "POST /workspaces/:id/time-entries",
        )
        .await
    }

    /// Closes a running entry by setting its end.
    #[instrument(skip(self))]
    pub async fn patch_time_entry(
        &self,
        workspace_id: &str,
        entry_id: &str,
        close: &CloseTimeEntry,
    ) -> Result<TimeEntry, ClockifyError> {
        let url = self.base_url.time_entry(workspace_id, entry_id);
        self.fetch(
            self.request(Method::PATCH, &url).json(close),
            "PATCH /workspaces/:id/time-entries/:entryId",
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn update_time_entry(
        &self,
        workspace_id: &str,
        entry_id: &str,
        update: &TimeEntryUpdate,
    ) -> Result<TimeEntry, ClockifyError> {
        let url = self.base_url.time_entry(workspace_id, entry_id);
        self.fetch(
            self.request(Method::PUT, &url).json(update),
            "PUT /workspaces/:id/time-entries/:entryId",
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_time_entry(
        &self,
        workspace_id: &str,
        entry_id: &str,
    ) -> Result<(), ClockifyError> {
        let url = self.base_url.time_entry(workspace_id, entry_id);
        self.send(
            self.request(Method::DELETE, &url),
            "DELETE /workspaces/:id/time-entries/:entryId",
        )
        .await
        .map(|_| ())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClockifyError {
    #[error("API key is required")]
    MissingApiKey,
    #[error("Clockify returned {status}: {message}")]
    Remote { status: u16, message: String },
    #[error("NetworkError: {0}")]
    Network(String),
    #[error("ParsingError: {0}")]
    Parsing(String),
    #[error("Other: {0}")]
    Other(String),
}

/// Error body returned by Clockify on non-success statuses.
#[derive(Debug, Deserialize)]
struct ClockifyErrorBody {
    message: String,
}

impl ClockifyError {
    fn remote(status: StatusCode, body: &[u8]) -> Self {
        let message = match serde_json::from_slice::<ClockifyErrorBody>(body) {
            Ok(parsed) => parsed.message,
            Err(_) => {
                let text = String::from_utf8_lossy(body).trim().to_string();
                if text.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown error")
                        .to_string()
                } else {
                    text
                }
            }
        };

        ClockifyError::Remote {
            status: status.as_u16(),
            message,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClockifyError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}
