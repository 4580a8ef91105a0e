use async_trait::async_trait;
use clockify::{
    ClockifyClient, ClockifyError, ClockifyURL, CloseTimeEntry, NewTimeEntry, Project, TimeEntry,
    TimeEntryUpdate, UserId, Workspace,
};
use time::OffsetDateTime;

use crate::{config::Credentials, ports::TimeTrackingClient, TimesheetError};

/// Adapter that wraps the Clockify client to implement the TimeTrackingClient port.
pub struct ClockifyAdapter {
    client: ClockifyClient,
}

impl ClockifyAdapter {
    pub fn new(credentials: &Credentials) -> Result<Self, TimesheetError> {
        let client = ClockifyClient::new(credentials.api_key.trim()).map_err(map_clockify_error)?;
        Ok(Self { client })
    }

    /// Adapter talking to a self-hosted or test server.
    pub fn with_base_url(credentials: &Credentials, base_url: &str) -> Result<Self, TimesheetError> {
        let base_url = ClockifyURL::parse(base_url)
            .map_err(|e| TimesheetError::validation(format!("Invalid base URL: {}", e)))?;
        let client = ClockifyClient::with_base_url(credentials.api_key.trim(), base_url)
            .map_err(map_clockify_error)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TimeTrackingClient for ClockifyAdapter {
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, TimesheetError> {
        self.client.list_workspaces().await.map_err(map_clockify_error)
    }

    async fn list_projects(&self, workspace_id: &str) -> Result<Vec<Project>, TimesheetError> {
        self.client
            .list_projects(workspace_id)
            .await
            .map_err(map_clockify_error)
    }

    async fn current_user(&self) -> Result<Option<UserId>, TimesheetError> {
        self.client.current_user().await.map_err(map_clockify_error)
    }

    async fn list_time_entries(
        &self,
        workspace_id: &str,
        user_id: &UserId,
        range: (OffsetDateTime, OffsetDateTime),
    ) -> Result<Vec<TimeEntry>, TimesheetError> {
        self.client
            .list_time_entries(workspace_id, user_id, range.0, range.1)
            .await
            .map_err(map_clockify_error)
    }

    async fn create_time_entry(
        &self,
        workspace_id: &str,
        entry: &NewTimeEntry,
    ) -> Result<TimeEntry, TimesheetError> {
        self.client
            .create_time_entry(workspace_id, entry)
            .await
            .map_err(map_clockify_error)
    }

    async fn patch_time_entry(
        &self,
        workspace_id: &str,
        entry_id: &str,
        end: OffsetDateTime,
    ) -> Result<TimeEntry, TimesheetError> {
        self.client
            .patch_time_entry(workspace_id, entry_id, &CloseTimeEntry { end })
            .await
            .map_err(map_clockify_error)
    }

    async fn update_time_entry(
        &self,
        workspace_id: &str,
        entry_id: &str,
        update: &TimeEntryUpdate,
    ) -> Result<TimeEntry, TimesheetError> {
        self.client
            .update_time_entry(workspace_id, entry_id, update)
            .await
            .map_err(map_clockify_error)
    }

    async fn delete_time_entry(
        &self,
        workspace_id: &str,
        entry_id: &str,
    ) -> Result<(), TimesheetError> {
        self.client
            .delete_time_entry(workspace_id, entry_id)
            .await
            .map_err(map_clockify_error)
    }
}

fn map_clockify_error(e: ClockifyError) -> TimesheetError {
    match e {
        ClockifyError::MissingApiKey => TimesheetError::validation("API key is required"),
        ClockifyError::Remote { status, message } => TimesheetError::Remote { status, message },
        ClockifyError::Network(msg) => TimesheetError::Network(msg),
        ClockifyError::Parsing(msg) => TimesheetError::Parsing(msg),
        ClockifyError::Other(msg) => TimesheetError::Parsing(msg),
    }
}
