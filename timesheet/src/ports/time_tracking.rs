use async_trait::async_trait;
use clockify::{NewTimeEntry, Project, TimeEntry, TimeEntryUpdate, UserId, Workspace};
use time::OffsetDateTime;

use crate::TimesheetError;

/// Outbound port for the remote time-tracking service.
///
/// Every call is a single request/response. Implementations must not retry,
/// since creates are not idempotent.
#[async_trait]
pub trait TimeTrackingClient: Send + Sync + 'static {
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, TimesheetError>;

    async fn list_projects(&self, workspace_id: &str) -> Result<Vec<Project>, TimesheetError>;

    /// The user owning the credentials, or `None` if the service does not know one.
    async fn current_user(&self) -> Result<Option<UserId>, TimesheetError>;

    // ========================================================================
    // Time Entry Operations
    // ========================================================================

    /// Entries whose start falls in the closed interval `range`.
    async fn list_time_entries(
        &self,
        workspace_id: &str,
        user_id: &UserId,
        range: (OffsetDateTime, OffsetDateTime),
    ) -> Result<Vec<TimeEntry>, TimesheetError>;

    /// Creates an entry. An entry without `end` is left running.
    async fn create_time_entry(
        &self,
        workspace_id: &str,
        entry: &NewTimeEntry,
    ) -> Result<TimeEntry, TimesheetError>;

    /// Closes a running entry at `end`.
    async fn patch_time_entry(
        &self,
        workspace_id: &str,
        entry_id: &str,
        end: OffsetDateTime,
    ) -> Result<TimeEntry, TimesheetError>;

    /// Replaces interval and metadata of an existing entry.
    async fn update_time_entry(
        &self,
        workspace_id: &str,
        entry_id: &str,
        update: &TimeEntryUpdate,
    ) -> Result<TimeEntry, TimesheetError>;

    async fn delete_time_entry(&self, workspace_id: &str, entry_id: &str)
        -> Result<(), TimesheetError>;
}
