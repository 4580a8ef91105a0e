use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::serde_helpers::{empty_string_as_none, null_as_default, utc_instant, utc_instant_option};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeInterval {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    /// `None` while the entry is still running.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end: Option<OffsetDateTime>,
    /// ISO-8601 duration text such as `PT1H30M`. `None` while running.
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub time_interval: TimeInterval,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub billable: bool,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub workspace_id: Option<String>,
}

impl TimeEntry {
    pub fn is_running(&self) -> bool {
        self.time_interval.end.is_none()
    }
}

/// Body of `POST /workspaces/{id}/time-entries`.
///
/// Leaving `end` unset starts a running entry; the field is then omitted from
/// the payload entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTimeEntry {
    #[serde(serialize_with = "utc_instant")]
    pub start: OffsetDateTime,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "utc_instant_option"
    )]
    pub end: Option<OffsetDateTime>,
    pub project_id: String,
    pub description: String,
    pub billable: bool,
}

impl NewTimeEntry {
    pub fn running(
        start: OffsetDateTime,
        project_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            start,
            end: None,
            project_id: project_id.into(),
            description: description.into(),
            billable: true,
        }
    }

    pub fn finished(
        start: OffsetDateTime,
        end: OffsetDateTime,
        project_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            end: Some(end),
            ..Self::running(start, project_id, description)
        }
    }

    pub fn with_billable(mut self, billable: bool) -> Self {
        self.billable = billable;
        self
    }
}

/// Body of `PATCH /workspaces/{id}/time-entries/{entryId}`, closing a running entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTimeEntry {
    #[serde(serialize_with = "utc_instant")]
    pub end: OffsetDateTime,
}

/// Body of `PUT /workspaces/{id}/time-entries/{entryId}`; replaces interval and metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryUpdate {
    #[serde(serialize_with = "utc_instant")]
    pub start: OffsetDateTime,
    #[serde(serialize_with = "utc_instant")]
    pub end: OffsetDateTime,
    pub description: String,
    pub project_id: Option<String>,
    pub billable: bool,
}
