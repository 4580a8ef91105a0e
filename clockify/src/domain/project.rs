use serde::{Deserialize, Serialize};

use super::serde_helpers::{empty_string_as_none, null_as_default};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub workspace_id: String,
}

/// A project as listed by `GET /workspaces/{id}/projects`.
///
/// Clockify flattens the owning client into `clientId`/`clientName`; a project
/// without a client has an empty `clientId`, which is read as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub client_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub client_name: String,
    pub workspace_id: String,
    #[serde(default)]
    pub billable: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub color: String,
    #[serde(default)]
    pub archived: bool,
}

impl Project {
    /// The owning client, if the project has one.
    pub fn client(&self) -> Option<Client> {
        self.client_id.as_ref().map(|id| Client {
            id: id.clone(),
            name: self.client_name.clone(),
            email: None,
            workspace_id: self.workspace_id.clone(),
        })
    }
}
