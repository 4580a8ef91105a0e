use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.clockify.me/api/v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockifyURL(String);

impl AsRef<str> for ClockifyURL {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Default for ClockifyURL {
    fn default() -> Self {
        Self(DEFAULT_BASE_URL.to_string())
    }
}

impl ClockifyURL {
    /// Creates a ClockifyURL from a custom base, e.g. a self-hosted instance or a test server.
    pub fn parse(base: &str) -> Result<Self, url::ParseError> {
        let parsed = Url::parse(base)?;
        Ok(Self(parsed.as_str().trim_end_matches('/').to_string()))
    }

    /// Append the given path to the URL.
    pub fn append_path(&self, path: &str) -> Self {
        let trimmed_url = self.0.trim_end_matches('/');
        let trimmed_path = path.trim_start_matches('/');
        Self(format!("{}/{}", trimmed_url, trimmed_path))
    }

    pub fn workspaces(&self) -> Self {
        self.append_path("/workspaces")
    }

    pub fn projects(&self, workspace_id: &str) -> Self {
        self.append_path(&format!("/workspaces/{}/projects", workspace_id))
    }

    pub fn user(&self) -> Self {
        self.append_path("/user")
    }

    pub fn user_time_entries(&self, workspace_id: &str, user_id: &str) -> Self {
        self.append_path(&format!(
            "/workspaces/{}/user/{}/time-entries",
            workspace_id, user_id
        ))
    }

    pub fn time_entries(&self, workspace_id: &str) -> Self {
        self.append_path(&format!("/workspaces/{}/time-entries", workspace_id))
    }

    pub fn time_entry(&self, workspace_id: &str, entry_id: &str) -> Self {
        self.append_path(&format!(
            "/workspaces/{}/time-entries/{}",
            workspace_id, entry_id
        ))
    }
}
