use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
#[cfg(unix)]
use std::{io::Write, os::unix::fs::OpenOptionsExt};

use crate::error::TimesheetError;

const ENV_PREFIX: &str = "CLOCKIFY";
const NOTIFY_CAPACITY: usize = 16;

/// Clockify credentials and optional selection hints.
///
/// Only `api_key` is required; the remaining fields are hints and may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub api_key: String,
    pub workspace_id: String,
    pub client_id: String,
    pub project_id: String,
}

impl Credentials {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn workspace_hint(&self) -> Option<&str> {
        non_blank(&self.workspace_id)
    }

    pub fn client_hint(&self) -> Option<&str> {
        non_blank(&self.client_id)
    }

    pub fn project_hint(&self) -> Option<&str> {
        non_blank(&self.project_id)
    }

    /// Applies deployment overrides field by field; a non-blank override wins.
    fn overlay(mut self, overrides: &Overrides) -> Self {
        let fields = [
            (&mut self.api_key, &overrides.api_key),
            (&mut self.workspace_id, &overrides.workspace_id),
            (&mut self.client_id, &overrides.client_id),
            (&mut self.project_id, &overrides.project_id),
        ];
        for (field, value) in fields {
            if let Some(value) = value.as_deref().and_then(non_blank) {
                *field = value.to_string();
            }
        }
        self
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Deployment-level overrides, read from `CLOCKIFY_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub workspace_id: Option<String>,
    pub client_id: Option<String>,
    pub project_id: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Reads overrides from a `config` environment source. Unreadable values
    /// are logged and ignored.
    pub fn from_environment(environment: config::Environment) -> Self {
        let settings = config::Config::builder()
            .add_source(environment.prefix_separator("_"))
            .build()
            .and_then(|settings| settings.try_deserialize::<Overrides>());

        match settings {
            Ok(overrides) => overrides,
            Err(e) => {
                tracing::warn!("Ignoring unreadable {}_* overrides: {}", ENV_PREFIX, e);
                Self::default()
            }
        }
    }
}

/// Notification broadcast after every successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigChanged;

/// Owns the persisted credentials and notifies subscribers when they change.
///
/// Shared as `Arc<ConfigStore>` by every component that needs credentials;
/// components call [`ConfigStore::subscribe`] to learn when to reload.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    overrides: Overrides,
    notifier: broadcast::Sender<ConfigChanged>,
}

impl ConfigStore {
    pub fn default_path() -> Result<PathBuf, TimesheetError> {
        Ok(dirs::config_dir()
            .ok_or_else(|| TimesheetError::storage("Cannot determine config directory"))?
            .join("timesheet")
            .join("credentials.toml"))
    }

    /// Store at the default location, with overrides taken from the environment.
    pub fn open_default() -> Result<Self, TimesheetError> {
        Ok(Self::at(Self::default_path()?).with_overrides(Overrides::from_env()))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        let (notifier, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            path: path.into(),
            overrides: Overrides::default(),
            notifier,
        }
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persisted credentials, or empty ones if the file is missing or unreadable.
    pub fn load(&self) -> Credentials {
        if !self.path.exists() {
            return Credentials::default();
        }

        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Failed to read config at {}: {}", self.path.display(), e);
                return Credentials::default();
            }
        };

        match toml::from_str(&raw) {
            Ok(credentials) => credentials,
            Err(e) => {
                tracing::warn!("Failed to parse config at {}: {}", self.path.display(), e);
                Credentials::default()
            }
        }
    }

    /// Persisted credentials with deployment overrides applied.
    pub fn effective(&self) -> Credentials {
        self.load().overlay(&self.overrides)
    }

    /// Replaces the persisted credentials and notifies every subscriber.
    pub fn save(&self, credentials: &Credentials) -> Result<(), TimesheetError> {
        if !credentials.has_api_key() {
            return Err(TimesheetError::validation("API key is required"));
        }

        let raw = toml::to_string_pretty(credentials)
            .map_err(|e| TimesheetError::storage(format!("Failed to encode config: {}", e)))?;
        secure_write(&self.path, &raw).map_err(|e| {
            TimesheetError::storage(format!(
                "Failed to write config at {}: {}",
                self.path.display(),
                e
            ))
        })?;

        tracing::debug!("Saved config to {}", self.path.display());
        // No receivers is fine; nobody is listening yet.
        let _ = self.notifier.send(ConfigChanged);
        Ok(())
    }

    /// Empty credentials. Nothing is persisted until they are saved.
    pub fn reset(&self) -> Credentials {
        Credentials::default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigChanged> {
        self.notifier.subscribe()
    }
}

fn secure_write(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    #[cfg(unix)]
    {
        std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?
            .write_all(content.as_bytes())?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(path, content)?;
    }

    Ok(())
}
