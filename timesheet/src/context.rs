use std::sync::Arc;

use clockify::{Project, TimeEntry, Workspace};
use time::{OffsetDateTime, UtcOffset};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use crate::{
    adapters::ClockifyAdapter,
    batch::BatchSubmitter,
    config::{ConfigChanged, ConfigStore, Credentials},
    entries::{EntryView, DEFAULT_WINDOW_DAYS},
    ports::TimeTrackingClient,
    projects::{ProjectGroup, ProjectIndex},
    time_utils::days_before,
    timer::TimerSession,
    TimesheetError,
};

type Connector<C> = Box<dyn Fn(&Credentials) -> Result<Arc<C>, TimesheetError> + Send + Sync>;

/// Everything resolved from one set of credentials.
pub struct Connection<C> {
    pub client: Arc<C>,
    pub credentials: Credentials,
    pub workspace: Workspace,
    pub projects: ProjectIndex,
}

impl<C: TimeTrackingClient> Connection<C> {
    pub fn timer(&self) -> TimerSession<C> {
        TimerSession::new(self.client.clone(), &self.workspace.id)
    }

    pub fn batch(&self, offset: UtcOffset) -> BatchSubmitter<C> {
        BatchSubmitter::new(self.client.clone(), &self.workspace.id, offset)
    }

    pub fn entries(&self, offset: UtcOffset) -> EntryView<C> {
        EntryView::new(self.client.clone(), &self.workspace.id, offset)
            .with_projects(self.projects.clone())
    }

    /// Project groups, narrowed to the configured client when there is one.
    pub fn visible_groups(&self) -> Vec<&ProjectGroup> {
        self.projects.for_client(self.credentials.client_hint())
    }

    /// The project to use when the user names none.
    pub fn default_project(&self) -> Option<&Project> {
        self.credentials
            .project_hint()
            .and_then(|id| self.projects.resolve(id))
    }

    /// The user's entry that is still running, if any.
    pub async fn running_entry(&self) -> Result<Option<TimeEntry>, TimesheetError> {
        let Some(user_id) = self.client.current_user().await? else {
            return Ok(None);
        };

        let now = OffsetDateTime::now_utc();
        let since = days_before(now, DEFAULT_WINDOW_DAYS)
            .ok_or_else(|| TimesheetError::validation("Current time is out of range"))?;
        let entries = self
            .client
            .list_time_entries(&self.workspace.id, &user_id, (since, now))
            .await?;
        Ok(entries.into_iter().find(TimeEntry::is_running))
    }
}

/// Keeps a [`Connection`] in sync with the configuration store.
///
/// The connection is built on first use and rebuilt after every saved
/// configuration change. The entry view handed out by [`Tracker::entries`]
/// follows each rebuild and reloads its last window.
pub struct Tracker<C> {
    store: Arc<ConfigStore>,
    offset: UtcOffset,
    connect: Connector<C>,
    changes: broadcast::Receiver<ConfigChanged>,
    connection: Option<Connection<C>>,
    entries: Option<Arc<EntryView<C>>>,
}

impl Tracker<ClockifyAdapter> {
    pub fn clockify(store: Arc<ConfigStore>, offset: UtcOffset) -> Self {
        Self::new(store, offset, |credentials| {
            Ok(Arc::new(ClockifyAdapter::new(credentials)?))
        })
    }
}

impl<C: TimeTrackingClient> Tracker<C> {
    pub fn new<F>(store: Arc<ConfigStore>, offset: UtcOffset, connect: F) -> Self
    where
        F: Fn(&Credentials) -> Result<Arc<C>, TimesheetError> + Send + Sync + 'static,
    {
        let changes = store.subscribe();
        Self {
            store,
            offset,
            connect: Box::new(connect),
            changes,
            connection: None,
            entries: None,
        }
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// The current connection, connecting first if needed.
    pub async fn connection(&mut self) -> Result<&Connection<C>, TimesheetError> {
        if self.sync_changes() || self.connection.is_none() {
            return self.refresh().await;
        }
        self.connection
            .as_ref()
            .ok_or_else(|| TimesheetError::storage("Connection missing after connect"))
    }

    /// The shared entry view, connecting first if needed.
    pub async fn entries(&mut self) -> Result<Arc<EntryView<C>>, TimesheetError> {
        let offset = self.offset;
        let missing = self.entries.is_none();
        let connection = self.connection().await?;
        if missing {
            let view = Arc::new(connection.entries(offset));
            self.entries = Some(view);
        }
        self.entries
            .clone()
            .ok_or_else(|| TimesheetError::storage("Entry view missing after connect"))
    }

    /// Rebuilds the connection from the effective credentials and reloads
    /// the entry view against it.
    ///
    /// The previous connection is discarded even when reconnecting fails.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&mut self) -> Result<&Connection<C>, TimesheetError> {
        self.connection = None;
        let connection = self.connect_with(self.store.effective()).await?;
        tracing::debug!(
            "Connected to workspace {} with {} projects",
            connection.workspace.id,
            connection.projects.projects().count()
        );

        if let Some(view) = &self.entries {
            let reloaded = view
                .reconnect(
                    connection.client.clone(),
                    &connection.workspace.id,
                    connection.projects.clone(),
                )
                .await;
            if let Err(e) = reloaded {
                tracing::warn!("Reconnected but failed to reload entries: {}", e);
            }
        }
        Ok(&*self.connection.insert(connection))
    }

    /// Waits for the next configuration change, then reconnects.
    pub async fn next_change(&mut self) -> Result<&Connection<C>, TimesheetError> {
        match self.changes.recv().await {
            Ok(ConfigChanged) | Err(RecvError::Lagged(_)) => self.refresh().await,
            Err(RecvError::Closed) => Err(TimesheetError::storage("Configuration store closed")),
        }
    }

    /// Drains pending notifications; true if any arrived.
    fn sync_changes(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.changes.try_recv() {
                Ok(ConfigChanged) | Err(TryRecvError::Lagged(_)) => changed = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return changed,
            }
        }
    }

    async fn connect_with(&self, credentials: Credentials) -> Result<Connection<C>, TimesheetError> {
        if !credentials.has_api_key() {
            return Err(TimesheetError::validation("API key is required"));
        }

        let client = (self.connect)(&credentials)?;
        let workspace = resolve_workspace(client.as_ref(), credentials.workspace_hint()).await?;
        let projects = ProjectIndex::new(client.list_projects(&workspace.id).await?);

        Ok(Connection {
            client,
            credentials,
            workspace,
            projects,
        })
    }
}

/// The hinted workspace, or the first one the service lists.
async fn resolve_workspace<C: TimeTrackingClient>(
    client: &C,
    hint: Option<&str>,
) -> Result<Workspace, TimesheetError> {
    let workspaces = client.list_workspaces().await?;

    match hint {
        Some(id) => Ok(workspaces
            .into_iter()
            .find(|workspace| workspace.id == id)
            .unwrap_or_else(|| {
                tracing::warn!("Workspace {} is not listed for this API key, using it anyway", id);
                Workspace {
                    id: id.to_string(),
                    name: id.to_string(),
                }
            })),
        None => workspaces
            .into_iter()
            .next()
            .ok_or_else(|| TimesheetError::validation("No workspaces available for this API key")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mock::{entry, Call, MockTimeTracking};
    use crate::projects::tests::project;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::Duration;

    fn workspaces() -> Vec<Workspace> {
        ["ws1", "ws2"]
            .iter()
            .map(|id| Workspace {
                id: id.to_string(),
                name: format!("Workspace {}", id),
            })
            .collect()
    }

    fn credentials(api_key: &str, workspace_id: &str) -> Credentials {
        Credentials {
            api_key: api_key.to_string(),
            workspace_id: workspace_id.to_string(),
            ..Credentials::default()
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<ConfigStore>,
        mock: Arc<MockTimeTracking>,
        connects: Arc<AtomicUsize>,
        tracker: Tracker<MockTimeTracking>,
    }

    fn fixture(mock: MockTimeTracking) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ConfigStore::at(dir.path().join("credentials.toml")));
        let mock = Arc::new(mock);
        let connects = Arc::new(AtomicUsize::new(0));

        let tracker = {
            let mock = mock.clone();
            let connects = connects.clone();
            Tracker::new(store.clone(), UtcOffset::UTC, move |_| {
                connects.fetch_add(1, Ordering::SeqCst);
                Ok(mock.clone())
            })
        };

        Fixture {
            _dir: dir,
            store,
            mock,
            connects,
            tracker,
        }
    }

    #[tokio::test]
    async fn missing_api_key_never_builds_a_client() {
        let mut f = fixture(MockTimeTracking::new());

        let err = f.tracker.connection().await.err().unwrap();

        assert_eq!(err, TimesheetError::validation("API key is required"));
        assert_eq!(f.connects.load(Ordering::SeqCst), 0);
        assert_eq!(f.mock.total_calls(), 0);
    }

    #[tokio::test]
    async fn first_workspace_is_used_without_hint() {
        let mut f = fixture(MockTimeTracking::new().with_workspaces(workspaces()));
        f.store.save(&credentials("key", "")).unwrap();

        let connection = f.tracker.connection().await.unwrap();

        assert_eq!(connection.workspace.id, "ws1");
    }

    #[tokio::test]
    async fn workspace_hint_selects_workspace() {
        let mut f = fixture(MockTimeTracking::new().with_workspaces(workspaces()));
        f.store.save(&credentials("key", "ws2")).unwrap();

        let connection = f.tracker.connection().await.unwrap();

        assert_eq!(connection.workspace.name, "Workspace ws2");
    }

    #[tokio::test]
    async fn no_workspaces_is_a_validation_error() {
        let mut f = fixture(MockTimeTracking::new().with_workspaces(vec![]));
        f.store.save(&credentials("key", "")).unwrap();

        assert!(f.tracker.connection().await.err().unwrap().is_validation());
    }

    #[tokio::test]
    async fn connection_is_reused_until_config_changes() {
        let mut f = fixture(MockTimeTracking::new().with_workspaces(workspaces()));
        f.store.save(&credentials("key", "ws1")).unwrap();

        f.tracker.connection().await.unwrap();
        f.tracker.connection().await.unwrap();
        assert_eq!(f.connects.load(Ordering::SeqCst), 1);

        f.store.save(&credentials("key", "ws2")).unwrap();
        let connection = f.tracker.connection().await.unwrap();

        assert_eq!(connection.workspace.id, "ws2");
        assert_eq!(f.connects.load(Ordering::SeqCst), 2);
        assert_eq!(f.mock.call_count(Call::Projects), 2);
    }

    #[tokio::test]
    async fn next_change_reconnects_after_save() {
        let mut f = fixture(MockTimeTracking::new().with_workspaces(workspaces()));
        f.store.save(&credentials("key", "ws1")).unwrap();
        f.tracker.connection().await.unwrap();

        f.store.save(&credentials("key", "ws2")).unwrap();
        let connection = f.tracker.next_change().await.unwrap();

        assert_eq!(connection.workspace.id, "ws2");
    }

    #[tokio::test]
    async fn client_and_project_hints_apply_to_listings() {
        let mut f = fixture(MockTimeTracking::new().with_projects(vec![
            project("p1", Some(("c1", "Acme"))),
            project("p2", Some(("c2", "Globex"))),
        ]));
        f.store
            .save(&Credentials {
                api_key: "key".to_string(),
                client_id: "c2".to_string(),
                project_id: "p2".to_string(),
                ..Credentials::default()
            })
            .unwrap();

        let connection = f.tracker.connection().await.unwrap();

        let groups = connection.visible_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].client.name, "Globex");
        assert_eq!(connection.default_project().unwrap().id, "p2");
    }

    #[tokio::test]
    async fn running_entry_is_found_among_recent_entries() {
        let now = OffsetDateTime::now_utc();
        let mut f = fixture(MockTimeTracking::new().with_entries(vec![
            entry("done", Some("p1"), now - Duration::hours(3), Some(now - Duration::hours(2))),
            entry("live", Some("p1"), now - Duration::minutes(20), None),
        ]));
        f.store.save(&credentials("key", "")).unwrap();

        let connection = f.tracker.connection().await.unwrap();
        let running = connection.running_entry().await.unwrap().unwrap();

        assert_eq!(running.id, "live");
    }

    #[tokio::test]
    async fn saved_config_reloads_entries_in_new_workspace() {
        let now = OffsetDateTime::now_utc();
        let mut f = fixture(
            MockTimeTracking::new()
                .with_workspaces(workspaces())
                .with_entries(vec![entry(
                    "e1",
                    Some("p1"),
                    now - Duration::hours(2),
                    Some(now - Duration::hours(1)),
                )]),
        );
        f.store.save(&credentials("key", "ws1")).unwrap();
        let view = f.tracker.entries().await.unwrap();
        view.load_recent(7).await.unwrap();

        f.store.save(&credentials("key", "ws2")).unwrap();
        f.tracker.next_change().await.unwrap();

        assert_eq!(
            f.mock.listed_workspaces(),
            vec!["ws1".to_string(), "ws2".to_string()]
        );
        assert_eq!(view.workspace_id().await, "ws2");
        assert_eq!(view.cached().await.len(), 1);
        assert!(Arc::ptr_eq(&view, &f.tracker.entries().await.unwrap()));
        assert_eq!(f.mock.call_count(Call::ListEntries), 2);
    }

    #[tokio::test]
    async fn entry_view_follows_save_on_next_use() {
        let mut f = fixture(MockTimeTracking::new().with_workspaces(workspaces()));
        f.store.save(&credentials("key", "ws1")).unwrap();
        let view = f.tracker.entries().await.unwrap();

        f.store.save(&credentials("key", "ws2")).unwrap();
        let again = f.tracker.entries().await.unwrap();

        assert!(Arc::ptr_eq(&view, &again));
        assert_eq!(view.workspace_id().await, "ws2");
        assert_eq!(f.mock.listed_workspaces(), vec!["ws2".to_string()]);
    }
}
