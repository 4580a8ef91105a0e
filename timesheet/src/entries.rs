//! Cached window of the user's time entries, enriched with project data.
//!
//! Every load takes a generation ticket when it is issued. When loads
//! overlap, only the most recently issued one may replace the cache, so a
//! slow stale response never overwrites a newer one.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use clockify::{TimeEntry, TimeEntryUpdate};
use itertools::Itertools;
use time::{Date, OffsetDateTime, UtcOffset};
use tokio::sync::{Mutex, RwLock};

use crate::{
    batch::MAX_HOURS_PER_DAY,
    duration::{format_hours_minutes, parse_hours},
    ports::TimeTrackingClient,
    projects::ProjectIndex,
    time_utils::{days_before, end_of_day, hours, start_of_day},
    TimesheetError,
};

pub const RECENT_LIMIT: usize = 5;
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Project details shown next to an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryProject {
    pub name: String,
    pub color: String,
    pub client_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeEntryView {
    pub entry: TimeEntry,
    pub project: Option<EntryProject>,
}

impl TimeEntryView {
    pub fn hours(&self) -> f64 {
        self.entry
            .time_interval
            .duration
            .as_deref()
            .map(parse_hours)
            .unwrap_or(0.0)
    }

    pub fn duration_label(&self) -> String {
        match self.entry.time_interval.duration.as_deref() {
            Some(duration) => format_hours_minutes(duration),
            None => "running".to_string(),
        }
    }

    pub fn project_name(&self) -> &str {
        self.project
            .as_ref()
            .map(|project| project.name.as_str())
            .unwrap_or("No project")
    }

    pub fn local_date(&self, offset: UtcOffset) -> Date {
        self.entry.time_interval.start.to_offset(offset).date()
    }
}

/// Local acknowledgment of a day submitted for approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalAck {
    pub date: Date,
    pub entry_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Window {
    Recent(i64),
    Range(Date, Date),
}

/// Service and workspace the view loads from.
struct Source<C> {
    client: Arc<C>,
    workspace_id: String,
}

impl<C> Clone for Source<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            workspace_id: self.workspace_id.clone(),
        }
    }
}

pub struct EntryView<C> {
    source: RwLock<Source<C>>,
    offset: UtcOffset,
    projects: RwLock<ProjectIndex>,
    cache: RwLock<Vec<TimeEntryView>>,
    generation: AtomicU64,
    last_window: Mutex<Window>,
}

impl<C: TimeTrackingClient> EntryView<C> {
    pub fn new(client: Arc<C>, workspace_id: impl Into<String>, offset: UtcOffset) -> Self {
        Self {
            source: RwLock::new(Source {
                client,
                workspace_id: workspace_id.into(),
            }),
            offset,
            projects: RwLock::new(ProjectIndex::default()),
            cache: RwLock::new(Vec::new()),
            generation: AtomicU64::new(0),
            last_window: Mutex::new(Window::Recent(DEFAULT_WINDOW_DAYS)),
        }
    }

    pub fn with_projects(self, projects: ProjectIndex) -> Self {
        Self {
            projects: RwLock::new(projects),
            ..self
        }
    }

    /// Points the view at another service or workspace and reloads its last
    /// window there. The cache is cleared first; a failed reload leaves it empty.
    #[tracing::instrument(skip(self, client, projects))]
    pub async fn reconnect(
        &self,
        client: Arc<C>,
        workspace_id: &str,
        projects: ProjectIndex,
    ) -> Result<Vec<TimeEntryView>, TimesheetError> {
        {
            let mut cache = self.cache.write().await;
            *self.source.write().await = Source {
                client,
                workspace_id: workspace_id.to_string(),
            };
            *self.projects.write().await = projects;
            self.generation.fetch_add(1, Ordering::SeqCst);
            cache.clear();
        }
        self.reload_last_window().await
    }

    pub async fn workspace_id(&self) -> String {
        self.source.read().await.workspace_id.clone()
    }

    /// Snapshot of the whole cached window.
    pub async fn cached(&self) -> Vec<TimeEntryView> {
        self.cache.read().await.clone()
    }

    /// Loads the last `window_days` days and returns the first few entries.
    pub async fn load_recent(&self, window_days: i64) -> Result<Vec<TimeEntryView>, TimesheetError> {
        if window_days <= 0 {
            return Err(TimesheetError::validation("Window must be at least one day"));
        }
        let now = OffsetDateTime::now_utc();
        let since = days_before(now, window_days).ok_or_else(|| {
            TimesheetError::validation(format!("Window of {} days is out of range", window_days))
        })?;
        *self.last_window.lock().await = Window::Recent(window_days);

        let mut views = self.reload((since, now)).await?;
        views.truncate(RECENT_LIMIT);
        Ok(views)
    }

    /// Loads every entry between two dates, both inclusive.
    pub async fn load_range(&self, from: Date, to: Date) -> Result<Vec<TimeEntryView>, TimesheetError> {
        if from > to {
            return Err(TimesheetError::validation(format!(
                "Range start {} is after its end {}",
                from, to
            )));
        }
        *self.last_window.lock().await = Window::Range(from, to);

        self.reload((start_of_day(from, self.offset), end_of_day(to, self.offset)))
            .await
    }

    /// Hours across the cached window. Running entries count as zero.
    pub async fn total_hours(&self) -> f64 {
        self.cache.read().await.iter().map(TimeEntryView::hours).sum()
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_entry(&self, entry_id: &str) -> Result<(), TimesheetError> {
        let source = self.source().await;
        source
            .client
            .delete_time_entry(&source.workspace_id, entry_id)
            .await?;

        if let Err(e) = self.reload_last_window().await {
            tracing::warn!("Deleted {} but failed to reload entries: {}", entry_id, e);
            self.cache
                .write()
                .await
                .retain(|view| view.entry.id != entry_id);
        }
        Ok(())
    }

    /// Sets a new description and length on a cached entry, keeping its start,
    /// project and billable flag.
    #[tracing::instrument(skip(self))]
    pub async fn edit_entry(
        &self,
        entry_id: &str,
        description: &str,
        new_hours: f64,
    ) -> Result<TimeEntry, TimesheetError> {
        if !(new_hours > 0.0 && new_hours <= MAX_HOURS_PER_DAY) {
            return Err(TimesheetError::validation(format!(
                "Hours must be greater than 0 and at most {}",
                MAX_HOURS_PER_DAY
            )));
        }

        let existing = self
            .cache
            .read()
            .await
            .iter()
            .find(|view| view.entry.id == entry_id)
            .map(|view| view.entry.clone())
            .ok_or_else(|| TimesheetError::EntryNotFound(entry_id.to_string()))?;

        let start = existing.time_interval.start;
        let end = start
            .checked_add(hours(new_hours))
            .ok_or_else(|| TimesheetError::validation("Entry would end after the last supported date"))?;
        let update = TimeEntryUpdate {
            start,
            end,
            description: description.trim().to_string(),
            project_id: existing.project_id.clone(),
            billable: existing.billable,
        };

        let source = self.source().await;
        let updated = source
            .client
            .update_time_entry(&source.workspace_id, entry_id, &update)
            .await?;

        if let Err(e) = self.reload_last_window().await {
            tracing::warn!("Updated {} but failed to reload entries: {}", entry_id, e);
        }
        Ok(updated)
    }

    /// Cached entries starting on `date` in the view's offset.
    pub async fn entries_on_date(&self, date: Date) -> Vec<TimeEntryView> {
        self.cache
            .read()
            .await
            .iter()
            .filter(|view| view.local_date(self.offset) == date)
            .cloned()
            .collect()
    }

    /// Distinct dates with at least one cached entry, in cache order.
    pub async fn dates_with_entries(&self) -> Vec<Date> {
        self.cache
            .read()
            .await
            .iter()
            .map(|view| view.local_date(self.offset))
            .unique()
            .collect()
    }

    /// Acknowledges a day as submitted for approval. Nothing is sent remotely.
    pub async fn submit_for_approval(&self, date: Date) -> Result<ApprovalAck, TimesheetError> {
        let entry_count = self.entries_on_date(date).await.len();
        if entry_count == 0 {
            return Err(TimesheetError::validation(format!(
                "No entries to submit on {}",
                date
            )));
        }

        tracing::info!("Submitted {} entries on {} for approval", entry_count, date);
        Ok(ApprovalAck { date, entry_count })
    }

    async fn source(&self) -> Source<C> {
        self.source.read().await.clone()
    }

    async fn reload_last_window(&self) -> Result<Vec<TimeEntryView>, TimesheetError> {
        let window = *self.last_window.lock().await;
        match window {
            Window::Recent(days) => self.load_recent(days).await,
            Window::Range(from, to) => self.load_range(from, to).await,
        }
    }

    /// Fetches and enriches `range`; replaces the cache if no newer load was issued.
    async fn reload(
        &self,
        range: (OffsetDateTime, OffsetDateTime),
    ) -> Result<Vec<TimeEntryView>, TimesheetError> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let source = self.source().await;

        let entries = match source.client.current_user().await? {
            Some(user_id) => {
                source
                    .client
                    .list_time_entries(&source.workspace_id, &user_id, range)
                    .await?
            }
            None => {
                tracing::warn!("No current user for these credentials, showing no entries");
                Vec::new()
            }
        };

        let views = self.enrich(entries).await;

        let mut cache = self.cache.write().await;
        if self.generation.load(Ordering::SeqCst) == ticket {
            *cache = views.clone();
        } else {
            tracing::debug!("Discarding stale entry load #{}", ticket);
        }
        Ok(views)
    }

    async fn enrich(&self, entries: Vec<TimeEntry>) -> Vec<TimeEntryView> {
        let projects = self.projects.read().await;
        entries
            .into_iter()
            .map(|entry| {
                let project = entry
                    .project_id
                    .as_deref()
                    .and_then(|id| projects.resolve(id))
                    .map(|project| EntryProject {
                        name: project.name.clone(),
                        color: project.color.clone(),
                        client_name: project.client_name.clone(),
                    });
                TimeEntryView { entry, project }
            })
            .collect()
    }
}
