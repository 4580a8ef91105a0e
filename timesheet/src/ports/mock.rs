//! In-memory time-tracking service for tests.

use async_trait::async_trait;
use clockify::{
    NewTimeEntry, Project, TimeEntry, TimeEntryUpdate, TimeInterval, UserId, Workspace,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use time::OffsetDateTime;

use super::TimeTrackingClient;
use crate::TimesheetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Workspaces,
    Projects,
    CurrentUser,
    ListEntries,
    Create,
    Patch,
    Update,
    Delete,
}

/// Mock service keeping entries in memory.
///
/// Counts every call per operation and fails the calls it was told to fail,
/// either by 0-based call index or always.
pub struct MockTimeTracking {
    workspaces: Vec<Workspace>,
    projects: Vec<Project>,
    user: Option<UserId>,
    entries: Mutex<Vec<TimeEntry>>,
    list_script: Mutex<VecDeque<(Duration, Vec<TimeEntry>)>>,
    calls: Mutex<HashMap<Call, usize>>,
    listed: Mutex<Vec<String>>,
    fail_at: HashSet<(Call, usize)>,
    fail_always: HashSet<Call>,
    created: Mutex<Vec<NewTimeEntry>>,
    patched: Mutex<Vec<(String, OffsetDateTime)>>,
    updated: Mutex<Vec<(String, TimeEntryUpdate)>>,
}

impl Default for MockTimeTracking {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTimeTracking {
    /// One workspace `ws1` and a known user, no projects and no entries.
    pub fn new() -> Self {
        Self {
            workspaces: vec![Workspace {
                id: "ws1".to_string(),
                name: "Main".to_string(),
            }],
            projects: Vec::new(),
            user: Some(UserId::new("user-1")),
            entries: Mutex::new(Vec::new()),
            list_script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(HashMap::new()),
            listed: Mutex::new(Vec::new()),
            fail_at: HashSet::new(),
            fail_always: HashSet::new(),
            created: Mutex::new(Vec::new()),
            patched: Mutex::new(Vec::new()),
            updated: Mutex::new(Vec::new()),
        }
    }

    pub fn with_workspaces(mut self, workspaces: Vec<Workspace>) -> Self {
        self.workspaces = workspaces;
        self
    }

    pub fn with_projects(mut self, projects: Vec<Project>) -> Self {
        self.projects = projects;
        self
    }

    pub fn with_entries(self, entries: Vec<TimeEntry>) -> Self {
        *self.entries.lock().unwrap() = entries;
        self
    }

    pub fn without_user(mut self) -> Self {
        self.user = None;
        self
    }

    /// Fails the `index`-th call (0-based) of `call`.
    pub fn failing_at(mut self, call: Call, index: usize) -> Self {
        self.fail_at.insert((call, index));
        self
    }

    pub fn failing(mut self, call: Call) -> Self {
        self.fail_always.insert(call);
        self
    }

    /// Queues the answer of the next entry listing. The answer is taken when
    /// the call begins and returned after `delay`.
    pub fn script_list(&self, delay: Duration, entries: Vec<TimeEntry>) {
        self.list_script.lock().unwrap().push_back((delay, entries));
    }

    pub fn call_count(&self, call: Call) -> usize {
        self.calls.lock().unwrap().get(&call).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Workspace of every entry listing, in call order.
    pub fn listed_workspaces(&self) -> Vec<String> {
        self.listed.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<NewTimeEntry> {
        self.created.lock().unwrap().clone()
    }

    pub fn patched(&self) -> Vec<(String, OffsetDateTime)> {
        self.patched.lock().unwrap().clone()
    }

    pub fn updated(&self) -> Vec<(String, TimeEntryUpdate)> {
        self.updated.lock().unwrap().clone()
    }

    /// Counts the call and decides whether it fails.
    fn record(&self, call: Call) -> Result<usize, TimesheetError> {
        let mut calls = self.calls.lock().unwrap();
        let count = calls.entry(call).or_insert(0);
        let index = *count;
        *count += 1;

        if self.fail_always.contains(&call) || self.fail_at.contains(&(call, index)) {
            return Err(TimesheetError::Remote {
                status: 500,
                message: format!("scripted {:?} failure #{}", call, index),
            });
        }
        Ok(index)
    }
}

fn not_found(entry_id: &str) -> TimesheetError {
    TimesheetError::Remote {
        status: 404,
        message: format!("Time entry {} not found", entry_id),
    }
}

/// ISO-8601 duration text the way the service reports it.
pub fn iso_duration(duration: time::Duration) -> String {
    let total = duration.whole_seconds().max(0);
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    let mut text = String::from("PT");
    if h > 0 {
        text.push_str(&format!("{}H", h));
    }
    if m > 0 {
        text.push_str(&format!("{}M", m));
    }
    if s > 0 || total == 0 {
        text.push_str(&format!("{}S", s));
    }
    text
}

/// A finished entry as the service would return it.
pub fn entry(
    id: &str,
    project_id: Option<&str>,
    start: OffsetDateTime,
    end: Option<OffsetDateTime>,
) -> TimeEntry {
    TimeEntry {
        id: id.to_string(),
        description: format!("work on {}", id),
        time_interval: TimeInterval {
            start,
            end,
            duration: end.map(|end| iso_duration(end - start)),
        },
        project_id: project_id.map(str::to_string),
        billable: true,
        user_id: Some("user-1".to_string()),
        workspace_id: Some("ws1".to_string()),
    }
}

#[async_trait]
impl TimeTrackingClient for MockTimeTracking {
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, TimesheetError> {
        self.record(Call::Workspaces)?;
        Ok(self.workspaces.clone())
    }

    async fn list_projects(&self, _workspace_id: &str) -> Result<Vec<Project>, TimesheetError> {
        self.record(Call::Projects)?;
        Ok(self.projects.clone())
    }

    async fn current_user(&self) -> Result<Option<UserId>, TimesheetError> {
        self.record(Call::CurrentUser)?;
        Ok(self.user.clone())
    }

    async fn list_time_entries(
        &self,
        workspace_id: &str,
        _user_id: &UserId,
        range: (OffsetDateTime, OffsetDateTime),
    ) -> Result<Vec<TimeEntry>, TimesheetError> {
        self.listed.lock().unwrap().push(workspace_id.to_string());
        self.record(Call::ListEntries)?;

        let scripted = self.list_script.lock().unwrap().pop_front();
        if let Some((delay, entries)) = scripted {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            return Ok(entries);
        }

        let (start, end) = range;
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.time_interval.start >= start && e.time_interval.start <= end)
            .cloned()
            .collect())
    }

    async fn create_time_entry(
        &self,
        _workspace_id: &str,
        new_entry: &NewTimeEntry,
    ) -> Result<TimeEntry, TimesheetError> {
        self.created.lock().unwrap().push(new_entry.clone());
        let index = self.record(Call::Create)?;

        let mut created = entry(
            &format!("entry-{}", index + 1),
            Some(new_entry.project_id.as_str()),
            new_entry.start,
            new_entry.end,
        );
        created.description = new_entry.description.clone();
        created.billable = new_entry.billable;

        self.entries.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn patch_time_entry(
        &self,
        _workspace_id: &str,
        entry_id: &str,
        end: OffsetDateTime,
    ) -> Result<TimeEntry, TimesheetError> {
        self.patched.lock().unwrap().push((entry_id.to_string(), end));
        self.record(Call::Patch)?;

        let mut entries = self.entries.lock().unwrap();
        let stored = entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| not_found(entry_id))?;
        stored.time_interval.end = Some(end);
        stored.time_interval.duration = Some(iso_duration(end - stored.time_interval.start));
        Ok(stored.clone())
    }

    async fn update_time_entry(
        &self,
        _workspace_id: &str,
        entry_id: &str,
        update: &TimeEntryUpdate,
    ) -> Result<TimeEntry, TimesheetError> {
        self.updated
            .lock()
            .unwrap()
            .push((entry_id.to_string(), update.clone()));
        self.record(Call::Update)?;

        let mut entries = self.entries.lock().unwrap();
        let stored = entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| not_found(entry_id))?;
        stored.description = update.description.clone();
        stored.project_id = update.project_id.clone();
        stored.billable = update.billable;
        stored.time_interval = TimeInterval {
            start: update.start,
            end: Some(update.end),
            duration: Some(iso_duration(update.end - update.start)),
        };
        Ok(stored.clone())
    }

    async fn delete_time_entry(
        &self,
        _workspace_id: &str,
        entry_id: &str,
    ) -> Result<(), TimesheetError> {
        self.record(Call::Delete)?;

        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| e.id != entry_id);
        if entries.len() == before {
            return Err(not_found(entry_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_duration_matches_service_text() {
        assert_eq!(iso_duration(time::Duration::minutes(90)), "PT1H30M");
        assert_eq!(iso_duration(time::Duration::hours(8)), "PT8H");
        assert_eq!(iso_duration(time::Duration::seconds(45)), "PT45S");
        assert_eq!(iso_duration(time::Duration::ZERO), "PT0S");
    }
}
