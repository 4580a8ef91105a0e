use std::sync::Arc;

use clockify::{NewTimeEntry, TimeEntry};
use time::{Duration, OffsetDateTime};
use tokio::sync::watch;

use crate::{ports::TimeTrackingClient, ticker::Ticker, TimesheetError};

/// A timer backed by a running remote entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningTimer {
    pub project_id: String,
    pub description: String,
    pub started_at: OffsetDateTime,
    pub remote_entry_id: String,
}

impl RunningTimer {
    pub fn elapsed(&self) -> Duration {
        OffsetDateTime::now_utc() - self.started_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Starting,
    Running(RunningTimer),
    Stopping(RunningTimer),
}

/// Local timer session mirroring one running entry on the remote service.
///
/// `Starting` and `Stopping` are held while the remote call is in flight. A
/// failed start returns to `Idle`; a failed stop stays `Running` so it can be
/// retried.
pub struct TimerSession<C> {
    client: Arc<C>,
    workspace_id: String,
    state: TimerState,
    ticker: Option<Ticker>,
    elapsed: Arc<watch::Sender<Duration>>,
}

impl<C: TimeTrackingClient> TimerSession<C> {
    pub fn new(client: Arc<C>, workspace_id: impl Into<String>) -> Self {
        let (elapsed, _) = watch::channel(Duration::ZERO);
        Self {
            client,
            workspace_id: workspace_id.into(),
            state: TimerState::Idle,
            ticker: None,
            elapsed: Arc::new(elapsed),
        }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn running(&self) -> Option<&RunningTimer> {
        match &self.state {
            TimerState::Running(timer) | TimerState::Stopping(timer) => Some(timer),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running(_))
    }

    /// Time since start, derived from the clock on every call.
    pub fn elapsed(&self) -> Option<Duration> {
        self.running().map(RunningTimer::elapsed)
    }

    /// Elapsed time, republished once per second while running.
    pub fn subscribe(&self) -> watch::Receiver<Duration> {
        self.elapsed.subscribe()
    }

    #[tracing::instrument(skip(self))]
    pub async fn start(
        &mut self,
        project_id: &str,
        description: &str,
    ) -> Result<RunningTimer, TimesheetError> {
        let project_id = project_id.trim();
        let description = description.trim();
        if project_id.is_empty() {
            return Err(TimesheetError::validation("Project is required"));
        }
        if description.is_empty() {
            return Err(TimesheetError::validation("Description is required"));
        }
        if self.state != TimerState::Idle {
            return Err(TimesheetError::TimerAlreadyRunning);
        }

        self.state = TimerState::Starting;
        let started_at = OffsetDateTime::now_utc();
        let new_entry = NewTimeEntry::running(started_at, project_id, description);

        match self
            .client
            .create_time_entry(&self.workspace_id, &new_entry)
            .await
        {
            Ok(created) => {
                let timer = RunningTimer {
                    project_id: project_id.to_string(),
                    description: description.to_string(),
                    started_at: created.time_interval.start,
                    remote_entry_id: created.id,
                };
                tracing::debug!("Started timer {}", timer.remote_entry_id);
                self.run(timer.clone());
                Ok(timer)
            }
            Err(e) => {
                self.state = TimerState::Idle;
                Err(e)
            }
        }
    }

    /// Closes the running entry at the current time.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<TimeEntry, TimesheetError> {
        let timer = match &self.state {
            TimerState::Running(timer) => timer.clone(),
            _ => return Err(TimesheetError::NoTimerRunning),
        };

        self.state = TimerState::Stopping(timer.clone());
        let end = OffsetDateTime::now_utc();

        match self
            .client
            .patch_time_entry(&self.workspace_id, &timer.remote_entry_id, end)
            .await
        {
            Ok(closed) => {
                self.state = TimerState::Idle;
                if let Some(ticker) = self.ticker.take() {
                    ticker.cancel();
                }
                self.elapsed.send_replace(Duration::ZERO);
                tracing::debug!("Stopped timer {}", timer.remote_entry_id);
                Ok(closed)
            }
            Err(e) => {
                tracing::warn!("Failed to stop timer {}: {}", timer.remote_entry_id, e);
                self.state = TimerState::Running(timer);
                Err(e)
            }
        }
    }

    /// Adopts an entry that is still running on the remote service.
    pub fn resume(&mut self, entry: &TimeEntry) -> Result<RunningTimer, TimesheetError> {
        if self.state != TimerState::Idle {
            return Err(TimesheetError::TimerAlreadyRunning);
        }
        if !entry.is_running() {
            return Err(TimesheetError::validation(format!(
                "Time entry {} is not running",
                entry.id
            )));
        }

        let timer = RunningTimer {
            project_id: entry.project_id.clone().unwrap_or_default(),
            description: entry.description.clone(),
            started_at: entry.time_interval.start,
            remote_entry_id: entry.id.clone(),
        };
        self.run(timer.clone());
        Ok(timer)
    }

    fn run(&mut self, timer: RunningTimer) {
        self.elapsed.send_replace(timer.elapsed());
        self.ticker = Some(Ticker::start(timer.started_at, self.elapsed.clone()));
        self.state = TimerState::Running(timer);
    }
}
