use std::sync::Arc;

use clockify::{NewTimeEntry, TimeEntry};
use itertools::Itertools;
use time::{macros::time, Date, UtcOffset};

use crate::{
    ports::TimeTrackingClient,
    time_utils::{at, hours},
    TimesheetError,
};

/// Hours a single day may hold.
pub const MAX_HOURS_PER_DAY: f64 = 24.0;

/// What to log on every selected date.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryTemplate {
    pub project_id: String,
    pub description: String,
    pub hours_per_day: f64,
}

impl EntryTemplate {
    pub fn validate(&self) -> Result<(), TimesheetError> {
        if self.project_id.trim().is_empty() {
            return Err(TimesheetError::validation("Project is required"));
        }
        if self.description.trim().is_empty() {
            return Err(TimesheetError::validation("Description is required"));
        }
        if !(self.hours_per_day > 0.0 && self.hours_per_day <= MAX_HOURS_PER_DAY) {
            return Err(TimesheetError::validation(format!(
                "Hours must be greater than 0 and at most {}",
                MAX_HOURS_PER_DAY
            )));
        }
        Ok(())
    }
}

/// Why a single date could not be logged.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub error: TimesheetError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub date: Date,
    pub outcome: Result<TimeEntry, BatchFailure>,
}

/// Per-date outcomes, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub items: Vec<BatchItem>,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    pub fn is_total_failure(&self) -> bool {
        !self.items.is_empty() && self.succeeded() == 0
    }
}

/// Logs one finished entry per date from a shared template.
///
/// Entries start at 09:00 wall-clock time in `offset`. Each date is an
/// independent remote call; a failure on one date never stops the rest.
pub struct BatchSubmitter<C> {
    client: Arc<C>,
    workspace_id: String,
    offset: UtcOffset,
}

impl<C: TimeTrackingClient> BatchSubmitter<C> {
    pub fn new(client: Arc<C>, workspace_id: impl Into<String>, offset: UtcOffset) -> Self {
        Self {
            client,
            workspace_id: workspace_id.into(),
            offset,
        }
    }

    /// Submits `template` once per distinct date.
    ///
    /// Returns `Err(BatchFailed)` only when every date failed; partial success is `Ok`.
    /// A date whose entry cannot be represented fails validation before anything is sent.
    #[tracing::instrument(skip(self, template), fields(project_id = %template.project_id))]
    pub async fn submit(
        &self,
        template: &EntryTemplate,
        dates: &[Date],
    ) -> Result<BatchResult, TimesheetError> {
        template.validate()?;
        if dates.is_empty() {
            return Err(TimesheetError::validation("Select at least one date"));
        }

        let length = hours(template.hours_per_day);
        let planned = dates
            .iter()
            .copied()
            .unique()
            .map(|date| {
                let start = at(date, time!(09:00), self.offset);
                let end = start.checked_add(length).ok_or_else(|| {
                    TimesheetError::validation(format!(
                        "An entry on {} would end after the last supported date",
                        date
                    ))
                })?;
                let new_entry = NewTimeEntry::finished(
                    start,
                    end,
                    template.project_id.trim(),
                    template.description.trim(),
                );
                Ok((date, new_entry))
            })
            .collect::<Result<Vec<_>, TimesheetError>>()?;

        let mut items = Vec::with_capacity(planned.len());
        for (date, new_entry) in planned {
            let outcome = self
                .client
                .create_time_entry(&self.workspace_id, &new_entry)
                .await
                .map_err(|error| {
                    tracing::error!("Failed to log {} on {}: {}", template.project_id, date, error);
                    BatchFailure { error }
                });
            items.push(BatchItem { date, outcome });
        }

        let result = BatchResult { items };
        if result.is_total_failure() {
            let first_error = result
                .items
                .iter()
                .find_map(|item| item.outcome.as_ref().err())
                .map(|failure| failure.error.to_string())
                .unwrap_or_default();
            return Err(TimesheetError::BatchFailed {
                attempted: result.items.len(),
                first_error,
            });
        }

        tracing::debug!(
            "Logged {} of {} dates",
            result.succeeded(),
            result.items.len()
        );
        Ok(result)
    }
}
