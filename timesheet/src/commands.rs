use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use timesheet::{
    batch::EntryTemplate,
    config::{ConfigStore, Credentials},
    context::{Connection, Tracker},
    duration::{format_clock, format_hours_minutes, format_total},
    entries::{EntryView, TimeEntryView},
    ports::TimeTrackingClient,
    TimesheetError,
};
use time::UtcOffset;

use crate::cli::{Commands, ConfigCommand, CredentialArgs, LogArgs, TimerCommand};

pub async fn run(command: Commands, offset: UtcOffset) -> Result<()> {
    let store = Arc::new(ConfigStore::open_default()?);
    let mut tracker = Tracker::clockify(store, offset);

    match command {
        Commands::Config(command) => config(tracker.store(), command),
        Commands::Projects { all } => projects(connect(&mut tracker).await?, all),
        Commands::Timer(command) => timer(connect(&mut tracker).await?, command).await,
        Commands::Log(args) => log(connect(&mut tracker).await?, args, offset).await,
        Commands::Recent { days } => {
            let entries = entry_view(&mut tracker).await?;
            let recent = entries
                .load_recent(days)
                .await
                .context("Failed to load recent entries")?;
            print_entries(&recent, offset);
            Ok(())
        }
        Commands::Day { date } => {
            let entries = entry_view(&mut tracker).await?;
            let loaded = entries
                .load_range(date, date)
                .await
                .with_context(|| format!("Failed to load entries on {}", date))?;
            print_entries(&loaded, offset);
            println!("Total: {}", format_total(entries.total_hours().await));
            Ok(())
        }
        Commands::Report { from, to } => {
            let entries = entry_view(&mut tracker).await?;
            entries
                .load_range(from, to)
                .await
                .with_context(|| format!("Failed to load entries from {} to {}", from, to))?;
            for date in entries.dates_with_entries().await {
                let hours: f64 = entries
                    .entries_on_date(date)
                    .await
                    .iter()
                    .map(TimeEntryView::hours)
                    .sum();
                println!("{}  {}", date, format_total(hours));
            }
            println!("Total: {}", format_total(entries.total_hours().await));
            Ok(())
        }
        Commands::Edit {
            entry_id,
            hours,
            description,
            days,
        } => {
            let entries = entry_view(&mut tracker).await?;
            entries
                .load_recent(days)
                .await
                .context("Failed to load recent entries")?;
            let updated = entries
                .edit_entry(&entry_id, &description, hours)
                .await
                .with_context(|| format!("Failed to edit entry {}", entry_id))?;
            println!("Updated {}", updated.id);
            Ok(())
        }
        Commands::Delete { entry_id } => {
            entry_view(&mut tracker)
                .await?
                .delete_entry(&entry_id)
                .await
                .with_context(|| format!("Failed to delete entry {}", entry_id))?;
            println!("Deleted {}", entry_id);
            Ok(())
        }
        Commands::Approve { date } => {
            let entries = entry_view(&mut tracker).await?;
            entries
                .load_range(date, date)
                .await
                .with_context(|| format!("Failed to load entries on {}", date))?;
            let ack = entries.submit_for_approval(date).await?;
            println!(
                "Submitted {} entries on {} for approval",
                ack.entry_count, ack.date
            );
            Ok(())
        }
    }
}

async fn connect<C: TimeTrackingClient>(tracker: &mut Tracker<C>) -> Result<&Connection<C>> {
    tracker
        .connection()
        .await
        .context("Failed to connect to Clockify")
}

async fn entry_view<C: TimeTrackingClient>(tracker: &mut Tracker<C>) -> Result<Arc<EntryView<C>>> {
    tracker
        .entries()
        .await
        .context("Failed to connect to Clockify")
}

fn config(store: &ConfigStore, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let credentials = store.effective();
            println!("api_key      = {}", mask(&credentials.api_key));
            println!("workspace_id = {}", credentials.workspace_id);
            println!("client_id    = {}", credentials.client_id);
            println!("project_id   = {}", credentials.project_id);
        }
        ConfigCommand::Set(args) => {
            store.save(&apply(store.load(), args))?;
            println!("Saved {}", store.path().display());
        }
        ConfigCommand::Reset(args) => {
            store.save(&apply(store.reset(), args))?;
            println!("Saved {}", store.path().display());
        }
        ConfigCommand::Path => println!("{}", store.path().display()),
    }
    Ok(())
}

fn apply(mut credentials: Credentials, args: CredentialArgs) -> Credentials {
    let fields = [
        (&mut credentials.api_key, args.api_key),
        (&mut credentials.workspace_id, args.workspace),
        (&mut credentials.client_id, args.client),
        (&mut credentials.project_id, args.project),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            *field = value.trim().to_string();
        }
    }
    credentials
}

fn mask(api_key: &str) -> String {
    if api_key.is_empty() {
        return "(not set)".to_string();
    }
    let visible: String = api_key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("****{}", visible)
}

fn projects<C: TimeTrackingClient>(connection: &Connection<C>, all: bool) -> Result<()> {
    let groups = if all {
        connection.projects.for_client(None)
    } else {
        connection.visible_groups()
    };

    println!("Workspace: {}", connection.workspace.name);
    for group in groups {
        println!("{} ({})", group.client.name, group.projects_count);
        for project in &group.projects {
            println!("  {}  {}", project.id, project.name);
        }
    }
    Ok(())
}

fn project_or_default<C: TimeTrackingClient>(
    connection: &Connection<C>,
    project: Option<String>,
) -> Result<String> {
    project
        .or_else(|| connection.default_project().map(|p| p.id.clone()))
        .ok_or_else(|| anyhow!("No project given and no default project configured"))
}

async fn timer<C: TimeTrackingClient>(
    connection: &Connection<C>,
    command: TimerCommand,
) -> Result<()> {
    let mut session = connection.timer();

    match command {
        TimerCommand::Start {
            project,
            description,
        } => {
            let project_id = project_or_default(connection, project)?;
            if connection.running_entry().await?.is_some() {
                return Err(TimesheetError::TimerAlreadyRunning.into());
            }
            let running = session.start(&project_id, &description.join(" ")).await?;
            let label = connection
                .projects
                .resolve(&running.project_id)
                .map(|p| connection.projects.label(p))
                .unwrap_or(running.project_id);
            println!("Started {} on {}", running.remote_entry_id, label);
        }
        TimerCommand::Stop => {
            let entry = connection
                .running_entry()
                .await?
                .ok_or(TimesheetError::NoTimerRunning)?;
            session.resume(&entry)?;
            let closed = session.stop().await.context("Failed to stop the timer")?;
            let length = closed
                .time_interval
                .duration
                .as_deref()
                .map(format_hours_minutes)
                .unwrap_or_default();
            println!("Stopped {} after {}", closed.id, length);
        }
        TimerCommand::Status => match connection.running_entry().await? {
            Some(entry) => {
                let running = session.resume(&entry)?;
                println!(
                    "{}  {}  {}",
                    format_clock(running.elapsed()),
                    running.description,
                    running.project_id
                );
            }
            None => println!("No timer running"),
        },
        TimerCommand::Watch => {
            let entry = connection
                .running_entry()
                .await?
                .ok_or(TimesheetError::NoTimerRunning)?;
            let running = session.resume(&entry)?;
            println!("{} ({})", running.description, running.project_id);

            let mut elapsed = session.subscribe();
            loop {
                tokio::select! {
                    changed = elapsed.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let clock = format_clock(*elapsed.borrow_and_update());
                        println!("{}", clock);
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
    }
    Ok(())
}

async fn log<C: TimeTrackingClient>(
    connection: &Connection<C>,
    args: LogArgs,
    offset: UtcOffset,
) -> Result<()> {
    let template = EntryTemplate {
        project_id: project_or_default(connection, args.project)?,
        description: args.description,
        hours_per_day: args.hours,
    };

    let result = connection.batch(offset).submit(&template, &args.dates).await?;
    for item in &result.items {
        match &item.outcome {
            Ok(entry) => println!("{}  logged {}", item.date, entry.id),
            Err(failure) => println!("{}  failed: {}", item.date, failure.error),
        }
    }
    println!(
        "{} succeeded, {} failed",
        result.succeeded(),
        result.failed()
    );
    Ok(())
}

fn print_entries(entries: &[TimeEntryView], offset: UtcOffset) {
    if entries.is_empty() {
        println!("No entries");
        return;
    }
    for view in entries {
        println!(
            "{}  {:>8}  {}  {}  [{}]",
            view.local_date(offset),
            view.duration_label(),
            view.entry.id,
            view.entry.description,
            view.project_name()
        );
    }
}
