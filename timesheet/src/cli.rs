use clap::{Args, Parser, Subcommand};
use time::{macros::format_description, Date};

#[derive(Debug, Parser)]
#[command(name = "timesheet")]
#[command(about = "Track and log work hours in Clockify")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show or change the stored Clockify credentials
    #[command(subcommand)]
    Config(ConfigCommand),
    /// List projects grouped by client
    Projects {
        /// Ignore the configured client and list every project
        #[arg(long)]
        all: bool,
    },
    /// Start, stop or follow the live timer
    #[command(subcommand)]
    Timer(TimerCommand),
    /// Log the same entry on several dates
    Log(LogArgs),
    /// Show the latest entries
    Recent {
        /// How many days back to look
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Show the entries of one day
    Day {
        #[arg(value_parser = parse_date)]
        date: Date,
    },
    /// Total hours between two dates, both inclusive
    Report {
        #[arg(long, value_parser = parse_date)]
        from: Date,
        #[arg(long, value_parser = parse_date)]
        to: Date,
    },
    /// Change the description and length of an entry
    Edit {
        entry_id: String,
        #[arg(long)]
        hours: f64,
        #[arg(long, short)]
        description: String,
        /// How many days back to look for the entry
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Delete an entry
    Delete { entry_id: String },
    /// Submit one day's entries for approval
    Approve {
        #[arg(value_parser = parse_date)]
        date: Date,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Save credentials, keeping stored values for omitted fields
    Set(CredentialArgs),
    /// Clear every stored field, then save the given ones
    Reset(CredentialArgs),
    /// Print the config file path
    Path,
}

#[derive(Debug, Args)]
pub struct CredentialArgs {
    #[arg(long)]
    pub api_key: Option<String>,
    #[arg(long)]
    pub workspace: Option<String>,
    #[arg(long)]
    pub client: Option<String>,
    #[arg(long)]
    pub project: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum TimerCommand {
    /// Start a running entry
    Start {
        /// Project id; defaults to the configured project
        #[arg(long, short)]
        project: Option<String>,
        /// What you are working on
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
    },
    /// Stop the running entry
    Stop,
    /// Show the running entry
    Status,
    /// Follow the running entry until interrupted
    Watch,
}

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Project id; defaults to the configured project
    #[arg(long, short)]
    pub project: Option<String>,
    #[arg(long, short)]
    pub description: String,
    /// Hours per date
    #[arg(long)]
    pub hours: f64,
    /// Dates as YYYY-MM-DD
    #[arg(required = true, num_args = 1.., value_parser = parse_date)]
    pub dates: Vec<Date>,
}

fn parse_date(value: &str) -> Result<Date, String> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}
