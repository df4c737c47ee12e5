//! Time entry CLI commands

use clap::Subcommand;

use crate::display::format_time_list;
use crate::error::LedgerResult;
use crate::services::{RecordTimeInput, TimeEntryService};
use crate::storage::Storage;

use super::{parse_date_or_today, parse_money, parse_project, parse_quantity};

/// Time entry subcommands
#[derive(Subcommand)]
pub enum TimeCommands {
    /// Record hours worked on a project
    Log {
        /// Project ID
        project: String,
        /// Hours (e.g., "1.5")
        hours: String,
        /// Hourly rate
        #[arg(short, long)]
        rate: String,
        #[arg(short, long, default_value = "cli")]
        user: String,
        /// Work date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        /// Exclude from invoicing
        #[arg(long)]
        non_billable: bool,
    },

    /// Submit a draft entry for approval
    Submit {
        /// Time entry ID
        entry: String,
    },

    /// Approve a submitted entry
    Approve {
        /// Time entry ID
        entry: String,
    },

    /// Reject an entry
    Reject {
        /// Time entry ID
        entry: String,
    },

    /// Delete an entry that has not been invoiced
    Delete {
        /// Time entry ID
        entry: String,
    },

    /// List a project's time entries
    List {
        /// Project ID
        project: String,
    },
}

/// Handle a time entry command
pub fn handle_time_command(storage: &Storage, cmd: TimeCommands) -> LedgerResult<()> {
    let service = TimeEntryService::new(storage);

    match cmd {
        TimeCommands::Log {
            project,
            hours,
            rate,
            user,
            date,
            description,
            non_billable,
        } => {
            let entry = service.record(RecordTimeInput {
                project_id: parse_project(&project)?,
                user,
                date: parse_date_or_today(date.as_deref())?,
                hours: parse_quantity(&hours)?,
                hourly_rate: parse_money(&rate)?,
                description,
                is_billable: !non_billable,
            })?;
            println!("Logged {}h at {} ({})", entry.hours, entry.hourly_rate, entry.amount());
            println!("  ID: {}", entry.id);
        }

        TimeCommands::Submit { entry } => {
            let found = service.find(&entry)?;
            let updated = service.submit(found.id)?;
            println!("Time entry {} is {}", updated.id, updated.status);
        }

        TimeCommands::Approve { entry } => {
            let found = service.find(&entry)?;
            let updated = service.approve(found.id)?;
            println!("Time entry {} is {}", updated.id, updated.status);
        }

        TimeCommands::Reject { entry } => {
            let found = service.find(&entry)?;
            let updated = service.reject(found.id)?;
            println!("Time entry {} is {}", updated.id, updated.status);
        }

        TimeCommands::Delete { entry } => {
            let found = service.find(&entry)?;
            service.delete(found.id)?;
            println!("Deleted time entry {}", found.id);
        }

        TimeCommands::List { project } => {
            let entries = service.list(parse_project(&project)?)?;
            print!("{}", format_time_list(&entries));
        }
    }

    Ok(())
}
