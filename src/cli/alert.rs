//! Alert CLI commands

use clap::Subcommand;

use crate::display::format_alert_list;
use crate::error::LedgerResult;
use crate::services::{AlertEngine, BudgetLedger};
use crate::storage::Storage;

/// Alert subcommands
#[derive(Subcommand)]
pub enum AlertCommands {
    /// List a budget's alerts
    List {
        /// Budget ID or project ID
        budget: String,
        /// Only alerts nobody has acknowledged
        #[arg(short, long)]
        unacknowledged: bool,
    },

    /// Acknowledge an alert
    Ack {
        /// Alert ID
        alert: String,
        #[arg(long, default_value = "cli")]
        by: String,
    },

    /// Re-evaluate a budget's alert tier
    Check {
        /// Budget ID or project ID
        budget: String,
    },
}

/// Handle an alert command
pub fn handle_alert_command(storage: &Storage, cmd: AlertCommands) -> LedgerResult<()> {
    let engine = AlertEngine::new(storage);
    let budgets = BudgetLedger::new(storage);

    match cmd {
        AlertCommands::List {
            budget,
            unacknowledged,
        } => {
            let found = budgets.find(&budget)?;
            let alerts = engine.list_alerts(found.id, unacknowledged)?;
            print!("{}", format_alert_list(&alerts));
        }

        AlertCommands::Ack { alert, by } => {
            let found = engine.find(&alert)?;
            let acknowledged = engine.acknowledge(found.id, &by)?;
            println!("Acknowledged: {}", acknowledged);
        }

        AlertCommands::Check { budget } => {
            let found = budgets.find(&budget)?;
            match engine.check(found.id)? {
                Some(alert) => println!("New alert: {}", alert),
                None => println!(
                    "No new alert for '{}' (tier {})",
                    found.name,
                    found.current_tier()
                ),
            }
        }
    }

    Ok(())
}
