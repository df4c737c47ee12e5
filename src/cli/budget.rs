//! Budget CLI commands
//!
//! Implements CLI commands for project budgets: creation, updates, manual
//! spend adjustments and the summary view.

use clap::Subcommand;

use crate::config::Settings;
use crate::display::{format_budget_list, format_budget_summary};
use crate::error::LedgerResult;
use crate::models::CategoryBudgets;
use crate::services::{BudgetLedger, CreateBudgetInput, UpdateBudgetInput};
use crate::storage::Storage;

use super::{parse_money, parse_project};

/// Budget subcommands
#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Create a budget for a project
    Create {
        /// Project ID
        project: String,
        /// Budget name
        name: String,
        /// Total budget (e.g., "10000" or "10000.00")
        total: String,
        /// Warning threshold as a fraction (e.g., 0.75)
        #[arg(long)]
        warning: Option<f64>,
        /// Critical threshold as a fraction (e.g., 0.9)
        #[arg(long)]
        critical: Option<f64>,
        /// Labor sub-budget
        #[arg(long)]
        labor: Option<String>,
        /// Material sub-budget
        #[arg(long)]
        material: Option<String>,
        /// Other sub-budget
        #[arg(long)]
        other: Option<String>,
        /// Notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List all budgets
    List,

    /// Show a budget summary
    Show {
        /// Budget ID or project ID
        budget: String,
    },

    /// Edit a budget
    Edit {
        /// Budget ID or project ID
        budget: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        total: Option<String>,
        #[arg(long)]
        warning: Option<f64>,
        #[arg(long)]
        critical: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a budget
    Delete {
        /// Budget ID or project ID
        budget: String,
    },

    /// Adjust spend directly (negative amounts reduce it)
    Spend {
        /// Budget ID or project ID
        budget: String,
        /// Amount to add
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },
}

/// Handle a budget command
pub fn handle_budget_command(
    storage: &Storage,
    settings: &Settings,
    cmd: BudgetCommands,
) -> LedgerResult<()> {
    let ledger = BudgetLedger::new(storage);

    match cmd {
        BudgetCommands::Create {
            project,
            name,
            total,
            warning,
            critical,
            labor,
            material,
            other,
            notes,
        } => {
            let project_id = parse_project(&project)?;
            let mut input = CreateBudgetInput::new(project_id, name, parse_money(&total)?);
            input.warning_threshold = Some(warning.unwrap_or(settings.default_warning_threshold));
            input.critical_threshold =
                Some(critical.unwrap_or(settings.default_critical_threshold));
            input.category_budgets = CategoryBudgets {
                labor: labor.as_deref().map(parse_money).transpose()?,
                material: material.as_deref().map(parse_money).transpose()?,
                other: other.as_deref().map(parse_money).transpose()?,
            };
            input.notes = notes;

            let budget = ledger.create_budget(input)?;
            println!("Created budget: {}", budget.name);
            println!("  Project: {}", budget.project_id);
            println!("  Total:   {}", budget.total_budget);
            println!("  Spent:   {}", budget.spent_amount);
            println!("  ID:      {}", budget.id);
        }

        BudgetCommands::List => {
            let budgets = ledger.list_budgets()?;
            print!("{}", format_budget_list(&budgets));
        }

        BudgetCommands::Show { budget } => {
            let found = ledger.find(&budget)?;
            let summary = ledger.get_summary(found.project_id)?;
            print!("{}", format_budget_summary(&summary));
        }

        BudgetCommands::Edit {
            budget,
            name,
            total,
            warning,
            critical,
            notes,
        } => {
            let found = ledger.find(&budget)?;
            let input = UpdateBudgetInput {
                name,
                total_budget: total.as_deref().map(parse_money).transpose()?,
                warning_threshold: warning,
                critical_threshold: critical,
                category_budgets: None,
                notes,
            };
            let updated = ledger.update_budget(found.id, input)?;
            println!("Updated budget: {}", updated.name);
            println!("  Total: {}  Spent: {}", updated.total_budget, updated.spent_amount);
        }

        BudgetCommands::Delete { budget } => {
            let found = ledger.find(&budget)?;
            let deleted = ledger.delete_budget(found.id)?;
            println!("Deleted budget: {}", deleted.name);
        }

        BudgetCommands::Spend { budget, amount } => {
            let found = ledger.find(&budget)?;
            let updated = ledger.apply_spend(found.id, parse_money(&amount)?)?;
            println!(
                "Spent {} of {} ({:.1}%)",
                updated.spent_amount,
                updated.total_budget,
                updated.percent_used()
            );
            if updated.current_tier().is_alerting() {
                println!("Tier: {}", updated.current_tier());
            }
        }
    }

    Ok(())
}
