//! Expense CLI commands

use clap::Subcommand;

use crate::display::format_expense_list;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{CostCategory, ExpenseStatus};
use crate::services::{ExpenseService, SubmitExpenseInput};
use crate::storage::Storage;

use super::{parse_date_or_today, parse_money, parse_project};

/// Expense subcommands
#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Submit an expense for approval
    Add {
        /// Project ID
        project: String,
        /// Amount (e.g., "42.50")
        amount: String,
        /// Cost category (labor, material, other)
        #[arg(short, long, default_value = "other")]
        category: String,
        /// Expense date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        /// Can be billed to the client
        #[arg(long)]
        billable: bool,
        /// Paid out of pocket and owed back to the submitter
        #[arg(long)]
        reimbursable: bool,
        /// Submitter
        #[arg(long, default_value = "cli")]
        by: String,
    },

    /// Approve a pending expense
    Approve {
        /// Expense ID
        expense: String,
        #[arg(long, default_value = "cli")]
        by: String,
    },

    /// Reject an expense
    Reject {
        /// Expense ID
        expense: String,
        #[arg(long, default_value = "cli")]
        by: String,
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// Mark an approved, reimbursable expense as paid back
    Reimburse {
        /// Expense ID
        expense: String,
    },

    /// Delete an expense
    Delete {
        /// Expense ID
        expense: String,
    },

    /// List a project's expenses
    List {
        /// Project ID
        project: String,
        /// Filter by status (pending, approved, rejected, reimbursed)
        #[arg(short, long)]
        status: Option<String>,
    },
}

/// Handle an expense command
pub fn handle_expense_command(storage: &Storage, cmd: ExpenseCommands) -> LedgerResult<()> {
    let service = ExpenseService::new(storage);

    match cmd {
        ExpenseCommands::Add {
            project,
            amount,
            category,
            date,
            description,
            billable,
            reimbursable,
            by,
        } => {
            let category = CostCategory::parse(&category).ok_or_else(|| {
                LedgerError::Validation(format!(
                    "Invalid category: '{}'. Valid categories: labor, material, other",
                    category
                ))
            })?;

            let expense = service.submit(SubmitExpenseInput {
                project_id: parse_project(&project)?,
                date: parse_date_or_today(date.as_deref())?,
                amount: parse_money(&amount)?,
                category,
                description,
                is_billable: billable,
                is_reimbursable: reimbursable,
                submitted_by: by,
            })?;

            println!("Submitted expense: {} {}", expense.amount, expense.category);
            println!("  Status: {}", expense.status);
            println!("  ID:     {}", expense.id);
        }

        ExpenseCommands::Approve { expense, by } => {
            let found = service.find(&expense)?;
            let approved = service.approve(found.id, &by)?;
            println!("Approved expense {} ({})", approved.id, approved.amount);
        }

        ExpenseCommands::Reject {
            expense,
            by,
            reason,
        } => {
            let found = service.find(&expense)?;
            let rejected = service.reject(found.id, &by, reason)?;
            println!("Rejected expense {} ({})", rejected.id, rejected.amount);
        }

        ExpenseCommands::Reimburse { expense } => {
            let found = service.find(&expense)?;
            let reimbursed = service.mark_reimbursed(found.id)?;
            println!("Reimbursed expense {} ({})", reimbursed.id, reimbursed.amount);
        }

        ExpenseCommands::Delete { expense } => {
            let found = service.find(&expense)?;
            service.delete(found.id)?;
            println!("Deleted expense {}", found.id);
        }

        ExpenseCommands::List { project, status } => {
            let status = status
                .as_deref()
                .map(|s| {
                    ExpenseStatus::parse(s).ok_or_else(|| {
                        LedgerError::Validation(format!("Invalid expense status: '{}'", s))
                    })
                })
                .transpose()?;
            let expenses = service.list(parse_project(&project)?, status)?;
            print!("{}", format_expense_list(&expenses));
        }
    }

    Ok(())
}
