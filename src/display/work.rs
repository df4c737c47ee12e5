//! Expense and time entry display formatting

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::{Expense, TimeEntry};

#[derive(Tabled)]
struct ExpenseRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Flags")]
    flags: String,
    #[tabled(rename = "Description")]
    description: String,
}

#[derive(Tabled)]
struct TimeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "Hours")]
    hours: String,
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Format expenses as a table.
///
/// Flags: B billable, R reimbursable, I claimed by an invoice.
pub fn format_expense_list(expenses: &[Expense]) -> String {
    if expenses.is_empty() {
        return "No expenses found.\n".to_string();
    }

    let rows = expenses.iter().map(|e| {
        let mut flags = String::new();
        if e.is_billable {
            flags.push('B');
        }
        if e.is_reimbursable {
            flags.push('R');
        }
        if e.is_claimed() {
            flags.push('I');
        }
        ExpenseRow {
            id: e.id.to_string(),
            date: e.date.to_string(),
            category: e.category.to_string(),
            amount: e.amount.to_string(),
            status: e.status.to_string(),
            flags,
            description: e.description.clone(),
        }
    });

    let mut table = Table::new(rows);
    table.with(Style::psql());
    format!("{}\n", table)
}

/// Format time entries as a table
pub fn format_time_list(entries: &[TimeEntry]) -> String {
    if entries.is_empty() {
        return "No time entries found.\n".to_string();
    }

    let rows = entries.iter().map(|t| TimeRow {
        id: t.id.to_string(),
        date: t.date.to_string(),
        user: t.user.clone(),
        hours: t.hours.to_string(),
        rate: t.hourly_rate.to_string(),
        amount: t.amount().to_string(),
        status: t.status.to_string(),
    });

    let mut table = Table::new(rows);
    table.with(Style::psql());
    format!("{}\n", table)
}
