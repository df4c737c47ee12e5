//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod alert;
pub mod budget;
pub mod expense;
pub mod export;
pub mod invoice;
pub mod time;

pub use alert::{handle_alert_command, AlertCommands};
pub use budget::{handle_budget_command, BudgetCommands};
pub use expense::{handle_expense_command, ExpenseCommands};
pub use export::{handle_export_command, ExportCommands};
pub use invoice::{handle_invoice_command, InvoiceCommands};
pub use time::{handle_time_command, TimeCommands};

use chrono::NaiveDate;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Money, Percentage, ProjectId, Quantity};

/// Parse an amount such as "100" or "100.00"
pub(crate) fn parse_money(value: &str) -> LedgerResult<Money> {
    Money::parse(value).map_err(|e| {
        LedgerError::Validation(format!(
            "Invalid amount: '{}'. Use format like '100.00' or '100'. Error: {}",
            value, e
        ))
    })
}

pub(crate) fn parse_quantity(value: &str) -> LedgerResult<Quantity> {
    Quantity::parse(value)
        .map_err(|_| LedgerError::Validation(format!("Invalid quantity: '{}'", value)))
}

pub(crate) fn parse_percentage(value: &str) -> LedgerResult<Percentage> {
    Percentage::parse(value)
        .map_err(|_| LedgerError::Validation(format!("Invalid percentage: '{}'", value)))
}

pub(crate) fn parse_project(value: &str) -> LedgerResult<ProjectId> {
    value
        .parse::<ProjectId>()
        .map_err(|_| LedgerError::Validation(format!("Invalid project ID: '{}'", value)))
}

/// Parse a YYYY-MM-DD date, defaulting to today
pub(crate) fn parse_date_or_today(value: Option<&str>) -> LedgerResult<NaiveDate> {
    match value {
        Some(s) => parse_date(s),
        None => Ok(today()),
    }
}

pub(crate) fn parse_date(value: &str) -> LedgerResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        LedgerError::Validation(format!(
            "Invalid date format: '{}'. Use YYYY-MM-DD",
            value
        ))
    })
}

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_money("12.50").unwrap().cents(), 1250);
        assert!(parse_money("abc").unwrap_err().is_validation());
        assert_eq!(parse_quantity("1.5").unwrap(), Quantity::from_hundredths(150));
        assert_eq!(parse_percentage("8.25%").unwrap().basis_points(), 825);
        assert_eq!(
            parse_date("2025-02-28").unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
        assert!(parse_date("28/02/2025").unwrap_err().is_validation());
        assert!(parse_project("not-a-uuid").unwrap_err().is_validation());
    }
}
