//! Display formatting for terminal output
//!
//! Provides utilities for formatting ledger data for terminal display,
//! as tables for lists and aligned detail views for single records.

pub mod budget;
pub mod invoice;
pub mod work;

pub use budget::{format_alert_list, format_budget_list, format_budget_summary};
pub use invoice::{format_invoice_details, format_invoice_list};
pub use work::{format_expense_list, format_time_list};
