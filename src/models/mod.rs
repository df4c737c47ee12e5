//! Core data models for the project ledger
//!
//! This module contains the data structures of the financial ledger:
//! project budgets, expenses, budget alerts, time entries and invoices.

pub mod alert;
pub mod budget;
pub mod expense;
pub mod ids;
pub mod invoice;
pub mod measure;
pub mod money;
pub mod time_entry;

pub use alert::{AlertTier, BudgetAlert};
pub use budget::{
    BudgetValidationError, CategoryBudgets, CostCategory, ProjectBudget,
    DEFAULT_CRITICAL_THRESHOLD, DEFAULT_WARNING_THRESHOLD,
};
pub use expense::{Expense, ExpenseStatus, ExpenseValidationError};
pub use ids::{AlertId, BudgetId, ExpenseId, InvoiceId, PaymentId, ProjectId, TimeEntryId};
pub use invoice::{
    Invoice, InvoiceItem, InvoiceStatus, InvoiceTotals, ItemSource, Payment, PaymentMethod,
    RecurringFrequency,
};
pub use measure::{MeasureParseError, Percentage, Quantity};
pub use money::Money;
pub use time_entry::{TimeEntry, TimeEntryStatus};
