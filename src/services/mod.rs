//! Service layer for the project ledger
//!
//! The service layer provides business logic on top of the storage layer,
//! handling validation, state transitions, and cross-entity operations such
//! as spend tracking and work claiming.

pub mod alert;
pub mod budget;
pub mod claim;
pub mod expense;
pub mod invoice;
pub mod lifecycle;
pub mod recurring;
pub mod time_entry;

pub use alert::AlertEngine;
pub use budget::{
    BudgetLedger, BudgetSummary, CreateBudgetInput, ExpenseCounts, UpdateBudgetInput,
};
pub use claim::{ClaimSelection, Claimer};
pub use expense::{ExpenseService, SubmitExpenseInput};
pub use invoice::{
    GenerateInvoiceRequest, InvoiceDefaults, InvoiceLedger, InvoiceView, PaymentInput,
};
pub use lifecycle::InvoiceLifecycle;
pub use recurring::RecurringScheduler;
pub use time_entry::{RecordTimeInput, TimeEntryService};
