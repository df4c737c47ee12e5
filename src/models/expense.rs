//! Expense model
//!
//! Expenses are submitted against a project, approved or rejected by an
//! approver, and may later be claimed by an invoice when billable.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::budget::CostCategory;
use super::ids::{ExpenseId, InvoiceId, ProjectId};
use super::money::Money;

/// Approval status of an expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Reimbursed,
}

impl ExpenseStatus {
    pub const ALL: [ExpenseStatus; 4] = [
        Self::Pending,
        Self::Approved,
        Self::Rejected,
        Self::Reimbursed,
    ];

    /// Whether an expense in this status counts toward a budget's spend.
    ///
    /// A reimbursed expense was approved first and stays spent.
    pub fn counts_toward_spend(&self) -> bool {
        matches!(self, Self::Approved | Self::Reimbursed)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "reimbursed" => Some(Self::Reimbursed),
            _ => None,
        }
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Approved => write!(f, "Approved"),
            Self::Rejected => write!(f, "Rejected"),
            Self::Reimbursed => write!(f, "Reimbursed"),
        }
    }
}

/// A project expense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    /// Unique identifier
    pub id: ExpenseId,

    /// Project the expense is booked against
    pub project_id: ProjectId,

    /// Date the cost was incurred
    pub date: NaiveDate,

    /// Amount (always positive)
    pub amount: Money,

    /// Cost category
    #[serde(default)]
    pub category: CostCategory,

    /// Description
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: ExpenseStatus,

    /// Can be billed to the client
    #[serde(default)]
    pub is_billable: bool,

    /// Paid out of pocket and owed back to the submitter
    #[serde(default)]
    pub is_reimbursable: bool,

    pub submitted_by: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,

    /// Invoice that claimed this expense
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<InvoiceId>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Expense {
    /// Create a new pending expense
    pub fn new(
        project_id: ProjectId,
        date: NaiveDate,
        amount: Money,
        category: CostCategory,
        submitted_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ExpenseId::new(),
            project_id,
            date,
            amount,
            category,
            description: String::new(),
            status: ExpenseStatus::Pending,
            is_billable: false,
            is_reimbursable: false,
            submitted_by: submitted_by.into(),
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            invoice_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Check if the expense is soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Check if an invoice has claimed this expense
    pub fn is_claimed(&self) -> bool {
        self.invoice_id.is_some()
    }

    /// Whether the expense currently contributes to its budget's spend
    pub fn counts_toward_spend(&self) -> bool {
        !self.is_deleted() && self.status.counts_toward_spend()
    }

    /// Whether the expense can be pulled into an invoice
    pub fn is_claimable(&self) -> bool {
        !self.is_deleted()
            && self.status == ExpenseStatus::Approved
            && self.is_billable
            && !self.is_claimed()
    }

    /// Set the status
    pub fn set_status(&mut self, status: ExpenseStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Mark as approved
    pub fn approve(&mut self, by: impl Into<String>) {
        self.approved_by = Some(by.into());
        self.approved_at = Some(Utc::now());
        self.rejection_reason = None;
        self.set_status(ExpenseStatus::Approved);
    }

    /// Mark as rejected
    pub fn reject(&mut self, by: impl Into<String>, reason: Option<String>) {
        self.approved_by = Some(by.into());
        self.approved_at = None;
        self.rejection_reason = reason;
        self.set_status(ExpenseStatus::Rejected);
    }

    /// Soft-delete the expense
    pub fn soft_delete(&mut self) {
        let now = Utc::now();
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    /// Validate the expense
    pub fn validate(&self) -> Result<(), ExpenseValidationError> {
        if !self.amount.is_positive() {
            return Err(ExpenseValidationError::NonPositiveAmount(self.amount));
        }
        if self.submitted_by.trim().is_empty() {
            return Err(ExpenseValidationError::MissingSubmitter);
        }
        Ok(())
    }
}

impl fmt::Display for Expense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({})",
            self.date.format("%Y-%m-%d"),
            self.description,
            self.amount,
            self.status
        )
    }
}

/// Validation errors for expenses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpenseValidationError {
    NonPositiveAmount(Money),
    MissingSubmitter,
}

impl fmt::Display for ExpenseValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveAmount(amount) => {
                write!(f, "Expense amount must be positive, got {}", amount)
            }
            Self::MissingSubmitter => write!(f, "Expense must have a submitter"),
        }
    }
}

impl std::error::Error for ExpenseValidationError {}
