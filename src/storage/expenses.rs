//! Expense repository
//!
//! Besides plain lookups this repository owns the claim marker on expenses:
//! `claim_where_unclaimed` and `release_claims` flip `invoice_id` under a
//! single write lock.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Expense, ExpenseId, InvoiceId, ProjectId};

use super::table::{Record, Table};

/// Repository for expenses
pub type ExpenseRepository = Table<Expense>;

impl Record for Expense {
    type Id = ExpenseId;

    fn id(&self) -> ExpenseId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Table<Expense> {
    /// Get an expense that has not been deleted
    pub fn get_active(&self, id: ExpenseId) -> LedgerResult<Expense> {
        self.get(id)?
            .filter(|e| !e.is_deleted())
            .ok_or_else(|| LedgerError::expense_not_found(id.to_string()))
    }

    /// Live expenses of a project, oldest first
    pub fn for_project(&self, project_id: ProjectId) -> LedgerResult<Vec<Expense>> {
        self.filter(|e| e.project_id == project_id && !e.is_deleted())
    }

    /// Approved, billable, unclaimed expenses dated within `[from, to]`
    pub fn claimable_in_range(
        &self,
        project_id: ProjectId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> LedgerResult<Vec<Expense>> {
        let mut found = self.filter(|e| {
            e.project_id == project_id && e.is_claimable() && e.date >= from && e.date <= to
        })?;
        found.sort_by_key(|e| (e.date, e.created_at));
        Ok(found)
    }

    /// Mark expenses as billed by `invoice_id`, skipping any that are no
    /// longer claimable. Returns how many were claimed.
    pub fn claim_where_unclaimed(&self, ids: &[ExpenseId], invoice_id: InvoiceId) -> LedgerResult<usize> {
        let now = Utc::now();
        self.update_where(ids, Expense::is_claimable, |e| {
            e.invoice_id = Some(invoice_id);
            e.updated_at = now;
        })
    }

    /// Clear the claim marker on every expense billed by `invoice_id`
    pub fn release_claims(&self, ids: &[ExpenseId], invoice_id: InvoiceId) -> LedgerResult<usize> {
        let now = Utc::now();
        self.update_where(
            ids,
            |e| e.invoice_id == Some(invoice_id),
            |e| {
                e.invoice_id = None;
                e.updated_at = now;
            },
        )
    }
}
