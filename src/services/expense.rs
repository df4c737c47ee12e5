//! Expense service
//!
//! Drives the expense approval workflow. Every status change that moves an
//! expense into or out of the counted set (Approved, Reimbursed) adjusts the
//! project budget in the same transaction, so the budget's spend always
//! equals the sum of its counted expenses.

use chrono::NaiveDate;

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{CostCategory, Expense, ExpenseId, ExpenseStatus, Money, ProjectId};
use crate::storage::{Storage, Tx};

use super::budget::BudgetLedger;

/// Input for submitting an expense
#[derive(Debug, Clone)]
pub struct SubmitExpenseInput {
    pub project_id: ProjectId,
    pub date: NaiveDate,
    pub amount: Money,
    pub category: CostCategory,
    pub description: String,
    pub is_billable: bool,
    pub is_reimbursable: bool,
    pub submitted_by: String,
}

/// Service for expenses
pub struct ExpenseService<'a> {
    storage: &'a Storage,
}

impl<'a> ExpenseService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Submit a new pending expense
    pub fn submit(&self, input: SubmitExpenseInput) -> LedgerResult<Expense> {
        let mut expense = Expense::new(
            input.project_id,
            input.date,
            input.amount,
            input.category,
            input.submitted_by.trim(),
        );
        expense.description = input.description.trim().to_string();
        expense.is_billable = input.is_billable;
        expense.is_reimbursable = input.is_reimbursable;

        expense
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        self.storage.transaction(|tx| {
            tx.expenses.upsert(expense.clone())?;
            tx.log_create(
                EntityType::Expense,
                expense.id.full(),
                Some(expense.description.clone()),
                &expense,
            );

            tracing::info!(expense = %expense.id, amount = %expense.amount, "expense submitted");
            Ok(expense)
        })
    }

    /// Approve a pending expense and add it to the project's spend
    pub fn approve(&self, id: ExpenseId, by: &str) -> LedgerResult<Expense> {
        let by = required_actor(by)?;
        self.storage.transaction(|tx| {
            let mut expense = tx.expenses.get_active(id)?;
            if expense.status != ExpenseStatus::Pending {
                return Err(LedgerError::Conflict(format!(
                    "Expense {} is {}, only pending expenses can be approved",
                    expense.id, expense.status
                )));
            }

            let before = expense.clone();
            expense.approve(by);
            Self::save_transition(tx, &before, &expense)?;
            BudgetLedger::apply_project_spend(tx, expense.project_id, expense.amount)?;

            tracing::info!(expense = %expense.id, by, "expense approved");
            Ok(expense)
        })
    }

    /// Reject a pending or approved expense, reversing its spend if it counted
    pub fn reject(&self, id: ExpenseId, by: &str, reason: Option<String>) -> LedgerResult<Expense> {
        let by = required_actor(by)?;
        self.storage.transaction(|tx| {
            let mut expense = tx.expenses.get_active(id)?;
            if !matches!(expense.status, ExpenseStatus::Pending | ExpenseStatus::Approved) {
                return Err(LedgerError::Conflict(format!(
                    "Expense {} is {} and cannot be rejected",
                    expense.id, expense.status
                )));
            }
            Self::ensure_unclaimed(&expense)?;

            let before = expense.clone();
            expense.reject(by, reason);
            Self::save_transition(tx, &before, &expense)?;
            if before.counts_toward_spend() {
                BudgetLedger::apply_project_spend(tx, expense.project_id, -expense.amount)?;
            }

            tracing::info!(expense = %expense.id, by, "expense rejected");
            Ok(expense)
        })
    }

    /// Mark an approved, reimbursable expense as paid back. It stays counted.
    pub fn mark_reimbursed(&self, id: ExpenseId) -> LedgerResult<Expense> {
        self.storage.transaction(|tx| {
            let mut expense = tx.expenses.get_active(id)?;
            if expense.status != ExpenseStatus::Approved {
                return Err(LedgerError::Conflict(format!(
                    "Expense {} is {}, only approved expenses can be reimbursed",
                    expense.id, expense.status
                )));
            }
            if !expense.is_reimbursable {
                return Err(LedgerError::Validation(format!(
                    "Expense {} is not reimbursable",
                    expense.id
                )));
            }

            let before = expense.clone();
            expense.set_status(ExpenseStatus::Reimbursed);
            Self::save_transition(tx, &before, &expense)?;

            tracing::info!(expense = %expense.id, "expense reimbursed");
            Ok(expense)
        })
    }

    /// Soft-delete an expense, reversing its spend if it counted
    pub fn delete(&self, id: ExpenseId) -> LedgerResult<Expense> {
        self.storage.transaction(|tx| {
            let mut expense = tx.expenses.get_active(id)?;
            Self::ensure_unclaimed(&expense)?;

            let counted = expense.counts_toward_spend();
            expense.soft_delete();
            tx.expenses.upsert(expense.clone())?;
            tx.log_delete(
                EntityType::Expense,
                expense.id.full(),
                Some(expense.description.clone()),
                &expense,
            );
            if counted {
                BudgetLedger::apply_project_spend(tx, expense.project_id, -expense.amount)?;
            }

            tracing::info!(expense = %expense.id, "expense deleted");
            Ok(expense)
        })
    }

    /// Get an expense by ID
    pub fn get(&self, id: ExpenseId) -> LedgerResult<Expense> {
        self.storage.expenses.get_active(id)
    }

    /// Find an expense by ID string
    pub fn find(&self, identifier: &str) -> LedgerResult<Expense> {
        let id = match identifier.parse::<ExpenseId>() {
            Ok(id) => id,
            Err(_) => self
                .storage
                .expenses
                .resolve_short_id(identifier)?
                .ok_or_else(|| LedgerError::expense_not_found(identifier))?,
        };
        self.storage.expenses.get_active(id)
    }

    /// Live expenses of a project, optionally narrowed to one status
    pub fn list(&self, project_id: ProjectId, status: Option<ExpenseStatus>) -> LedgerResult<Vec<Expense>> {
        let mut expenses = self.storage.expenses.for_project(project_id)?;
        if let Some(status) = status {
            expenses.retain(|e| e.status == status);
        }
        Ok(expenses)
    }

    fn ensure_unclaimed(expense: &Expense) -> LedgerResult<()> {
        match expense.invoice_id {
            Some(invoice) => Err(LedgerError::Conflict(format!(
                "Expense {} is billed on invoice {}",
                expense.id, invoice
            ))),
            None => Ok(()),
        }
    }

    fn save_transition(tx: &Tx<'_>, before: &Expense, after: &Expense) -> LedgerResult<()> {
        tx.expenses.upsert(after.clone())?;
        tx.log_update(
            EntityType::Expense,
            after.id.full(),
            Some(after.description.clone()),
            before,
            after,
            Some(format!("status: {} -> {}", before.status, after.status)),
        );
        Ok(())
    }
}

fn required_actor(by: &str) -> LedgerResult<&str> {
    let by = by.trim();
    if by.is_empty() {
        Err(LedgerError::Validation("An approver is required".into()))
    } else {
        Ok(by)
    }
}
