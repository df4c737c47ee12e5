//! Budget ledger
//!
//! Owns each project's budget figures. `spent_amount` only ever changes
//! through [`BudgetLedger::apply_spend_within`], which also runs the alert
//! check inside the same transaction.

use serde::Serialize;

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    AlertTier, BudgetId, CategoryBudgets, CostCategory, ExpenseStatus, Money, ProjectBudget,
    ProjectId, DEFAULT_CRITICAL_THRESHOLD, DEFAULT_WARNING_THRESHOLD,
};
use crate::storage::{Storage, Tx};

use super::alert::AlertEngine;

/// Input for creating a budget
#[derive(Debug, Clone)]
pub struct CreateBudgetInput {
    pub project_id: ProjectId,
    pub name: String,
    pub total_budget: Money,
    pub warning_threshold: Option<f64>,
    pub critical_threshold: Option<f64>,
    pub category_budgets: CategoryBudgets,
    pub notes: Option<String>,
}

impl CreateBudgetInput {
    pub fn new(project_id: ProjectId, name: impl Into<String>, total_budget: Money) -> Self {
        Self {
            project_id,
            name: name.into(),
            total_budget,
            warning_threshold: None,
            critical_threshold: None,
            category_budgets: CategoryBudgets::default(),
            notes: None,
        }
    }
}

/// Changes to an existing budget; `None` leaves a field as it is
#[derive(Debug, Clone, Default)]
pub struct UpdateBudgetInput {
    pub name: Option<String>,
    pub total_budget: Option<Money>,
    pub warning_threshold: Option<f64>,
    pub critical_threshold: Option<f64>,
    pub category_budgets: Option<CategoryBudgets>,
    pub notes: Option<String>,
}

/// Spend against one cost category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: CostCategory,
    pub budgeted: Option<Money>,
    pub spent: Money,
    pub remaining: Option<Money>,
}

/// Number of live expenses in each status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExpenseCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub reimbursed: usize,
}

impl ExpenseCounts {
    fn add(&mut self, status: ExpenseStatus) {
        match status {
            ExpenseStatus::Pending => self.pending += 1,
            ExpenseStatus::Approved => self.approved += 1,
            ExpenseStatus::Rejected => self.rejected += 1,
            ExpenseStatus::Reimbursed => self.reimbursed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.approved + self.rejected + self.reimbursed
    }
}

/// Alert state of a budget at the time of the summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertFlags {
    pub current_tier: AlertTier,
    pub is_warning: bool,
    pub is_critical: bool,
    pub is_exceeded: bool,
    pub unacknowledged: usize,
    pub total_alerts: usize,
}

/// Read-only view of a project's budget
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSummary {
    pub budget_id: BudgetId,
    pub project_id: ProjectId,
    pub name: String,
    pub total_budget: Money,
    pub spent_amount: Money,
    pub remaining: Money,
    pub percent_used: f64,
    pub categories: Vec<CategorySummary>,
    pub expense_counts: ExpenseCounts,
    pub alerts: AlertFlags,
}

/// Service for project budgets
pub struct BudgetLedger<'a> {
    storage: &'a Storage,
}

impl<'a> BudgetLedger<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a project's budget.
    ///
    /// The spent amount starts at the sum of the project's already-counted
    /// expenses. A project can only have one live budget.
    pub fn create_budget(&self, input: CreateBudgetInput) -> LedgerResult<ProjectBudget> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(LedgerError::Validation("Budget name cannot be empty".into()));
        }

        let mut budget = ProjectBudget::with_thresholds(
            input.project_id,
            name,
            input.total_budget,
            input.warning_threshold.unwrap_or(DEFAULT_WARNING_THRESHOLD),
            input.critical_threshold.unwrap_or(DEFAULT_CRITICAL_THRESHOLD),
        );
        budget.category_budgets = input.category_budgets;
        if let Some(notes) = input.notes {
            budget.notes = notes;
        }
        budget
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        self.storage.transaction(|tx| {
            if let Some(existing) = tx.budgets.active_for_project(budget.project_id)? {
                return Err(LedgerError::Conflict(format!(
                    "Project {} already has budget {}",
                    budget.project_id, existing.id
                )));
            }

            budget.spent_amount = tx
                .expenses
                .for_project(budget.project_id)?
                .iter()
                .filter(|e| e.counts_toward_spend())
                .map(|e| e.amount)
                .sum();

            tx.budgets.upsert(budget.clone())?;
            tx.log_create(
                EntityType::Budget,
                budget.id.full(),
                Some(budget.name.clone()),
                &budget,
            );
            Self::run_alert_check(tx, budget.id);

            tracing::info!(budget = %budget.id, project = %budget.project_id, total = %budget.total_budget, "budget created");
            Ok(budget)
        })
    }

    /// Update a budget and re-evaluate its alert tier
    pub fn update_budget(&self, id: BudgetId, input: UpdateBudgetInput) -> LedgerResult<ProjectBudget> {
        self.storage.transaction(|tx| {
            let mut budget = tx.budgets.get_active(id)?;
            let before = budget.clone();

            if let Some(name) = input.name {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(LedgerError::Validation("Budget name cannot be empty".into()));
                }
                budget.name = name;
            }
            if let Some(total) = input.total_budget {
                budget.total_budget = total;
            }
            if let Some(warning) = input.warning_threshold {
                budget.warning_threshold = warning;
            }
            if let Some(critical) = input.critical_threshold {
                budget.critical_threshold = critical;
            }
            if let Some(categories) = input.category_budgets {
                budget.category_budgets = categories;
            }
            if let Some(notes) = input.notes {
                budget.notes = notes;
            }

            budget
                .validate()
                .map_err(|e| LedgerError::Validation(e.to_string()))?;
            budget.updated_at = chrono::Utc::now();

            tx.budgets.upsert(budget.clone())?;
            tx.log_update(
                EntityType::Budget,
                budget.id.full(),
                Some(budget.name.clone()),
                &before,
                &budget,
                Some(budget_diff(&before, &budget)),
            );
            Self::run_alert_check(tx, budget.id);

            tracing::info!(budget = %budget.id, "budget updated");
            Ok(budget)
        })
    }

    /// Soft-delete a budget
    pub fn delete_budget(&self, id: BudgetId) -> LedgerResult<ProjectBudget> {
        self.storage.transaction(|tx| {
            let mut budget = tx.budgets.get_active(id)?;
            budget.soft_delete();
            tx.budgets.upsert(budget.clone())?;
            tx.log_delete(
                EntityType::Budget,
                budget.id.full(),
                Some(budget.name.clone()),
                &budget,
            );

            tracing::info!(budget = %budget.id, "budget deleted");
            Ok(budget)
        })
    }

    /// Add a signed amount to a budget's spend and run the alert check
    pub fn apply_spend(&self, budget_id: BudgetId, delta: Money) -> LedgerResult<ProjectBudget> {
        self.storage
            .transaction(|tx| Self::apply_spend_within(tx, budget_id, delta))
    }

    /// Spend mutation inside an open transaction.
    ///
    /// A failing alert check is logged and does not undo the spend; the tier
    /// is re-derived from stored state on the next check.
    pub(crate) fn apply_spend_within(
        tx: &Tx<'_>,
        budget_id: BudgetId,
        delta: Money,
    ) -> LedgerResult<ProjectBudget> {
        let mut budget = tx.budgets.get_active(budget_id)?;
        let before = budget.clone();

        budget.apply_spend(delta);
        tx.budgets.upsert(budget.clone())?;
        tx.log_update(
            EntityType::Budget,
            budget.id.full(),
            Some(budget.name.clone()),
            &before,
            &budget,
            Some(format!("spent {} -> {}", before.spent_amount, budget.spent_amount)),
        );
        tracing::info!(budget = %budget.id, delta = %delta, spent = %budget.spent_amount, "spend applied");

        Self::run_alert_check(tx, budget.id);
        Ok(budget)
    }

    /// Apply spend to the project's live budget, if it has one
    pub(crate) fn apply_project_spend(
        tx: &Tx<'_>,
        project_id: ProjectId,
        delta: Money,
    ) -> LedgerResult<Option<ProjectBudget>> {
        match tx.budgets.active_for_project(project_id)? {
            Some(budget) => Self::apply_spend_within(tx, budget.id, delta).map(Some),
            None => {
                tracing::debug!(project = %project_id, "no live budget, spend not tracked");
                Ok(None)
            }
        }
    }

    fn run_alert_check(tx: &Tx<'_>, budget_id: BudgetId) {
        if let Err(err) = AlertEngine::check_within(tx, budget_id) {
            tracing::warn!(budget = %budget_id, error = %err, "alert check failed");
        }
    }

    /// Get a budget by ID
    pub fn get(&self, id: BudgetId) -> LedgerResult<ProjectBudget> {
        self.storage.budgets.get_active(id)
    }

    /// Find a budget by ID string or by project ID string
    pub fn find(&self, identifier: &str) -> LedgerResult<ProjectBudget> {
        if let Ok(id) = identifier.parse::<BudgetId>() {
            if let Ok(budget) = self.storage.budgets.get_active(id) {
                return Ok(budget);
            }
        }
        if let Ok(project) = identifier.parse::<ProjectId>() {
            if let Some(budget) = self.storage.budgets.active_for_project(project)? {
                return Ok(budget);
            }
        }
        if let Some(id) = self.storage.budgets.resolve_short_id(identifier)? {
            return self.storage.budgets.get_active(id);
        }
        Err(LedgerError::budget_not_found(identifier))
    }

    /// List all live budgets
    pub fn list_budgets(&self) -> LedgerResult<Vec<ProjectBudget>> {
        self.storage.budgets.list_active()
    }

    /// Summarize a project's budget
    pub fn get_summary(&self, project_id: ProjectId) -> LedgerResult<BudgetSummary> {
        let budget = self
            .storage
            .budgets
            .active_for_project(project_id)?
            .ok_or_else(|| LedgerError::budget_not_found(format!("project {}", project_id)))?;

        let expenses = self.storage.expenses.for_project(project_id)?;

        let mut expense_counts = ExpenseCounts::default();
        for expense in &expenses {
            expense_counts.add(expense.status);
        }

        let categories = CostCategory::ALL
            .iter()
            .map(|&category| {
                let spent: Money = expenses
                    .iter()
                    .filter(|e| e.category == category && e.counts_toward_spend())
                    .map(|e| e.amount)
                    .sum();
                let budgeted = budget.category_budgets.get(category);
                CategorySummary {
                    category,
                    budgeted,
                    spent,
                    remaining: budgeted.map(|b| b - spent),
                }
            })
            .collect();

        let history = self.storage.alerts.for_budget(budget.id)?;
        let current_tier = budget.current_tier();
        let alerts = AlertFlags {
            current_tier,
            is_warning: current_tier == AlertTier::Warning,
            is_critical: current_tier == AlertTier::Critical,
            is_exceeded: current_tier == AlertTier::Exceeded,
            unacknowledged: history.iter().filter(|a| !a.is_acknowledged).count(),
            total_alerts: history.len(),
        };

        Ok(BudgetSummary {
            budget_id: budget.id,
            project_id,
            remaining: budget.remaining(),
            percent_used: budget.percent_used(),
            name: budget.name,
            total_budget: budget.total_budget,
            spent_amount: budget.spent_amount,
            categories,
            expense_counts,
            alerts,
        })
    }
}

fn budget_diff(before: &ProjectBudget, after: &ProjectBudget) -> String {
    let mut changes = Vec::new();
    if before.name != after.name {
        changes.push(format!("name: {} -> {}", before.name, after.name));
    }
    if before.total_budget != after.total_budget {
        changes.push(format!("total: {} -> {}", before.total_budget, after.total_budget));
    }
    if before.warning_threshold != after.warning_threshold {
        changes.push(format!(
            "warning: {} -> {}",
            before.warning_threshold, after.warning_threshold
        ));
    }
    if before.critical_threshold != after.critical_threshold {
        changes.push(format!(
            "critical: {} -> {}",
            before.critical_threshold, after.critical_threshold
        ));
    }
    if before.category_budgets != after.category_budgets {
        changes.push("category budgets changed".to_string());
    }
    if changes.is_empty() {
        "no changes".to_string()
    } else {
        changes.join(", ")
    }
}
