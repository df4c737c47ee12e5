//! Budget repository
//!
//! Budgets live in budgets.json. Soft-deleted budgets stay on disk and are
//! filtered out by the lookups below.

use chrono::{DateTime, Utc};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{BudgetId, ProjectBudget, ProjectId};

use super::table::{Record, Table};

/// Repository for project budgets
pub type BudgetRepository = Table<ProjectBudget>;

impl Record for ProjectBudget {
    type Id = BudgetId;

    fn id(&self) -> BudgetId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Table<ProjectBudget> {
    /// Get a budget that has not been deleted
    pub fn get_active(&self, id: BudgetId) -> LedgerResult<ProjectBudget> {
        self.get(id)?
            .filter(|b| !b.is_deleted())
            .ok_or_else(|| LedgerError::budget_not_found(id.to_string()))
    }

    /// The live budget of a project, if any
    pub fn active_for_project(&self, project_id: ProjectId) -> LedgerResult<Option<ProjectBudget>> {
        Ok(self
            .filter(|b| b.project_id == project_id && !b.is_deleted())?
            .into_iter()
            .next())
    }

    /// All budgets that have not been deleted
    pub fn list_active(&self) -> LedgerResult<Vec<ProjectBudget>> {
        self.filter(|b| !b.is_deleted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, BudgetRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = BudgetRepository::new(temp_dir.path().join("budgets.json"));
        (temp_dir, repo)
    }

    #[test]
    fn test_deleted_budget_is_not_found() {
        let (_temp, repo) = create_test_repo();
        let mut budget = ProjectBudget::new(ProjectId::new(), "Site", Money::from_cents(10_000));
        budget.soft_delete();
        repo.upsert(budget.clone()).unwrap();

        let err = repo.get_active(budget.id).unwrap_err();
        assert!(err.is_not_found());
        assert!(repo.active_for_project(budget.project_id).unwrap().is_none());
        assert!(repo.get(budget.id).unwrap().is_some());
    }

    #[test]
    fn test_active_for_project() {
        let (_temp, repo) = create_test_repo();
        let project = ProjectId::new();
        let budget = ProjectBudget::new(project, "Site", Money::from_cents(10_000));
        repo.upsert(budget.clone()).unwrap();
        repo.upsert(ProjectBudget::new(ProjectId::new(), "Other", Money::zero()))
            .unwrap();

        let found = repo.active_for_project(project).unwrap().unwrap();
        assert_eq!(found.id, budget.id);
        assert_eq!(repo.list_active().unwrap().len(), 2);
    }
}
