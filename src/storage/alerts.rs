//! Alert repository
//!
//! Alerts are append-only; only the acknowledgement fields ever change.

use chrono::{DateTime, Utc};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{AlertId, BudgetAlert, BudgetId};

use super::table::{Record, Table};

/// Repository for budget alerts
pub type AlertRepository = Table<BudgetAlert>;

impl Record for BudgetAlert {
    type Id = AlertId;

    fn id(&self) -> AlertId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Table<BudgetAlert> {
    pub fn get_required(&self, id: AlertId) -> LedgerResult<BudgetAlert> {
        self.get(id)?
            .ok_or_else(|| LedgerError::alert_not_found(id.to_string()))
    }

    /// Alert history of a budget, oldest first
    pub fn for_budget(&self, budget_id: BudgetId) -> LedgerResult<Vec<BudgetAlert>> {
        self.filter(|a| a.budget_id == budget_id)
    }

    /// Most recently created alert of a budget
    pub fn latest_for_budget(&self, budget_id: BudgetId) -> LedgerResult<Option<BudgetAlert>> {
        Ok(self.for_budget(budget_id)?.pop())
    }

    pub fn unacknowledged_for_budget(&self, budget_id: BudgetId) -> LedgerResult<Vec<BudgetAlert>> {
        self.filter(|a| a.budget_id == budget_id && !a.is_acknowledged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertTier, Money, ProjectId};
    use tempfile::TempDir;

    fn alert(budget_id: BudgetId, tier: AlertTier) -> BudgetAlert {
        BudgetAlert::new(
            budget_id,
            ProjectId::new(),
            tier,
            Money::from_cents(7_500),
            Money::from_cents(8_000),
            80.0,
            "test",
        )
    }

    #[test]
    fn test_latest_for_budget() {
        let temp_dir = TempDir::new().unwrap();
        let repo = AlertRepository::new(temp_dir.path().join("alerts.json"));
        let budget_id = BudgetId::new();

        assert!(repo.latest_for_budget(budget_id).unwrap().is_none());

        repo.upsert(alert(budget_id, AlertTier::Warning)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let critical = alert(budget_id, AlertTier::Critical);
        repo.upsert(critical.clone()).unwrap();
        repo.upsert(alert(BudgetId::new(), AlertTier::Exceeded)).unwrap();

        let latest = repo.latest_for_budget(budget_id).unwrap().unwrap();
        assert_eq!(latest.id, critical.id);
        assert_eq!(repo.for_budget(budget_id).unwrap().len(), 2);
        assert_eq!(repo.unacknowledged_for_budget(budget_id).unwrap().len(), 2);
    }
}
