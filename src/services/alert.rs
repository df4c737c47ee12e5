//! Alert engine
//!
//! Derives a budget's spend tier and records one alert per upward tier
//! crossing. The tier of the most recent alert is the baseline; it falls
//! back to Normal once spend drops below the threshold that produced it, so
//! a later re-crossing alerts again.

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{AlertId, AlertTier, BudgetAlert, BudgetId, ProjectBudget};
use crate::notify::LedgerEvent;
use crate::storage::{Storage, Tx};

/// Service for budget alerts
pub struct AlertEngine<'a> {
    storage: &'a Storage,
}

impl<'a> AlertEngine<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Re-evaluate a budget and record an alert if it crossed into a higher tier
    pub fn check(&self, budget_id: BudgetId) -> LedgerResult<Option<BudgetAlert>> {
        self.storage.transaction(|tx| Self::check_within(tx, budget_id))
    }

    /// Alert check inside an open transaction
    pub(crate) fn check_within(tx: &Tx<'_>, budget_id: BudgetId) -> LedgerResult<Option<BudgetAlert>> {
        let budget = tx.budgets.get_active(budget_id)?;
        let current = budget.current_tier();
        let last = Self::last_tier(tx, &budget)?;

        if current <= last {
            tracing::debug!(budget = %budget.id, %current, %last, "no tier change");
            return Ok(None);
        }

        let alert = BudgetAlert::new(
            budget.id,
            budget.project_id,
            current,
            budget.threshold_amount(current),
            budget.spent_amount,
            budget.percent_used(),
            alert_message(&budget, current),
        );

        tx.alerts.upsert(alert.clone())?;
        tx.log_create(
            EntityType::Alert,
            alert.id.full(),
            Some(format!("{} {}", budget.name, current)),
            &alert,
        );
        tx.emit(LedgerEvent::BudgetAlertRaised {
            alert_id: alert.id,
            budget_id: budget.id,
            project_id: budget.project_id,
            tier: current,
            percentage_used: alert.percentage_used,
        });

        tracing::info!(
            budget = %budget.id,
            tier = %current,
            percent = alert.percentage_used,
            "budget alert raised"
        );
        Ok(Some(alert))
    }

    /// Tier of the latest alert, or Normal when spend has since dropped
    /// below the threshold that produced it
    fn last_tier(tx: &Tx<'_>, budget: &ProjectBudget) -> LedgerResult<AlertTier> {
        let tier = match tx.alerts.latest_for_budget(budget.id)? {
            Some(alert) if budget.has_reached(budget.threshold_percentage(alert.alert_type)) => {
                alert.alert_type
            }
            _ => AlertTier::Normal,
        };
        Ok(tier)
    }

    /// Acknowledge an alert. Does not affect tier tracking.
    pub fn acknowledge(&self, alert_id: AlertId, by: &str) -> LedgerResult<BudgetAlert> {
        let by = by.trim();
        if by.is_empty() {
            return Err(LedgerError::Validation(
                "An acknowledgement needs the acknowledging user".into(),
            ));
        }

        self.storage.transaction(|tx| {
            let mut alert = tx.alerts.get_required(alert_id)?;
            if alert.is_acknowledged {
                return Ok(alert);
            }

            let before = alert.clone();
            alert.acknowledge(by);
            tx.alerts.upsert(alert.clone())?;
            tx.log_update(
                EntityType::Alert,
                alert.id.full(),
                None,
                &before,
                &alert,
                Some(format!("acknowledged by {}", by)),
            );

            tracing::info!(alert = %alert.id, by, "alert acknowledged");
            Ok(alert)
        })
    }

    /// Alert history of a budget, oldest first
    pub fn list_alerts(
        &self,
        budget_id: BudgetId,
        only_unacknowledged: bool,
    ) -> LedgerResult<Vec<BudgetAlert>> {
        if only_unacknowledged {
            self.storage.alerts.unacknowledged_for_budget(budget_id)
        } else {
            self.storage.alerts.for_budget(budget_id)
        }
    }

    /// Find an alert by its ID string
    pub fn find(&self, identifier: &str) -> LedgerResult<BudgetAlert> {
        let id = match identifier.parse::<AlertId>() {
            Ok(id) => id,
            Err(_) => self
                .storage
                .alerts
                .resolve_short_id(identifier)?
                .ok_or_else(|| LedgerError::alert_not_found(identifier))?,
        };
        self.storage.alerts.get_required(id)
    }
}

fn alert_message(budget: &ProjectBudget, tier: AlertTier) -> String {
    let used = format!(
        "{:.1}% used ({} of {})",
        budget.percent_used(),
        budget.spent_amount,
        budget.total_budget
    );
    match tier {
        AlertTier::Exceeded => format!("Budget '{}' has been exceeded: {}", budget.name, used),
        _ => format!("Budget '{}' reached the {} threshold: {}", budget.name, tier, used),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerPaths;
    use crate::models::{Money, ProjectId};
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::open(paths).unwrap();
        (temp_dir, storage)
    }

    fn seed_budget(storage: &Storage, total: i64) -> BudgetId {
        let budget = ProjectBudget::new(ProjectId::new(), "Fit-out", Money::from_cents(total));
        storage.budgets.upsert(budget.clone()).unwrap();
        budget.id
    }

    fn set_spent(storage: &Storage, id: BudgetId, spent: i64) {
        let mut budget = storage.budgets.get(id).unwrap().unwrap();
        budget.spent_amount = Money::from_cents(spent);
        storage.budgets.upsert(budget).unwrap();
    }

    fn tiers(storage: &Storage, id: BudgetId) -> Vec<AlertTier> {
        storage
            .alerts
            .for_budget(id)
            .unwrap()
            .iter()
            .map(|a| a.alert_type)
            .collect()
    }

    #[test]
    fn test_check_is_idempotent() {
        let (_temp, storage) = create_test_storage();
        let engine = AlertEngine::new(&storage);
        let id = seed_budget(&storage, 10_000);

        for spent in [7_000, 8_000, 8_000, 9_500, 9_500] {
            set_spent(&storage, id, spent);
            engine.check(id).unwrap();
        }

        assert_eq!(tiers(&storage, id), vec![AlertTier::Warning, AlertTier::Critical]);
    }

    #[test]
    fn test_alert_snapshot() {
        let (_temp, storage) = create_test_storage();
        let engine = AlertEngine::new(&storage);
        let id = seed_budget(&storage, 1_000_000);
        set_spent(&storage, id, 800_000);

        let alert = engine.check(id).unwrap().unwrap();
        assert_eq!(alert.alert_type, AlertTier::Warning);
        assert_eq!(alert.threshold_amount.cents(), 750_000);
        assert_eq!(alert.current_amount.cents(), 800_000);
        assert!((alert.percentage_used - 80.0).abs() < 1e-9);
        assert!(alert.message.contains("Warning"));
    }

    #[test]
    fn test_jump_straight_to_exceeded() {
        let (_temp, storage) = create_test_storage();
        let engine = AlertEngine::new(&storage);
        let id = seed_budget(&storage, 10_000);
        set_spent(&storage, id, 12_000);

        engine.check(id).unwrap();
        assert_eq!(tiers(&storage, id), vec![AlertTier::Exceeded]);
    }

    #[test]
    fn test_drop_below_and_recross_alerts_again() {
        let (_temp, storage) = create_test_storage();
        let engine = AlertEngine::new(&storage);
        let id = seed_budget(&storage, 10_000);

        set_spent(&storage, id, 8_000);
        engine.check(id).unwrap();
        set_spent(&storage, id, 5_000);
        assert!(engine.check(id).unwrap().is_none());
        set_spent(&storage, id, 8_000);
        engine.check(id).unwrap();

        assert_eq!(tiers(&storage, id), vec![AlertTier::Warning, AlertTier::Warning]);
    }

    #[test]
    fn test_partial_drop_records_the_lower_tier() {
        let (_temp, storage) = create_test_storage();
        let engine = AlertEngine::new(&storage);
        let id = seed_budget(&storage, 10_000);

        set_spent(&storage, id, 9_500);
        engine.check(id).unwrap();

        // Below the critical threshold but still above warning
        set_spent(&storage, id, 8_000);
        let lower = engine.check(id).unwrap().unwrap();
        assert_eq!(lower.alert_type, AlertTier::Warning);
        assert!(engine.check(id).unwrap().is_none());

        set_spent(&storage, id, 9_500);
        engine.check(id).unwrap();

        assert_eq!(
            tiers(&storage, id),
            vec![AlertTier::Critical, AlertTier::Warning, AlertTier::Critical]
        );
    }

    #[test]
    fn test_acknowledge_does_not_reset_tier() {
        let (_temp, storage) = create_test_storage();
        let engine = AlertEngine::new(&storage);
        let id = seed_budget(&storage, 10_000);
        set_spent(&storage, id, 9_200);

        let alert = engine.check(id).unwrap().unwrap();
        let acked = engine.acknowledge(alert.id, "pm").unwrap();
        assert!(acked.is_acknowledged);
        assert_eq!(acked.acknowledged_by.as_deref(), Some("pm"));
        assert!(acked.acknowledged_at.is_some());

        assert!(engine.check(id).unwrap().is_none());
        assert!(engine.list_alerts(id, true).unwrap().is_empty());
        assert_eq!(engine.list_alerts(id, false).unwrap().len(), 1);
    }

    #[test]
    fn test_check_deleted_budget_is_not_found() {
        let (_temp, storage) = create_test_storage();
        let engine = AlertEngine::new(&storage);
        let id = seed_budget(&storage, 10_000);
        let mut budget = storage.budgets.get(id).unwrap().unwrap();
        budget.soft_delete();
        storage.budgets.upsert(budget).unwrap();

        assert!(engine.check(id).unwrap_err().is_not_found());
    }
}
