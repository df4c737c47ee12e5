//! Audit entry data structures
//!
//! An entry records one committed change to a ledger record together with
//! JSON snapshots of the record around the change. The snapshots are typed
//! back into ledger values when an entry is shown, so the log reads in terms
//! of money, hours and lifecycle status rather than raw JSON.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::{
    AlertTier, ExpenseStatus, InvoiceStatus, Money, ProjectId, Quantity, TimeEntryStatus,
};

/// Types of operations that can be audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "CREATE"),
            Operation::Update => write!(f, "UPDATE"),
            Operation::Delete => write!(f, "DELETE"),
        }
    }
}

/// Ledger record kinds that appear in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Budget,
    Expense,
    Alert,
    TimeEntry,
    Invoice,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityType::Budget => write!(f, "Budget"),
            EntityType::Expense => write!(f, "Expense"),
            EntityType::Alert => write!(f, "Alert"),
            EntityType::TimeEntry => write!(f, "TimeEntry"),
            EntityType::Invoice => write!(f, "Invoice"),
        }
    }
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the change was committed (UTC)
    pub timestamp: DateTime<Utc>,

    pub operation: Operation,

    pub entity_type: EntityType,

    /// Full UUID of the affected record
    pub entity_id: String,

    /// Name users know the record by (invoice number, budget name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,

    /// Record before the change (updates and deletes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,

    /// Record after the change (creates and updates)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,

    /// Field changes, e.g. `status: Sent -> Paid`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_summary: Option<String>,
}

impl AuditEntry {
    pub fn create<T: Serialize>(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> Self {
        Self::new(Operation::Create, entity_type, entity_id, entity_name, None, Some(entity), None)
    }

    pub fn update<T: Serialize>(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        before: &T,
        after: &T,
        diff_summary: Option<String>,
    ) -> Self {
        Self::new(
            Operation::Update,
            entity_type,
            entity_id,
            entity_name,
            Some(before),
            Some(after),
            diff_summary,
        )
    }

    pub fn delete<T: Serialize>(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> Self {
        Self::new(Operation::Delete, entity_type, entity_id, entity_name, Some(entity), None, None)
    }

    fn new<T: Serialize>(
        operation: Operation,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        before: Option<&T>,
        after: Option<&T>,
        diff_summary: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            entity_type,
            entity_id: entity_id.into(),
            entity_name,
            before: before.and_then(|b| serde_json::to_value(b).ok()),
            after: after.and_then(|a| serde_json::to_value(a).ok()),
            diff_summary,
        }
    }

    /// The latest known state of the record
    fn snapshot(&self) -> Option<&serde_json::Value> {
        self.after.as_ref().or(self.before.as_ref())
    }

    fn field<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.snapshot()?.get(key)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Project the record belongs to
    pub fn project_id(&self) -> Option<ProjectId> {
        self.field("project_id")
    }

    pub fn concerns_project(&self, project: ProjectId) -> bool {
        self.project_id() == Some(project)
    }

    /// The record's money and status at this point in its history
    ///
    /// Returns `None` when the snapshot lacks the fields for its kind.
    pub fn key_figures(&self) -> Option<String> {
        match self.entity_type {
            EntityType::Budget => {
                let spent: Money = self.field("spent_amount")?;
                let total: Money = self.field("total_budget")?;
                Some(format!("spent {} of {}", spent, total))
            }
            EntityType::Expense => {
                let amount: Money = self.field("amount")?;
                let status: ExpenseStatus = self.field("status")?;
                Some(format!("{} {}", amount, status))
            }
            EntityType::Alert => {
                let tier: AlertTier = self.field("alert_type")?;
                let used: f64 = self.field("percentage_used")?;
                Some(format!("{} at {:.1}% used", tier, used))
            }
            EntityType::TimeEntry => {
                let hours: Quantity = self.field("hours")?;
                let status: TimeEntryStatus = self.field("status")?;
                Some(format!("{}h {}", hours, status))
            }
            EntityType::Invoice => {
                let status: InvoiceStatus = self.field("status")?;
                let total: Money = self.field("total_amount")?;
                let paid: Money = self.field("amount_paid")?;
                Some(format!("{}, total {}, paid {}", status, total, paid))
            }
        }
    }

    /// Format the entry for the `audit` command
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.operation,
            self.entity_type,
            self.entity_id
        );

        if let Some(name) = &self.entity_name {
            output.push_str(&format!(" ({})", name));
        }
        if let Some(project) = self.project_id() {
            output.push_str(&format!(" {}", project));
        }
        if let Some(figures) = self.key_figures() {
            output.push_str(&format!("\n  {}", figures));
        }
        if let Some(diff) = &self.diff_summary {
            output.push_str(&format!("\n  Changes: {}", diff));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PROJECT: &str = "6f1c2d3e-4a5b-4c6d-8e7f-9a0b1c2d3e4f";

    fn invoice_json(status: &str, paid: i64) -> serde_json::Value {
        json!({
            "project_id": PROJECT,
            "invoice_number": "INV-00007",
            "status": status,
            "total_amount": 110_000,
            "amount_paid": paid,
        })
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Create.to_string(), "CREATE");
        assert_eq!(Operation::Update.to_string(), "UPDATE");
        assert_eq!(Operation::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_create_and_delete_keep_one_side() {
        let data = json!({"amount": 2500, "status": "pending"});

        let created = AuditEntry::create(EntityType::Expense, "exp-1", None, &data);
        assert_eq!(created.operation, Operation::Create);
        assert!(created.before.is_none());
        assert_eq!(created.after, Some(data.clone()));

        let deleted = AuditEntry::delete(EntityType::Expense, "exp-1", None, &data);
        assert_eq!(deleted.operation, Operation::Delete);
        assert_eq!(deleted.before, Some(data));
        assert!(deleted.after.is_none());
    }

    #[test]
    fn test_serialization_uses_snake_case_kinds() {
        let entry = AuditEntry::create(EntityType::TimeEntry, "tim-1", None, &json!({"hours": 150}));

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"entity_type\":\"time_entry\""));
        assert!(!json.contains("diff_summary"));

        let deserialized: AuditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.entity_type, EntityType::TimeEntry);
    }

    #[test]
    fn test_key_figures_follow_latest_snapshot() {
        let entry = AuditEntry::update(
            EntityType::Invoice,
            "inv-1",
            Some("INV-00007".to_string()),
            &invoice_json("sent", 0),
            &invoice_json("partially_paid", 40_000),
            Some("status: Sent -> Partially Paid".to_string()),
        );
        assert_eq!(
            entry.key_figures().unwrap(),
            "Partially Paid, total $1100.00, paid $400.00"
        );

        // A delete only has the record as it was
        let deleted = AuditEntry::delete(EntityType::Invoice, "inv-1", None, &invoice_json("draft", 0));
        assert_eq!(deleted.key_figures().unwrap(), "Draft, total $1100.00, paid $0.00");
    }

    #[test]
    fn test_key_figures_per_kind() {
        let budget = AuditEntry::create(
            EntityType::Budget,
            "bud-1",
            None,
            &json!({"spent_amount": 80_000, "total_budget": 100_000}),
        );
        assert_eq!(budget.key_figures().unwrap(), "spent $800.00 of $1000.00");

        let expense = AuditEntry::create(
            EntityType::Expense,
            "exp-1",
            None,
            &json!({"amount": 2_550, "status": "approved"}),
        );
        assert_eq!(expense.key_figures().unwrap(), "$25.50 Approved");

        let alert = AuditEntry::create(
            EntityType::Alert,
            "alr-1",
            None,
            &json!({"alert_type": "critical", "percentage_used": 92.5}),
        );
        assert_eq!(alert.key_figures().unwrap(), "Critical at 92.5% used");

        let time = AuditEntry::create(
            EntityType::TimeEntry,
            "tim-1",
            None,
            &json!({"hours": 750, "status": "invoiced"}),
        );
        assert_eq!(time.key_figures().unwrap(), format!("{}h Invoiced", Quantity::from_hundredths(750)));
    }

    #[test]
    fn test_key_figures_missing_fields() {
        let entry = AuditEntry::create(EntityType::Invoice, "inv-1", None, &json!({"status": "sent"}));
        assert!(entry.key_figures().is_none());

        let unknown_status = AuditEntry::create(
            EntityType::Expense,
            "exp-1",
            None,
            &json!({"amount": 100, "status": "archived"}),
        );
        assert!(unknown_status.key_figures().is_none());
    }

    #[test]
    fn test_project_scoping() {
        let project: ProjectId = PROJECT.parse().unwrap();
        let entry = AuditEntry::create(EntityType::Invoice, "inv-1", None, &invoice_json("sent", 0));

        assert_eq!(entry.project_id(), Some(project));
        assert!(entry.concerns_project(project));
        assert!(!entry.concerns_project(ProjectId::new()));

        let unscoped = AuditEntry::create(EntityType::Budget, "bud-1", None, &json!({}));
        assert!(unscoped.project_id().is_none());
        assert!(!unscoped.concerns_project(project));
    }

    #[test]
    fn test_human_readable_format() {
        let entry = AuditEntry::update(
            EntityType::Invoice,
            "inv-12345678",
            Some("INV-00007".to_string()),
            &invoice_json("sent", 0),
            &invoice_json("paid", 110_000),
            Some("status: Sent -> Paid".to_string()),
        );

        let formatted = entry.format_human_readable();
        let lines: Vec<&str> = formatted.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("UPDATE Invoice inv-12345678 (INV-00007) prj-6f1c2d3e"));
        assert_eq!(lines[1], "  Paid, total $1100.00, paid $1100.00");
        assert_eq!(lines[2], "  Changes: status: Sent -> Paid");
    }
}
