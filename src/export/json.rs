//! JSON export
//!
//! Writes a complete snapshot of the ledger with schema versioning.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{BudgetAlert, Expense, Invoice, Money, ProjectBudget, TimeEntry};
use crate::storage::Storage;

/// Current export schema version
pub const EXPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Full ledger snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerExport {
    /// Schema version for compatibility checking
    pub schema_version: String,

    pub exported_at: DateTime<Utc>,

    /// Application version that created the export
    pub app_version: String,

    pub budgets: Vec<ProjectBudget>,

    pub expenses: Vec<Expense>,

    pub alerts: Vec<BudgetAlert>,

    pub time_entries: Vec<TimeEntry>,

    pub invoices: Vec<Invoice>,

    pub metadata: ExportMetadata,
}

/// Counts and totals for quick reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub budget_count: usize,
    pub expense_count: usize,
    pub alert_count: usize,
    pub time_entry_count: usize,
    pub invoice_count: usize,

    /// Sum of positive balances on invoices that are neither paid nor
    /// cancelled
    pub outstanding: Money,

    pub earliest_invoice: Option<NaiveDate>,
    pub latest_invoice: Option<NaiveDate>,
}

impl LedgerExport {
    /// Snapshot every table, soft-deleted rows included
    pub fn from_storage(storage: &Storage) -> LedgerResult<Self> {
        let budgets = storage.budgets.get_all()?;
        let expenses = storage.expenses.get_all()?;
        let alerts = storage.alerts.get_all()?;
        let time_entries = storage.time_entries.get_all()?;
        let invoices = storage.invoices.get_all()?;

        let outstanding = invoices
            .iter()
            .filter(|i| !i.is_deleted() && !i.status.is_terminal() && i.balance().is_positive())
            .map(Invoice::balance)
            .sum();

        let metadata = ExportMetadata {
            budget_count: budgets.len(),
            expense_count: expenses.len(),
            alert_count: alerts.len(),
            time_entry_count: time_entries.len(),
            invoice_count: invoices.len(),
            outstanding,
            earliest_invoice: invoices.iter().map(|i| i.invoice_date).min(),
            latest_invoice: invoices.iter().map(|i| i.invoice_date).max(),
        };

        Ok(Self {
            schema_version: EXPORT_SCHEMA_VERSION.to_string(),
            exported_at: Utc::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            budgets,
            expenses,
            alerts,
            time_entries,
            invoices,
            metadata,
        })
    }

    /// Check schema version and that claims point at exported invoices
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version != EXPORT_SCHEMA_VERSION {
            return Err(format!(
                "Schema version mismatch: expected {}, got {}",
                EXPORT_SCHEMA_VERSION, self.schema_version
            ));
        }

        let invoice_ids: HashSet<_> = self.invoices.iter().map(|i| i.id).collect();
        for entry in &self.time_entries {
            if let Some(invoice_id) = entry.invoice_id {
                if !invoice_ids.contains(&invoice_id) {
                    return Err(format!(
                        "Time entry {} references unknown invoice {}",
                        entry.id, invoice_id
                    ));
                }
            }
        }
        for expense in &self.expenses {
            if let Some(invoice_id) = expense.invoice_id {
                if !invoice_ids.contains(&invoice_id) {
                    return Err(format!(
                        "Expense {} references unknown invoice {}",
                        expense.id, invoice_id
                    ));
                }
            }
        }

        let budget_ids: HashSet<_> = self.budgets.iter().map(|b| b.id).collect();
        for alert in &self.alerts {
            if !budget_ids.contains(&alert.budget_id) {
                return Err(format!(
                    "Alert {} references unknown budget {}",
                    alert.id, alert.budget_id
                ));
            }
        }

        Ok(())
    }
}

/// Export the full ledger to JSON
pub fn export_full_json<W: Write>(storage: &Storage, writer: W, pretty: bool) -> LedgerResult<()> {
    let export = LedgerExport::from_storage(storage)?;

    if pretty {
        serde_json::to_writer_pretty(writer, &export)
    } else {
        serde_json::to_writer(writer, &export)
    }
    .map_err(|e| LedgerError::Export(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerPaths;
    use crate::models::{InvoiceItem, InvoiceStatus, ProjectId, Quantity};
    use crate::services::{GenerateInvoiceRequest, InvoiceLedger, InvoiceLifecycle};
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::open(paths).unwrap();
        (temp_dir, storage)
    }

    fn seed_invoice(storage: &Storage, cents: i64) -> Invoice {
        let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let mut request = GenerateInvoiceRequest::new(ProjectId::new(), date, date, date);
        request.manual_items = vec![InvoiceItem::manual("Retainer", Quantity::one(), Money::from_cents(cents))];
        InvoiceLedger::new(storage).generate_from_time_range(request).unwrap()
    }

    #[test]
    fn test_full_export() {
        let (_temp, storage) = create_test_storage();
        let sent = seed_invoice(&storage, 40_000);
        InvoiceLifecycle::new(&storage).send(sent.id).unwrap();
        seed_invoice(&storage, 10_000);

        let export = LedgerExport::from_storage(&storage).unwrap();
        assert_eq!(export.schema_version, EXPORT_SCHEMA_VERSION);
        assert_eq!(export.metadata.invoice_count, 2);
        assert_eq!(export.metadata.outstanding.cents(), 50_000);
        assert!(export.validate().is_ok());
    }

    #[test]
    fn test_json_parses_back() {
        let (_temp, storage) = create_test_storage();
        let invoice = seed_invoice(&storage, 12_345);

        let mut output = Vec::new();
        export_full_json(&storage, &mut output, true).unwrap();

        let parsed: LedgerExport = serde_json::from_slice(&output).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.invoices.len(), 1);
        assert_eq!(parsed.invoices[0].invoice_number, invoice.invoice_number);
        assert_eq!(parsed.invoices[0].status, InvoiceStatus::Draft);
        assert_eq!(parsed.invoices[0].total_amount, invoice.total_amount);
    }

    #[test]
    fn test_validate_rejects_dangling_claims() {
        let (_temp, storage) = create_test_storage();
        let mut export = LedgerExport::from_storage(&storage).unwrap();
        let mut entry = TimeEntry::new(
            ProjectId::new(),
            "alice",
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            Quantity::one(),
            Money::from_cents(100),
        );
        entry.invoice_id = Some(crate::models::InvoiceId::new());
        export.time_entries.push(entry);

        assert!(export.validate().unwrap_err().contains("unknown invoice"));
    }
}
