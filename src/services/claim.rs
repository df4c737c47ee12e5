//! Time and expense claimer
//!
//! Selecting billable work is a plain read. Claiming it is a
//! compare-and-set inside a transaction: every selected row must still be
//! unclaimed, otherwise the whole claim fails with a conflict and the
//! transaction rolls back. Rows are never silently dropped from an invoice.

use chrono::NaiveDate;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Expense, ExpenseId, Invoice, InvoiceId, InvoiceItem, ItemSource, ProjectId, Quantity,
    TimeEntry, TimeEntryId,
};
use crate::storage::{Storage, Tx};

/// Billable work selected for one invoice
#[derive(Debug, Clone)]
pub struct ClaimSelection {
    pub project_id: ProjectId,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub time_entries: Vec<TimeEntry>,
    pub expenses: Vec<Expense>,
}

impl ClaimSelection {
    pub fn is_empty(&self) -> bool {
        self.time_entries.is_empty() && self.expenses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.time_entries.len() + self.expenses.len()
    }

    pub fn time_entry_ids(&self) -> Vec<TimeEntryId> {
        self.time_entries.iter().map(|t| t.id).collect()
    }

    pub fn expense_ids(&self) -> Vec<ExpenseId> {
        self.expenses.iter().map(|e| e.id).collect()
    }

    /// Invoice lines for the selected work: hours at the hourly rate for
    /// time, one unit at the expense amount for expenses
    pub fn to_items(&self) -> Vec<InvoiceItem> {
        let time = self.time_entries.iter().map(|entry| InvoiceItem {
            description: line_description(&entry.description, || {
                format!("{} on {}", entry.user, entry.date.format("%Y-%m-%d"))
            }),
            quantity: entry.hours,
            unit_price: entry.hourly_rate,
            source: Some(ItemSource::TimeEntry(entry.id)),
        });
        let expenses = self.expenses.iter().map(|expense| InvoiceItem {
            description: line_description(&expense.description, || {
                format!("{} expense on {}", expense.category, expense.date.format("%Y-%m-%d"))
            }),
            quantity: Quantity::one(),
            unit_price: expense.amount,
            source: Some(ItemSource::Expense(expense.id)),
        });
        time.chain(expenses).collect()
    }
}

fn line_description(description: &str, fallback: impl FnOnce() -> String) -> String {
    if description.trim().is_empty() {
        fallback()
    } else {
        description.trim().to_string()
    }
}

/// Service that hands billable work to invoices
pub struct Claimer<'a> {
    storage: &'a Storage,
}

impl<'a> Claimer<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Select approved, billable, unclaimed work dated within `[from, to]`
    pub fn select(
        &self,
        project_id: ProjectId,
        from: NaiveDate,
        to: NaiveDate,
        include_expenses: bool,
    ) -> LedgerResult<ClaimSelection> {
        if from > to {
            return Err(LedgerError::Validation(format!(
                "Range start {} is after its end {}",
                from, to
            )));
        }

        let time_entries = self
            .storage
            .time_entries
            .claimable_in_range(project_id, from, to)?;
        let expenses = if include_expenses {
            self.storage.expenses.claimable_in_range(project_id, from, to)?
        } else {
            Vec::new()
        };

        Ok(ClaimSelection {
            project_id,
            from,
            to,
            time_entries,
            expenses,
        })
    }

    /// Select and claim in one transaction on behalf of `invoice_id`
    pub fn claim(
        &self,
        project_id: ProjectId,
        from: NaiveDate,
        to: NaiveDate,
        include_expenses: bool,
        invoice_id: InvoiceId,
    ) -> LedgerResult<ClaimSelection> {
        let selection = self.select(project_id, from, to, include_expenses)?;
        self.storage.transaction(|tx| {
            Self::claim_within(tx, &selection, invoice_id)?;
            Ok(selection)
        })
    }

    /// Mark every selected row as claimed by `invoice_id`.
    ///
    /// Fails with a conflict if any row was claimed, changed or deleted
    /// since it was selected. The caller's transaction then rolls back the
    /// rows this call did flip.
    pub(crate) fn claim_within(
        tx: &Tx<'_>,
        selection: &ClaimSelection,
        invoice_id: InvoiceId,
    ) -> LedgerResult<()> {
        let time_ids = selection.time_entry_ids();
        let claimed_time = tx.time_entries.claim_where_unclaimed(&time_ids, invoice_id)?;
        if claimed_time != time_ids.len() {
            return Err(LedgerError::Conflict(format!(
                "{} of {} time entries were already claimed by another invoice",
                time_ids.len() - claimed_time,
                time_ids.len()
            )));
        }

        let expense_ids = selection.expense_ids();
        let claimed_expenses = tx.expenses.claim_where_unclaimed(&expense_ids, invoice_id)?;
        if claimed_expenses != expense_ids.len() {
            return Err(LedgerError::Conflict(format!(
                "{} of {} expenses were already claimed by another invoice",
                expense_ids.len() - claimed_expenses,
                expense_ids.len()
            )));
        }

        tracing::debug!(
            invoice = %invoice_id,
            time_entries = claimed_time,
            expenses = claimed_expenses,
            "work claimed"
        );
        Ok(())
    }

    /// Release every row an invoice claimed. Returns how many were freed.
    pub(crate) fn release_within(tx: &Tx<'_>, invoice: &Invoice) -> LedgerResult<usize> {
        let time = tx
            .time_entries
            .release_claims(&invoice.claimed_time_entries(), invoice.id)?;
        let expenses = tx
            .expenses
            .release_claims(&invoice.claimed_expenses(), invoice.id)?;
        Ok(time + expenses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerPaths;
    use crate::models::{CostCategory, Money, TimeEntryStatus};
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::open(paths).unwrap();
        (temp_dir, storage)
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
    }

    fn seed_entry(storage: &Storage, project: ProjectId, day: u32) -> TimeEntry {
        let mut entry = TimeEntry::new(
            project,
            "alice",
            date(day),
            Quantity::from_hundredths(150),
            Money::from_cents(8_000),
        );
        entry.set_status(TimeEntryStatus::Approved);
        storage.time_entries.upsert(entry.clone()).unwrap();
        entry
    }

    fn seed_expense(storage: &Storage, project: ProjectId, day: u32) -> Expense {
        let mut expense = Expense::new(
            project,
            date(day),
            Money::from_cents(2_500),
            CostCategory::Material,
            "sam",
        );
        expense.is_billable = true;
        expense.approve("lee");
        storage.expenses.upsert(expense.clone()).unwrap();
        expense
    }

    #[test]
    fn test_select_respects_range_and_flags() {
        let (_temp, storage) = create_test_storage();
        let project = ProjectId::new();
        seed_entry(&storage, project, 3);
        seed_entry(&storage, project, 20);
        seed_expense(&storage, project, 4);

        let claimer = Claimer::new(&storage);
        let without = claimer.select(project, date(1), date(10), false).unwrap();
        assert_eq!(without.time_entries.len(), 1);
        assert!(without.expenses.is_empty());

        let with = claimer.select(project, date(1), date(10), true).unwrap();
        assert_eq!(with.len(), 2);

        assert!(claimer
            .select(project, date(10), date(1), true)
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_items_from_selection() {
        let (_temp, storage) = create_test_storage();
        let project = ProjectId::new();
        let entry = seed_entry(&storage, project, 3);
        let expense = seed_expense(&storage, project, 4);

        let selection = Claimer::new(&storage)
            .select(project, date(1), date(31), true)
            .unwrap();
        let items = selection.to_items();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity, entry.hours);
        assert_eq!(items[0].unit_price, entry.hourly_rate);
        assert_eq!(items[0].amount().cents(), 12_000);
        assert_eq!(items[0].source, Some(ItemSource::TimeEntry(entry.id)));
        assert_eq!(items[1].quantity, Quantity::one());
        assert_eq!(items[1].amount(), expense.amount);
    }

    #[test]
    fn test_stale_selection_conflicts_and_rolls_back() {
        let (_temp, storage) = create_test_storage();
        let project = ProjectId::new();
        let first = seed_entry(&storage, project, 3);
        let second = seed_entry(&storage, project, 4);
        let claimer = Claimer::new(&storage);

        let stale = claimer.select(project, date(1), date(31), false).unwrap();
        storage
            .time_entries
            .claim_where_unclaimed(&[second.id], InvoiceId::new())
            .unwrap();

        let loser = InvoiceId::new();
        let err = storage
            .transaction(|tx| Claimer::claim_within(tx, &stale, loser))
            .unwrap_err();
        assert!(err.is_conflict());

        let first = storage.time_entries.get(first.id).unwrap().unwrap();
        assert!(first.invoice_id.is_none());
        assert_eq!(first.status, TimeEntryStatus::Approved);
    }

    #[test]
    fn test_claim_then_release() {
        let (_temp, storage) = create_test_storage();
        let project = ProjectId::new();
        let entry = seed_entry(&storage, project, 3);
        let claimer = Claimer::new(&storage);

        let invoice_id = InvoiceId::new();
        let selection = claimer
            .claim(project, date(1), date(31), true, invoice_id)
            .unwrap();
        assert_eq!(selection.len(), 1);
        assert!(claimer
            .select(project, date(1), date(31), true)
            .unwrap()
            .is_empty());

        let mut invoice = Invoice::new(project, "INV-00001", date(1), date(31));
        invoice.id = invoice_id;
        invoice.items = selection.to_items();
        let released = storage
            .transaction(|tx| Claimer::release_within(tx, &invoice))
            .unwrap();
        assert_eq!(released, 1);
        assert!(storage.time_entries.get(entry.id).unwrap().unwrap().is_claimable());
    }
}
