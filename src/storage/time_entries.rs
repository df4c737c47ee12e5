//! Time entry repository
//!
//! Claiming an entry moves it to `Invoiced` and records the invoice; the
//! move only happens while the entry is still Approved and unclaimed.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{InvoiceId, ProjectId, TimeEntry, TimeEntryId, TimeEntryStatus};

use super::table::{Record, Table};

/// Repository for time entries
pub type TimeEntryRepository = Table<TimeEntry>;

impl Record for TimeEntry {
    type Id = TimeEntryId;

    fn id(&self) -> TimeEntryId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Table<TimeEntry> {
    pub fn get_active(&self, id: TimeEntryId) -> LedgerResult<TimeEntry> {
        self.get(id)?
            .filter(|t| !t.is_deleted())
            .ok_or_else(|| LedgerError::time_entry_not_found(id.to_string()))
    }

    pub fn for_project(&self, project_id: ProjectId) -> LedgerResult<Vec<TimeEntry>> {
        self.filter(|t| t.project_id == project_id && !t.is_deleted())
    }

    /// Approved, billable, not-yet-invoiced entries dated within `[from, to]`
    pub fn claimable_in_range(
        &self,
        project_id: ProjectId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> LedgerResult<Vec<TimeEntry>> {
        let mut found = self.filter(|t| {
            t.project_id == project_id && t.is_claimable() && t.date >= from && t.date <= to
        })?;
        found.sort_by_key(|t| (t.date, t.created_at));
        Ok(found)
    }

    /// Move entries to Invoiced for `invoice_id`, skipping any that are no
    /// longer claimable. Returns how many were claimed.
    pub fn claim_where_unclaimed(
        &self,
        ids: &[TimeEntryId],
        invoice_id: InvoiceId,
    ) -> LedgerResult<usize> {
        self.update_where(ids, TimeEntry::is_claimable, |t| {
            t.invoice_id = Some(invoice_id);
            t.set_status(TimeEntryStatus::Invoiced);
        })
    }

    /// Return entries billed by `invoice_id` to Approved
    pub fn release_claims(&self, ids: &[TimeEntryId], invoice_id: InvoiceId) -> LedgerResult<usize> {
        self.update_where(
            ids,
            |t| t.invoice_id == Some(invoice_id),
            |t| {
                t.invoice_id = None;
                t.set_status(TimeEntryStatus::Approved);
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, Quantity};
    use tempfile::TempDir;

    fn approved_entry(project: ProjectId) -> TimeEntry {
        let mut entry = TimeEntry::new(
            project,
            "alice",
            NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
            Quantity::whole(4),
            Money::from_cents(10_000),
        );
        entry.set_status(TimeEntryStatus::Approved);
        entry
    }

    #[test]
    fn test_claim_and_release() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TimeEntryRepository::new(temp_dir.path().join("time_entries.json"));
        let entry = approved_entry(ProjectId::new());
        repo.upsert(entry.clone()).unwrap();

        let invoice = InvoiceId::new();
        assert_eq!(repo.claim_where_unclaimed(&[entry.id], invoice).unwrap(), 1);
        let claimed = repo.get_active(entry.id).unwrap();
        assert_eq!(claimed.status, TimeEntryStatus::Invoiced);
        assert_eq!(claimed.invoice_id, Some(invoice));

        assert_eq!(repo.claim_where_unclaimed(&[entry.id], InvoiceId::new()).unwrap(), 0);

        assert_eq!(repo.release_claims(&[entry.id], invoice).unwrap(), 1);
        let released = repo.get_active(entry.id).unwrap();
        assert_eq!(released.status, TimeEntryStatus::Approved);
        assert!(released.invoice_id.is_none());
    }

    #[test]
    fn test_unbillable_entries_are_not_claimable() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TimeEntryRepository::new(temp_dir.path().join("time_entries.json"));
        let project = ProjectId::new();
        let mut entry = approved_entry(project);
        entry.is_billable = false;
        repo.upsert(entry).unwrap();

        let from = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
        assert!(repo.claimable_in_range(project, from, to).unwrap().is_empty());
    }
}
