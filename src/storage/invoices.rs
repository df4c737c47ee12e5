//! Invoice repository

use chrono::{DateTime, Utc};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Invoice, InvoiceId, InvoiceStatus, ProjectId};

use super::table::{Record, Table};

/// Repository for invoices
pub type InvoiceRepository = Table<Invoice>;

impl Record for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> InvoiceId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Table<Invoice> {
    pub fn get_active(&self, id: InvoiceId) -> LedgerResult<Invoice> {
        self.get(id)?
            .filter(|i| !i.is_deleted())
            .ok_or_else(|| LedgerError::invoice_not_found(id.to_string()))
    }

    /// Look up a live invoice by its human-facing number
    pub fn find_by_number(&self, number: &str) -> LedgerResult<Option<Invoice>> {
        Ok(self
            .filter(|i| !i.is_deleted() && i.invoice_number.eq_ignore_ascii_case(number))?
            .into_iter()
            .next())
    }

    /// Live invoices, optionally narrowed to a project and/or a status
    pub fn list(
        &self,
        project_id: Option<ProjectId>,
        status: Option<InvoiceStatus>,
    ) -> LedgerResult<Vec<Invoice>> {
        self.filter(|i| {
            !i.is_deleted()
                && project_id.map_or(true, |p| i.project_id == p)
                && status.map_or(true, |s| i.status == s)
        })
    }

    /// The invoice spawned from `parent_id`, if one exists
    pub fn successor_of(&self, parent_id: InvoiceId) -> LedgerResult<Option<Invoice>> {
        Ok(self
            .filter(|i| !i.is_deleted() && i.parent_invoice_id == Some(parent_id))?
            .into_iter()
            .next())
    }

    /// Next sequential number for `prefix`, e.g. `INV-00007`
    ///
    /// Deleted invoices still reserve their numbers.
    pub fn next_number(&self, prefix: &str) -> LedgerResult<String> {
        let marker = format!("{}-", prefix);
        let highest = self
            .read()?
            .values()
            .filter_map(|i| i.invoice_number.strip_prefix(&marker))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Ok(format!("{}{:05}", marker, highest + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn create_test_repo() -> (TempDir, InvoiceRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = InvoiceRepository::new(temp_dir.path().join("invoices.json"));
        (temp_dir, repo)
    }

    #[test]
    fn test_next_number_is_sequential() {
        let (_temp, repo) = create_test_repo();
        assert_eq!(repo.next_number("INV").unwrap(), "INV-00001");

        let project = ProjectId::new();
        repo.upsert(Invoice::new(project, "INV-00001", date(1), date(30))).unwrap();
        let mut deleted = Invoice::new(project, "INV-00009", date(1), date(30));
        deleted.deleted_at = Some(Utc::now());
        repo.upsert(deleted).unwrap();
        repo.upsert(Invoice::new(project, "ACME-00020", date(1), date(30))).unwrap();

        assert_eq!(repo.next_number("INV").unwrap(), "INV-00010");
        assert_eq!(repo.next_number("ACME").unwrap(), "ACME-00021");
    }

    #[test]
    fn test_successor_and_list() {
        let (_temp, repo) = create_test_repo();
        let project = ProjectId::new();
        let parent = Invoice::new(project, "INV-00001", date(1), date(30));
        let mut child = Invoice::new(project, "INV-00002", date(2), date(28));
        child.parent_invoice_id = Some(parent.id);
        child.set_status(InvoiceStatus::Sent);
        repo.upsert(parent.clone()).unwrap();
        repo.upsert(child.clone()).unwrap();

        assert_eq!(repo.successor_of(parent.id).unwrap().unwrap().id, child.id);
        assert!(repo.successor_of(child.id).unwrap().is_none());
        assert_eq!(repo.list(Some(project), None).unwrap().len(), 2);
        assert_eq!(repo.list(None, Some(InvoiceStatus::Sent)).unwrap().len(), 1);
        assert_eq!(
            repo.find_by_number("inv-00002").unwrap().unwrap().id,
            child.id
        );
    }
}
