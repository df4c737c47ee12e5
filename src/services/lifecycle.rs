//! Invoice lifecycle
//!
//! Draft -> Sent -> PartiallyPaid -> Paid, with Overdue reachable from Sent
//! and PartiallyPaid once the due date passes, and Cancelled reachable from
//! the states listed on [`InvoiceLifecycle::cancel`]. Paid and Cancelled are
//! terminal.

use chrono::{NaiveDate, Utc};

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Invoice, InvoiceId, InvoiceStatus};
use crate::notify::LedgerEvent;
use crate::storage::Storage;

use super::claim::Claimer;

/// Service for invoice status transitions
pub struct InvoiceLifecycle<'a> {
    storage: &'a Storage,
}

impl<'a> InvoiceLifecycle<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Status an open invoice should hold given what has been paid
    pub fn status_after_payment(invoice: &Invoice) -> InvoiceStatus {
        if invoice.amount_paid >= invoice.total_amount {
            InvoiceStatus::Paid
        } else if invoice.amount_paid.is_positive() {
            InvoiceStatus::PartiallyPaid
        } else {
            invoice.status
        }
    }

    /// Apply the post-payment status. Returns true if the invoice just
    /// became Paid.
    pub(crate) fn transition_on_payment(invoice: &mut Invoice) -> bool {
        let next = Self::status_after_payment(invoice);
        if next == invoice.status {
            return false;
        }
        invoice.set_status(next);
        if next == InvoiceStatus::Paid {
            invoice.paid_at = Some(Utc::now());
            return true;
        }
        false
    }

    /// Draft -> Sent
    pub fn send(&self, invoice_id: InvoiceId) -> LedgerResult<Invoice> {
        self.storage.transaction(|tx| {
            let mut invoice = tx.invoices.get_active(invoice_id)?;
            if invoice.status != InvoiceStatus::Draft {
                return Err(LedgerError::Conflict(format!(
                    "Invoice {} is {}, only drafts can be sent",
                    invoice.invoice_number, invoice.status
                )));
            }
            if invoice.items.is_empty() {
                return Err(LedgerError::Validation(format!(
                    "Invoice {} has no line items",
                    invoice.invoice_number
                )));
            }

            let before = invoice.clone();
            invoice.set_status(InvoiceStatus::Sent);
            invoice.sent_at = Some(Utc::now());

            tx.invoices.upsert(invoice.clone())?;
            tx.log_update(
                EntityType::Invoice,
                invoice.id.full(),
                Some(invoice.invoice_number.clone()),
                &before,
                &invoice,
                Some("status: Draft -> Sent".to_string()),
            );
            tx.emit(LedgerEvent::InvoiceSent {
                invoice_id: invoice.id,
                invoice_number: invoice.invoice_number.clone(),
            });

            tracing::info!(invoice = %invoice.invoice_number, "invoice sent");
            Ok(invoice)
        })
    }

    /// Cancel a Draft or Sent invoice, or an Overdue one nothing was paid
    /// on. Every time entry and expense it claimed becomes claimable again.
    pub fn cancel(&self, invoice_id: InvoiceId) -> LedgerResult<Invoice> {
        self.storage.transaction(|tx| {
            let mut invoice = tx.invoices.get_active(invoice_id)?;
            let allowed = match invoice.status {
                InvoiceStatus::Draft | InvoiceStatus::Sent => true,
                InvoiceStatus::Overdue => invoice.amount_paid.is_zero(),
                _ => false,
            };
            if !allowed {
                return Err(LedgerError::Conflict(format!(
                    "Invoice {} is {} and cannot be cancelled",
                    invoice.invoice_number, invoice.status
                )));
            }

            let before = invoice.clone();
            let released = Claimer::release_within(tx, &invoice)?;
            invoice.set_status(InvoiceStatus::Cancelled);
            invoice.cancelled_at = Some(Utc::now());

            tx.invoices.upsert(invoice.clone())?;
            tx.log_update(
                EntityType::Invoice,
                invoice.id.full(),
                Some(invoice.invoice_number.clone()),
                &before,
                &invoice,
                Some(format!(
                    "status: {} -> Cancelled, {} claims released",
                    before.status, released
                )),
            );
            tx.emit(LedgerEvent::InvoiceCancelled {
                invoice_id: invoice.id,
                invoice_number: invoice.invoice_number.clone(),
            });

            tracing::info!(invoice = %invoice.invoice_number, released, "invoice cancelled");
            Ok(invoice)
        })
    }

    /// Persist Overdue on every open invoice past due with money owed.
    ///
    /// Reads already report overdue state without this; the sweep makes it
    /// visible to status filters and emits one event per invoice.
    pub fn sweep_overdue(&self, today: NaiveDate) -> LedgerResult<Vec<Invoice>> {
        self.storage.transaction(|tx| {
            let due = tx.invoices.filter(|i| {
                !i.is_deleted()
                    && matches!(i.status, InvoiceStatus::Sent | InvoiceStatus::PartiallyPaid)
                    && i.is_overdue(today)
            })?;

            let mut marked = Vec::with_capacity(due.len());
            for mut invoice in due {
                let before = invoice.clone();
                let days_overdue = invoice.days_overdue(today);
                invoice.set_status(InvoiceStatus::Overdue);

                tx.invoices.upsert(invoice.clone())?;
                tx.log_update(
                    EntityType::Invoice,
                    invoice.id.full(),
                    Some(invoice.invoice_number.clone()),
                    &before,
                    &invoice,
                    Some(format!("status: {} -> Overdue", before.status)),
                );
                tx.emit(LedgerEvent::InvoiceOverdue {
                    invoice_id: invoice.id,
                    invoice_number: invoice.invoice_number.clone(),
                    days_overdue,
                });
                marked.push(invoice);
            }

            if !marked.is_empty() {
                tracing::info!(count = marked.len(), %today, "invoices marked overdue");
            }
            Ok(marked)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerPaths;
    use crate::models::{
        InvoiceItem, Money, PaymentMethod, ProjectId, Quantity, TimeEntry, TimeEntryStatus,
    };
    use crate::services::invoice::{GenerateInvoiceRequest, InvoiceLedger, PaymentInput};
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::open(paths).unwrap();
        (temp_dir, storage)
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn draft(storage: &Storage, cents: i64) -> Invoice {
        let mut request =
            GenerateInvoiceRequest::new(ProjectId::new(), date(1, 1), date(1, 31), date(2, 1));
        request.due_date = Some(date(2, 28));
        request.manual_items = vec![InvoiceItem::manual("Support", Quantity::one(), Money::from_cents(cents))];
        InvoiceLedger::new(storage).generate_from_time_range(request).unwrap()
    }

    fn pay(storage: &Storage, id: InvoiceId, cents: i64) -> Invoice {
        InvoiceLedger::new(storage)
            .apply_payment(id, PaymentInput::new(Money::from_cents(cents), PaymentMethod::Cash, date(2, 5)))
            .unwrap()
    }

    #[test]
    fn test_status_after_payment() {
        let mut invoice = Invoice::new(ProjectId::new(), "INV-00001", date(1, 1), date(1, 31));
        invoice.total_amount = Money::from_cents(10_000);
        invoice.status = InvoiceStatus::Sent;
        assert_eq!(InvoiceLifecycle::status_after_payment(&invoice), InvoiceStatus::Sent);

        invoice.amount_paid = Money::from_cents(4_000);
        assert_eq!(
            InvoiceLifecycle::status_after_payment(&invoice),
            InvoiceStatus::PartiallyPaid
        );

        invoice.status = InvoiceStatus::Overdue;
        assert_eq!(
            InvoiceLifecycle::status_after_payment(&invoice),
            InvoiceStatus::PartiallyPaid
        );

        invoice.amount_paid = Money::from_cents(10_000);
        assert_eq!(InvoiceLifecycle::status_after_payment(&invoice), InvoiceStatus::Paid);
    }

    #[test]
    fn test_send_only_from_draft() {
        let (_temp, storage) = create_test_storage();
        let lifecycle = InvoiceLifecycle::new(&storage);
        let invoice = draft(&storage, 10_000);

        let sent = lifecycle.send(invoice.id).unwrap();
        assert_eq!(sent.status, InvoiceStatus::Sent);
        assert!(sent.sent_at.is_some());
        assert!(lifecycle.send(invoice.id).unwrap_err().is_conflict());
    }

    #[test]
    fn test_cancel_releases_claims() {
        let (_temp, storage) = create_test_storage();
        let project = ProjectId::new();
        let mut entry = TimeEntry::new(project, "alice", date(1, 5), Quantity::whole(2), Money::from_cents(5_000));
        entry.set_status(TimeEntryStatus::Approved);
        storage.time_entries.upsert(entry.clone()).unwrap();

        let request = GenerateInvoiceRequest::new(project, date(1, 1), date(1, 31), date(2, 1));
        let invoice = InvoiceLedger::new(&storage).generate_from_time_range(request).unwrap();
        let lifecycle = InvoiceLifecycle::new(&storage);
        lifecycle.send(invoice.id).unwrap();

        let cancelled = lifecycle.cancel(invoice.id).unwrap();
        assert_eq!(cancelled.status, InvoiceStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());

        let freed = storage.time_entries.get(entry.id).unwrap().unwrap();
        assert!(freed.invoice_id.is_none());
        assert_eq!(freed.status, TimeEntryStatus::Approved);
        assert!(lifecycle.cancel(invoice.id).unwrap_err().is_conflict());
    }

    #[test]
    fn test_cancel_refused_after_payment() {
        let (_temp, storage) = create_test_storage();
        let lifecycle = InvoiceLifecycle::new(&storage);
        let invoice = draft(&storage, 10_000);
        lifecycle.send(invoice.id).unwrap();
        pay(&storage, invoice.id, 2_500);

        assert!(lifecycle.cancel(invoice.id).unwrap_err().is_conflict());
    }

    #[test]
    fn test_sweep_marks_only_owing_invoices() {
        let (_temp, storage) = create_test_storage();
        let lifecycle = InvoiceLifecycle::new(&storage);

        let owing = draft(&storage, 10_000);
        lifecycle.send(owing.id).unwrap();
        pay(&storage, owing.id, 5_000);

        let settled = draft(&storage, 10_000);
        lifecycle.send(settled.id).unwrap();
        pay(&storage, settled.id, 10_000);

        let unsent = draft(&storage, 10_000);

        let marked = lifecycle.sweep_overdue(date(3, 10)).unwrap();
        assert_eq!(marked.len(), 1);
        assert_eq!(marked[0].id, owing.id);
        assert_eq!(marked[0].status, InvoiceStatus::Overdue);
        assert_eq!(marked[0].days_overdue(date(3, 10)), 10);

        assert_eq!(
            storage.invoices.get_active(settled.id).unwrap().status,
            InvoiceStatus::Paid
        );
        assert_eq!(
            storage.invoices.get_active(unsent.id).unwrap().status,
            InvoiceStatus::Draft
        );
        assert!(lifecycle.sweep_overdue(date(3, 10)).unwrap().is_empty());

        let paid = pay(&storage, owing.id, 5_000);
        assert_eq!(paid.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_partial_payment_on_overdue_invoice() {
        let (_temp, storage) = create_test_storage();
        let lifecycle = InvoiceLifecycle::new(&storage);
        let ledger = InvoiceLedger::new(&storage);

        let invoice = draft(&storage, 10_000);
        lifecycle.send(invoice.id).unwrap();
        assert_eq!(lifecycle.sweep_overdue(date(3, 10)).unwrap().len(), 1);

        let partial = pay(&storage, invoice.id, 5_000);
        assert_eq!(partial.status, InvoiceStatus::PartiallyPaid);
        assert_eq!(partial.balance(), Money::from_cents(5_000));

        // Still past due with money owed, so reads and the next sweep agree
        let view = ledger.get_invoice(invoice.id, date(3, 10)).unwrap();
        assert!(view.is_overdue);
        assert_eq!(view.days_overdue, 10);
        let marked = lifecycle.sweep_overdue(date(3, 10)).unwrap();
        assert_eq!(marked.len(), 1);
        assert_eq!(marked[0].status, InvoiceStatus::Overdue);

        let paid = pay(&storage, invoice.id, 5_000);
        assert_eq!(paid.status, InvoiceStatus::Paid);
    }
}
