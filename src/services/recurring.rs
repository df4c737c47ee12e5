//! Recurring invoice scheduler
//!
//! A recurring invoice spawns at most one successor: a fresh draft carrying
//! the parent's manual lines, tax rate and discount, dated one cadence step
//! later. Claimed time and expense lines are never copied.

use chrono::NaiveDate;

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Invoice, InvoiceId, InvoiceStatus};
use crate::notify::LedgerEvent;
use crate::storage::{Storage, Tx};

/// Service that issues the next invoice of a recurring series
pub struct RecurringScheduler<'a> {
    storage: &'a Storage,
    number_prefix: String,
}

impl<'a> RecurringScheduler<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self {
            storage,
            number_prefix: "INV".to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.number_prefix = prefix.into();
        self
    }

    /// Spawn the successor of `invoice_id` if it is due one.
    ///
    /// Returns the successor, whether it was created now or earlier, and
    /// None for invoices that do not recur or were cancelled.
    pub fn maybe_spawn_next(&self, invoice_id: InvoiceId) -> LedgerResult<Option<Invoice>> {
        self.storage
            .transaction(|tx| Self::maybe_spawn_next_within(tx, invoice_id, &self.number_prefix))
    }

    pub(crate) fn maybe_spawn_next_within(
        tx: &Tx<'_>,
        invoice_id: InvoiceId,
        prefix: &str,
    ) -> LedgerResult<Option<Invoice>> {
        let parent = tx.invoices.get_active(invoice_id)?;
        let frequency = match parent.recurring_frequency {
            Some(frequency) if parent.is_recurring => frequency,
            _ => return Ok(None),
        };
        if parent.status == InvoiceStatus::Cancelled {
            return Ok(None);
        }
        if let Some(existing) = tx.invoices.successor_of(parent.id)? {
            tracing::debug!(
                parent = %parent.invoice_number,
                successor = %existing.invoice_number,
                "successor already issued"
            );
            return Ok(Some(existing));
        }

        let out_of_range = || {
            LedgerError::Validation(format!(
                "Next date for recurring invoice {} is out of range",
                parent.invoice_number
            ))
        };
        let invoice_date = parent
            .next_recurring_date
            .or_else(|| frequency.advance(parent.invoice_date))
            .ok_or_else(out_of_range)?;
        let due_date = frequency.advance(parent.due_date).ok_or_else(out_of_range)?;
        let next_recurring_date = frequency.advance(invoice_date).ok_or_else(out_of_range)?;

        let number = tx.invoices.next_number(prefix)?;
        let mut successor = Invoice::new(parent.project_id, number, invoice_date, due_date);
        successor.client_name = parent.client_name.clone();
        successor.notes = parent.notes.clone();
        successor.items = parent.template_items();
        successor.tax_rate = parent.tax_rate;
        successor.discount_amount = parent.discount_amount;
        successor.is_recurring = true;
        successor.recurring_frequency = Some(frequency);
        successor.next_recurring_date = Some(next_recurring_date);
        successor.parent_invoice_id = Some(parent.id);
        successor.recalculate();

        tx.invoices.upsert(successor.clone())?;
        tx.log_create(
            EntityType::Invoice,
            successor.id.full(),
            Some(successor.invoice_number.clone()),
            &successor,
        );
        tx.emit(LedgerEvent::RecurringInvoiceSpawned {
            parent_id: parent.id,
            invoice_id: successor.id,
            invoice_number: successor.invoice_number.clone(),
        });

        tracing::info!(
            parent = %parent.invoice_number,
            successor = %successor.invoice_number,
            date = %successor.invoice_date,
            "recurring invoice spawned"
        );
        Ok(Some(successor))
    }

    /// Spawn successors for every recurring invoice whose next date has
    /// arrived. Returns only the invoices created by this call.
    pub fn spawn_due(&self, today: NaiveDate) -> LedgerResult<Vec<Invoice>> {
        self.storage.transaction(|tx| {
            let due = tx.invoices.filter(|i| {
                !i.is_deleted()
                    && i.is_recurring
                    && i.status != InvoiceStatus::Cancelled
                    && i.next_recurring_date.is_some_and(|next| next <= today)
            })?;

            let mut spawned = Vec::new();
            for parent in due {
                if tx.invoices.successor_of(parent.id)?.is_some() {
                    continue;
                }
                if let Some(successor) =
                    Self::maybe_spawn_next_within(tx, parent.id, &self.number_prefix)?
                {
                    spawned.push(successor);
                }
            }
            Ok(spawned)
        })
    }
}
