//! Outbound ledger events
//!
//! Services stage events on the open transaction; the store hands them to
//! the configured [`Notifier`] only after the transaction has committed.
//! Delivery is fire-and-forget: a failing notifier is logged and never
//! undoes the mutation that produced the event.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use thiserror::Error;

use crate::models::{AlertId, AlertTier, BudgetId, InvoiceId, Money, PaymentId, ProjectId};

/// Something that happened in the ledger that other systems may care about
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    BudgetAlertRaised {
        alert_id: AlertId,
        budget_id: BudgetId,
        project_id: ProjectId,
        tier: AlertTier,
        percentage_used: f64,
    },
    InvoiceCreated {
        invoice_id: InvoiceId,
        invoice_number: String,
        total: Money,
    },
    InvoiceSent {
        invoice_id: InvoiceId,
        invoice_number: String,
    },
    PaymentRecorded {
        invoice_id: InvoiceId,
        payment_id: PaymentId,
        amount: Money,
    },
    InvoicePaid {
        invoice_id: InvoiceId,
        invoice_number: String,
    },
    InvoiceOverdue {
        invoice_id: InvoiceId,
        invoice_number: String,
        days_overdue: i64,
    },
    RecurringInvoiceSpawned {
        parent_id: InvoiceId,
        invoice_id: InvoiceId,
        invoice_number: String,
    },
    InvoiceCancelled {
        invoice_id: InvoiceId,
        invoice_number: String,
    },
}

impl LedgerEvent {
    /// Short machine name of the event
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BudgetAlertRaised { .. } => "budget_alert_raised",
            Self::InvoiceCreated { .. } => "invoice_created",
            Self::InvoiceSent { .. } => "invoice_sent",
            Self::PaymentRecorded { .. } => "payment_recorded",
            Self::InvoicePaid { .. } => "invoice_paid",
            Self::InvoiceOverdue { .. } => "invoice_overdue",
            Self::RecurringInvoiceSpawned { .. } => "recurring_invoice_spawned",
            Self::InvoiceCancelled { .. } => "invoice_cancelled",
        }
    }
}

impl fmt::Display for LedgerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BudgetAlertRaised {
                budget_id,
                tier,
                percentage_used,
                ..
            } => write!(f, "{} alert on {} at {:.1}%", tier, budget_id, percentage_used),
            Self::InvoiceCreated {
                invoice_number,
                total,
                ..
            } => write!(f, "Invoice {} created for {}", invoice_number, total),
            Self::InvoiceSent { invoice_number, .. } => {
                write!(f, "Invoice {} sent", invoice_number)
            }
            Self::PaymentRecorded {
                invoice_id, amount, ..
            } => write!(f, "Payment of {} recorded on {}", amount, invoice_id),
            Self::InvoicePaid { invoice_number, .. } => {
                write!(f, "Invoice {} paid in full", invoice_number)
            }
            Self::InvoiceOverdue {
                invoice_number,
                days_overdue,
                ..
            } => write!(f, "Invoice {} is {} days overdue", invoice_number, days_overdue),
            Self::RecurringInvoiceSpawned {
                parent_id,
                invoice_number,
                ..
            } => write!(f, "Invoice {} issued from {}", invoice_number, parent_id),
            Self::InvoiceCancelled { invoice_number, .. } => {
                write!(f, "Invoice {} cancelled", invoice_number)
            }
        }
    }
}

/// Delivery failure reported by a notifier
#[derive(Error, Debug)]
#[error("Notification failed: {0}")]
pub struct NotifyError(pub String);

/// Receives committed ledger events
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &LedgerEvent) -> Result<(), NotifyError>;
}

/// Default notifier: writes each event as a tracing record
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &LedgerEvent) -> Result<(), NotifyError> {
        tracing::info!(target: "project_ledger::notify", kind = event.kind(), "{}", event);
        Ok(())
    }
}

/// Keeps events in memory; clones share the same buffer
#[derive(Debug, Default, Clone)]
pub struct MemoryNotifier {
    events: Arc<Mutex<Vec<LedgerEvent>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, oldest first
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, event: &LedgerEvent) -> Result<(), NotifyError> {
        self.events
            .lock()
            .map_err(|e| NotifyError(e.to_string()))?
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_notifier_shares_buffer() {
        let notifier = MemoryNotifier::new();
        let handle = notifier.clone();
        let event = LedgerEvent::InvoiceSent {
            invoice_id: InvoiceId::new(),
            invoice_number: "INV-00001".into(),
        };

        notifier.notify(&event).unwrap();
        assert_eq!(handle.events(), vec![event]);
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = LedgerEvent::InvoicePaid {
            invoice_id: InvoiceId::new(),
            invoice_number: "INV-00002".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "invoice_paid");
        assert_eq!(event.kind(), "invoice_paid");
        assert_eq!(event.to_string(), "Invoice INV-00002 paid in full");
    }

    #[test]
    fn test_log_notifier_never_fails() {
        let event = LedgerEvent::InvoiceCancelled {
            invoice_id: InvoiceId::new(),
            invoice_number: "INV-00003".into(),
        };
        assert!(LogNotifier.notify(&event).is_ok());
    }
}
