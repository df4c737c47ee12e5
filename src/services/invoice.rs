//! Invoice ledger
//!
//! Builds invoices from claimed work and manual lines, computes their totals,
//! and applies payments. Generation claims the selected work and creates the
//! draft in one transaction, so a failed generation leaves every time entry
//! and expense claimable.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::audit::EntityType;
use crate::config::Settings;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Invoice, InvoiceId, InvoiceItem, InvoiceStatus, InvoiceTotals, Money, Payment, PaymentMethod,
    Percentage, ProjectId, RecurringFrequency,
};
use crate::notify::LedgerEvent;
use crate::storage::Storage;

use super::claim::{ClaimSelection, Claimer};
use super::lifecycle::InvoiceLifecycle;
use super::recurring::RecurringScheduler;

/// Numbering and payment-term defaults for new invoices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDefaults {
    pub number_prefix: String,
    pub payment_terms_days: u32,
}

impl Default for InvoiceDefaults {
    fn default() -> Self {
        Self {
            number_prefix: "INV".to_string(),
            payment_terms_days: 30,
        }
    }
}

impl InvoiceDefaults {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            number_prefix: settings.invoice_number_prefix.clone(),
            payment_terms_days: settings.payment_terms_days,
        }
    }
}

/// Request to invoice a project's billable work over a date range
#[derive(Debug, Clone)]
pub struct GenerateInvoiceRequest {
    pub project_id: ProjectId,
    pub client_name: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub include_expenses: bool,
    pub tax_rate: Percentage,
    pub discount: Money,
    pub invoice_date: NaiveDate,
    /// Defaults to the invoice date plus the payment terms
    pub due_date: Option<NaiveDate>,
    pub recurring: Option<RecurringFrequency>,
    /// Lines not backed by claimed work; these repeat on recurring invoices
    pub manual_items: Vec<InvoiceItem>,
    pub notes: String,
}

impl GenerateInvoiceRequest {
    pub fn new(project_id: ProjectId, from: NaiveDate, to: NaiveDate, invoice_date: NaiveDate) -> Self {
        Self {
            project_id,
            client_name: String::new(),
            from,
            to,
            include_expenses: false,
            tax_rate: Percentage::zero(),
            discount: Money::zero(),
            invoice_date,
            due_date: None,
            recurring: None,
            manual_items: Vec::new(),
            notes: String::new(),
        }
    }
}

/// Line items and totals produced by [`InvoiceLedger::build`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltInvoice {
    pub items: Vec<InvoiceItem>,
    pub totals: InvoiceTotals,
}

/// A payment to record against an invoice
#[derive(Debug, Clone)]
pub struct PaymentInput {
    pub amount: Money,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub reference: Option<String>,
    pub recorded_by: String,
}

impl PaymentInput {
    pub fn new(amount: Money, method: PaymentMethod, payment_date: NaiveDate) -> Self {
        Self {
            amount,
            method,
            payment_date,
            reference: None,
            recorded_by: "system".to_string(),
        }
    }
}

/// An invoice together with the values derived on read
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub balance: Money,
    pub is_overdue: bool,
    pub days_overdue: i64,
    pub credit: Money,
}

impl InvoiceView {
    pub fn new(invoice: Invoice, today: NaiveDate) -> Self {
        Self {
            balance: invoice.balance(),
            is_overdue: invoice.is_overdue(today),
            days_overdue: invoice.days_overdue(today),
            credit: invoice.credit(),
            invoice,
        }
    }
}

/// Service for invoice construction and payments
pub struct InvoiceLedger<'a> {
    storage: &'a Storage,
    defaults: InvoiceDefaults,
}

impl<'a> InvoiceLedger<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self {
            storage,
            defaults: InvoiceDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: InvoiceDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Turn claimed work plus manual lines into items and totals.
    ///
    /// Rejects a tax rate outside [0, 100], a negative discount and manual
    /// lines without a description, with a non-positive quantity or with a
    /// negative price.
    pub fn build(
        selection: &ClaimSelection,
        manual_items: &[InvoiceItem],
        tax_rate: Percentage,
        discount: Money,
    ) -> LedgerResult<BuiltInvoice> {
        validate_rates(tax_rate, discount)?;

        for item in manual_items {
            if item.description.trim().is_empty() {
                return Err(LedgerError::Validation("Line items need a description".into()));
            }
            if !item.quantity.is_positive() {
                return Err(LedgerError::Validation(format!(
                    "Quantity of '{}' must be positive",
                    item.description
                )));
            }
            if item.unit_price.is_negative() {
                return Err(LedgerError::Validation(format!(
                    "Unit price of '{}' cannot be negative",
                    item.description
                )));
            }
        }

        let mut items = selection.to_items();
        items.extend(manual_items.iter().map(|item| InvoiceItem {
            source: None,
            ..item.clone()
        }));

        let totals = InvoiceTotals::compute(&items, tax_rate, discount);
        Ok(BuiltInvoice { items, totals })
    }

    /// Select the project's billable work in the range and invoice it
    pub fn generate_from_time_range(&self, request: GenerateInvoiceRequest) -> LedgerResult<Invoice> {
        let selection = Claimer::new(self.storage).select(
            request.project_id,
            request.from,
            request.to,
            request.include_expenses,
        )?;
        self.generate_from_selection(request, selection)
    }

    /// Claim an already-selected set of work and create a draft invoice.
    ///
    /// Fails with a conflict if any selected row was claimed in the meantime.
    pub fn generate_from_selection(
        &self,
        request: GenerateInvoiceRequest,
        selection: ClaimSelection,
    ) -> LedgerResult<Invoice> {
        if selection.project_id != request.project_id {
            return Err(LedgerError::Validation(
                "The selected work belongs to a different project".into(),
            ));
        }

        let built = Self::build(
            &selection,
            &request.manual_items,
            request.tax_rate,
            request.discount,
        )?;
        if built.items.is_empty() {
            return Err(LedgerError::Validation(format!(
                "No billable work for project {} between {} and {}",
                request.project_id, request.from, request.to
            )));
        }

        let due_date = match request.due_date {
            Some(date) => date,
            None => request
                .invoice_date
                .checked_add_days(Days::new(u64::from(self.defaults.payment_terms_days)))
                .ok_or_else(|| LedgerError::Validation("Due date is out of range".into()))?,
        };
        if due_date < request.invoice_date {
            return Err(LedgerError::Validation(format!(
                "Due date {} is before the invoice date {}",
                due_date, request.invoice_date
            )));
        }

        let next_recurring_date = match request.recurring {
            Some(frequency) => Some(
                frequency
                    .advance(request.invoice_date)
                    .ok_or_else(|| LedgerError::Validation("Recurring date is out of range".into()))?,
            ),
            None => None,
        };

        self.storage.transaction(|tx| {
            let number = tx.invoices.next_number(&self.defaults.number_prefix)?;
            let mut invoice = Invoice::new(request.project_id, number, request.invoice_date, due_date);
            invoice.client_name = request.client_name.trim().to_string();
            invoice.notes = request.notes.clone();
            invoice.items = built.items.clone();
            invoice.tax_rate = request.tax_rate;
            invoice.discount_amount = built.totals.discount_amount;
            invoice.subtotal = built.totals.subtotal;
            invoice.tax_amount = built.totals.tax_amount;
            invoice.total_amount = built.totals.total_amount;
            invoice.is_recurring = request.recurring.is_some();
            invoice.recurring_frequency = request.recurring;
            invoice.next_recurring_date = next_recurring_date;

            Claimer::claim_within(tx, &selection, invoice.id)?;

            tx.invoices.upsert(invoice.clone())?;
            tx.log_create(
                EntityType::Invoice,
                invoice.id.full(),
                Some(invoice.invoice_number.clone()),
                &invoice,
            );
            tx.emit(LedgerEvent::InvoiceCreated {
                invoice_id: invoice.id,
                invoice_number: invoice.invoice_number.clone(),
                total: invoice.total_amount,
            });

            tracing::info!(
                invoice = %invoice.invoice_number,
                items = invoice.items.len(),
                total = %invoice.total_amount,
                "invoice generated"
            );
            Ok(invoice)
        })
    }

    /// Pull newly billable work in the range into an existing draft
    pub fn claim_into_draft(
        &self,
        invoice_id: InvoiceId,
        from: NaiveDate,
        to: NaiveDate,
        include_expenses: bool,
    ) -> LedgerResult<Invoice> {
        let current = self.storage.invoices.get_active(invoice_id)?;
        let selection =
            Claimer::new(self.storage).select(current.project_id, from, to, include_expenses)?;

        self.storage.transaction(|tx| {
            let mut invoice = tx.invoices.get_active(invoice_id)?;
            if invoice.status != InvoiceStatus::Draft {
                return Err(LedgerError::Conflict(format!(
                    "Invoice {} is {}, only drafts can take more lines",
                    invoice.invoice_number, invoice.status
                )));
            }
            if selection.is_empty() {
                return Ok(invoice);
            }

            let before = invoice.clone();
            Claimer::claim_within(tx, &selection, invoice.id)?;
            invoice.items.extend(selection.to_items());
            invoice.recalculate();

            tx.invoices.upsert(invoice.clone())?;
            tx.log_update(
                EntityType::Invoice,
                invoice.id.full(),
                Some(invoice.invoice_number.clone()),
                &before,
                &invoice,
                Some(format!("{} lines claimed", selection.len())),
            );

            tracing::info!(invoice = %invoice.invoice_number, added = selection.len(), "work added to draft");
            Ok(invoice)
        })
    }

    /// Record a payment and move the invoice along its lifecycle.
    ///
    /// Payments beyond the total are accepted; the excess shows up as a
    /// credit. Paying a recurring invoice in full issues its successor.
    pub fn apply_payment(&self, invoice_id: InvoiceId, input: PaymentInput) -> LedgerResult<Invoice> {
        if !input.amount.is_positive() {
            return Err(LedgerError::Validation(format!(
                "Payment amount must be positive, got {}",
                input.amount
            )));
        }

        self.storage.transaction(|tx| {
            let mut invoice = tx.invoices.get_active(invoice_id)?;
            match invoice.status {
                InvoiceStatus::Draft => {
                    return Err(LedgerError::Conflict(format!(
                        "Invoice {} has not been sent",
                        invoice.invoice_number
                    )))
                }
                InvoiceStatus::Paid | InvoiceStatus::Cancelled => {
                    return Err(LedgerError::Conflict(format!(
                        "Invoice {} is {} and accepts no payments",
                        invoice.invoice_number, invoice.status
                    )))
                }
                _ => {}
            }

            let before = invoice.clone();
            let mut payment = Payment::new(
                input.amount,
                input.payment_date,
                input.method,
                input.recorded_by.trim(),
            );
            payment.reference = input.reference.clone();
            invoice.payments.push(payment.clone());
            invoice.amount_paid += payment.amount;

            if invoice.amount_paid > invoice.total_amount {
                tracing::warn!(
                    invoice = %invoice.invoice_number,
                    credit = %invoice.credit(),
                    "invoice overpaid"
                );
            }

            let became_paid = InvoiceLifecycle::transition_on_payment(&mut invoice);

            tx.invoices.upsert(invoice.clone())?;
            tx.log_update(
                EntityType::Invoice,
                invoice.id.full(),
                Some(invoice.invoice_number.clone()),
                &before,
                &invoice,
                Some(format!(
                    "payment {} ({}), status {} -> {}",
                    payment.amount, payment.method, before.status, invoice.status
                )),
            );
            tx.emit(LedgerEvent::PaymentRecorded {
                invoice_id: invoice.id,
                payment_id: payment.id,
                amount: payment.amount,
            });

            if became_paid {
                tx.emit(LedgerEvent::InvoicePaid {
                    invoice_id: invoice.id,
                    invoice_number: invoice.invoice_number.clone(),
                });
                if invoice.is_recurring {
                    RecurringScheduler::maybe_spawn_next_within(
                        tx,
                        invoice.id,
                        &self.defaults.number_prefix,
                    )?;
                }
            }

            tracing::info!(
                invoice = %invoice.invoice_number,
                amount = %payment.amount,
                status = %invoice.status,
                "payment applied"
            );
            Ok(invoice)
        })
    }

    /// An invoice with its derived balance, overdue state and credit
    pub fn get_invoice(&self, invoice_id: InvoiceId, today: NaiveDate) -> LedgerResult<InvoiceView> {
        let invoice = self.storage.invoices.get_active(invoice_id)?;
        Ok(InvoiceView::new(invoice, today))
    }

    /// Find an invoice by number (e.g. INV-00001) or ID string
    pub fn find(&self, identifier: &str) -> LedgerResult<Invoice> {
        if let Some(invoice) = self.storage.invoices.find_by_number(identifier)? {
            return Ok(invoice);
        }
        let id = match identifier.parse::<InvoiceId>() {
            Ok(id) => id,
            Err(_) => self
                .storage
                .invoices
                .resolve_short_id(identifier)?
                .ok_or_else(|| LedgerError::invoice_not_found(identifier))?,
        };
        self.storage.invoices.get_active(id)
    }

    /// Live invoices, optionally narrowed to a project and/or status
    pub fn list_invoices(
        &self,
        project_id: Option<ProjectId>,
        status: Option<InvoiceStatus>,
    ) -> LedgerResult<Vec<Invoice>> {
        self.storage.invoices.list(project_id, status)
    }
}

fn validate_rates(tax_rate: Percentage, discount: Money) -> LedgerResult<()> {
    if !tax_rate.is_valid_rate() {
        return Err(LedgerError::Validation(format!(
            "Tax rate must be between 0 and 100, got {}",
            tax_rate
        )));
    }
    if discount.is_negative() {
        return Err(LedgerError::Validation(format!(
            "Discount cannot be negative, got {}",
            discount
        )));
    }
    Ok(())
}
