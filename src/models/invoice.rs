//! Invoice model
//!
//! An invoice owns its ordered line items and payments. Header totals are
//! stored for reporting but always equal `InvoiceTotals::compute` over the
//! persisted items; `balance`, overdue state and credit are derived on read.

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{ExpenseId, InvoiceId, PaymentId, ProjectId, TimeEntryId};
use super::measure::{Percentage, Quantity};
use super::money::Money;

/// Lifecycle status of an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    PartiallyPaid,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    /// Paid and Cancelled admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }

    /// Statuses that are awaiting payment from the client
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Sent | Self::PartiallyPaid | Self::Overdue)
    }

    /// Parse a status from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "draft" => Some(Self::Draft),
            "sent" => Some(Self::Sent),
            "partially_paid" | "partial" => Some(Self::PartiallyPaid),
            "paid" => Some(Self::Paid),
            "overdue" => Some(Self::Overdue),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "Draft"),
            Self::Sent => write!(f, "Sent"),
            Self::PartiallyPaid => write!(f, "Partially Paid"),
            Self::Paid => write!(f, "Paid"),
            Self::Overdue => write!(f, "Overdue"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Cadence of a recurring invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurringFrequency {
    Weekly,
    Monthly,
    Quarterly,
    Annually,
}

impl RecurringFrequency {
    /// Advance a date by one cadence step.
    ///
    /// Month-based cadences clamp to the last day of shorter months
    /// (Jan 31 + 1 month is Feb 28/29).
    pub fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Weekly => date.checked_add_days(Days::new(7)),
            Self::Monthly => date.checked_add_months(Months::new(1)),
            Self::Quarterly => date.checked_add_months(Months::new(3)),
            Self::Annually => date.checked_add_months(Months::new(12)),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "annually" | "yearly" => Some(Self::Annually),
            _ => None,
        }
    }
}

impl fmt::Display for RecurringFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekly => write!(f, "Weekly"),
            Self::Monthly => write!(f, "Monthly"),
            Self::Quarterly => write!(f, "Quarterly"),
            Self::Annually => write!(f, "Annually"),
        }
    }
}

/// Claim marker linking a line item back to what it bills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ItemSource {
    TimeEntry(TimeEntryId),
    Expense(ExpenseId),
}

/// A single invoice line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub description: String,

    pub quantity: Quantity,

    pub unit_price: Money,

    /// Set when the line bills a claimed time entry or expense
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ItemSource>,
}

impl InvoiceItem {
    /// A manual line not backed by a claim
    pub fn manual(description: impl Into<String>, quantity: Quantity, unit_price: Money) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            source: None,
        }
    }

    /// Line amount (quantity times unit price)
    pub fn amount(&self) -> Money {
        self.unit_price.times(self.quantity)
    }

    /// Check if this line bills a claimed entry
    pub fn is_claimed(&self) -> bool {
        self.source.is_some()
    }
}

/// How a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    BankTransfer,
    Card,
    Cash,
    Check,
    Other,
}

impl PaymentMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "bank_transfer" | "bank" | "transfer" | "wire" => Some(Self::BankTransfer),
            "card" | "credit_card" => Some(Self::Card),
            "cash" => Some(Self::Cash),
            "check" | "cheque" => Some(Self::Check),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BankTransfer => write!(f, "Bank Transfer"),
            Self::Card => write!(f, "Card"),
            Self::Cash => write!(f, "Cash"),
            Self::Check => write!(f, "Check"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// A payment applied to an invoice; immutable once recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,

    pub amount: Money,

    pub payment_date: NaiveDate,

    #[serde(default)]
    pub method: PaymentMethod,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    pub recorded_by: String,

    pub recorded_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        amount: Money,
        payment_date: NaiveDate,
        method: PaymentMethod,
        recorded_by: impl Into<String>,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            amount,
            payment_date,
            method,
            reference: None,
            recorded_by: recorded_by.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Header totals derived from line items, tax rate and discount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
}

impl InvoiceTotals {
    /// `total = subtotal + subtotal * tax_rate / 100 - discount`
    pub fn compute(items: &[InvoiceItem], tax_rate: Percentage, discount_amount: Money) -> Self {
        let subtotal: Money = items.iter().map(InvoiceItem::amount).sum();
        let tax_amount = subtotal.percent(tax_rate);
        Self {
            subtotal,
            tax_amount,
            discount_amount,
            total_amount: subtotal + tax_amount - discount_amount,
        }
    }
}

/// A client invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,

    /// Human-facing sequential number, e.g. INV-00042
    pub invoice_number: String,

    pub project_id: ProjectId,

    #[serde(default)]
    pub client_name: String,

    #[serde(default)]
    pub status: InvoiceStatus,

    pub invoice_date: NaiveDate,

    pub due_date: NaiveDate,

    #[serde(default)]
    pub items: Vec<InvoiceItem>,

    #[serde(default)]
    pub payments: Vec<Payment>,

    pub subtotal: Money,

    pub tax_rate: Percentage,

    pub tax_amount: Money,

    pub discount_amount: Money,

    pub total_amount: Money,

    pub amount_paid: Money,

    #[serde(default)]
    pub is_recurring: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_frequency: Option<RecurringFrequency>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_recurring_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_invoice_id: Option<InvoiceId>,

    #[serde(default)]
    pub notes: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Create an empty draft invoice
    pub fn new(
        project_id: ProjectId,
        invoice_number: impl Into<String>,
        invoice_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: InvoiceId::new(),
            invoice_number: invoice_number.into(),
            project_id,
            client_name: String::new(),
            status: InvoiceStatus::Draft,
            invoice_date,
            due_date,
            items: Vec::new(),
            payments: Vec::new(),
            subtotal: Money::zero(),
            tax_rate: Percentage::zero(),
            tax_amount: Money::zero(),
            discount_amount: Money::zero(),
            total_amount: Money::zero(),
            amount_paid: Money::zero(),
            is_recurring: false,
            recurring_frequency: None,
            next_recurring_date: None,
            parent_invoice_id: None,
            notes: String::new(),
            sent_at: None,
            paid_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Outstanding amount; negative when overpaid
    pub fn balance(&self) -> Money {
        self.total_amount - self.amount_paid
    }

    /// Amount paid beyond the total
    pub fn credit(&self) -> Money {
        if self.balance().is_negative() {
            -self.balance()
        } else {
            Money::zero()
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Overdue as of `today`: past due, money outstanding, not Paid/Cancelled
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.status.is_terminal() && self.balance().is_positive() && self.due_date < today
    }

    /// Days past due, or 0 when not overdue
    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        if self.is_overdue(today) {
            (today - self.due_date).num_days()
        } else {
            0
        }
    }

    /// Totals recomputed from the current items, tax rate and discount
    pub fn computed_totals(&self) -> InvoiceTotals {
        InvoiceTotals::compute(&self.items, self.tax_rate, self.discount_amount)
    }

    /// Store totals recomputed from the items
    pub fn recalculate(&mut self) {
        let totals = self.computed_totals();
        self.subtotal = totals.subtotal;
        self.tax_amount = totals.tax_amount;
        self.total_amount = totals.total_amount;
        self.updated_at = Utc::now();
    }

    /// Time entries billed by this invoice
    pub fn claimed_time_entries(&self) -> Vec<TimeEntryId> {
        self.items
            .iter()
            .filter_map(|i| match i.source {
                Some(ItemSource::TimeEntry(id)) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Expenses billed by this invoice
    pub fn claimed_expenses(&self) -> Vec<ExpenseId> {
        self.items
            .iter()
            .filter_map(|i| match i.source {
                Some(ItemSource::Expense(id)) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Line items that are not backed by claims (the recurring template)
    pub fn template_items(&self) -> Vec<InvoiceItem> {
        self.items.iter().filter(|i| !i.is_claimed()).cloned().collect()
    }

    pub fn set_status(&mut self, status: InvoiceStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

impl fmt::Display for Invoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} total {} balance {}",
            self.invoice_number,
            self.status,
            self.total_amount,
            self.balance()
        )
    }
}
