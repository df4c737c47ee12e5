//! CSV export
//!
//! Writes invoices and budget summaries as spreadsheet-friendly rows.
//! Amounts are plain decimals without a currency symbol.

use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;

use crate::error::{LedgerError, LedgerResult};
use crate::models::Money;
use crate::services::BudgetLedger;
use crate::storage::Storage;

#[derive(Serialize)]
struct InvoiceRecord {
    #[serde(rename = "Number")]
    number: String,
    #[serde(rename = "Project")]
    project: String,
    #[serde(rename = "Client")]
    client: String,
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Due")]
    due: NaiveDate,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Subtotal")]
    subtotal: String,
    #[serde(rename = "Tax")]
    tax: String,
    #[serde(rename = "Discount")]
    discount: String,
    #[serde(rename = "Total")]
    total: String,
    #[serde(rename = "Paid")]
    paid: String,
    #[serde(rename = "Balance")]
    balance: String,
    #[serde(rename = "Overdue Days")]
    overdue_days: i64,
}

#[derive(Serialize)]
struct BudgetRecord {
    #[serde(rename = "Project")]
    project: String,
    #[serde(rename = "Budget")]
    name: String,
    #[serde(rename = "Total")]
    total: String,
    #[serde(rename = "Spent")]
    spent: String,
    #[serde(rename = "Remaining")]
    remaining: String,
    #[serde(rename = "Percent Used")]
    percent_used: String,
    #[serde(rename = "Labor Spent")]
    labor: String,
    #[serde(rename = "Material Spent")]
    material: String,
    #[serde(rename = "Other Spent")]
    other: String,
    #[serde(rename = "Tier")]
    tier: String,
    #[serde(rename = "Unacknowledged Alerts")]
    unacknowledged: usize,
}

/// Export every live invoice. Returns the number of rows written.
pub fn export_invoices_csv<W: Write>(
    storage: &Storage,
    writer: W,
    today: NaiveDate,
) -> LedgerResult<usize> {
    let invoices = storage.invoices.list(None, None)?;
    let mut csv = csv::Writer::from_writer(writer);

    for invoice in &invoices {
        csv.serialize(InvoiceRecord {
            number: invoice.invoice_number.clone(),
            project: invoice.project_id.full(),
            client: invoice.client_name.clone(),
            date: invoice.invoice_date,
            due: invoice.due_date,
            status: invoice.status.to_string(),
            subtotal: decimal(invoice.subtotal),
            tax: decimal(invoice.tax_amount),
            discount: decimal(invoice.discount_amount),
            total: decimal(invoice.total_amount),
            paid: decimal(invoice.amount_paid),
            balance: decimal(invoice.balance()),
            overdue_days: invoice.days_overdue(today),
        })
        .map_err(export_error)?;
    }

    csv.flush()
        .map_err(|e| LedgerError::Export(e.to_string()))?;
    Ok(invoices.len())
}

/// Export a summary row per active budget. Returns the number of rows
/// written.
pub fn export_budget_summaries_csv<W: Write>(storage: &Storage, writer: W) -> LedgerResult<usize> {
    let ledger = BudgetLedger::new(storage);
    let budgets = ledger.list_budgets()?;
    let mut csv = csv::Writer::from_writer(writer);

    for budget in &budgets {
        let summary = ledger.get_summary(budget.project_id)?;
        let spent_in = |index: usize| {
            summary
                .categories
                .get(index)
                .map(|c| decimal(c.spent))
                .unwrap_or_default()
        };

        csv.serialize(BudgetRecord {
            project: summary.project_id.full(),
            name: summary.name.clone(),
            total: decimal(summary.total_budget),
            spent: decimal(summary.spent_amount),
            remaining: decimal(summary.remaining),
            percent_used: format!("{:.2}", summary.percent_used),
            labor: spent_in(0),
            material: spent_in(1),
            other: spent_in(2),
            tier: summary.alerts.current_tier.to_string(),
            unacknowledged: summary.alerts.unacknowledged,
        })
        .map_err(export_error)?;
    }

    csv.flush()
        .map_err(|e| LedgerError::Export(e.to_string()))?;
    Ok(budgets.len())
}

fn decimal(amount: Money) -> String {
    amount.format_with_symbol("")
}

fn export_error(err: csv::Error) -> LedgerError {
    LedgerError::Export(err.to_string())
}
