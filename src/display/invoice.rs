//! Invoice display formatting

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::services::InvoiceView;

#[derive(Tabled)]
struct InvoiceRow {
    #[tabled(rename = "Number")]
    number: String,
    #[tabled(rename = "Client")]
    client: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Balance")]
    balance: String,
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Qty")]
    quantity: String,
    #[tabled(rename = "Unit")]
    unit_price: String,
    #[tabled(rename = "Amount")]
    amount: String,
}

/// Format invoices as a table
pub fn format_invoice_list(views: &[InvoiceView]) -> String {
    if views.is_empty() {
        return "No invoices found.\n".to_string();
    }

    let rows = views.iter().map(|v| {
        let status = if v.is_overdue && v.invoice.status != crate::models::InvoiceStatus::Overdue {
            format!("{} (overdue)", v.invoice.status)
        } else {
            v.invoice.status.to_string()
        };
        InvoiceRow {
            number: v.invoice.invoice_number.clone(),
            client: v.invoice.client_name.clone(),
            date: v.invoice.invoice_date.to_string(),
            due: v.invoice.due_date.to_string(),
            status,
            total: v.invoice.total_amount.to_string(),
            balance: v.balance.to_string(),
        }
    });

    let mut table = Table::new(rows);
    table.with(Style::psql());
    format!("{}\n", table)
}

/// Format one invoice with its items, totals and payments
pub fn format_invoice_details(view: &InvoiceView) -> String {
    let invoice = &view.invoice;
    let mut output = String::new();

    output.push_str(&format!("Invoice: {}\n", invoice.invoice_number));
    output.push_str(&format!("  ID:       {}\n", invoice.id));
    output.push_str(&format!("  Project:  {}\n", invoice.project_id));
    if !invoice.client_name.is_empty() {
        output.push_str(&format!("  Client:   {}\n", invoice.client_name));
    }
    output.push_str(&format!("  Status:   {}\n", invoice.status));
    output.push_str(&format!("  Date:     {}\n", invoice.invoice_date));
    output.push_str(&format!("  Due:      {}\n", invoice.due_date));
    if view.is_overdue {
        output.push_str(&format!("  Overdue:  {} days\n", view.days_overdue));
    }
    if let Some(frequency) = invoice.recurring_frequency {
        output.push_str(&format!("  Repeats:  {}", frequency));
        if let Some(next) = invoice.next_recurring_date {
            output.push_str(&format!(", next on {}", next));
        }
        output.push('\n');
    }

    if !invoice.items.is_empty() {
        let rows = invoice.items.iter().map(|item| ItemRow {
            description: item.description.clone(),
            quantity: item.quantity.to_string(),
            unit_price: item.unit_price.to_string(),
            amount: item.amount().to_string(),
        });
        let mut table = Table::new(rows);
        table.with(Style::psql());
        output.push('\n');
        output.push_str(&table.to_string());
        output.push('\n');
    }

    output.push('\n');
    output.push_str(&format!("  Subtotal: {:>12}\n", invoice.subtotal.to_string()));
    output.push_str(&format!(
        "  Tax {:>5}{:>12}\n",
        invoice.tax_rate.to_string(),
        invoice.tax_amount.to_string()
    ));
    if !invoice.discount_amount.is_zero() {
        output.push_str(&format!(
            "  Discount: {:>12}\n",
            (-invoice.discount_amount).to_string()
        ));
    }
    output.push_str(&format!("  Total:    {:>12}\n", invoice.total_amount.to_string()));
    output.push_str(&format!("  Paid:     {:>12}\n", invoice.amount_paid.to_string()));
    output.push_str(&format!("  Balance:  {:>12}\n", view.balance.to_string()));
    if view.credit.is_positive() {
        output.push_str(&format!("  Credit:   {:>12}\n", view.credit.to_string()));
    }

    if !invoice.payments.is_empty() {
        output.push_str("\n  Payments:\n");
        for payment in &invoice.payments {
            output.push_str(&format!(
                "    {} {:>12} {}",
                payment.payment_date,
                payment.amount.to_string(),
                payment.method
            ));
            if let Some(reference) = &payment.reference {
                output.push_str(&format!(" ({})", reference));
            }
            output.push('\n');
        }
    }

    if !invoice.notes.is_empty() {
        output.push_str(&format!("\n  Notes: {}\n", invoice.notes));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Invoice, InvoiceItem, InvoiceStatus, Money, Payment, PaymentMethod, Percentage, ProjectId,
        Quantity,
    };
    use chrono::NaiveDate;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn sent_invoice() -> Invoice {
        let mut invoice = Invoice::new(ProjectId::new(), "INV-00003", date(1, 1), date(1, 31));
        invoice.client_name = "Acme".into();
        invoice
            .items
            .push(InvoiceItem::manual("Design", Quantity::whole(10), Money::from_cents(10_000)));
        invoice.tax_rate = Percentage::whole(10);
        invoice.recalculate();
        invoice.status = InvoiceStatus::PartiallyPaid;
        invoice.amount_paid = Money::from_cents(60_000);
        invoice
            .payments
            .push(Payment::new(Money::from_cents(60_000), date(1, 20), PaymentMethod::Card, "lee"));
        invoice
    }

    #[test]
    fn test_format_invoice_list_flags_overdue() {
        let view = InvoiceView::new(sent_invoice(), date(2, 10));
        let output = format_invoice_list(&[view]);
        assert!(output.contains("INV-00003"));
        assert!(output.contains("Partially Paid (overdue)"));
        assert!(output.contains("$500.00"));
    }

    #[test]
    fn test_format_invoice_details() {
        let view = InvoiceView::new(sent_invoice(), date(2, 10));
        let output = format_invoice_details(&view);
        assert!(output.contains("Invoice: INV-00003"));
        assert!(output.contains("Design"));
        assert!(output.contains("$1100.00"));
        assert!(output.contains("Overdue:  10 days"));
        assert!(output.contains("Card"));
    }

    #[test]
    fn test_format_empty_list() {
        assert!(format_invoice_list(&[]).contains("No invoices found"));
    }
}
