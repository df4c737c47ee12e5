//! Invoice CLI commands
//!
//! Generation, sending, payments, cancellation, and the periodic overdue
//! and recurring jobs.

use clap::Subcommand;

use crate::config::Settings;
use crate::display::{format_invoice_details, format_invoice_list};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{InvoiceItem, InvoiceStatus, PaymentMethod, RecurringFrequency};
use crate::services::{
    GenerateInvoiceRequest, InvoiceDefaults, InvoiceLedger, InvoiceLifecycle, InvoiceView,
    PaymentInput, RecurringScheduler,
};
use crate::storage::Storage;

use super::{
    parse_date, parse_date_or_today, parse_money, parse_percentage, parse_project,
    parse_quantity,
};

/// Invoice subcommands
#[derive(Subcommand)]
pub enum InvoiceCommands {
    /// Invoice a project's approved billable work over a date range
    Generate {
        /// Project ID
        project: String,
        /// Range start (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Range end (YYYY-MM-DD)
        #[arg(long)]
        to: String,
        #[arg(short, long, default_value = "")]
        client: String,
        /// Also bill approved billable expenses
        #[arg(long)]
        expenses: bool,
        /// Tax rate in percent (defaults to the configured rate)
        #[arg(long)]
        tax: Option<String>,
        /// Discount amount
        #[arg(long, default_value = "0")]
        discount: String,
        /// Invoice date (defaults to today)
        #[arg(long)]
        date: Option<String>,
        /// Due date (defaults to the payment terms)
        #[arg(long)]
        due: Option<String>,
        /// Repeat weekly, monthly, quarterly or annually
        #[arg(long)]
        recurring: Option<String>,
        /// Manual line as "description:quantity:unit price" (repeatable)
        #[arg(long = "item")]
        items: Vec<String>,
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Add newly approved work to a draft
    Claim {
        /// Invoice number or ID
        invoice: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        expenses: bool,
    },

    /// Send a draft invoice
    Send {
        /// Invoice number or ID
        invoice: String,
    },

    /// Record a payment
    Pay {
        /// Invoice number or ID
        invoice: String,
        /// Amount paid
        amount: String,
        /// Payment method (bank, card, cash, check, other)
        #[arg(short, long, default_value = "bank")]
        method: String,
        /// Payment date (defaults to today)
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short, long)]
        reference: Option<String>,
        #[arg(long, default_value = "cli")]
        by: String,
    },

    /// Cancel an invoice and release its claimed work
    Cancel {
        /// Invoice number or ID
        invoice: String,
    },

    /// Show an invoice
    Show {
        /// Invoice number or ID
        invoice: String,
        /// Evaluate overdue state as of this date
        #[arg(long)]
        today: Option<String>,
    },

    /// List invoices
    List {
        #[arg(short, long)]
        project: Option<String>,
        #[arg(short, long)]
        status: Option<String>,
        #[arg(long)]
        today: Option<String>,
    },

    /// Mark overdue invoices and issue due recurring invoices
    Sweep {
        #[arg(long)]
        today: Option<String>,
    },

    /// Issue the next invoice of a recurring series now
    Next {
        /// Invoice number or ID
        invoice: String,
    },
}

/// Handle an invoice command
pub fn handle_invoice_command(
    storage: &Storage,
    settings: &Settings,
    cmd: InvoiceCommands,
) -> LedgerResult<()> {
    let defaults = InvoiceDefaults::from_settings(settings);
    let ledger = InvoiceLedger::new(storage).with_defaults(defaults.clone());
    let lifecycle = InvoiceLifecycle::new(storage);
    let scheduler = RecurringScheduler::new(storage).with_prefix(defaults.number_prefix.clone());

    match cmd {
        InvoiceCommands::Generate {
            project,
            from,
            to,
            client,
            expenses,
            tax,
            discount,
            date,
            due,
            recurring,
            items,
            notes,
        } => {
            let mut request = GenerateInvoiceRequest::new(
                parse_project(&project)?,
                parse_date(&from)?,
                parse_date(&to)?,
                parse_date_or_today(date.as_deref())?,
            );
            request.client_name = client;
            request.include_expenses = expenses;
            request.tax_rate = match tax {
                Some(tax) => parse_percentage(&tax)?,
                None => settings.default_tax_rate,
            };
            request.discount = parse_money(&discount)?;
            request.due_date = due.as_deref().map(parse_date).transpose()?;
            request.recurring = recurring
                .as_deref()
                .map(|r| {
                    RecurringFrequency::parse(r).ok_or_else(|| {
                        LedgerError::Validation(format!(
                            "Invalid frequency: '{}'. Valid: weekly, monthly, quarterly, annually",
                            r
                        ))
                    })
                })
                .transpose()?;
            request.manual_items = items
                .iter()
                .map(|raw| parse_item(raw))
                .collect::<LedgerResult<_>>()?;
            request.notes = notes;

            let invoice = ledger.generate_from_time_range(request)?;
            println!("Created invoice {}", invoice.invoice_number);
            println!("  Lines:    {}", invoice.items.len());
            println!("  Subtotal: {}", invoice.subtotal);
            println!("  Tax:      {}", invoice.tax_amount);
            println!("  Total:    {}", invoice.total_amount);
            println!("  Due:      {}", invoice.due_date);
        }

        InvoiceCommands::Claim {
            invoice,
            from,
            to,
            expenses,
        } => {
            let found = ledger.find(&invoice)?;
            let updated =
                ledger.claim_into_draft(found.id, parse_date(&from)?, parse_date(&to)?, expenses)?;
            println!(
                "Invoice {} now has {} lines, total {}",
                updated.invoice_number,
                updated.items.len(),
                updated.total_amount
            );
        }

        InvoiceCommands::Send { invoice } => {
            let found = ledger.find(&invoice)?;
            let sent = lifecycle.send(found.id)?;
            println!("Sent invoice {} ({})", sent.invoice_number, sent.total_amount);
        }

        InvoiceCommands::Pay {
            invoice,
            amount,
            method,
            date,
            reference,
            by,
        } => {
            let found = ledger.find(&invoice)?;
            let method = PaymentMethod::parse(&method).ok_or_else(|| {
                LedgerError::Validation(format!(
                    "Invalid payment method: '{}'. Valid: bank, card, cash, check, other",
                    method
                ))
            })?;
            let mut input =
                PaymentInput::new(parse_money(&amount)?, method, parse_date_or_today(date.as_deref())?);
            input.reference = reference;
            input.recorded_by = by;

            let paid = ledger.apply_payment(found.id, input)?;
            println!("Recorded payment on {}", paid.invoice_number);
            println!("  Status:  {}", paid.status);
            println!("  Balance: {}", paid.balance());
            if paid.credit().is_positive() {
                println!("  Credit:  {}", paid.credit());
            }
            if let Some(successor) = storage.invoices.successor_of(paid.id)? {
                if paid.status == InvoiceStatus::Paid {
                    println!("  Next:    {}", successor.invoice_number);
                }
            }
        }

        InvoiceCommands::Cancel { invoice } => {
            let found = ledger.find(&invoice)?;
            let cancelled = lifecycle.cancel(found.id)?;
            println!("Cancelled invoice {}", cancelled.invoice_number);
        }

        InvoiceCommands::Show { invoice, today } => {
            let found = ledger.find(&invoice)?;
            let view = ledger.get_invoice(found.id, parse_date_or_today(today.as_deref())?)?;
            print!("{}", format_invoice_details(&view));
        }

        InvoiceCommands::List {
            project,
            status,
            today,
        } => {
            let project = project.as_deref().map(parse_project).transpose()?;
            let status = status
                .as_deref()
                .map(|s| {
                    InvoiceStatus::parse(s).ok_or_else(|| {
                        LedgerError::Validation(format!("Invalid invoice status: '{}'", s))
                    })
                })
                .transpose()?;
            let today = parse_date_or_today(today.as_deref())?;

            let views: Vec<InvoiceView> = ledger
                .list_invoices(project, status)?
                .into_iter()
                .map(|invoice| InvoiceView::new(invoice, today))
                .collect();
            print!("{}", format_invoice_list(&views));
        }

        InvoiceCommands::Sweep { today } => {
            let today = parse_date_or_today(today.as_deref())?;
            let overdue = lifecycle.sweep_overdue(today)?;
            let spawned = scheduler.spawn_due(today)?;

            println!("Marked {} invoice(s) overdue", overdue.len());
            for invoice in &overdue {
                println!("  {} ({} days)", invoice.invoice_number, invoice.days_overdue(today));
            }
            println!("Issued {} recurring invoice(s)", spawned.len());
            for invoice in &spawned {
                println!("  {} dated {}", invoice.invoice_number, invoice.invoice_date);
            }
        }

        InvoiceCommands::Next { invoice } => {
            let found = ledger.find(&invoice)?;
            match scheduler.maybe_spawn_next(found.id)? {
                Some(next) => println!(
                    "Next invoice of {}: {} dated {}",
                    found.invoice_number, next.invoice_number, next.invoice_date
                ),
                None => println!("Invoice {} does not recur", found.invoice_number),
            }
        }
    }

    Ok(())
}

/// Parse "description:quantity:unit price"; the description may contain colons
fn parse_item(raw: &str) -> LedgerResult<InvoiceItem> {
    let mut parts = raw.rsplitn(3, ':');
    let (price, quantity, description) = match (parts.next(), parts.next(), parts.next()) {
        (Some(p), Some(q), Some(d)) => (p, q, d),
        _ => {
            return Err(LedgerError::Validation(format!(
                "Invalid item '{}'. Use \"description:quantity:unit price\"",
                raw
            )))
        }
    };

    Ok(InvoiceItem::manual(
        description.trim(),
        parse_quantity(quantity)?,
        parse_money(price)?,
    ))
}
