//! CLI commands for data export

use clap::{Subcommand, ValueEnum};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::{LedgerError, LedgerResult};
use crate::export::{csv, json, yaml};
use crate::storage::Storage;

use super::parse_date_or_today;

/// Snapshot format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    /// JSON (machine-readable)
    Json,
    /// YAML (human-readable)
    Yaml,
}

/// Export subcommands
#[derive(Subcommand, Debug)]
pub enum ExportCommands {
    /// Export the whole ledger
    All {
        /// Output file path
        output: PathBuf,

        #[arg(short, long, value_enum, default_value = "json")]
        format: ExportFormat,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Export invoices to CSV
    Invoices {
        /// Output file path
        output: PathBuf,

        /// Compute overdue days as of this date
        #[arg(long)]
        today: Option<String>,
    },

    /// Export budget summaries to CSV
    Budgets {
        /// Output file path
        output: PathBuf,
    },

    /// Show what an export would contain
    Info,
}

/// Handle export commands
pub fn handle_export_command(storage: &Storage, cmd: ExportCommands) -> LedgerResult<()> {
    match cmd {
        ExportCommands::All {
            output,
            format,
            pretty,
        } => {
            let writer = create_output(&output)?;
            match format {
                ExportFormat::Json => json::export_full_json(storage, writer, pretty)?,
                ExportFormat::Yaml => yaml::export_full_yaml(storage, writer)?,
            }
            println!("Full ledger exported to: {}", output.display());
        }

        ExportCommands::Invoices { output, today } => {
            let today = parse_date_or_today(today.as_deref())?;
            let count = csv::export_invoices_csv(storage, create_output(&output)?, today)?;
            println!("Exported {} invoices to: {}", count, output.display());
        }

        ExportCommands::Budgets { output } => {
            let count = csv::export_budget_summaries_csv(storage, create_output(&output)?)?;
            println!("Exported {} budgets to: {}", count, output.display());
        }

        ExportCommands::Info => {
            let export = json::LedgerExport::from_storage(storage)?;
            let meta = &export.metadata;

            println!("Export Information");
            println!("==================\n");
            println!("Schema Version: {}", export.schema_version);
            println!("App Version:    {}", export.app_version);
            println!();
            println!("Data Summary:");
            println!("  Budgets:       {}", meta.budget_count);
            println!("  Expenses:      {}", meta.expense_count);
            println!("  Alerts:        {}", meta.alert_count);
            println!("  Time entries:  {}", meta.time_entry_count);
            println!("  Invoices:      {}", meta.invoice_count);
            println!("  Outstanding:   {}", meta.outstanding);
            if let (Some(earliest), Some(latest)) = (meta.earliest_invoice, meta.latest_invoice) {
                println!("  Invoice dates: {} to {}", earliest, latest);
            }
        }
    }

    Ok(())
}

fn create_output(path: &Path) -> LedgerResult<BufWriter<File>> {
    let file = File::create(path).map_err(|e| {
        LedgerError::Export(format!("Failed to create file {}: {}", path.display(), e))
    })?;
    Ok(BufWriter::new(file))
}
