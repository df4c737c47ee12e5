use anyhow::Result;
use clap::{Parser, Subcommand};

use project_ledger::cli::{
    handle_alert_command, handle_budget_command, handle_expense_command, handle_export_command,
    handle_invoice_command, handle_time_command,
};
use project_ledger::config::{LedgerPaths, Settings};
use project_ledger::logging::init_tracing;
use project_ledger::models::ProjectId;
use project_ledger::storage::{initialize_storage, Storage};

#[derive(Parser)]
#[command(
    name = "ledger",
    version,
    about = "Project budget tracking and invoicing",
    long_about = "Track project budgets against approved expenses, get warned as \
                  spending crosses thresholds, and bill approved time and expenses \
                  through invoices with payments and recurring schedules."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Project budget commands
    #[command(subcommand)]
    Budget(project_ledger::cli::BudgetCommands),

    /// Expense commands
    #[command(subcommand)]
    Expense(project_ledger::cli::ExpenseCommands),

    /// Time entry commands
    #[command(subcommand)]
    Time(project_ledger::cli::TimeCommands),

    /// Invoice commands
    #[command(subcommand, alias = "inv")]
    Invoice(project_ledger::cli::InvoiceCommands),

    /// Budget alert commands
    #[command(subcommand)]
    Alert(project_ledger::cli::AlertCommands),

    /// Export ledger data
    #[command(subcommand)]
    Export(project_ledger::cli::ExportCommands),

    /// Show recent audit log entries
    Audit {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Only entries for this project
        #[arg(short, long)]
        project: Option<ProjectId>,
    },

    /// Initialize the ledger data directory
    Init,

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = LedgerPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    init_tracing(&settings.log_level);

    let storage = Storage::open(paths.clone())?;

    match cli.command {
        Some(Commands::Budget(cmd)) => handle_budget_command(&storage, &settings, cmd)?,
        Some(Commands::Expense(cmd)) => handle_expense_command(&storage, cmd)?,
        Some(Commands::Time(cmd)) => handle_time_command(&storage, cmd)?,
        Some(Commands::Invoice(cmd)) => handle_invoice_command(&storage, &settings, cmd)?,
        Some(Commands::Alert(cmd)) => handle_alert_command(&storage, cmd)?,
        Some(Commands::Export(cmd)) => handle_export_command(&storage, cmd)?,
        Some(Commands::Audit { limit, project }) => {
            let entries = match project {
                Some(project) => storage
                    .audit_log()
                    .read_recent_where(limit, |entry| entry.concerns_project(project))?,
                None => storage.audit_log().read_recent(limit)?,
            };
            if entries.is_empty() {
                println!("No audit entries yet.");
            }
            for entry in entries {
                println!("{}", entry.format_human_readable());
            }
        }
        Some(Commands::Init) => {
            println!("Initializing project ledger at: {}", paths.base_dir().display());
            initialize_storage(&paths)?;
            println!("Initialization complete!");
            println!();
            println!("Run 'ledger budget create <project> <name> <total>' to get started.");
        }
        Some(Commands::Config) => {
            println!("Project Ledger Configuration");
            println!("============================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Settings file:    {}", paths.settings_file().display());
            println!();
            println!("Settings:");
            println!("  Currency symbol:    {}", settings.currency_symbol);
            println!(
                "  Alert thresholds:   {:.0}% / {:.0}%",
                settings.default_warning_threshold * 100.0,
                settings.default_critical_threshold * 100.0
            );
            println!("  Default tax rate:   {}", settings.default_tax_rate);
            println!("  Payment terms:      {} days", settings.payment_terms_days);
            println!("  Invoice prefix:     {}", settings.invoice_number_prefix);
            println!("  Log level:          {}", settings.log_level);
        }
        None => {
            println!("Project Ledger - budgets, alerts and invoices");
            println!();
            println!("Run 'ledger --help' for usage information.");
        }
    }

    Ok(())
}
