//! Export module for the project ledger
//!
//! Read-only exporters:
//! - CSV: invoices and budget summaries (spreadsheet-compatible)
//! - JSON: full ledger snapshot, machine-readable
//! - YAML: full ledger snapshot, human-readable

pub mod csv;
pub mod json;
pub mod yaml;

pub use csv::{export_budget_summaries_csv, export_invoices_csv};
pub use json::{export_full_json, LedgerExport, EXPORT_SCHEMA_VERSION};
pub use yaml::export_full_yaml;
