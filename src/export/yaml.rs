//! YAML export
//!
//! Writes the same snapshot as the JSON exporter in a human-readable form.

use std::io::Write;

use crate::error::{LedgerError, LedgerResult};
use crate::export::json::LedgerExport;
use crate::storage::Storage;

/// Export the full ledger to YAML
pub fn export_full_yaml<W: Write>(storage: &Storage, mut writer: W) -> LedgerResult<()> {
    let export = LedgerExport::from_storage(storage)?;

    let header = format!(
        "# Project ledger export\n# Generated: {}\n# App Version: {}\n\n",
        export.exported_at, export.app_version
    );
    writer
        .write_all(header.as_bytes())
        .map_err(|e| LedgerError::Export(e.to_string()))?;

    serde_yaml::to_writer(writer, &export).map_err(|e| LedgerError::Export(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerPaths;
    use crate::models::{Money, ProjectId};
    use crate::services::{BudgetLedger, CreateBudgetInput};
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::open(paths).unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_yaml_export() {
        let (_temp, storage) = create_test_storage();
        BudgetLedger::new(&storage)
            .create_budget(CreateBudgetInput::new(ProjectId::new(), "Office fit-out", Money::from_cents(500_000)))
            .unwrap();

        let mut output = Vec::new();
        export_full_yaml(&storage, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.starts_with("# Project ledger export"));
        assert!(text.contains("Office fit-out"));

        let parsed: LedgerExport = serde_yaml::from_str(&text).unwrap();
        assert_eq!(parsed.budgets.len(), 1);
        assert!(parsed.validate().is_ok());
    }
}
