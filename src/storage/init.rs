//! Storage initialization
//!
//! Handles first-run setup: directories, the settings file and empty data
//! files so that a fresh ledger can be inspected before anything is recorded.

use crate::config::{LedgerPaths, Settings};
use crate::error::LedgerResult;

use super::Storage;

/// Initialize storage for a fresh installation.
///
/// Existing data files are left untouched. Returns the effective settings.
pub fn initialize_storage(paths: &LedgerPaths) -> LedgerResult<Settings> {
    paths.ensure_directories()?;

    let settings = Settings::load_or_create(paths)?;
    if !paths.is_initialized() {
        settings.save(paths)?;
    }

    let storage = Storage::new(paths.clone())?;
    storage.load_all()?;
    storage.save_all()?;

    tracing::info!(base_dir = %paths.base_dir().display(), "ledger initialized");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_creates_files() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());

        let settings = initialize_storage(&paths).unwrap();
        assert_eq!(settings.invoice_number_prefix, "INV");
        assert!(paths.is_initialized());
        assert!(paths.budgets_file().exists());
        assert!(paths.invoices_file().exists());
        assert!(paths.time_entries_file().exists());
    }

    #[test]
    fn test_initialize_is_repeatable() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());

        initialize_storage(&paths).unwrap();
        let contents = std::fs::read_to_string(paths.expenses_file()).unwrap();
        initialize_storage(&paths).unwrap();
        assert_eq!(std::fs::read_to_string(paths.expenses_file()).unwrap(), contents);
    }
}
