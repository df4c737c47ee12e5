//! Storage layer for the project ledger
//!
//! Every entity lives in its own JSON file under `data/`, held in memory by a
//! [`Table`]. Mutations go through [`Storage::transaction`], which serializes
//! writers, snapshots all tables, and either persists everything or restores
//! the snapshot. Audit entries and ledger events staged on the [`Tx`] are
//! only released once the transaction has committed.
//!
//! Writers in other processes are excluded by a file lock on `data/.lock`;
//! a transaction reloads the tables first when another process has
//! committed since this one last read them.

pub mod alerts;
pub mod budgets;
pub mod expenses;
pub mod init;
pub mod invoices;
mod lock;
pub mod table;
pub mod time_entries;

use std::cell::RefCell;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;

pub use alerts::AlertRepository;
pub use budgets::BudgetRepository;
pub use expenses::ExpenseRepository;
pub use init::initialize_storage;
pub use invoices::InvoiceRepository;
pub use table::{Record, Table};
pub use time_entries::TimeEntryRepository;

use crate::audit::{AuditEntry, AuditLogger, EntityType};
use crate::config::LedgerPaths;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{BudgetAlert, Expense, Invoice, ProjectBudget, TimeEntry};
use crate::notify::{LedgerEvent, LogNotifier, Notifier};

use lock::StoreLock;
use table::Rows;

/// Generation of tables that were never loaded from disk
const UNLOADED: u64 = u64::MAX;

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: LedgerPaths,
    pub budgets: BudgetRepository,
    pub expenses: ExpenseRepository,
    pub alerts: AlertRepository,
    pub time_entries: TimeEntryRepository,
    pub invoices: InvoiceRepository,
    audit: AuditLogger,
    notifier: Box<dyn Notifier>,
    write_guard: Mutex<()>,
    /// Commit counter of the data currently held in memory
    generation: AtomicU64,
}

/// In-memory copy of every table, used to roll back a failed transaction
struct Snapshot {
    budgets: Rows<ProjectBudget>,
    expenses: Rows<Expense>,
    alerts: Rows<BudgetAlert>,
    time_entries: Rows<TimeEntry>,
    invoices: Rows<Invoice>,
}

impl Storage {
    /// Create a new Storage instance with empty tables
    pub fn new(paths: LedgerPaths) -> LedgerResult<Self> {
        paths.ensure_directories()?;

        Ok(Self {
            budgets: BudgetRepository::new(paths.budgets_file()),
            expenses: ExpenseRepository::new(paths.expenses_file()),
            alerts: AlertRepository::new(paths.alerts_file()),
            time_entries: TimeEntryRepository::new(paths.time_entries_file()),
            invoices: InvoiceRepository::new(paths.invoices_file()),
            audit: AuditLogger::new(paths.audit_log()),
            notifier: Box::new(LogNotifier),
            write_guard: Mutex::new(()),
            generation: AtomicU64::new(UNLOADED),
            paths,
        })
    }

    /// Create a Storage instance and load everything from disk
    pub fn open(paths: LedgerPaths) -> LedgerResult<Self> {
        let storage = Self::new(paths)?;
        storage.load_all()?;
        Ok(storage)
    }

    /// Replace the notifier that receives committed events
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &LedgerPaths {
        &self.paths
    }

    /// The append-only audit log
    pub fn audit_log(&self) -> &AuditLogger {
        &self.audit
    }

    /// Load all data from disk
    pub fn load_all(&self) -> LedgerResult<()> {
        let generation = lock::read_generation(&self.paths.lock_file());
        self.load_tables()?;
        self.generation.store(generation, Ordering::SeqCst);
        Ok(())
    }

    fn load_tables(&self) -> LedgerResult<()> {
        self.budgets.load()?;
        self.expenses.load()?;
        self.alerts.load()?;
        self.time_entries.load()?;
        self.invoices.load()?;
        Ok(())
    }

    /// Save all data to disk
    pub fn save_all(&self) -> LedgerResult<()> {
        self.budgets.save()?;
        self.expenses.save()?;
        self.alerts.save()?;
        self.time_entries.save()?;
        self.invoices.save()?;
        Ok(())
    }

    /// Check if storage has been initialized
    pub fn is_initialized(&self) -> bool {
        self.paths.is_initialized()
    }

    /// Run `work` as one atomic unit.
    ///
    /// Writers are serialized. If `work` fails, or the result cannot be
    /// saved, every table is restored to its state before the call and
    /// nothing staged on the [`Tx`] is released. On success the staged audit
    /// entries are appended, the write lock is dropped, and staged events
    /// are handed to the notifier.
    pub fn transaction<T, F>(&self, work: F) -> LedgerResult<T>
    where
        F: FnOnce(&Tx<'_>) -> LedgerResult<T>,
    {
        let guard = self
            .write_guard
            .lock()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire store lock: {}", e)))?;
        let mut file_lock = StoreLock::acquire(&self.paths.lock_file())?;

        let committed = file_lock.generation()?;
        if committed != self.generation.load(Ordering::SeqCst) {
            tracing::debug!(committed, "reloading tables changed by another process");
            self.load_tables()?;
            self.generation.store(committed, Ordering::SeqCst);
        }

        let snapshot = self.snapshot()?;
        let tx = Tx {
            storage: self,
            audit: RefCell::new(Vec::new()),
            events: RefCell::new(Vec::new()),
        };

        let value = match work(&tx) {
            Ok(value) => value,
            Err(err) => {
                self.rollback(snapshot);
                tracing::debug!(error = %err, "transaction rolled back");
                return Err(err);
            }
        };

        // Bumped before the files change so no reader can miss this commit
        let next = committed.wrapping_add(1) % UNLOADED;
        if let Err(err) = file_lock.set_generation(next) {
            self.rollback(snapshot);
            return Err(err);
        }

        if let Err(err) = self.save_all() {
            self.rollback(snapshot);
            if let Err(resave) = self.save_all() {
                tracing::error!(error = %resave, "failed to rewrite data after rollback");
            }
            self.generation.store(UNLOADED, Ordering::SeqCst);
            return Err(err);
        }
        self.generation.store(next, Ordering::SeqCst);

        let Tx { audit, events, .. } = tx;
        if let Err(err) = self.audit.log_batch(&audit.into_inner()) {
            tracing::warn!(error = %err, "failed to append audit entries");
        }
        drop(file_lock);
        drop(guard);

        for event in events.into_inner() {
            if let Err(err) = self.notifier.notify(&event) {
                tracing::warn!(kind = event.kind(), error = %err, "notification dropped");
            }
        }

        Ok(value)
    }

    fn snapshot(&self) -> LedgerResult<Snapshot> {
        Ok(Snapshot {
            budgets: self.budgets.snapshot()?,
            expenses: self.expenses.snapshot()?,
            alerts: self.alerts.snapshot()?,
            time_entries: self.time_entries.snapshot()?,
            invoices: self.invoices.snapshot()?,
        })
    }

    fn rollback(&self, snapshot: Snapshot) {
        let restored = self
            .budgets
            .restore(snapshot.budgets)
            .and_then(|_| self.expenses.restore(snapshot.expenses))
            .and_then(|_| self.alerts.restore(snapshot.alerts))
            .and_then(|_| self.time_entries.restore(snapshot.time_entries))
            .and_then(|_| self.invoices.restore(snapshot.invoices));

        if let Err(err) = restored {
            tracing::error!(error = %err, "failed to restore tables after rollback");
        }
    }
}

/// An open transaction.
///
/// Only [`Storage::transaction`] can create one, so any function taking a
/// `&Tx` runs with the store's write lock held.
pub struct Tx<'a> {
    storage: &'a Storage,
    audit: RefCell<Vec<AuditEntry>>,
    events: RefCell<Vec<LedgerEvent>>,
}

impl Tx<'_> {
    /// Stage an audit entry, written on commit
    pub fn audit(&self, entry: AuditEntry) {
        self.audit.borrow_mut().push(entry);
    }

    /// Stage an event, dispatched after commit
    pub fn emit(&self, event: LedgerEvent) {
        self.events.borrow_mut().push(event);
    }

    pub fn log_create<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) {
        self.audit(AuditEntry::create(entity_type, entity_id, entity_name, entity));
    }

    pub fn log_update<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        before: &T,
        after: &T,
        diff_summary: Option<String>,
    ) {
        self.audit(AuditEntry::update(
            entity_type,
            entity_id,
            entity_name,
            before,
            after,
            diff_summary,
        ));
    }

    pub fn log_delete<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) {
        self.audit(AuditEntry::delete(entity_type, entity_id, entity_name, entity));
    }
}

impl Deref for Tx<'_> {
    type Target = Storage;

    fn deref(&self) -> &Storage {
        self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvoiceId, Money, ProjectId};
    use crate::notify::{MemoryNotifier, NotifyError};
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        (temp_dir, storage)
    }

    fn sent_event() -> LedgerEvent {
        LedgerEvent::InvoiceSent {
            invoice_id: InvoiceId::new(),
            invoice_number: "INV-00001".into(),
        }
    }

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn notify(&self, _event: &LedgerEvent) -> Result<(), NotifyError> {
            Err(NotifyError("mail server down".into()))
        }
    }

    #[test]
    fn test_storage_creation() {
        let (temp_dir, storage) = create_test_storage();
        assert!(temp_dir.path().join("data").exists());
        assert!(!storage.is_initialized());
    }

    #[test]
    fn test_commit_persists_and_releases_staged_work() {
        let (temp_dir, storage) = create_test_storage();
        let notifier = MemoryNotifier::new();
        let storage = storage.with_notifier(Box::new(notifier.clone()));

        let budget = ProjectBudget::new(ProjectId::new(), "Build", Money::from_cents(1_000));
        storage
            .transaction(|tx| {
                tx.budgets.upsert(budget.clone())?;
                tx.log_create(
                    EntityType::Budget,
                    budget.id.full(),
                    Some(budget.name.clone()),
                    &budget,
                );
                tx.emit(sent_event());
                Ok(())
            })
            .unwrap();

        assert_eq!(notifier.events().len(), 1);
        assert_eq!(storage.audit_log().read_all().unwrap().len(), 1);

        let reopened =
            Storage::open(LedgerPaths::with_base_dir(temp_dir.path().to_path_buf())).unwrap();
        assert!(reopened.budgets.get(budget.id).unwrap().is_some());
    }

    #[test]
    fn test_failure_rolls_back_everything() {
        let (_temp, storage) = create_test_storage();
        let notifier = MemoryNotifier::new();
        let storage = storage.with_notifier(Box::new(notifier.clone()));

        let budget = ProjectBudget::new(ProjectId::new(), "Build", Money::from_cents(1_000));
        let result: LedgerResult<()> = storage.transaction(|tx| {
            tx.budgets.upsert(budget.clone())?;
            tx.audit(AuditEntry::create(EntityType::Budget, budget.id.full(), None, &budget));
            tx.emit(sent_event());
            Err(LedgerError::Conflict("lost the race".into()))
        });

        assert!(result.unwrap_err().is_conflict());
        assert!(storage.budgets.get(budget.id).unwrap().is_none());
        assert!(notifier.events().is_empty());
        assert!(storage.audit_log().read_all().unwrap().is_empty());
    }

    #[test]
    fn test_notifier_failure_keeps_commit() {
        let (_temp, storage) = create_test_storage();
        let storage = storage.with_notifier(Box::new(FailingNotifier));

        let budget = ProjectBudget::new(ProjectId::new(), "Build", Money::from_cents(1_000));
        storage
            .transaction(|tx| {
                tx.budgets.upsert(budget.clone())?;
                tx.emit(sent_event());
                Ok(())
            })
            .unwrap();

        assert!(storage.budgets.get(budget.id).unwrap().is_some());
    }

    #[test]
    fn test_commit_from_another_store_is_not_overwritten() {
        let (temp_dir, first) = create_test_storage();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let second = Storage::open(paths.clone()).unwrap();

        let one = ProjectBudget::new(ProjectId::new(), "Build", Money::from_cents(1_000));
        let two = ProjectBudget::new(ProjectId::new(), "Launch", Money::from_cents(2_000));
        first
            .transaction(|tx| tx.budgets.upsert(one.clone()))
            .unwrap();
        second
            .transaction(|tx| {
                // The first store's commit is visible before any write
                assert!(tx.budgets.get(one.id)?.is_some());
                tx.budgets.upsert(two.clone())
            })
            .unwrap();

        let reopened = Storage::open(paths).unwrap();
        assert_eq!(reopened.budgets.len().unwrap(), 2);
        assert_eq!(lock::read_generation(&reopened.paths().lock_file()), 2);
    }
}
