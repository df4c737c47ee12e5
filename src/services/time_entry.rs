//! Time entry service
//!
//! Minimal workflow for recorded hours: Draft -> Submitted -> Approved or
//! Rejected. Invoicing moves an approved entry to Invoiced; that transition
//! belongs to the claimer, never to this service.

use chrono::NaiveDate;

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Money, ProjectId, Quantity, TimeEntry, TimeEntryId, TimeEntryStatus};
use crate::storage::{Storage, Tx};

/// Input for recording hours
#[derive(Debug, Clone)]
pub struct RecordTimeInput {
    pub project_id: ProjectId,
    pub user: String,
    pub date: NaiveDate,
    pub hours: Quantity,
    pub hourly_rate: Money,
    pub description: String,
    pub is_billable: bool,
}

/// Service for time entries
pub struct TimeEntryService<'a> {
    storage: &'a Storage,
}

impl<'a> TimeEntryService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Record a draft time entry
    pub fn record(&self, input: RecordTimeInput) -> LedgerResult<TimeEntry> {
        let user = input.user.trim();
        if user.is_empty() {
            return Err(LedgerError::Validation("A time entry needs a user".into()));
        }

        let mut entry = TimeEntry::new(
            input.project_id,
            user,
            input.date,
            input.hours,
            input.hourly_rate,
        );
        entry.description = input.description.trim().to_string();
        entry.is_billable = input.is_billable;
        entry.validate().map_err(LedgerError::Validation)?;

        self.storage.transaction(|tx| {
            tx.time_entries.upsert(entry.clone())?;
            tx.log_create(
                EntityType::TimeEntry,
                entry.id.full(),
                Some(format!("{} {}h", entry.user, entry.hours)),
                &entry,
            );

            tracing::info!(entry = %entry.id, hours = %entry.hours, "time recorded");
            Ok(entry)
        })
    }

    /// Draft -> Submitted
    pub fn submit(&self, id: TimeEntryId) -> LedgerResult<TimeEntry> {
        self.transition(id, &[TimeEntryStatus::Draft], TimeEntryStatus::Submitted)
    }

    /// Submitted -> Approved
    pub fn approve(&self, id: TimeEntryId) -> LedgerResult<TimeEntry> {
        self.transition(id, &[TimeEntryStatus::Submitted], TimeEntryStatus::Approved)
    }

    /// Submitted or Approved -> Rejected
    pub fn reject(&self, id: TimeEntryId) -> LedgerResult<TimeEntry> {
        self.transition(
            id,
            &[TimeEntryStatus::Submitted, TimeEntryStatus::Approved],
            TimeEntryStatus::Rejected,
        )
    }

    /// Soft-delete an entry that has not been invoiced
    pub fn delete(&self, id: TimeEntryId) -> LedgerResult<TimeEntry> {
        self.storage.transaction(|tx| {
            let mut entry = tx.time_entries.get_active(id)?;
            if let Some(invoice) = entry.invoice_id {
                return Err(LedgerError::Conflict(format!(
                    "Time entry {} is billed on invoice {}",
                    entry.id, invoice
                )));
            }

            entry.deleted_at = Some(chrono::Utc::now());
            entry.updated_at = chrono::Utc::now();
            tx.time_entries.upsert(entry.clone())?;
            tx.log_delete(EntityType::TimeEntry, entry.id.full(), None, &entry);
            Ok(entry)
        })
    }

    pub fn get(&self, id: TimeEntryId) -> LedgerResult<TimeEntry> {
        self.storage.time_entries.get_active(id)
    }

    /// Find an entry by ID string
    pub fn find(&self, identifier: &str) -> LedgerResult<TimeEntry> {
        let id = match identifier.parse::<TimeEntryId>() {
            Ok(id) => id,
            Err(_) => self
                .storage
                .time_entries
                .resolve_short_id(identifier)?
                .ok_or_else(|| LedgerError::time_entry_not_found(identifier))?,
        };
        self.storage.time_entries.get_active(id)
    }

    pub fn list(&self, project_id: ProjectId) -> LedgerResult<Vec<TimeEntry>> {
        self.storage.time_entries.for_project(project_id)
    }

    fn transition(
        &self,
        id: TimeEntryId,
        from: &[TimeEntryStatus],
        to: TimeEntryStatus,
    ) -> LedgerResult<TimeEntry> {
        self.storage
            .transaction(|tx| Self::transition_within(tx, id, from, to))
    }

    fn transition_within(
        tx: &Tx<'_>,
        id: TimeEntryId,
        from: &[TimeEntryStatus],
        to: TimeEntryStatus,
    ) -> LedgerResult<TimeEntry> {
        let mut entry = tx.time_entries.get_active(id)?;
        if !from.contains(&entry.status) {
            return Err(LedgerError::Conflict(format!(
                "Time entry {} is {} and cannot move to {}",
                entry.id, entry.status, to
            )));
        }

        let before = entry.clone();
        entry.set_status(to);
        tx.time_entries.upsert(entry.clone())?;
        tx.log_update(
            EntityType::TimeEntry,
            entry.id.full(),
            None,
            &before,
            &entry,
            Some(format!("status: {} -> {}", before.status, entry.status)),
        );

        tracing::info!(entry = %entry.id, status = %entry.status, "time entry updated");
        Ok(entry)
    }
}
