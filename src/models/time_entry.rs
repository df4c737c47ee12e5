//! Time entry model
//!
//! Time entries are recorded by team members and consumed by invoicing.
//! Moving an entry to `Invoiced` is exclusive: one invoice per entry.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{InvoiceId, ProjectId, TimeEntryId};
use super::measure::Quantity;
use super::money::Money;

/// Workflow status of a time entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeEntryStatus {
    #[default]
    Draft,
    Submitted,
    Approved,
    Rejected,
    Invoiced,
}

impl fmt::Display for TimeEntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "Draft"),
            Self::Submitted => write!(f, "Submitted"),
            Self::Approved => write!(f, "Approved"),
            Self::Rejected => write!(f, "Rejected"),
            Self::Invoiced => write!(f, "Invoiced"),
        }
    }
}

/// Hours worked on a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: TimeEntryId,

    pub project_id: ProjectId,

    /// Person who did the work
    pub user: String,

    pub date: NaiveDate,

    pub hours: Quantity,

    pub hourly_rate: Money,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub is_billable: bool,

    #[serde(default)]
    pub status: TimeEntryStatus,

    /// Invoice that claimed this entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<InvoiceId>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TimeEntry {
    /// Create a new draft time entry
    pub fn new(
        project_id: ProjectId,
        user: impl Into<String>,
        date: NaiveDate,
        hours: Quantity,
        hourly_rate: Money,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TimeEntryId::new(),
            project_id,
            user: user.into(),
            date,
            hours,
            hourly_rate,
            description: String::new(),
            is_billable: true,
            status: TimeEntryStatus::Draft,
            invoice_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Value of the entry (hours times rate)
    pub fn amount(&self) -> Money {
        self.hourly_rate.times(self.hours)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether the entry can be pulled into an invoice
    pub fn is_claimable(&self) -> bool {
        !self.is_deleted()
            && self.is_billable
            && self.status == TimeEntryStatus::Approved
            && self.invoice_id.is_none()
    }

    pub fn set_status(&mut self, status: TimeEntryStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.hours.is_positive() {
            return Err(format!("Hours must be positive, got {}", self.hours));
        }
        if self.hourly_rate.is_negative() {
            return Err(format!("Hourly rate cannot be negative, got {}", self.hourly_rate));
        }
        Ok(())
    }
}

impl fmt::Display for TimeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}h @ {}",
            self.date.format("%Y-%m-%d"),
            self.user,
            self.hours,
            self.hourly_rate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TimeEntry {
        TimeEntry::new(
            ProjectId::new(),
            "dana",
            NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
            Quantity::parse("7.5").unwrap(),
            Money::from_cents(12000),
        )
    }

    #[test]
    fn test_amount() {
        assert_eq!(sample().amount().cents(), 90000);
    }

    #[test]
    fn test_claimable_only_when_approved() {
        let mut entry = sample();
        assert!(!entry.is_claimable());

        entry.set_status(TimeEntryStatus::Approved);
        assert!(entry.is_claimable());

        entry.is_billable = false;
        assert!(!entry.is_claimable());
    }

    #[test]
    fn test_validate() {
        let mut entry = sample();
        assert!(entry.validate().is_ok());
        entry.hours = Quantity::zero();
        assert!(entry.validate().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(sample().to_string(), "2025-02-03 dana 7.50h @ $120.00");
    }
}
