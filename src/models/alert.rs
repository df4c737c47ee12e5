//! Budget alert model
//!
//! One alert is recorded per upward tier crossing. Alerts are immutable once
//! created apart from their acknowledgement fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{AlertId, BudgetId, ProjectId};
use super::money::Money;

/// Spend tier of a budget, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlertTier {
    /// Below the warning threshold; never stored on an alert
    #[default]
    Normal,
    Warning,
    Critical,
    Exceeded,
}

impl AlertTier {
    /// Check if this tier is above the normal range
    pub fn is_alerting(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

impl fmt::Display for AlertTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "Normal"),
            Self::Warning => write!(f, "Warning"),
            Self::Critical => write!(f, "Critical"),
            Self::Exceeded => write!(f, "Exceeded"),
        }
    }
}

/// A recorded tier crossing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetAlert {
    /// Unique identifier
    pub id: AlertId,

    /// Budget that crossed the threshold
    pub budget_id: BudgetId,

    /// Project owning the budget
    pub project_id: ProjectId,

    /// Tier that was crossed into
    pub alert_type: AlertTier,

    /// Spend amount at which the tier starts
    pub threshold_amount: Money,

    /// Spent amount when the alert was raised
    pub current_amount: Money,

    /// Percentage used when the alert was raised
    pub percentage_used: f64,

    /// Human-readable message
    pub message: String,

    #[serde(default)]
    pub is_acknowledged: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,

    /// When the alert was raised
    pub created_at: DateTime<Utc>,
}

impl BudgetAlert {
    /// Create a new, unacknowledged alert
    pub fn new(
        budget_id: BudgetId,
        project_id: ProjectId,
        alert_type: AlertTier,
        threshold_amount: Money,
        current_amount: Money,
        percentage_used: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: AlertId::new(),
            budget_id,
            project_id,
            alert_type,
            threshold_amount,
            current_amount,
            percentage_used,
            message: message.into(),
            is_acknowledged: false,
            acknowledged_at: None,
            acknowledged_by: None,
            created_at: Utc::now(),
        }
    }

    /// Mark the alert as acknowledged
    pub fn acknowledge(&mut self, by: impl Into<String>) {
        self.is_acknowledged = true;
        self.acknowledged_at = Some(Utc::now());
        self.acknowledged_by = Some(by.into());
    }
}

impl fmt::Display for BudgetAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.alert_type, self.message)
    }
}
