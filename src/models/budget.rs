//! Project budget model
//!
//! A project owns at most one active budget. The spent amount is mutated only
//! through the budget ledger service; `remaining` and `percent_used` are
//! computed from stored fields and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::alert::AlertTier;
use super::ids::{BudgetId, ProjectId};
use super::measure::Percentage;
use super::money::Money;

/// Default fraction of the budget at which a warning is raised
pub const DEFAULT_WARNING_THRESHOLD: f64 = 0.75;

/// Default fraction of the budget at which a critical alert is raised
pub const DEFAULT_CRITICAL_THRESHOLD: f64 = 0.90;

/// Cost category shared by expenses and per-category sub-budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CostCategory {
    Labor,
    Material,
    #[default]
    Other,
}

impl CostCategory {
    pub const ALL: [CostCategory; 3] = [Self::Labor, Self::Material, Self::Other];

    /// Parse a category from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "labor" | "labour" => Some(Self::Labor),
            "material" | "materials" => Some(Self::Material),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for CostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Labor => write!(f, "Labor"),
            Self::Material => write!(f, "Material"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// Optional sub-budgets per cost category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CategoryBudgets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labor: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<Money>,
}

impl CategoryBudgets {
    /// Get the sub-budget for a category, if one is set
    pub fn get(&self, category: CostCategory) -> Option<Money> {
        match category {
            CostCategory::Labor => self.labor,
            CostCategory::Material => self.material,
            CostCategory::Other => self.other,
        }
    }

    /// Sum of all configured sub-budgets
    pub fn allocated(&self) -> Money {
        CostCategory::ALL.iter().filter_map(|c| self.get(*c)).sum()
    }
}

/// A project's budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectBudget {
    /// Unique identifier
    pub id: BudgetId,

    /// Owning project
    pub project_id: ProjectId,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Total budgeted amount
    pub total_budget: Money,

    /// Optional per-category sub-budgets
    #[serde(default)]
    pub category_budgets: CategoryBudgets,

    /// Sum of approved, non-deleted expenses
    pub spent_amount: Money,

    /// Warning threshold as a fraction in [0, 1]
    pub warning_threshold: f64,

    /// Critical threshold as a fraction in [0, 1]
    pub critical_threshold: f64,

    /// Notes
    #[serde(default)]
    pub notes: String,

    /// When the budget was created
    pub created_at: DateTime<Utc>,

    /// When the budget was last modified
    pub updated_at: DateTime<Utc>,

    /// Set when the budget is soft-deleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ProjectBudget {
    /// Create a new budget with default thresholds
    pub fn new(project_id: ProjectId, name: impl Into<String>, total_budget: Money) -> Self {
        let now = Utc::now();
        Self {
            id: BudgetId::new(),
            project_id,
            name: name.into(),
            total_budget,
            category_budgets: CategoryBudgets::default(),
            spent_amount: Money::zero(),
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
            critical_threshold: DEFAULT_CRITICAL_THRESHOLD,
            notes: String::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Create a budget with explicit thresholds
    pub fn with_thresholds(
        project_id: ProjectId,
        name: impl Into<String>,
        total_budget: Money,
        warning_threshold: f64,
        critical_threshold: f64,
    ) -> Self {
        let mut budget = Self::new(project_id, name, total_budget);
        budget.warning_threshold = warning_threshold;
        budget.critical_threshold = critical_threshold;
        budget
    }

    /// Remaining amount (may be negative once the budget is exceeded)
    pub fn remaining(&self) -> Money {
        self.total_budget - self.spent_amount
    }

    /// Percentage of the budget spent; 0 when the total is zero
    pub fn percent_used(&self) -> f64 {
        if self.total_budget.is_zero() {
            return 0.0;
        }
        self.spent_amount.cents() as f64 / self.total_budget.cents() as f64 * 100.0
    }

    /// Check if the budget is soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// The threshold that produces a tier, as a percentage of the total
    pub fn threshold_percentage(&self, tier: AlertTier) -> Percentage {
        match tier {
            AlertTier::Normal => Percentage::zero(),
            AlertTier::Warning => fraction_to_percentage(self.warning_threshold),
            AlertTier::Critical => fraction_to_percentage(self.critical_threshold),
            AlertTier::Exceeded => Percentage::whole(100),
        }
    }

    /// The spend amount at which a tier starts
    pub fn threshold_amount(&self, tier: AlertTier) -> Money {
        self.total_budget.percent(self.threshold_percentage(tier))
    }

    /// Whether the current spend is at or above a percentage of the total.
    ///
    /// Compared in integer arithmetic so that spend exactly on a threshold
    /// always lands in the higher tier.
    pub fn has_reached(&self, threshold: Percentage) -> bool {
        let bp = threshold.basis_points() as i128;
        if self.total_budget.cents() <= 0 {
            return 0 >= bp;
        }
        self.spent_amount.cents() as i128 * 10_000 >= bp * self.total_budget.cents() as i128
    }

    /// Current tier derived from the spend percentage
    pub fn current_tier(&self) -> AlertTier {
        if !self.has_reached(self.threshold_percentage(AlertTier::Warning)) {
            AlertTier::Normal
        } else if !self.has_reached(self.threshold_percentage(AlertTier::Critical)) {
            AlertTier::Warning
        } else if !self.has_reached(self.threshold_percentage(AlertTier::Exceeded)) {
            AlertTier::Critical
        } else {
            AlertTier::Exceeded
        }
    }

    /// Add a signed delta to the spent amount
    pub fn apply_spend(&mut self, delta: Money) {
        self.spent_amount += delta;
        self.updated_at = Utc::now();
    }

    /// Soft-delete the budget
    pub fn soft_delete(&mut self) {
        let now = Utc::now();
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    /// Validate the budget
    pub fn validate(&self) -> Result<(), BudgetValidationError> {
        if self.total_budget.is_negative() {
            return Err(BudgetValidationError::NegativeTotal);
        }

        for (name, value) in [
            ("warning", self.warning_threshold),
            ("critical", self.critical_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(BudgetValidationError::ThresholdOutOfRange { name, value });
            }
        }

        if self.warning_threshold > self.critical_threshold {
            return Err(BudgetValidationError::ThresholdsOutOfOrder);
        }

        for category in CostCategory::ALL {
            if self.category_budgets.get(category).is_some_and(|m| m.is_negative()) {
                return Err(BudgetValidationError::NegativeCategoryBudget(category));
            }
        }

        if self.category_budgets.allocated() > self.total_budget {
            return Err(BudgetValidationError::CategoriesExceedTotal);
        }

        Ok(())
    }
}

fn fraction_to_percentage(fraction: f64) -> Percentage {
    Percentage::from_basis_points((fraction * 10_000.0).round() as i64)
}

impl fmt::Display for ProjectBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} spent {} of {} ({:.1}%)",
            self.name,
            self.spent_amount,
            self.total_budget,
            self.percent_used()
        )
    }
}

/// Validation errors for budgets
#[derive(Debug, Clone, PartialEq)]
pub enum BudgetValidationError {
    NegativeTotal,
    ThresholdOutOfRange { name: &'static str, value: f64 },
    ThresholdsOutOfOrder,
    NegativeCategoryBudget(CostCategory),
    CategoriesExceedTotal,
}

impl fmt::Display for BudgetValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeTotal => write!(f, "Total budget cannot be negative"),
            Self::ThresholdOutOfRange { name, value } => {
                write!(f, "The {} threshold must be between 0 and 1, got {}", name, value)
            }
            Self::ThresholdsOutOfOrder => {
                write!(f, "The warning threshold cannot be above the critical threshold")
            }
            Self::NegativeCategoryBudget(category) => {
                write!(f, "The {} sub-budget cannot be negative", category)
            }
            Self::CategoriesExceedTotal => {
                write!(f, "Category sub-budgets exceed the total budget")
            }
        }
    }
}

impl std::error::Error for BudgetValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(total: i64, spent: i64) -> ProjectBudget {
        let mut b = ProjectBudget::new(ProjectId::new(), "Test", Money::from_cents(total));
        b.spent_amount = Money::from_cents(spent);
        b
    }

    #[test]
    fn test_derived_values() {
        let b = budget(1_000_000, 800_000);
        assert_eq!(b.remaining().cents(), 200_000);
        assert!((b.percent_used() - 80.0).abs() < f64::EPSILON);
        assert_eq!(b.remaining() + b.spent_amount, b.total_budget);
    }

    #[test]
    fn test_zero_total_reports_zero_percent() {
        let b = budget(0, 500);
        assert_eq!(b.percent_used(), 0.0);
        assert_eq!(b.current_tier(), AlertTier::Normal);
    }

    #[test]
    fn test_tier_mapping() {
        assert_eq!(budget(10000, 7000).current_tier(), AlertTier::Normal);
        assert_eq!(budget(10000, 7500).current_tier(), AlertTier::Warning);
        assert_eq!(budget(10000, 8999).current_tier(), AlertTier::Warning);
        assert_eq!(budget(10000, 9000).current_tier(), AlertTier::Critical);
        assert_eq!(budget(10000, 9999).current_tier(), AlertTier::Critical);
        assert_eq!(budget(10000, 10000).current_tier(), AlertTier::Exceeded);
        assert_eq!(budget(10000, 25000).current_tier(), AlertTier::Exceeded);
    }

    #[test]
    fn test_threshold_amounts() {
        let b = budget(1_000_000, 0);
        assert_eq!(b.threshold_amount(AlertTier::Warning).cents(), 750_000);
        assert_eq!(b.threshold_amount(AlertTier::Critical).cents(), 900_000);
        assert_eq!(b.threshold_amount(AlertTier::Exceeded).cents(), 1_000_000);
    }

    #[test]
    fn test_validation() {
        let mut b = budget(10000, 0);
        assert!(b.validate().is_ok());

        b.warning_threshold = 1.5;
        assert!(matches!(
            b.validate(),
            Err(BudgetValidationError::ThresholdOutOfRange { name: "warning", .. })
        ));

        b.warning_threshold = 0.95;
        assert_eq!(b.validate(), Err(BudgetValidationError::ThresholdsOutOfOrder));

        b.warning_threshold = 0.5;
        b.category_budgets.labor = Some(Money::from_cents(20000));
        assert_eq!(b.validate(), Err(BudgetValidationError::CategoriesExceedTotal));
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(CostCategory::parse("Labour"), Some(CostCategory::Labor));
        assert_eq!(CostCategory::parse("materials"), Some(CostCategory::Material));
        assert_eq!(CostCategory::parse("travel"), None);
    }
}
