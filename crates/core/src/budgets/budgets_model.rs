//! Budget domain models.

use chrono::{NaiveDate, NaiveDateTime};
use num_traits::Zero;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::categories::CategoryKind;
use crate::constants::DEFAULT_ALERT_PERCENTAGE;
use crate::errors::{Error, Result, ValidationError};
use crate::money::{self, ensure_non_negative, ensure_percentage, percentage_of};
use crate::periods::PeriodType;
use crate::utils::DateRange;

/// Budget lifecycle state. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Draft,
    PendingApproval,
    Active,
    /// Terminal.
    Completed,
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::Draft => "draft",
            BudgetStatus::PendingApproval => "pending_approval",
            BudgetStatus::Active => "active",
            BudgetStatus::Completed => "completed",
        }
    }

    /// Whether `self -> next` is a legal step. `draft -> active` is only legal
    /// when no approval workflow is configured.
    pub fn can_transition_to(&self, next: BudgetStatus, require_approval: bool) -> bool {
        use BudgetStatus::*;
        match (self, next) {
            (Draft, PendingApproval) | (PendingApproval, Active) | (Active, Completed) => true,
            (Draft, Active) => !require_approval,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BudgetStatus::Completed)
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "draft" => Ok(BudgetStatus::Draft),
            "pending_approval" => Ok(BudgetStatus::PendingApproval),
            "active" => Ok(BudgetStatus::Active),
            "completed" => Ok(BudgetStatus::Completed),
            other => Err(Error::DataIntegrity(format!(
                "unknown budget status '{}'",
                other
            ))),
        }
    }
}

/// Engine-wide behaviour switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSettings {
    /// When false, `approve` may move a draft straight to active.
    pub require_approval: bool,
    /// Alert percentage given to budgets created without one.
    pub default_alert_percentage: Decimal,
}

impl Default for BudgetSettings {
    fn default() -> Self {
        Self {
            require_approval: true,
            default_alert_percentage: Decimal::from(DEFAULT_ALERT_PERCENTAGE),
        }
    }
}

/// Domain model representing a budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub period_type: PeriodType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Fixed at creation.
    pub currency: String,
    pub planned_income: Decimal,
    pub actual_income: Decimal,
    pub planned_expenses: Decimal,
    pub actual_expenses: Decimal,
    pub status: BudgetStatus,
    pub is_template: bool,
    pub rollover_unused: bool,
    pub deduct_overspent: bool,
    pub alert_percentage: Decimal,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Set when the user deletes the budget; rows are never hard-deleted.
    pub retired_at: Option<NaiveDateTime>,
}

impl Budget {
    pub fn period(&self) -> Result<DateRange> {
        DateRange::new(self.start_date, self.end_date)
    }

    pub fn is_retired(&self) -> bool {
        self.retired_at.is_some()
    }

    /// Actual expenses as a percentage of planned expenses.
    pub fn expense_usage_percentage(&self) -> Result<Decimal> {
        percentage_of(self.actual_expenses, self.planned_expenses)
    }

    pub fn is_over_budget(&self) -> bool {
        self.actual_expenses > self.planned_expenses
    }

    pub fn is_alert_threshold_reached(&self) -> Result<bool> {
        if self.planned_expenses <= Decimal::zero() {
            return Ok(false);
        }
        Ok(self.expense_usage_percentage()? >= self.alert_percentage)
    }

    /// Checks the invariants every persisted budget must satisfy.
    pub fn validate(&self) -> Result<()> {
        self.period()?;
        ensure_non_negative("planned_income", self.planned_income)?;
        ensure_non_negative("actual_income", self.actual_income)?;
        ensure_non_negative("planned_expenses", self.planned_expenses)?;
        ensure_non_negative("actual_expenses", self.actual_expenses)?;
        ensure_percentage("alert_percentage", self.alert_percentage)?;
        validate_currency(&self.currency)?;
        if self.name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "name".to_string(),
            )));
        }
        Ok(())
    }
}

/// ISO-4217 style code: three uppercase ASCII letters.
pub fn validate_currency(currency: &str) -> Result<()> {
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(Error::Validation(ValidationError::InvalidInput(format!(
            "currency '{}' is not a three-letter code",
            currency
        ))))
    }
}

/// Input model for creating a new budget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBudget {
    pub user_id: String,
    pub name: String,
    pub period_type: PeriodType,
    pub start_date: NaiveDate,
    /// Derived from the period type when absent; required for custom periods.
    pub end_date: Option<NaiveDate>,
    pub currency: String,
    #[serde(default)]
    pub planned_income: Decimal,
    #[serde(default)]
    pub planned_expenses: Decimal,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub rollover_unused: bool,
    #[serde(default)]
    pub deduct_overspent: bool,
    pub alert_percentage: Option<Decimal>,
}

/// Ties one category to one budget with a planned amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAllocation {
    pub id: String,
    pub budget_id: String,
    pub category_id: String,
    /// Kind of the category when the allocation was made; selects which
    /// transaction type counts toward `spent_amount`.
    pub category_kind: CategoryKind,
    pub allocated_amount: Decimal,
    /// Derived by recalculation, never edited directly.
    pub spent_amount: Decimal,
    pub priority: i32,
    pub is_fixed_amount: bool,
    pub alert_on_overspend: bool,
    pub alert_threshold: Decimal,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl BudgetAllocation {
    /// `spent / allocated * 100`, zero when nothing is allocated.
    pub fn usage_percentage(&self) -> Result<Decimal> {
        percentage_of(self.spent_amount, self.allocated_amount)
    }

    pub fn is_over_budget(&self) -> bool {
        self.spent_amount > self.allocated_amount
    }

    /// At or past `threshold` percent without having gone over.
    pub fn is_near_limit(&self, threshold: Decimal) -> Result<bool> {
        if self.is_over_budget() {
            return Ok(false);
        }
        Ok(self.usage_percentage()? >= threshold)
    }

    /// May be negative.
    pub fn remaining(&self) -> Result<Decimal> {
        money::checked_sub(self.allocated_amount, self.spent_amount)
    }

    pub fn unused(&self) -> Result<Decimal> {
        money::positive_difference(self.allocated_amount, self.spent_amount)
    }

    pub fn overspent(&self) -> Result<Decimal> {
        money::positive_difference(self.spent_amount, self.allocated_amount)
    }

    pub fn should_alert(&self) -> Result<bool> {
        if !self.alert_on_overspend {
            return Ok(false);
        }
        Ok(self.is_over_budget() || self.is_near_limit(self.alert_threshold)?)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("allocated_amount", self.allocated_amount)?;
        ensure_non_negative("spent_amount", self.spent_amount)?;
        ensure_percentage("alert_threshold", self.alert_threshold)
    }
}

/// Input model for adding or updating a category allocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBudgetAllocation {
    pub category_id: String,
    pub allocated_amount: Decimal,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub is_fixed_amount: bool,
    #[serde(default)]
    pub alert_on_overspend: bool,
    pub alert_threshold: Option<Decimal>,
}

/// A budget together with the allocations it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetWithAllocations {
    pub budget: Budget,
    pub allocations: Vec<BudgetAllocation>,
}

impl BudgetWithAllocations {
    pub fn allocation_for(&self, category_id: &str) -> Option<&BudgetAllocation> {
        self.allocations
            .iter()
            .find(|a| a.category_id == category_id)
    }
}

/// Planned, actual and the difference between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountComparison {
    pub planned: Decimal,
    pub actual: Decimal,
    /// Positive means favourable.
    pub variance: Decimal,
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodProgress {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: i64,
    pub days_elapsed: i64,
    pub days_remaining: i64,
    pub progress_percentage: Decimal,
}

/// Read-only performance report for one budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPerformanceSummary {
    pub budget_id: String,
    pub name: String,
    pub currency: String,
    pub status: BudgetStatus,
    pub period: PeriodProgress,
    pub income: AmountComparison,
    pub expenses: AmountComparison,
    pub net: AmountComparison,
    pub is_over_budget: bool,
    pub is_alert_threshold_reached: bool,
    pub over_budget_category_count: usize,
    pub near_limit_category_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetFailure {
    pub budget_id: String,
    pub error: String,
}

/// Outcome of recalculating every active budget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRecalculationReport {
    pub recalculated: Vec<String>,
    pub failures: Vec<BudgetFailure>,
}

impl BulkRecalculationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
