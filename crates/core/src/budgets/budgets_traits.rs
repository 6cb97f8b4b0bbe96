//! Budget repository and service traits.
//!
//! These traits define the contract for budget persistence and lifecycle
//! operations without any database-specific types.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;

use super::budgets_model::{
    Budget, BudgetAllocation, BudgetPerformanceSummary, BudgetWithAllocations,
    BulkRecalculationReport, NewBudget, NewBudgetAllocation,
};
use super::rollover::RolloverOutcome;
use crate::errors::Result;

/// Trait defining the contract for Budget repository operations.
///
/// Every write method is atomic: either the budget row and all of its
/// allocations are stored, or nothing is.
#[async_trait]
pub trait BudgetRepositoryTrait: Send + Sync {
    /// Fails with `Error::NotFound` when the budget does not exist.
    fn get_by_id(&self, budget_id: &str) -> Result<Budget>;

    /// Budget and its allocations, read consistently.
    fn get_aggregate(&self, budget_id: &str) -> Result<BudgetWithAllocations>;

    /// Live (not retired) budgets of a user, newest period first.
    fn list_by_user(&self, user_id: &str) -> Result<Vec<Budget>>;

    /// Live budgets in `active` status.
    fn list_active(&self) -> Result<Vec<Budget>>;

    /// Inserts a new budget together with its allocations.
    async fn insert_aggregate(
        &self,
        budget: Budget,
        allocations: Vec<BudgetAllocation>,
    ) -> Result<BudgetWithAllocations>;

    /// Updates the budget row only.
    async fn update_budget(&self, budget: Budget) -> Result<Budget>;

    /// Updates the budget row and makes its stored allocations equal to
    /// `allocations` (upserting the given ones, deleting the rest).
    async fn save_aggregate(
        &self,
        budget: Budget,
        allocations: Vec<BudgetAllocation>,
    ) -> Result<BudgetWithAllocations>;
}

/// A freshly generated next-period budget and what rollover did to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextPeriodBudget {
    pub budget: BudgetWithAllocations,
    pub rollover: RolloverOutcome,
}

/// Trait defining the contract for budget lifecycle operations.
#[async_trait]
pub trait BudgetServiceTrait: Send + Sync {
    fn get_budget(&self, budget_id: &str) -> Result<Budget>;

    fn get_budget_with_allocations(&self, budget_id: &str) -> Result<BudgetWithAllocations>;

    fn list_budgets(&self, user_id: &str) -> Result<Vec<Budget>>;

    /// Creates a draft budget with zero actuals.
    async fn create_budget(
        &self,
        new_budget: NewBudget,
        created_by: &str,
        as_of: NaiveDateTime,
    ) -> Result<Budget>;

    /// Adds or replaces the allocation for one category.
    async fn set_allocation(
        &self,
        budget_id: &str,
        allocation: NewBudgetAllocation,
        as_of: NaiveDateTime,
    ) -> Result<BudgetWithAllocations>;

    async fn remove_allocation(
        &self,
        budget_id: &str,
        category_id: &str,
        as_of: NaiveDateTime,
    ) -> Result<BudgetWithAllocations>;

    /// `draft -> pending_approval`.
    async fn submit_for_approval(&self, budget_id: &str, as_of: NaiveDateTime) -> Result<Budget>;

    /// `pending_approval -> active`, or `draft -> active` when approval is not required.
    async fn approve(
        &self,
        budget_id: &str,
        approver: &str,
        as_of: NaiveDateTime,
    ) -> Result<Budget>;

    /// Re-derives actual income, actual expenses and every allocation's spent amount.
    async fn recalculate_actuals(
        &self,
        budget_id: &str,
        as_of: NaiveDateTime,
    ) -> Result<BudgetWithAllocations>;

    /// Final recalculation followed by `active -> completed`.
    async fn complete(
        &self,
        budget_id: &str,
        as_of: NaiveDateTime,
    ) -> Result<BudgetWithAllocations>;

    /// Copies the template's allocations onto the target budget.
    async fn create_categories_from_template(
        &self,
        target_id: &str,
        template_id: &str,
        as_of: NaiveDateTime,
    ) -> Result<BudgetWithAllocations>;

    /// Generates the following period's draft budget, applying rollover.
    async fn create_next_period_budget(
        &self,
        current_id: &str,
        created_by: &str,
        as_of: NaiveDateTime,
    ) -> Result<NextPeriodBudget>;

    async fn retire_budget(&self, budget_id: &str, as_of: NaiveDateTime) -> Result<Budget>;

    fn get_performance_summary(
        &self,
        budget_id: &str,
        as_of: NaiveDate,
    ) -> Result<BudgetPerformanceSummary>;

    fn get_over_budget_categories(&self, budget_id: &str) -> Result<Vec<BudgetAllocation>>;

    fn get_near_limit_categories(
        &self,
        budget_id: &str,
        threshold: Decimal,
    ) -> Result<Vec<BudgetAllocation>>;

    /// Recalculates every live active budget. Only listing the budgets can fail
    /// the whole call; per-budget failures are collected in the report.
    async fn recalculate_active_budgets(
        &self,
        as_of: NaiveDateTime,
    ) -> Result<BulkRecalculationReport>;
}
