//! Template copy and period rollover arithmetic.
//!
//! Everything here is pure: callers load the aggregates, run these functions
//! and persist the result in a single write.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use log::{debug, warn};
use num_traits::Zero;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::budgets_model::{Budget, BudgetAllocation};
use crate::categories::CategoryKind;
use crate::errors::Result;
use crate::money;

/// What rollover changed on one category of the new budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloverAdjustment {
    pub category_id: String,
    pub previous_amount: Decimal,
    pub carried_over: Decimal,
    pub deducted: Decimal,
    pub new_amount: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloverOutcome {
    pub adjustments: Vec<RolloverAdjustment>,
    /// Source categories without a matching allocation in the new budget.
    /// Their unused or overspent amounts were not applied anywhere.
    pub dropped: Vec<String>,
}

impl RolloverOutcome {
    pub fn carried_over_total(&self) -> Result<Decimal> {
        money::sum(self.adjustments.iter().map(|a| a.carried_over))
    }

    pub fn deducted_total(&self) -> Result<Decimal> {
        money::sum(self.adjustments.iter().map(|a| a.deducted))
    }
}

/// Copies `template` allocations onto `target_budget_id`.
///
/// Copies keep category, kind, amount, priority and alert settings; spent
/// starts at zero. An existing allocation for the same category is replaced.
/// The result is ordered by priority, then category id.
pub fn allocations_from_template(
    target_budget_id: &str,
    template: &[BudgetAllocation],
    existing: Vec<BudgetAllocation>,
    as_of: NaiveDateTime,
) -> Vec<BudgetAllocation> {
    let mut by_category: HashMap<String, BudgetAllocation> = existing
        .into_iter()
        .map(|a| (a.category_id.clone(), a))
        .collect();

    for source in template {
        let created_at = by_category
            .get(&source.category_id)
            .map(|current| current.created_at)
            .unwrap_or(as_of);
        by_category.insert(
            source.category_id.clone(),
            BudgetAllocation {
                id: Uuid::new_v4().to_string(),
                budget_id: target_budget_id.to_string(),
                category_id: source.category_id.clone(),
                category_kind: source.category_kind,
                allocated_amount: source.allocated_amount,
                spent_amount: Decimal::zero(),
                priority: source.priority,
                is_fixed_amount: source.is_fixed_amount,
                alert_on_overspend: source.alert_on_overspend,
                alert_threshold: source.alert_threshold,
                created_at,
                updated_at: as_of,
            },
        );
    }

    let mut allocations: Vec<BudgetAllocation> = by_category.into_values().collect();
    sort_allocations(&mut allocations);
    allocations
}

/// Applies the source budget's rollover to the allocations of the new budget.
///
/// Does nothing unless the source has `rollover_unused` set. Unused amounts
/// are added to the matching category; with `deduct_overspent`, overspending
/// is subtracted, never taking an allocation below zero.
///
/// An amount that leaves the decimal range fails with `DataIntegrity`; the
/// target allocations must then be discarded.
pub fn apply_rollover(
    source: &Budget,
    source_allocations: &[BudgetAllocation],
    target: &mut [BudgetAllocation],
) -> Result<RolloverOutcome> {
    let mut outcome = RolloverOutcome::default();
    if !source.rollover_unused {
        return Ok(outcome);
    }

    for source_allocation in source_allocations {
        let Some(new_allocation) = target
            .iter_mut()
            .find(|a| a.category_id == source_allocation.category_id)
        else {
            warn!(
                "Rollover for category {} of budget {} dropped: no matching allocation in the next period",
                source_allocation.category_id, source.id
            );
            outcome.dropped.push(source_allocation.category_id.clone());
            continue;
        };

        let previous_amount = new_allocation.allocated_amount;
        let carried_over = source_allocation.unused()?;
        if carried_over > Decimal::zero() {
            new_allocation.allocated_amount =
                money::checked_add(new_allocation.allocated_amount, carried_over)?;
        }

        let mut deducted = Decimal::zero();
        if source.deduct_overspent {
            let overspent = source_allocation.overspent()?;
            if overspent > Decimal::zero() {
                deducted = new_allocation
                    .allocated_amount
                    .max(Decimal::zero())
                    .min(overspent);
                new_allocation.allocated_amount -= deducted;
            }
        }

        if carried_over.is_zero() && deducted.is_zero() {
            continue;
        }

        debug!(
            "Rollover {} -> {} for category {}: +{} -{}",
            previous_amount,
            new_allocation.allocated_amount,
            new_allocation.category_id,
            carried_over,
            deducted
        );
        outcome.adjustments.push(RolloverAdjustment {
            category_id: new_allocation.category_id.clone(),
            previous_amount,
            carried_over,
            deducted,
            new_amount: new_allocation.allocated_amount,
        });
    }

    Ok(outcome)
}

/// Sets planned income / expenses to the sums of the income / expense allocations.
pub fn recompute_planned_totals(
    budget: &mut Budget,
    allocations: &[BudgetAllocation],
) -> Result<()> {
    budget.planned_income = total_allocated(allocations, CategoryKind::Income)?;
    budget.planned_expenses = total_allocated(allocations, CategoryKind::Expense)?;
    Ok(())
}

fn total_allocated(allocations: &[BudgetAllocation], kind: CategoryKind) -> Result<Decimal> {
    money::sum(
        allocations
            .iter()
            .filter(|a| a.category_kind == kind)
            .map(|a| a.allocated_amount),
    )
}

pub(crate) fn sort_allocations(allocations: &mut [BudgetAllocation]) {
    allocations.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.category_id.cmp(&b.category_id))
    });
}
