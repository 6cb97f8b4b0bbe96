use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::budgets_model::{
    AmountComparison, Budget, BudgetAllocation, BudgetPerformanceSummary, PeriodProgress,
};
use crate::errors::Result;
use crate::money::{checked_sub, percentage_of, round_percentage};
use crate::utils::days_inclusive;

/// Builds the read-only performance report of a budget as seen on `as_of`.
///
/// Near-limit categories are counted against each allocation's own alert threshold.
pub fn performance_summary(
    budget: &Budget,
    allocations: &[BudgetAllocation],
    as_of: NaiveDate,
) -> Result<BudgetPerformanceSummary> {
    let period = period_progress(budget, as_of)?;

    let income = AmountComparison {
        planned: budget.planned_income,
        actual: budget.actual_income,
        variance: checked_sub(budget.actual_income, budget.planned_income)?,
        percentage: round_percentage(percentage_of(budget.actual_income, budget.planned_income)?),
    };
    let expenses = AmountComparison {
        planned: budget.planned_expenses,
        actual: budget.actual_expenses,
        variance: checked_sub(budget.planned_expenses, budget.actual_expenses)?,
        percentage: round_percentage(budget.expense_usage_percentage()?),
    };
    let planned_net = checked_sub(budget.planned_income, budget.planned_expenses)?;
    let actual_net = checked_sub(budget.actual_income, budget.actual_expenses)?;
    let net = AmountComparison {
        planned: planned_net,
        actual: actual_net,
        variance: checked_sub(actual_net, planned_net)?,
        percentage: round_percentage(percentage_of(actual_net, planned_net)?),
    };

    let mut near_limit_category_count = 0;
    for allocation in allocations {
        if allocation.is_near_limit(allocation.alert_threshold)? {
            near_limit_category_count += 1;
        }
    }

    Ok(BudgetPerformanceSummary {
        budget_id: budget.id.clone(),
        name: budget.name.clone(),
        currency: budget.currency.clone(),
        status: budget.status,
        period,
        income,
        expenses,
        net,
        is_over_budget: budget.is_over_budget(),
        is_alert_threshold_reached: budget.is_alert_threshold_reached()?,
        over_budget_category_count: allocations.iter().filter(|a| a.is_over_budget()).count(),
        near_limit_category_count,
    })
}

fn period_progress(budget: &Budget, as_of: NaiveDate) -> Result<PeriodProgress> {
    let range = budget.period()?;
    let duration_days = range.days();
    // The start day itself counts as elapsed.
    let days_elapsed = days_inclusive(range.start, as_of).clamp(0, duration_days);
    let progress_percentage = round_percentage(percentage_of(
        Decimal::from(days_elapsed),
        Decimal::from(duration_days),
    )?);

    Ok(PeriodProgress {
        start_date: range.start,
        end_date: range.end,
        duration_days,
        days_elapsed,
        days_remaining: duration_days - days_elapsed,
        progress_percentage,
    })
}
