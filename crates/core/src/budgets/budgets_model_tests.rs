//! Tests for budget status transitions and allocation metrics.

use super::*;
use crate::categories::CategoryKind;
use crate::errors::Error;
use crate::periods::PeriodType;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;

fn ts() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn allocation(allocated: Decimal, spent: Decimal) -> BudgetAllocation {
    BudgetAllocation {
        id: "alloc-1".to_string(),
        budget_id: "budget-1".to_string(),
        category_id: "groceries".to_string(),
        category_kind: CategoryKind::Expense,
        allocated_amount: allocated,
        spent_amount: spent,
        priority: 0,
        is_fixed_amount: false,
        alert_on_overspend: true,
        alert_threshold: dec!(80),
        created_at: ts(),
        updated_at: ts(),
    }
}

fn budget() -> Budget {
    Budget {
        id: "budget-1".to_string(),
        user_id: "user-1".to_string(),
        name: "Household".to_string(),
        period_type: PeriodType::Monthly,
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        currency: "USD".to_string(),
        planned_income: dec!(3000),
        actual_income: dec!(0),
        planned_expenses: dec!(1000),
        actual_expenses: dec!(0),
        status: BudgetStatus::Draft,
        is_template: false,
        rollover_unused: false,
        deduct_overspent: false,
        alert_percentage: dec!(80),
        created_by: "user-1".to_string(),
        approved_by: None,
        approved_at: None,
        created_at: ts(),
        updated_at: ts(),
        retired_at: None,
    }
}

// ==================== BudgetStatus ====================

#[test]
fn test_forward_transitions_with_approval() {
    use BudgetStatus::*;
    assert!(Draft.can_transition_to(PendingApproval, true));
    assert!(PendingApproval.can_transition_to(Active, true));
    assert!(Active.can_transition_to(Completed, true));
    assert!(!Draft.can_transition_to(Active, true));
}

#[test]
fn test_draft_to_active_without_approval() {
    assert!(BudgetStatus::Draft.can_transition_to(BudgetStatus::Active, false));
}

#[test]
fn test_no_backward_or_terminal_transitions() {
    use BudgetStatus::*;
    for next in [Draft, PendingApproval, Active, Completed] {
        assert!(!Completed.can_transition_to(next, false));
    }
    assert!(!Active.can_transition_to(Active, false));
    assert!(!Active.can_transition_to(Draft, false));
    assert!(!PendingApproval.can_transition_to(Draft, false));
}

#[test]
fn test_status_string_forms() {
    assert_eq!(
        serde_json::to_string(&BudgetStatus::PendingApproval).unwrap(),
        "\"pending_approval\""
    );
    assert_eq!(
        BudgetStatus::from_str("completed").unwrap(),
        BudgetStatus::Completed
    );
    assert!(matches!(
        BudgetStatus::from_str("archived"),
        Err(Error::DataIntegrity(_))
    ));
}

// ==================== Allocation metrics ====================

#[test]
fn test_usage_percentage_zero_when_nothing_allocated() {
    let alloc = allocation(dec!(0), dec!(50));
    assert_eq!(alloc.usage_percentage().unwrap(), dec!(0));
    assert!(alloc.is_over_budget());
}

#[test]
fn test_usage_percentage() {
    assert_eq!(allocation(dec!(200), dec!(50)).usage_percentage().unwrap(), dec!(25));
    assert_eq!(allocation(dec!(300), dec!(350)).usage_percentage().unwrap().round_dp(2), dec!(116.67));
}

#[test]
fn test_near_limit_excludes_over_budget() {
    let near = allocation(dec!(100), dec!(85));
    assert!(near.is_near_limit(dec!(80)).unwrap());
    assert!(!near.is_over_budget());

    let exactly_full = allocation(dec!(100), dec!(100));
    assert!(exactly_full.is_near_limit(dec!(80)).unwrap());

    let over = allocation(dec!(100), dec!(101));
    assert!(!over.is_near_limit(dec!(80)).unwrap());
    assert!(over.is_over_budget());
}

#[test]
fn test_remaining_unused_overspent() {
    let under = allocation(dec!(300), dec!(200));
    assert_eq!(under.remaining().unwrap(), dec!(100));
    assert_eq!(under.unused().unwrap(), dec!(100));
    assert_eq!(under.overspent().unwrap(), dec!(0));

    let over = allocation(dec!(300), dec!(350));
    assert_eq!(over.remaining().unwrap(), dec!(-50));
    assert_eq!(over.unused().unwrap(), dec!(0));
    assert_eq!(over.overspent().unwrap(), dec!(50));
}

#[test]
fn test_should_alert() {
    assert!(allocation(dec!(100), dec!(90)).should_alert().unwrap());
    assert!(allocation(dec!(100), dec!(150)).should_alert().unwrap());
    assert!(!allocation(dec!(100), dec!(10)).should_alert().unwrap());

    let mut silent = allocation(dec!(100), dec!(150));
    silent.alert_on_overspend = false;
    assert!(!silent.should_alert().unwrap());
}

#[test]
fn test_metrics_overflow_is_data_integrity() {
    let huge = allocation(dec!(1), dec!(1e27));
    assert!(matches!(huge.usage_percentage(), Err(Error::DataIntegrity(_))));
    assert!(huge.is_over_budget());

    let mut b = budget();
    b.planned_expenses = dec!(0.001);
    b.actual_expenses = Decimal::MAX;
    assert!(matches!(
        b.is_alert_threshold_reached(),
        Err(Error::DataIntegrity(_))
    ));
}

// ==================== Budget ====================

#[test]
fn test_budget_validate() {
    assert!(budget().validate().is_ok());

    let mut inverted = budget();
    inverted.end_date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
    assert!(matches!(inverted.validate(), Err(Error::InvalidDateRange(_))));

    let mut bad_currency = budget();
    bad_currency.currency = "usd".to_string();
    assert!(matches!(bad_currency.validate(), Err(Error::Validation(_))));

    let mut bad_alert = budget();
    bad_alert.alert_percentage = dec!(120);
    assert!(matches!(bad_alert.validate(), Err(Error::Validation(_))));

    let mut negative = budget();
    negative.planned_expenses = dec!(-1);
    assert!(matches!(negative.validate(), Err(Error::Validation(_))));
}

#[test]
fn test_budget_alert_threshold() {
    let mut b = budget();
    b.actual_expenses = dec!(799.99);
    assert!(!b.is_alert_threshold_reached().unwrap());
    b.actual_expenses = dec!(800);
    assert!(b.is_alert_threshold_reached().unwrap());
    assert!(!b.is_over_budget());
    b.actual_expenses = dec!(1000.01);
    assert!(b.is_over_budget());
}

#[test]
fn test_budget_serializes_money_as_strings() {
    let json = serde_json::to_value(budget()).unwrap();
    assert_eq!(json["plannedIncome"], "3000");
    assert_eq!(json["status"], "draft");
    assert_eq!(json["periodType"], "monthly");
}

#[test]
fn test_settings_default() {
    let settings = BudgetSettings::default();
    assert!(settings.require_approval);
    assert_eq!(settings.default_alert_percentage, dec!(80));
}
