//! Database models for budgets.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use std::str::FromStr;

use budgetkit_core::budgets::{Budget, BudgetAllocation, BudgetStatus};
use budgetkit_core::categories::CategoryKind;
use budgetkit_core::errors::{Error, Result};
use budgetkit_core::money::parse_amount;
use budgetkit_core::periods::PeriodType;

/// Database model for budgets
#[derive(
    Queryable, Identifiable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone,
)]
#[diesel(table_name = crate::schema::budgets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct BudgetDB {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub period_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub currency: String,
    pub planned_income: String,
    pub actual_income: String,
    pub planned_expenses: String,
    pub actual_expenses: String,
    pub status: String,
    pub is_template: bool,
    pub rollover_unused: bool,
    pub deduct_overspent: bool,
    pub alert_percentage: String,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub retired_at: Option<NaiveDateTime>,
}

/// Database model for budget allocations
#[derive(
    Queryable,
    Identifiable,
    Insertable,
    Associations,
    AsChangeset,
    Selectable,
    PartialEq,
    Debug,
    Clone,
)]
#[diesel(belongs_to(BudgetDB, foreign_key = budget_id))]
#[diesel(table_name = crate::schema::budget_allocations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BudgetAllocationDB {
    pub id: String,
    pub budget_id: String,
    pub category_id: String,
    pub category_kind: String,
    pub allocated_amount: String,
    pub spent_amount: String,
    pub priority: i32,
    pub is_fixed_amount: bool,
    pub alert_on_overspend: bool,
    pub alert_threshold: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// Conversion to domain models. Stored text that does not parse is a data
// integrity failure, never a silent zero.
impl TryFrom<BudgetDB> for Budget {
    type Error = Error;

    fn try_from(db: BudgetDB) -> Result<Self> {
        let period_type = PeriodType::from_str(&db.period_type).map_err(|_| {
            Error::DataIntegrity(format!(
                "budget {} has unknown period type '{}'",
                db.id, db.period_type
            ))
        })?;
        Ok(Self {
            planned_income: parse_amount("planned_income", &db.planned_income)?,
            actual_income: parse_amount("actual_income", &db.actual_income)?,
            planned_expenses: parse_amount("planned_expenses", &db.planned_expenses)?,
            actual_expenses: parse_amount("actual_expenses", &db.actual_expenses)?,
            alert_percentage: parse_amount("alert_percentage", &db.alert_percentage)?,
            status: BudgetStatus::from_str(&db.status)?,
            period_type,
            id: db.id,
            user_id: db.user_id,
            name: db.name,
            start_date: db.start_date,
            end_date: db.end_date,
            currency: db.currency,
            is_template: db.is_template,
            rollover_unused: db.rollover_unused,
            deduct_overspent: db.deduct_overspent,
            created_by: db.created_by,
            approved_by: db.approved_by,
            approved_at: db.approved_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
            retired_at: db.retired_at,
        })
    }
}

impl TryFrom<BudgetAllocationDB> for BudgetAllocation {
    type Error = Error;

    fn try_from(db: BudgetAllocationDB) -> Result<Self> {
        Ok(Self {
            category_kind: CategoryKind::from_str(&db.category_kind)?,
            allocated_amount: parse_amount("allocated_amount", &db.allocated_amount)?,
            spent_amount: parse_amount("spent_amount", &db.spent_amount)?,
            alert_threshold: parse_amount("alert_threshold", &db.alert_threshold)?,
            id: db.id,
            budget_id: db.budget_id,
            category_id: db.category_id,
            priority: db.priority,
            is_fixed_amount: db.is_fixed_amount,
            alert_on_overspend: db.alert_on_overspend,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

impl From<Budget> for BudgetDB {
    fn from(domain: Budget) -> Self {
        Self {
            id: domain.id,
            user_id: domain.user_id,
            name: domain.name,
            period_type: domain.period_type.as_str().to_string(),
            start_date: domain.start_date,
            end_date: domain.end_date,
            currency: domain.currency,
            planned_income: domain.planned_income.to_string(),
            actual_income: domain.actual_income.to_string(),
            planned_expenses: domain.planned_expenses.to_string(),
            actual_expenses: domain.actual_expenses.to_string(),
            status: domain.status.as_str().to_string(),
            is_template: domain.is_template,
            rollover_unused: domain.rollover_unused,
            deduct_overspent: domain.deduct_overspent,
            alert_percentage: domain.alert_percentage.to_string(),
            created_by: domain.created_by,
            approved_by: domain.approved_by,
            approved_at: domain.approved_at,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
            retired_at: domain.retired_at,
        }
    }
}

impl From<BudgetAllocation> for BudgetAllocationDB {
    fn from(domain: BudgetAllocation) -> Self {
        Self {
            id: domain.id,
            budget_id: domain.budget_id,
            category_id: domain.category_id,
            category_kind: domain.category_kind.as_str().to_string(),
            allocated_amount: domain.allocated_amount.to_string(),
            spent_amount: domain.spent_amount.to_string(),
            priority: domain.priority,
            is_fixed_amount: domain.is_fixed_amount,
            alert_on_overspend: domain.alert_on_overspend,
            alert_threshold: domain.alert_threshold.to_string(),
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn budget_row() -> BudgetDB {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        BudgetDB {
            id: "b1".to_string(),
            user_id: "u1".to_string(),
            name: "Household".to_string(),
            period_type: "monthly".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            currency: "USD".to_string(),
            planned_income: "3000.00".to_string(),
            actual_income: "0".to_string(),
            planned_expenses: "1200.50".to_string(),
            actual_expenses: "0".to_string(),
            status: "pending_approval".to_string(),
            is_template: false,
            rollover_unused: true,
            deduct_overspent: false,
            alert_percentage: "80".to_string(),
            created_by: "u1".to_string(),
            approved_by: None,
            approved_at: None,
            created_at: ts,
            updated_at: ts,
            retired_at: None,
        }
    }

    #[test]
    fn test_budget_row_converts_exactly() {
        let budget = Budget::try_from(budget_row()).unwrap();
        assert_eq!(budget.planned_expenses, dec!(1200.50));
        assert_eq!(budget.status, BudgetStatus::PendingApproval);
        assert_eq!(budget.period_type, PeriodType::Monthly);

        let row = BudgetDB::from(budget);
        assert_eq!(row.planned_expenses, "1200.50");
        assert_eq!(row.status, "pending_approval");
    }

    #[test]
    fn test_malformed_amount_is_data_integrity() {
        let mut row = budget_row();
        row.actual_expenses = "12.3.4".to_string();
        assert!(matches!(Budget::try_from(row), Err(Error::DataIntegrity(_))));
    }

    #[test]
    fn test_unknown_period_type_is_data_integrity() {
        let mut row = budget_row();
        row.period_type = "fortnightly".to_string();
        assert!(matches!(Budget::try_from(row), Err(Error::DataIntegrity(_))));
    }
}
