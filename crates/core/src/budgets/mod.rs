//! Budgets module - lifecycle engine, rollover arithmetic, models and traits.

mod budgets_model;
mod budgets_service;
mod budgets_traits;
mod performance;
mod rollover;

pub use budgets_model::*;
pub use budgets_service::BudgetService;
pub use budgets_traits::{BudgetRepositoryTrait, BudgetServiceTrait, NextPeriodBudget};
pub use performance::performance_summary;
pub use rollover::{
    allocations_from_template, apply_rollover, recompute_planned_totals, RolloverAdjustment,
    RolloverOutcome,
};

#[cfg(test)]
mod budgets_model_tests;
