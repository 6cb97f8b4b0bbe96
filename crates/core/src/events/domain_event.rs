//! Domain event types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::budgets::BudgetStatus;

/// Facts emitted by the budget service once a mutation has been persisted.
///
/// Nothing is emitted for a failed or rolled-back operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    BudgetCreated {
        budget_id: String,
        user_id: String,
    },

    /// Status moved forward (submission, approval, completion).
    BudgetStatusChanged {
        budget_id: String,
        from: BudgetStatus,
        to: BudgetStatus,
    },

    BudgetRecalculated {
        budget_id: String,
        actual_income: Decimal,
        actual_expenses: Decimal,
    },

    /// A next-period budget was generated from `source_budget_id`.
    BudgetRolledOver {
        source_budget_id: String,
        new_budget_id: String,
        carried_over: Decimal,
        deducted: Decimal,
        /// Source categories with no counterpart in the new budget; their
        /// rollover amounts were not applied.
        dropped_category_ids: Vec<String>,
    },

    /// A category allocation with alerts enabled is over budget or near its threshold.
    BudgetAlertRaised {
        budget_id: String,
        category_id: String,
        usage_percentage: Decimal,
        is_over_budget: bool,
    },

    /// Expense usage of the whole budget reached its alert percentage.
    BudgetThresholdReached {
        budget_id: String,
        usage_percentage: Decimal,
        alert_percentage: Decimal,
    },

    BudgetRetired {
        budget_id: String,
    },
}

impl DomainEvent {
    pub fn budget_id(&self) -> &str {
        match self {
            DomainEvent::BudgetCreated { budget_id, .. }
            | DomainEvent::BudgetStatusChanged { budget_id, .. }
            | DomainEvent::BudgetRecalculated { budget_id, .. }
            | DomainEvent::BudgetAlertRaised { budget_id, .. }
            | DomainEvent::BudgetThresholdReached { budget_id, .. }
            | DomainEvent::BudgetRetired { budget_id } => budget_id,
            DomainEvent::BudgetRolledOver { new_budget_id, .. } => new_budget_id,
        }
    }

    pub fn status_changed(budget_id: &str, from: BudgetStatus, to: BudgetStatus) -> Self {
        DomainEvent::BudgetStatusChanged {
            budget_id: budget_id.to_string(),
            from,
            to,
        }
    }
}
