//! Read-only view over transaction history and the actuals aggregator built on it.

mod actuals_aggregator;
mod transactions_model;
mod transactions_traits;

pub use actuals_aggregator::ActualsAggregator;
pub use transactions_model::{Transaction, TransactionType};
pub use transactions_traits::{ActualsAggregatorTrait, TransactionRepositoryTrait};

#[cfg(test)]
mod actuals_aggregator_tests;
