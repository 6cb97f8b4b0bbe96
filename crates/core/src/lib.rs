//! budgetkit Core - Budget lifecycle engine, domain entities and traits.
//!
//! This crate contains the period, rollover and recalculation logic. It is
//! database-agnostic and defines traits that are implemented by the
//! `storage-sqlite` crate.

pub mod budgets;
pub mod categories;
pub mod constants;
pub mod errors;
pub mod events;
pub mod money;
pub mod periods;
pub mod transactions;
pub mod utils;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
