//! SQLite storage implementation for budgets and their allocations.

mod model;
mod repository;

pub use model::{BudgetAllocationDB, BudgetDB};
pub use repository::BudgetRepository;
