//! Read-only SQLite aggregation over transaction history.

mod model;
mod repository;

pub use model::TransactionDB;
pub use repository::TransactionRepository;
