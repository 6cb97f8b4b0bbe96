//! SQLite storage implementation for budgetkit.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `budgetkit-core` and contains:
//! - Database initialisation and connection pooling
//! - Embedded Diesel migrations
//! - The single writer actor that runs every write inside an immediate transaction
//! - Repository implementations for budgets, categories and transactions
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//!
//! ```text
//!   core (domain, traits)
//!          │
//!          ▼
//!   storage-sqlite (this crate)
//!          │
//!          ▼
//!      SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod budgets;
pub mod categories;
pub mod transactions;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use budgets::BudgetRepository;
pub use categories::CategoryRepository;
pub use transactions::TransactionRepository;

// Re-export from budgetkit-core for convenience
pub use budgetkit_core::errors::{DatabaseError, Error, Result};
