//! Categories module - read-only models and repository trait.

mod categories_model;
mod categories_traits;

pub use categories_model::{Category, CategoryKind};
pub use categories_traits::CategoryRepositoryTrait;
