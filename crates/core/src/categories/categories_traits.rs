use super::Category;
use crate::errors::Result;

/// Read access to the category store.
pub trait CategoryRepositoryTrait: Send + Sync {
    /// Fails with `Error::NotFound` when the category does not exist.
    fn get_by_id(&self, category_id: &str) -> Result<Category>;

    /// Categories for the given ids; unknown ids are skipped.
    fn get_by_ids(&self, category_ids: &[String]) -> Result<Vec<Category>>;
}
