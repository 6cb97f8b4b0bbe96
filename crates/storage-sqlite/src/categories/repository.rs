use diesel::prelude::*;
use std::sync::Arc;

use budgetkit_core::categories::{Category, CategoryRepositoryTrait};
use budgetkit_core::errors::{Error, Result};

use super::model::CategoryDB;
use crate::db::{get_connection, DbPool};
use crate::errors::IntoCore;
use crate::schema::categories;
use crate::utils::chunk_for_sqlite;

pub struct CategoryRepository {
    pool: Arc<DbPool>,
}

impl CategoryRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        CategoryRepository { pool }
    }
}

impl CategoryRepositoryTrait for CategoryRepository {
    fn get_by_id(&self, category_id: &str) -> Result<Category> {
        let mut conn = get_connection(&self.pool)?;
        categories::table
            .find(category_id)
            .select(CategoryDB::as_select())
            .first::<CategoryDB>(&mut conn)
            .optional()
            .into_core()?
            .ok_or_else(|| Error::NotFound(format!("Category {} not found", category_id)))
            .and_then(Category::try_from)
    }

    fn get_by_ids(&self, category_ids: &[String]) -> Result<Vec<Category>> {
        let mut conn = get_connection(&self.pool)?;
        let mut found = Vec::with_capacity(category_ids.len());
        for chunk in chunk_for_sqlite(category_ids) {
            let rows = categories::table
                .filter(categories::id.eq_any(chunk))
                .select(CategoryDB::as_select())
                .load::<CategoryDB>(&mut conn)
                .into_core()?;
            for row in rows {
                found.push(Category::try_from(row)?);
            }
        }
        Ok(found)
    }
}
