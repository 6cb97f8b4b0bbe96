use diesel::prelude::*;
use std::str::FromStr;

use budgetkit_core::categories::{Category, CategoryKind};
use budgetkit_core::errors::Error;

/// Database model for categories
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::categories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CategoryDB {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub kind: String,
}

impl TryFrom<CategoryDB> for Category {
    type Error = Error;

    fn try_from(db: CategoryDB) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: CategoryKind::from_str(&db.kind)?,
            id: db.id,
            user_id: db.user_id,
            name: db.name,
        })
    }
}

impl From<Category> for CategoryDB {
    fn from(domain: Category) -> Self {
        Self {
            id: domain.id,
            user_id: domain.user_id,
            name: domain.name,
            kind: domain.kind.as_str().to_string(),
        }
    }
}
