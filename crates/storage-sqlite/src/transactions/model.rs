use chrono::NaiveDate;
use diesel::prelude::*;
use std::str::FromStr;

use budgetkit_core::errors::Error;
use budgetkit_core::money::parse_amount;
use budgetkit_core::transactions::{Transaction, TransactionType};

/// Database model for transactions
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionDB {
    pub id: String,
    pub user_id: String,
    pub account_id: String,
    pub category_id: Option<String>,
    pub transaction_type: String,
    pub amount: String,
    pub currency: String,
    pub transaction_date: NaiveDate,
}

impl TryFrom<TransactionDB> for Transaction {
    type Error = Error;

    fn try_from(db: TransactionDB) -> Result<Self, Self::Error> {
        let transaction_type = TransactionType::from_str(&db.transaction_type).map_err(|_| {
            Error::DataIntegrity(format!(
                "transaction {} has unknown type '{}'",
                db.id, db.transaction_type
            ))
        })?;
        Ok(Self {
            amount: parse_amount("amount", &db.amount)?,
            transaction_type,
            id: db.id,
            user_id: db.user_id,
            account_id: db.account_id,
            category_id: db.category_id,
            currency: db.currency,
            transaction_date: db.transaction_date,
        })
    }
}

impl From<Transaction> for TransactionDB {
    fn from(domain: Transaction) -> Self {
        Self {
            id: domain.id,
            user_id: domain.user_id,
            account_id: domain.account_id,
            category_id: domain.category_id,
            transaction_type: domain.transaction_type.as_str().to_string(),
            amount: domain.amount.to_string(),
            currency: domain.currency,
            transaction_date: domain.transaction_date,
        }
    }
}
