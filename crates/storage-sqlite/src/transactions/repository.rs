use diesel::prelude::*;
use log::debug;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use budgetkit_core::errors::Result;
use budgetkit_core::money::{self, parse_amount};
use budgetkit_core::transactions::{TransactionRepositoryTrait, TransactionType};
use budgetkit_core::utils::DateRange;

use crate::db::{get_connection, DbPool};
use crate::errors::IntoCore;
use crate::schema::transactions;
use crate::utils::chunk_for_sqlite;

/// Amounts are stored as decimal text and summed exactly in Rust, never with
/// SQLite's `SUM`.
pub struct TransactionRepository {
    pool: Arc<DbPool>,
}

impl TransactionRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        TransactionRepository { pool }
    }
}

impl TransactionRepositoryTrait for TransactionRepository {
    fn sum_amounts(
        &self,
        user_id: &str,
        range: &DateRange,
        transaction_type: TransactionType,
        category_id: Option<&str>,
    ) -> Result<Decimal> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = transactions::table
            .select(transactions::amount)
            .filter(transactions::user_id.eq(user_id))
            .filter(transactions::transaction_type.eq(transaction_type.as_str()))
            .filter(transactions::transaction_date.between(range.start, range.end))
            .into_boxed();
        if let Some(category_id) = category_id {
            query = query.filter(transactions::category_id.eq(category_id));
        }

        let amounts = query.load::<String>(&mut conn).into_core()?;
        let parsed = amounts
            .iter()
            .map(|raw| parse_amount("amount", raw))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "Summed {} {} rows for user {} over {}",
            parsed.len(),
            transaction_type,
            user_id,
            range
        );
        money::sum(parsed)
    }

    fn sum_amounts_by_category(
        &self,
        user_id: &str,
        range: &DateRange,
        transaction_type: TransactionType,
        category_ids: &[String],
    ) -> Result<HashMap<String, Decimal>> {
        let mut conn = get_connection(&self.pool)?;
        let mut sums: HashMap<String, Decimal> = HashMap::new();

        for chunk in chunk_for_sqlite(category_ids) {
            let rows = transactions::table
                .select((transactions::category_id, transactions::amount))
                .filter(transactions::user_id.eq(user_id))
                .filter(transactions::transaction_type.eq(transaction_type.as_str()))
                .filter(transactions::transaction_date.between(range.start, range.end))
                .filter(transactions::category_id.eq_any(chunk))
                .load::<(Option<String>, String)>(&mut conn)
                .into_core()?;

            for (category_id, raw) in rows {
                let amount = parse_amount("amount", &raw)?;
                if let Some(category_id) = category_id {
                    let total = sums.entry(category_id).or_insert(Decimal::ZERO);
                    *total = money::checked_add(*total, amount)?;
                }
            }
        }
        Ok(sums)
    }
}
