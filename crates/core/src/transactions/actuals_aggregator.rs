use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use num_traits::Zero;
use rust_decimal::Decimal;

use super::transactions_traits::{ActualsAggregatorTrait, TransactionRepositoryTrait};
use super::TransactionType;
use crate::errors::Result;
use crate::utils::DateRange;

/// Sums income and expense history for budget recalculation.
pub struct ActualsAggregator {
    repository: Arc<dyn TransactionRepositoryTrait>,
}

impl ActualsAggregator {
    pub fn new(repository: Arc<dyn TransactionRepositoryTrait>) -> Self {
        ActualsAggregator { repository }
    }
}

impl ActualsAggregatorTrait for ActualsAggregator {
    fn sum_by_type(
        &self,
        user_id: &str,
        range: &DateRange,
        transaction_type: TransactionType,
    ) -> Result<Decimal> {
        DateRange::new(range.start, range.end)?;
        let total = self
            .repository
            .sum_amounts(user_id, range, transaction_type, None)?;
        debug!(
            "Sum of {} for user {} over {}: {}",
            transaction_type, user_id, range, total
        );
        Ok(total)
    }

    fn sum_by_category(
        &self,
        user_id: &str,
        range: &DateRange,
        category_id: &str,
        transaction_type: TransactionType,
    ) -> Result<Decimal> {
        DateRange::new(range.start, range.end)?;
        self.repository
            .sum_amounts(user_id, range, transaction_type, Some(category_id))
    }

    fn sum_by_categories(
        &self,
        user_id: &str,
        range: &DateRange,
        category_ids: &[String],
        transaction_type: TransactionType,
    ) -> Result<HashMap<String, Decimal>> {
        DateRange::new(range.start, range.end)?;
        if category_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut sums = self.repository.sum_amounts_by_category(
            user_id,
            range,
            transaction_type,
            category_ids,
        )?;
        sums.retain(|id, _| category_ids.contains(id));
        for id in category_ids {
            sums.entry(id.clone()).or_insert_with(Decimal::zero);
        }
        debug!(
            "Summed {} {} categories for user {} over {}",
            sums.len(),
            transaction_type,
            user_id,
            range
        );
        Ok(sums)
    }
}
