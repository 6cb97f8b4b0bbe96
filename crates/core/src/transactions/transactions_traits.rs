use std::collections::HashMap;

use rust_decimal::Decimal;

use super::TransactionType;
use crate::errors::Result;
use crate::utils::DateRange;

/// Aggregation queries over the transaction store.
///
/// Implementations filter on an inclusive `[start, end]` date range and sum the
/// stored amounts exactly, in the stored currency.
pub trait TransactionRepositoryTrait: Send + Sync {
    /// Sum of amounts of one type, optionally restricted to a category.
    fn sum_amounts(
        &self,
        user_id: &str,
        range: &DateRange,
        transaction_type: TransactionType,
        category_id: Option<&str>,
    ) -> Result<Decimal>;

    /// Sums grouped by category, restricted to `category_ids`. Categories
    /// without transactions may be absent from the map.
    fn sum_amounts_by_category(
        &self,
        user_id: &str,
        range: &DateRange,
        transaction_type: TransactionType,
        category_ids: &[String],
    ) -> Result<HashMap<String, Decimal>>;
}

/// Trait for the actuals aggregator used by budget recalculation.
pub trait ActualsAggregatorTrait: Send + Sync {
    fn sum_by_type(
        &self,
        user_id: &str,
        range: &DateRange,
        transaction_type: TransactionType,
    ) -> Result<Decimal>;

    fn sum_by_category(
        &self,
        user_id: &str,
        range: &DateRange,
        category_id: &str,
        transaction_type: TransactionType,
    ) -> Result<Decimal>;

    /// Same as calling [`sum_by_category`](Self::sum_by_category) for each id;
    /// every requested id is present in the result.
    fn sum_by_categories(
        &self,
        user_id: &str,
        range: &DateRange,
        category_ids: &[String],
        transaction_type: TransactionType,
    ) -> Result<HashMap<String, Decimal>>;
}
