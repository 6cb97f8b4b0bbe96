//! Unit tests for the actuals aggregator.

use super::*;
use crate::errors::{Error, Result};
use crate::utils::DateRange;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Mock Implementations
// ============================================================================

struct MockTransactionRepository {
    transactions: Vec<Transaction>,
}

impl MockTransactionRepository {
    fn matching<'a>(
        &'a self,
        user_id: &'a str,
        range: &'a DateRange,
        transaction_type: TransactionType,
    ) -> impl Iterator<Item = &'a Transaction> + 'a {
        self.transactions.iter().filter(move |t| {
            t.user_id == user_id
                && t.transaction_type == transaction_type
                && range.contains(t.transaction_date)
        })
    }
}

impl TransactionRepositoryTrait for MockTransactionRepository {
    fn sum_amounts(
        &self,
        user_id: &str,
        range: &DateRange,
        transaction_type: TransactionType,
        category_id: Option<&str>,
    ) -> Result<Decimal> {
        Ok(self
            .matching(user_id, range, transaction_type)
            .filter(|t| category_id.map_or(true, |c| t.category_id.as_deref() == Some(c)))
            .map(|t| t.amount)
            .sum())
    }

    fn sum_amounts_by_category(
        &self,
        user_id: &str,
        range: &DateRange,
        transaction_type: TransactionType,
        _category_ids: &[String],
    ) -> Result<HashMap<String, Decimal>> {
        // Returns every category so the aggregator's own filtering is exercised.
        let mut sums = HashMap::new();
        for t in self.matching(user_id, range, transaction_type) {
            if let Some(category_id) = &t.category_id {
                *sums.entry(category_id.clone()).or_insert(Decimal::ZERO) += t.amount;
            }
        }
        Ok(sums)
    }
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn tx(
    id: &str,
    user: &str,
    category: Option<&str>,
    kind: TransactionType,
    amount: Decimal,
    date: NaiveDate,
) -> Transaction {
    Transaction {
        id: id.to_string(),
        user_id: user.to_string(),
        account_id: "acc-1".to_string(),
        category_id: category.map(str::to_string),
        transaction_type: kind,
        amount,
        currency: "USD".to_string(),
        transaction_date: date,
    }
}

fn aggregator(transactions: Vec<Transaction>) -> ActualsAggregator {
    ActualsAggregator::new(Arc::new(MockTransactionRepository { transactions }))
}

fn january() -> DateRange {
    DateRange::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_sum_by_type_includes_both_boundaries() {
    let agg = aggregator(vec![
        tx("1", "u1", Some("food"), TransactionType::Expense, dec!(10.00), d(2024, 1, 1)),
        tx("2", "u1", Some("food"), TransactionType::Expense, dec!(20.50), d(2024, 1, 31)),
        tx("3", "u1", Some("food"), TransactionType::Expense, dec!(99.00), d(2023, 12, 31)),
        tx("4", "u1", Some("food"), TransactionType::Expense, dec!(99.00), d(2024, 2, 1)),
    ]);

    let total = agg
        .sum_by_type("u1", &january(), TransactionType::Expense)
        .unwrap();
    assert_eq!(total, dec!(30.50));
}

#[test]
fn test_sum_by_type_filters_user_and_type() {
    let agg = aggregator(vec![
        tx("1", "u1", None, TransactionType::Income, dec!(1000), d(2024, 1, 15)),
        tx("2", "u2", None, TransactionType::Income, dec!(500), d(2024, 1, 15)),
        tx("3", "u1", None, TransactionType::Transfer, dec!(250), d(2024, 1, 15)),
        tx("4", "u1", None, TransactionType::Expense, dec!(75), d(2024, 1, 15)),
    ]);

    assert_eq!(
        agg.sum_by_type("u1", &january(), TransactionType::Income).unwrap(),
        dec!(1000)
    );
    assert_eq!(
        agg.sum_by_type("u1", &january(), TransactionType::Transfer).unwrap(),
        dec!(250)
    );
}

#[test]
fn test_sum_by_type_empty_is_zero() {
    let agg = aggregator(vec![]);
    assert_eq!(
        agg.sum_by_type("u1", &january(), TransactionType::Expense).unwrap(),
        Decimal::ZERO
    );
}

#[test]
fn test_sum_by_category_restricts_to_category() {
    let agg = aggregator(vec![
        tx("1", "u1", Some("food"), TransactionType::Expense, dec!(12.34), d(2024, 1, 3)),
        tx("2", "u1", Some("rent"), TransactionType::Expense, dec!(900), d(2024, 1, 3)),
        tx("3", "u1", Some("food"), TransactionType::Expense, dec!(7.66), d(2024, 1, 9)),
    ]);

    let food = agg
        .sum_by_category("u1", &january(), "food", TransactionType::Expense)
        .unwrap();
    assert_eq!(food, dec!(20.00));
}

#[test]
fn test_sum_by_categories_fills_missing_and_drops_unrequested() {
    let agg = aggregator(vec![
        tx("1", "u1", Some("food"), TransactionType::Expense, dec!(40), d(2024, 1, 3)),
        tx("2", "u1", Some("fun"), TransactionType::Expense, dec!(60), d(2024, 1, 3)),
    ]);
    let ids = vec!["food".to_string(), "rent".to_string()];

    let sums = agg
        .sum_by_categories("u1", &january(), &ids, TransactionType::Expense)
        .unwrap();
    assert_eq!(sums.len(), 2);
    assert_eq!(sums["food"], dec!(40));
    assert_eq!(sums["rent"], Decimal::ZERO);
    assert!(!sums.contains_key("fun"));
}

#[test]
fn test_sum_by_categories_matches_single_category_sums() {
    let agg = aggregator(vec![
        tx("1", "u1", Some("a"), TransactionType::Expense, dec!(1.10), d(2024, 1, 2)),
        tx("2", "u1", Some("b"), TransactionType::Expense, dec!(2.20), d(2024, 1, 5)),
        tx("3", "u1", Some("a"), TransactionType::Expense, dec!(3.30), d(2024, 1, 7)),
    ]);
    let ids = vec!["a".to_string(), "b".to_string()];
    let grouped = agg
        .sum_by_categories("u1", &january(), &ids, TransactionType::Expense)
        .unwrap();
    for id in &ids {
        let single = agg
            .sum_by_category("u1", &january(), id, TransactionType::Expense)
            .unwrap();
        assert_eq!(grouped[id], single);
    }
}

#[test]
fn test_sum_is_order_independent() {
    let mut rows = vec![
        tx("1", "u1", None, TransactionType::Expense, dec!(0.10), d(2024, 1, 2)),
        tx("2", "u1", None, TransactionType::Expense, dec!(0.20), d(2024, 1, 3)),
        tx("3", "u1", None, TransactionType::Expense, dec!(0.30), d(2024, 1, 4)),
    ];
    let forward = aggregator(rows.clone())
        .sum_by_type("u1", &january(), TransactionType::Expense)
        .unwrap();
    rows.reverse();
    let backward = aggregator(rows)
        .sum_by_type("u1", &january(), TransactionType::Expense)
        .unwrap();
    assert_eq!(forward, backward);
    assert_eq!(forward, dec!(0.60));
}

#[test]
fn test_inverted_range_rejected() {
    let agg = aggregator(vec![]);
    let inverted = DateRange {
        start: d(2024, 2, 1),
        end: d(2024, 1, 1),
    };
    let err = agg
        .sum_by_type("u1", &inverted, TransactionType::Expense)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidDateRange(_)));
}
