//! Integration tests for the SQLite repositories against a temporary database.

use std::sync::Arc;

use budgetkit_core::budgets::{
    Budget, BudgetAllocation, BudgetRepositoryTrait, BudgetService, BudgetServiceTrait,
    BudgetSettings, BudgetStatus, NewBudget, NewBudgetAllocation,
};
use budgetkit_core::categories::{Category, CategoryKind, CategoryRepositoryTrait};
use budgetkit_core::events::NoOpDomainEventSink;
use budgetkit_core::periods::PeriodType;
use budgetkit_core::transactions::{
    ActualsAggregator, Transaction, TransactionRepositoryTrait, TransactionType,
};
use budgetkit_core::utils::DateRange;
use budgetkit_core::Error;
use budgetkit_storage_sqlite::categories::CategoryDB;
use budgetkit_storage_sqlite::schema::{budget_allocations, budgets, categories, transactions};
use budgetkit_storage_sqlite::transactions::TransactionDB;
use budgetkit_storage_sqlite::{
    create_pool, get_connection, init, run_migrations, spawn_writer, BudgetRepository,
    CategoryRepository, DbPool, TransactionRepository, WriteHandle,
};
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;

// =============================================================================
// Setup
// =============================================================================

struct TestDb {
    _dir: TempDir,
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl TestDb {
    fn budgets(&self) -> BudgetRepository {
        BudgetRepository::new(self.pool.clone(), self.writer.clone())
    }

    fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.pool.clone())
    }

    fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone())
    }

    fn seed_categories(&self, rows: Vec<Category>) {
        let rows: Vec<CategoryDB> = rows.into_iter().map(CategoryDB::from).collect();
        let mut conn = get_connection(&self.pool).unwrap();
        diesel::insert_into(categories::table)
            .values(&rows)
            .execute(&mut conn)
            .unwrap();
    }

    fn seed_transactions(&self, rows: Vec<Transaction>) {
        let rows: Vec<TransactionDB> = rows.into_iter().map(TransactionDB::from).collect();
        let mut conn = get_connection(&self.pool).unwrap();
        diesel::insert_into(transactions::table)
            .values(&rows)
            .execute(&mut conn)
            .unwrap();
    }
}

fn setup() -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db").join("budgetkit.db");
    let db_path = init(path.to_str().unwrap()).unwrap();
    let pool = create_pool(&db_path).unwrap();
    run_migrations(&pool).unwrap();
    let writer = spawn_writer(&pool).unwrap();
    TestDb {
        _dir: dir,
        pool,
        writer,
    }
}

const USER: &str = "user-1";

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn at(y: i32, m: u32, day: u32) -> NaiveDateTime {
    d(y, m, day).and_hms_opt(7, 45, 0).unwrap()
}

fn category(id: &str, kind: CategoryKind) -> Category {
    Category {
        id: id.to_string(),
        user_id: USER.to_string(),
        name: id.to_uppercase(),
        kind,
    }
}

fn tx(
    id: &str,
    category_id: Option<&str>,
    transaction_type: TransactionType,
    amount: Decimal,
    date: NaiveDate,
) -> Transaction {
    Transaction {
        id: id.to_string(),
        user_id: USER.to_string(),
        account_id: "checking".to_string(),
        category_id: category_id.map(str::to_string),
        transaction_type,
        amount,
        currency: "USD".to_string(),
        transaction_date: date,
    }
}

fn january_budget(id: &str) -> Budget {
    Budget {
        id: id.to_string(),
        user_id: USER.to_string(),
        name: "Household".to_string(),
        period_type: PeriodType::Monthly,
        start_date: d(2024, 1, 1),
        end_date: d(2024, 1, 31),
        currency: "USD".to_string(),
        planned_income: dec!(2500.00),
        actual_income: dec!(0),
        planned_expenses: dec!(1200.10),
        actual_expenses: dec!(0),
        status: BudgetStatus::Draft,
        is_template: false,
        rollover_unused: true,
        deduct_overspent: false,
        alert_percentage: dec!(80),
        created_by: USER.to_string(),
        approved_by: None,
        approved_at: None,
        created_at: at(2023, 12, 30),
        updated_at: at(2023, 12, 30),
        retired_at: None,
    }
}

fn allocation(budget_id: &str, category_id: &str, allocated: Decimal, priority: i32) -> BudgetAllocation {
    BudgetAllocation {
        id: format!("{}-{}", budget_id, category_id),
        budget_id: budget_id.to_string(),
        category_id: category_id.to_string(),
        category_kind: CategoryKind::Expense,
        allocated_amount: allocated,
        spent_amount: dec!(0),
        priority,
        is_fixed_amount: false,
        alert_on_overspend: true,
        alert_threshold: dec!(75.5),
        created_at: at(2023, 12, 30),
        updated_at: at(2023, 12, 30),
    }
}

fn january() -> DateRange {
    DateRange::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap()
}

// =============================================================================
// Budget repository
// =============================================================================

#[tokio::test]
async fn test_insert_and_load_aggregate_round_trip() {
    let db = setup();
    let repo = db.budgets();

    let inserted = repo
        .insert_aggregate(
            january_budget("b1"),
            vec![
                allocation("b1", "rent", dec!(900.00), 2),
                allocation("b1", "food", dec!(300.10), 1),
            ],
        )
        .await
        .unwrap();

    assert_eq!(inserted.budget, january_budget("b1"));
    let order: Vec<&str> = inserted
        .allocations
        .iter()
        .map(|a| a.category_id.as_str())
        .collect();
    assert_eq!(order, vec!["food", "rent"]);
    assert_eq!(inserted.allocations[0].allocated_amount, dec!(300.10));
    assert_eq!(inserted.allocations[0].alert_threshold, dec!(75.5));
    assert_eq!(repo.get_aggregate("b1").unwrap(), inserted);
}

#[tokio::test]
async fn test_missing_budget_is_not_found() {
    let db = setup();
    let repo = db.budgets();

    assert!(matches!(repo.get_by_id("nope"), Err(Error::NotFound(_))));
    assert!(matches!(repo.get_aggregate("nope"), Err(Error::NotFound(_))));
    let err = repo.update_budget(january_budget("nope")).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_update_budget_writes_nullable_columns() {
    let db = setup();
    let repo = db.budgets();
    let mut budget = january_budget("b1");
    budget.approved_by = Some("manager".to_string());
    budget.approved_at = Some(at(2024, 1, 2));
    repo.insert_aggregate(budget.clone(), Vec::new()).await.unwrap();

    budget.approved_by = None;
    budget.approved_at = None;
    budget.status = BudgetStatus::PendingApproval;
    let updated = repo.update_budget(budget.clone()).await.unwrap();

    assert_eq!(updated, budget);
    assert_eq!(repo.get_by_id("b1").unwrap().approved_by, None);
}

#[tokio::test]
async fn test_save_aggregate_replaces_and_removes_allocations() {
    let db = setup();
    let repo = db.budgets();
    repo.insert_aggregate(
        january_budget("b1"),
        vec![
            allocation("b1", "food", dec!(300), 1),
            allocation("b1", "rent", dec!(900), 2),
        ],
    )
    .await
    .unwrap();

    // New id for the same category, rent dropped.
    let mut food = allocation("b1", "food", dec!(450), 1);
    food.id = "replacement".to_string();
    let mut budget = january_budget("b1");
    budget.planned_expenses = dec!(450);
    let saved = repo.save_aggregate(budget, vec![food]).await.unwrap();

    assert_eq!(saved.allocations.len(), 1);
    assert_eq!(saved.allocations[0].id, "replacement");
    assert_eq!(saved.allocations[0].allocated_amount, dec!(450));
    assert_eq!(saved.budget.planned_expenses, dec!(450));
}

#[tokio::test]
async fn test_failed_save_rolls_back_everything() {
    let db = setup();
    let repo = db.budgets();
    let original = repo
        .insert_aggregate(
            january_budget("b1"),
            vec![allocation("b1", "food", dec!(300), 1)],
        )
        .await
        .unwrap();

    let mut budget = january_budget("b1");
    budget.actual_expenses = dec!(999);
    let mut duplicate = allocation("b1", "food", dec!(1), 1);
    duplicate.id = "duplicate".to_string();
    let err = repo
        .save_aggregate(
            budget,
            vec![allocation("b1", "food", dec!(500), 1), duplicate],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Database(_)));
    assert_eq!(repo.get_aggregate("b1").unwrap(), original);
}

#[tokio::test]
async fn test_lists_skip_retired_budgets() {
    let db = setup();
    let repo = db.budgets();

    let mut active = january_budget("a");
    active.status = BudgetStatus::Active;
    let mut february = january_budget("b");
    february.start_date = d(2024, 2, 1);
    february.end_date = d(2024, 2, 29);
    let mut retired = january_budget("c");
    retired.status = BudgetStatus::Active;
    retired.retired_at = Some(at(2024, 1, 10));
    for budget in [active, february, retired] {
        repo.insert_aggregate(budget, Vec::new()).await.unwrap();
    }

    let by_user: Vec<String> = repo
        .list_by_user(USER)
        .unwrap()
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(by_user, vec!["b".to_string(), "a".to_string()]);

    let active: Vec<String> = repo.list_active().unwrap().into_iter().map(|b| b.id).collect();
    assert_eq!(active, vec!["a".to_string()]);
}

#[tokio::test]
async fn test_malformed_stored_amount_is_data_integrity() {
    let db = setup();
    let repo = db.budgets();
    repo.insert_aggregate(january_budget("b1"), vec![allocation("b1", "food", dec!(10), 0)])
        .await
        .unwrap();

    let mut conn = get_connection(&db.pool).unwrap();
    diesel::update(budget_allocations::table.find("b1-food"))
        .set(budget_allocations::spent_amount.eq("twelve"))
        .execute(&mut conn)
        .unwrap();

    assert!(repo.get_by_id("b1").is_ok());
    assert!(matches!(repo.get_aggregate("b1"), Err(Error::DataIntegrity(_))));
}

#[tokio::test]
async fn test_deleting_budget_row_cascades_to_allocations() {
    let db = setup();
    let repo = db.budgets();
    repo.insert_aggregate(january_budget("b1"), vec![allocation("b1", "food", dec!(10), 0)])
        .await
        .unwrap();

    let mut conn = get_connection(&db.pool).unwrap();
    diesel::delete(budgets::table.find("b1"))
        .execute(&mut conn)
        .unwrap();
    let remaining: i64 = budget_allocations::table
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(remaining, 0);
}

// =============================================================================
// Category and transaction repositories
// =============================================================================

#[tokio::test]
async fn test_category_lookup() {
    let db = setup();
    db.seed_categories(vec![
        category("food", CategoryKind::Expense),
        category("salary", CategoryKind::Income),
    ]);
    let repo = db.categories();

    assert_eq!(repo.get_by_id("salary").unwrap().kind, CategoryKind::Income);
    assert!(matches!(repo.get_by_id("travel"), Err(Error::NotFound(_))));

    let ids = vec!["food".to_string(), "travel".to_string()];
    let found = repo.get_by_ids(&ids).unwrap();
    assert_eq!(found, vec![category("food", CategoryKind::Expense)]);
}

#[tokio::test]
async fn test_transaction_sums_are_inclusive_and_exact() {
    let db = setup();
    db.seed_transactions(vec![
        tx("t1", Some("food"), TransactionType::Expense, dec!(0.10), d(2024, 1, 1)),
        tx("t2", Some("food"), TransactionType::Expense, dec!(0.20), d(2024, 1, 31)),
        tx("t3", Some("rent"), TransactionType::Expense, dec!(900), d(2024, 1, 3)),
        tx("t4", None, TransactionType::Expense, dec!(5), d(2024, 1, 3)),
        tx("t5", Some("food"), TransactionType::Expense, dec!(77), d(2024, 2, 1)),
        tx("t6", Some("salary"), TransactionType::Income, dec!(2500), d(2024, 1, 25)),
        tx("t7", None, TransactionType::Transfer, dec!(100), d(2024, 1, 4)),
    ]);
    let repo = db.transactions();

    assert_eq!(
        repo.sum_amounts(USER, &january(), TransactionType::Expense, None)
            .unwrap(),
        dec!(905.30)
    );
    assert_eq!(
        repo.sum_amounts(USER, &january(), TransactionType::Expense, Some("food"))
            .unwrap(),
        dec!(0.30)
    );
    assert_eq!(
        repo.sum_amounts("someone-else", &january(), TransactionType::Expense, None)
            .unwrap(),
        dec!(0)
    );

    let ids = vec!["food".to_string(), "rent".to_string(), "fuel".to_string()];
    let by_category = repo
        .sum_amounts_by_category(USER, &january(), TransactionType::Expense, &ids)
        .unwrap();
    assert_eq!(by_category.get("food"), Some(&dec!(0.30)));
    assert_eq!(by_category.get("rent"), Some(&dec!(900)));
    assert_eq!(by_category.get("fuel"), None);
}

#[tokio::test]
async fn test_malformed_transaction_amount_fails_sum() {
    let db = setup();
    db.seed_transactions(vec![tx(
        "t1",
        Some("food"),
        TransactionType::Expense,
        dec!(10),
        d(2024, 1, 5),
    )]);
    let mut conn = get_connection(&db.pool).unwrap();
    diesel::update(transactions::table.find("t1"))
        .set(transactions::amount.eq("1O.00"))
        .execute(&mut conn)
        .unwrap();

    let err = db
        .transactions()
        .sum_amounts(USER, &january(), TransactionType::Expense, None)
        .unwrap_err();
    assert!(matches!(err, Error::DataIntegrity(_)));
}

#[tokio::test]
async fn test_overflowing_transaction_sum_is_data_integrity() {
    let db = setup();
    db.seed_transactions(vec![
        tx("t1", Some("food"), TransactionType::Expense, dec!(5e28), d(2024, 1, 5)),
        tx("t2", Some("food"), TransactionType::Expense, dec!(5e28), d(2024, 1, 6)),
    ]);
    let repo = db.transactions();

    let err = repo
        .sum_amounts(USER, &january(), TransactionType::Expense, None)
        .unwrap_err();
    assert!(matches!(err, Error::DataIntegrity(_)));

    let ids = vec!["food".to_string()];
    let err = repo
        .sum_amounts_by_category(USER, &january(), TransactionType::Expense, &ids)
        .unwrap_err();
    assert!(matches!(err, Error::DataIntegrity(_)));
}

// =============================================================================
// Engine on top of SQLite
// =============================================================================

#[tokio::test]
async fn test_budget_lifecycle_end_to_end() {
    let db = setup();
    db.seed_categories(vec![
        category("food", CategoryKind::Expense),
        category("salary", CategoryKind::Income),
    ]);
    db.seed_transactions(vec![
        tx("t1", Some("food"), TransactionType::Expense, dec!(120.50), d(2024, 1, 2)),
        tx("t2", Some("food"), TransactionType::Expense, dec!(79.50), d(2024, 1, 30)),
        tx("t3", Some("salary"), TransactionType::Income, dec!(2500), d(2024, 1, 25)),
    ]);

    let service = BudgetService::new(
        Arc::new(db.budgets()),
        Arc::new(db.categories()),
        Arc::new(ActualsAggregator::new(Arc::new(db.transactions()))),
        Arc::new(NoOpDomainEventSink),
        BudgetSettings {
            require_approval: false,
            ..BudgetSettings::default()
        },
    );

    let budget = service
        .create_budget(
            NewBudget {
                user_id: USER.to_string(),
                name: "Household".to_string(),
                period_type: PeriodType::Monthly,
                start_date: d(2024, 1, 1),
                end_date: None,
                currency: "USD".to_string(),
                planned_income: dec!(0),
                planned_expenses: dec!(0),
                is_template: false,
                rollover_unused: true,
                deduct_overspent: false,
                alert_percentage: None,
            },
            USER,
            at(2023, 12, 31),
        )
        .await
        .unwrap();
    for (category_id, amount) in [("food", dec!(300)), ("salary", dec!(2500))] {
        service
            .set_allocation(
                &budget.id,
                NewBudgetAllocation {
                    category_id: category_id.to_string(),
                    allocated_amount: amount,
                    priority: 0,
                    is_fixed_amount: false,
                    alert_on_overspend: false,
                    alert_threshold: None,
                },
                at(2023, 12, 31),
            )
            .await
            .unwrap();
    }
    service
        .approve(&budget.id, "manager", at(2024, 1, 1))
        .await
        .unwrap();

    let report = service
        .recalculate_active_budgets(at(2024, 1, 31))
        .await
        .unwrap();
    assert_eq!(report.recalculated, vec![budget.id.clone()]);

    let completed = service.complete(&budget.id, at(2024, 2, 1)).await.unwrap();
    assert_eq!(completed.budget.actual_expenses, dec!(200));
    assert_eq!(completed.budget.actual_income, dec!(2500));
    assert_eq!(completed.allocation_for("food").unwrap().spent_amount, dec!(200));

    let next = service
        .create_next_period_budget(&budget.id, USER, at(2024, 2, 1))
        .await
        .unwrap();
    let february = service
        .get_budget_with_allocations(&next.budget.budget.id)
        .unwrap();
    assert_eq!(february.budget.start_date, d(2024, 2, 1));
    assert_eq!(february.budget.end_date, d(2024, 2, 29));
    assert_eq!(february.allocation_for("food").unwrap().allocated_amount, dec!(400));
    assert_eq!(february.budget.planned_expenses, dec!(400));
    assert_eq!(february, next.budget);
}
