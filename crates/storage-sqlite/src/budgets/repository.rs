use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;
use std::sync::Arc;

use budgetkit_core::budgets::{
    Budget, BudgetAllocation, BudgetRepositoryTrait, BudgetStatus, BudgetWithAllocations,
};
use budgetkit_core::errors::{Error, Result};

use super::model::{BudgetAllocationDB, BudgetDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::{budget_allocations, budgets};

pub struct BudgetRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl BudgetRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        BudgetRepository { pool, writer }
    }
}

fn not_found(budget_id: &str) -> Error {
    Error::NotFound(format!("Budget {} not found", budget_id))
}

fn load_budget(conn: &mut SqliteConnection, budget_id: &str) -> Result<BudgetDB> {
    budgets::table
        .find(budget_id)
        .select(BudgetDB::as_select())
        .first::<BudgetDB>(conn)
        .optional()
        .into_core()?
        .ok_or_else(|| not_found(budget_id))
}

/// Reads a budget and its allocations, ordered by priority then category.
fn load_aggregate(conn: &mut SqliteConnection, budget_id: &str) -> Result<BudgetWithAllocations> {
    let budget_db = load_budget(conn, budget_id)?;
    let allocation_rows = BudgetAllocationDB::belonging_to(&budget_db)
        .select(BudgetAllocationDB::as_select())
        .order((
            budget_allocations::priority.asc(),
            budget_allocations::category_id.asc(),
        ))
        .load::<BudgetAllocationDB>(conn)
        .into_core()?;

    Ok(BudgetWithAllocations {
        budget: Budget::try_from(budget_db)?,
        allocations: allocation_rows
            .into_iter()
            .map(BudgetAllocation::try_from)
            .collect::<Result<Vec<_>>>()?,
    })
}

fn to_domain(rows: Vec<BudgetDB>) -> Result<Vec<Budget>> {
    rows.into_iter().map(Budget::try_from).collect()
}

fn insert_allocations(
    conn: &mut SqliteConnection,
    allocations: Vec<BudgetAllocation>,
) -> Result<()> {
    for allocation in allocations {
        let row = BudgetAllocationDB::from(allocation);
        diesel::insert_into(budget_allocations::table)
            .values(&row)
            .on_conflict(budget_allocations::id)
            .do_update()
            .set(&row)
            .execute(conn)
            .into_core()?;
    }
    Ok(())
}

fn update_budget_row(conn: &mut SqliteConnection, budget: Budget) -> Result<()> {
    let budget_id = budget.id.clone();
    let row = BudgetDB::from(budget);
    let updated = diesel::update(budgets::table.find(&budget_id))
        .set(&row)
        .execute(conn)
        .into_core()?;
    if updated == 0 {
        return Err(not_found(&budget_id));
    }
    Ok(())
}

#[async_trait]
impl BudgetRepositoryTrait for BudgetRepository {
    fn get_by_id(&self, budget_id: &str) -> Result<Budget> {
        let mut conn = get_connection(&self.pool)?;
        Budget::try_from(load_budget(&mut conn, budget_id)?)
    }

    fn get_aggregate(&self, budget_id: &str) -> Result<BudgetWithAllocations> {
        let mut conn = get_connection(&self.pool)?;
        conn.transaction::<_, StorageError, _>(|conn| {
            load_aggregate(conn, budget_id).map_err(StorageError::from)
        })
        .map_err(Error::from)
    }

    fn list_by_user(&self, user_id: &str) -> Result<Vec<Budget>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = budgets::table
            .filter(budgets::user_id.eq(user_id))
            .filter(budgets::retired_at.is_null())
            .order((budgets::start_date.desc(), budgets::id.asc()))
            .select(BudgetDB::as_select())
            .load::<BudgetDB>(&mut conn)
            .into_core()?;
        to_domain(rows)
    }

    fn list_active(&self) -> Result<Vec<Budget>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = budgets::table
            .filter(budgets::status.eq(BudgetStatus::Active.as_str()))
            .filter(budgets::retired_at.is_null())
            .order(budgets::id.asc())
            .select(BudgetDB::as_select())
            .load::<BudgetDB>(&mut conn)
            .into_core()?;
        to_domain(rows)
    }

    async fn insert_aggregate(
        &self,
        budget: Budget,
        allocations: Vec<BudgetAllocation>,
    ) -> Result<BudgetWithAllocations> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<BudgetWithAllocations> {
                let budget_id = budget.id.clone();
                diesel::insert_into(budgets::table)
                    .values(BudgetDB::from(budget))
                    .execute(conn)
                    .into_core()?;
                insert_allocations(conn, allocations)?;
                load_aggregate(conn, &budget_id)
            })
            .await
    }

    async fn update_budget(&self, budget: Budget) -> Result<Budget> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Budget> {
                let budget_id = budget.id.clone();
                update_budget_row(conn, budget)?;
                Budget::try_from(load_budget(conn, &budget_id)?)
            })
            .await
    }

    async fn save_aggregate(
        &self,
        budget: Budget,
        allocations: Vec<BudgetAllocation>,
    ) -> Result<BudgetWithAllocations> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<BudgetWithAllocations> {
                let budget_id = budget.id.clone();
                update_budget_row(conn, budget)?;

                // Drop rows that are no longer part of the budget first, so a
                // replacement for the same category does not hit the unique key.
                let kept_ids: Vec<String> = allocations.iter().map(|a| a.id.clone()).collect();
                let stale = budget_allocations::table
                    .filter(budget_allocations::budget_id.eq(&budget_id))
                    .filter(budget_allocations::id.ne_all(&kept_ids));
                diesel::delete(stale).execute(conn).into_core()?;

                insert_allocations(conn, allocations)?;
                load_aggregate(conn, &budget_id)
            })
            .await
    }
}
