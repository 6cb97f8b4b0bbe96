use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use dashmap::DashMap;
use futures::future::join_all;
use log::{debug, error, info, warn};
use num_traits::Zero;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::budgets_model::{
    Budget, BudgetAllocation, BudgetFailure, BudgetPerformanceSummary, BudgetSettings,
    BudgetStatus, BudgetWithAllocations, BulkRecalculationReport, NewBudget, NewBudgetAllocation,
};
use super::budgets_traits::{BudgetRepositoryTrait, BudgetServiceTrait, NextPeriodBudget};
use super::performance::performance_summary;
use super::rollover::{
    allocations_from_template, apply_rollover, recompute_planned_totals, sort_allocations,
};
use crate::categories::{CategoryKind, CategoryRepositoryTrait};
use crate::constants::DEFAULT_ALERT_PERCENTAGE;
use crate::errors::{Error, Result, ValidationError};
use crate::events::{DomainEvent, DomainEventSink};
use crate::money::{ensure_non_negative, ensure_percentage, round_percentage};
use crate::periods::{initial_period, next_period};
use crate::transactions::{ActualsAggregatorTrait, TransactionType};

/// Budget lifecycle engine.
///
/// Every mutating operation holds the budget's lock from the first read to
/// the final write, so two operations on one budget never interleave.
/// Different budgets proceed in parallel.
pub struct BudgetService {
    repository: Arc<dyn BudgetRepositoryTrait>,
    category_repository: Arc<dyn CategoryRepositoryTrait>,
    aggregator: Arc<dyn ActualsAggregatorTrait>,
    event_sink: Arc<dyn DomainEventSink>,
    settings: BudgetSettings,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl BudgetService {
    pub fn new(
        repository: Arc<dyn BudgetRepositoryTrait>,
        category_repository: Arc<dyn CategoryRepositoryTrait>,
        aggregator: Arc<dyn ActualsAggregatorTrait>,
        event_sink: Arc<dyn DomainEventSink>,
        settings: BudgetSettings,
    ) -> Self {
        Self {
            repository,
            category_repository,
            aggregator,
            event_sink,
            settings,
            locks: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &BudgetSettings {
        &self.settings
    }

    /// Waits for exclusive access to one budget.
    async fn lock_budget(&self, budget_id: &str) -> BudgetGuard<'_> {
        let lock = self
            .locks
            .entry(budget_id.to_string())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        BudgetGuard {
            locks: &self.locks,
            budget_id: budget_id.to_string(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_lock_count(&self) -> usize {
        self.locks.len()
    }

    /// Re-derives actuals and spent amounts from transaction history.
    ///
    /// Works on a copy; nothing is persisted here.
    fn recalculated(
        &self,
        aggregate: &BudgetWithAllocations,
        as_of: NaiveDateTime,
    ) -> Result<BudgetWithAllocations> {
        let mut budget = aggregate.budget.clone();
        let mut allocations = aggregate.allocations.clone();
        let range = budget.period()?;

        budget.actual_income = non_negative_actual(
            &budget.id,
            "actual_income",
            self.aggregator
                .sum_by_type(&budget.user_id, &range, TransactionType::Income)?,
        )?;
        budget.actual_expenses = non_negative_actual(
            &budget.id,
            "actual_expenses",
            self.aggregator
                .sum_by_type(&budget.user_id, &range, TransactionType::Expense)?,
        )?;

        for kind in [CategoryKind::Income, CategoryKind::Expense] {
            let category_ids: Vec<String> = allocations
                .iter()
                .filter(|a| a.category_kind == kind)
                .map(|a| a.category_id.clone())
                .collect();
            if category_ids.is_empty() {
                continue;
            }
            let sums = self.aggregator.sum_by_categories(
                &budget.user_id,
                &range,
                &category_ids,
                kind.transaction_type(),
            )?;
            for allocation in allocations.iter_mut().filter(|a| a.category_kind == kind) {
                let spent = sums
                    .get(&allocation.category_id)
                    .copied()
                    .unwrap_or_else(Decimal::zero);
                allocation.spent_amount = non_negative_actual(
                    &budget.id,
                    &format!("spent_amount of category {}", allocation.category_id),
                    spent,
                )?;
                allocation.updated_at = as_of;
            }
        }

        budget.updated_at = as_of;
        debug!(
            "Recalculated budget {} over {}: income {}, expenses {}",
            budget.id, range, budget.actual_income, budget.actual_expenses
        );
        Ok(BudgetWithAllocations {
            budget,
            allocations,
        })
    }

    /// Events describing a successful recalculation. Computed before the
    /// write, so an amount out of range aborts the recalculation.
    fn recalculation_events(
        previous: &Budget,
        updated: &BudgetWithAllocations,
    ) -> Result<Vec<DomainEvent>> {
        let budget = &updated.budget;
        let mut events = vec![DomainEvent::BudgetRecalculated {
            budget_id: budget.id.clone(),
            actual_income: budget.actual_income,
            actual_expenses: budget.actual_expenses,
        }];

        for allocation in &updated.allocations {
            if allocation.should_alert()? {
                events.push(DomainEvent::BudgetAlertRaised {
                    budget_id: budget.id.clone(),
                    category_id: allocation.category_id.clone(),
                    usage_percentage: round_percentage(allocation.usage_percentage()?),
                    is_over_budget: allocation.is_over_budget(),
                });
            }
        }

        // A previous state that no longer computes counts as not reached.
        let reached_before = previous.is_alert_threshold_reached().unwrap_or(false);
        if budget.is_alert_threshold_reached()? && !reached_before {
            events.push(DomainEvent::BudgetThresholdReached {
                budget_id: budget.id.clone(),
                usage_percentage: round_percentage(budget.expense_usage_percentage()?),
                alert_percentage: budget.alert_percentage,
            });
        }
        Ok(events)
    }

    /// Template allocations whose category still exists.
    fn live_template_allocations(
        &self,
        template: &BudgetWithAllocations,
    ) -> Result<Vec<BudgetAllocation>> {
        let category_ids: Vec<String> = template
            .allocations
            .iter()
            .map(|a| a.category_id.clone())
            .collect();
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }
        let known: HashSet<String> = self
            .category_repository
            .get_by_ids(&category_ids)?
            .into_iter()
            .map(|c| c.id)
            .collect();

        Ok(template
            .allocations
            .iter()
            .filter(|a| {
                let exists = known.contains(&a.category_id);
                if !exists {
                    warn!(
                        "Skipping allocation for missing category {} of template {}",
                        a.category_id, template.budget.id
                    );
                }
                exists
            })
            .cloned()
            .collect())
    }

    async fn save(
        &self,
        budget: Budget,
        allocations: Vec<BudgetAllocation>,
        operation: &str,
    ) -> Result<BudgetWithAllocations> {
        let budget_id = budget.id.clone();
        self.repository
            .save_aggregate(budget, allocations)
            .await
            .map_err(|e| {
                error!("Failed to persist {} of budget {}: {}", operation, budget_id, e);
                e
            })
    }

    async fn save_budget(&self, budget: Budget, operation: &str) -> Result<Budget> {
        let budget_id = budget.id.clone();
        self.repository
            .update_budget(budget)
            .await
            .map_err(|e| {
                error!("Failed to persist {} of budget {}: {}", operation, budget_id, e);
                e
            })
    }

    async fn recalculate_locked(
        &self,
        budget_id: &str,
        as_of: NaiveDateTime,
    ) -> Result<BudgetWithAllocations> {
        let aggregate = self.repository.get_aggregate(budget_id)?;
        let budget = &aggregate.budget;
        if budget.is_retired() || budget.status.is_terminal() {
            return Err(rejected(budget, "recalculate"));
        }

        let updated = self.recalculated(&aggregate, as_of)?;
        let events = Self::recalculation_events(&aggregate.budget, &updated)?;
        let saved = self
            .save(updated.budget, updated.allocations, "recalculation")
            .await?;
        self.event_sink.emit_batch(events);
        Ok(saved)
    }

    /// Moves a live budget to `next` if the state machine allows it.
    async fn transition_locked(
        &self,
        budget_id: &str,
        next: BudgetStatus,
        approver: Option<&str>,
        as_of: NaiveDateTime,
    ) -> Result<Budget> {
        let mut budget = self.repository.get_by_id(budget_id)?;
        if budget.is_retired() {
            return Err(rejected(&budget, next.as_str()));
        }
        let previous = budget.status;
        if !previous.can_transition_to(next, self.settings.require_approval) {
            return Err(Error::invalid_transition(previous, next));
        }

        budget.status = next;
        if let Some(approver) = approver {
            budget.approved_by = Some(approver.to_string());
            budget.approved_at = Some(as_of);
        }
        budget.updated_at = as_of;

        let saved = self.save_budget(budget, next.as_str()).await?;
        info!("Budget {} moved from {} to {}", budget_id, previous, next);
        self.event_sink
            .emit(DomainEvent::status_changed(budget_id, previous, next));
        Ok(saved)
    }
}

/// Exclusive access to one budget. On drop the lock entry is removed unless
/// another operation already holds a handle to it.
struct BudgetGuard<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    budget_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for BudgetGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.budget_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Error for an operation the budget's current state does not allow.
fn rejected(budget: &Budget, attempted: &str) -> Error {
    let state = if budget.is_retired() {
        "retired"
    } else {
        budget.status.as_str()
    };
    Error::invalid_transition(state, attempted)
}

/// Allocations and totals may only change before a budget is completed.
fn ensure_editable(budget: &Budget, attempted: &str) -> Result<()> {
    if budget.is_retired() || budget.status.is_terminal() {
        return Err(rejected(budget, attempted));
    }
    Ok(())
}

fn non_negative_actual(budget_id: &str, field: &str, value: Decimal) -> Result<Decimal> {
    if value < Decimal::zero() {
        return Err(Error::DataIntegrity(format!(
            "budget {}: derived {} is negative ({})",
            budget_id, field, value
        )));
    }
    Ok(value)
}

fn by_priority(mut allocations: Vec<BudgetAllocation>) -> Vec<BudgetAllocation> {
    sort_allocations(&mut allocations);
    allocations
}

#[async_trait]
impl BudgetServiceTrait for BudgetService {
    fn get_budget(&self, budget_id: &str) -> Result<Budget> {
        self.repository.get_by_id(budget_id)
    }

    fn get_budget_with_allocations(&self, budget_id: &str) -> Result<BudgetWithAllocations> {
        self.repository.get_aggregate(budget_id)
    }

    fn list_budgets(&self, user_id: &str) -> Result<Vec<Budget>> {
        self.repository.list_by_user(user_id)
    }

    async fn create_budget(
        &self,
        new_budget: NewBudget,
        created_by: &str,
        as_of: NaiveDateTime,
    ) -> Result<Budget> {
        let period = initial_period(
            new_budget.period_type,
            new_budget.start_date,
            new_budget.end_date,
        )?;
        let budget = Budget {
            id: Uuid::new_v4().to_string(),
            user_id: new_budget.user_id,
            name: new_budget.name,
            period_type: new_budget.period_type,
            start_date: period.start,
            end_date: period.end,
            currency: new_budget.currency,
            planned_income: new_budget.planned_income,
            actual_income: Decimal::zero(),
            planned_expenses: new_budget.planned_expenses,
            actual_expenses: Decimal::zero(),
            status: BudgetStatus::Draft,
            is_template: new_budget.is_template,
            rollover_unused: new_budget.rollover_unused,
            deduct_overspent: new_budget.deduct_overspent,
            alert_percentage: new_budget
                .alert_percentage
                .unwrap_or(self.settings.default_alert_percentage),
            created_by: created_by.to_string(),
            approved_by: None,
            approved_at: None,
            created_at: as_of,
            updated_at: as_of,
            retired_at: None,
        };
        budget.validate()?;

        let created = self
            .repository
            .insert_aggregate(budget, Vec::new())
            .await
            .map_err(|e| {
                error!("Failed to create budget: {}", e);
                e
            })?;
        let budget = created.budget;
        info!(
            "Created {} budget {} for user {} ({})",
            budget.period_type,
            budget.id,
            budget.user_id,
            budget.period()?
        );
        self.event_sink.emit(DomainEvent::BudgetCreated {
            budget_id: budget.id.clone(),
            user_id: budget.user_id.clone(),
        });
        Ok(budget)
    }

    async fn set_allocation(
        &self,
        budget_id: &str,
        allocation: NewBudgetAllocation,
        as_of: NaiveDateTime,
    ) -> Result<BudgetWithAllocations> {
        ensure_non_negative("allocated_amount", allocation.allocated_amount)?;
        let alert_threshold = allocation
            .alert_threshold
            .unwrap_or_else(|| Decimal::from(DEFAULT_ALERT_PERCENTAGE));
        ensure_percentage("alert_threshold", alert_threshold)?;

        let _guard = self.lock_budget(budget_id).await;

        let aggregate = self.repository.get_aggregate(budget_id)?;
        let mut budget = aggregate.budget;
        ensure_editable(&budget, "allocate")?;

        let category = self.category_repository.get_by_id(&allocation.category_id)?;
        if category.user_id != budget.user_id {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "category {} does not belong to the owner of budget {}",
                category.id, budget.id
            ))));
        }

        let mut allocations = aggregate.allocations;
        match allocations
            .iter_mut()
            .find(|a| a.category_id == allocation.category_id)
        {
            Some(existing) => {
                existing.category_kind = category.kind;
                existing.allocated_amount = allocation.allocated_amount;
                existing.priority = allocation.priority;
                existing.is_fixed_amount = allocation.is_fixed_amount;
                existing.alert_on_overspend = allocation.alert_on_overspend;
                existing.alert_threshold = alert_threshold;
                existing.updated_at = as_of;
            }
            None => allocations.push(BudgetAllocation {
                id: Uuid::new_v4().to_string(),
                budget_id: budget.id.clone(),
                category_id: category.id.clone(),
                category_kind: category.kind,
                allocated_amount: allocation.allocated_amount,
                spent_amount: Decimal::zero(),
                priority: allocation.priority,
                is_fixed_amount: allocation.is_fixed_amount,
                alert_on_overspend: allocation.alert_on_overspend,
                alert_threshold,
                created_at: as_of,
                updated_at: as_of,
            }),
        }

        sort_allocations(&mut allocations);
        recompute_planned_totals(&mut budget, &allocations)?;
        budget.updated_at = as_of;
        debug!(
            "Allocated {} to category {} on budget {}",
            allocation.allocated_amount, category.id, budget.id
        );
        self.save(budget, allocations, "allocation").await
    }

    async fn remove_allocation(
        &self,
        budget_id: &str,
        category_id: &str,
        as_of: NaiveDateTime,
    ) -> Result<BudgetWithAllocations> {
        let _guard = self.lock_budget(budget_id).await;

        let aggregate = self.repository.get_aggregate(budget_id)?;
        let mut budget = aggregate.budget;
        ensure_editable(&budget, "allocate")?;

        let mut allocations = aggregate.allocations;
        let before = allocations.len();
        allocations.retain(|a| a.category_id != category_id);
        if allocations.len() == before {
            return Err(Error::NotFound(format!(
                "budget {} has no allocation for category {}",
                budget_id, category_id
            )));
        }

        recompute_planned_totals(&mut budget, &allocations)?;
        budget.updated_at = as_of;
        self.save(budget, allocations, "allocation removal").await
    }

    async fn submit_for_approval(&self, budget_id: &str, as_of: NaiveDateTime) -> Result<Budget> {
        let _guard = self.lock_budget(budget_id).await;
        self.transition_locked(budget_id, BudgetStatus::PendingApproval, None, as_of)
            .await
    }

    async fn approve(
        &self,
        budget_id: &str,
        approver: &str,
        as_of: NaiveDateTime,
    ) -> Result<Budget> {
        let _guard = self.lock_budget(budget_id).await;
        self.transition_locked(budget_id, BudgetStatus::Active, Some(approver), as_of)
            .await
    }

    async fn recalculate_actuals(
        &self,
        budget_id: &str,
        as_of: NaiveDateTime,
    ) -> Result<BudgetWithAllocations> {
        let _guard = self.lock_budget(budget_id).await;
        self.recalculate_locked(budget_id, as_of).await
    }

    async fn complete(
        &self,
        budget_id: &str,
        as_of: NaiveDateTime,
    ) -> Result<BudgetWithAllocations> {
        let _guard = self.lock_budget(budget_id).await;

        let aggregate = self.repository.get_aggregate(budget_id)?;
        let previous = aggregate.budget.status;
        if aggregate.budget.is_retired() {
            return Err(rejected(&aggregate.budget, BudgetStatus::Completed.as_str()));
        }
        if previous != BudgetStatus::Completed
            && !previous.can_transition_to(BudgetStatus::Completed, self.settings.require_approval)
        {
            return Err(Error::invalid_transition(previous, BudgetStatus::Completed));
        }

        let mut updated = self.recalculated(&aggregate, as_of)?;
        updated.budget.status = BudgetStatus::Completed;
        let mut events = Self::recalculation_events(&aggregate.budget, &updated)?;

        let saved = self
            .save(updated.budget, updated.allocations, "completion")
            .await?;
        if previous != BudgetStatus::Completed {
            info!("Budget {} completed", budget_id);
            events.push(DomainEvent::status_changed(
                budget_id,
                previous,
                BudgetStatus::Completed,
            ));
        }
        self.event_sink.emit_batch(events);
        Ok(saved)
    }

    async fn create_categories_from_template(
        &self,
        target_id: &str,
        template_id: &str,
        as_of: NaiveDateTime,
    ) -> Result<BudgetWithAllocations> {
        if target_id == template_id {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "budget {} cannot be its own template",
                target_id
            ))));
        }

        let _guard = self.lock_budget(target_id).await;

        let target = self.repository.get_aggregate(target_id)?;
        ensure_editable(&target.budget, "copy template")?;
        let template = self.repository.get_aggregate(template_id)?;
        if template.budget.user_id != target.budget.user_id {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "template {} belongs to another user",
                template_id
            ))));
        }

        let copied = self.live_template_allocations(&template)?;
        let allocations = allocations_from_template(target_id, &copied, target.allocations, as_of);
        let mut budget = target.budget;
        recompute_planned_totals(&mut budget, &allocations)?;
        budget.updated_at = as_of;

        info!(
            "Copied {} allocations from template {} to budget {}",
            copied.len(),
            template_id,
            target_id
        );
        self.save(budget, allocations, "template copy").await
    }

    async fn create_next_period_budget(
        &self,
        current_id: &str,
        created_by: &str,
        as_of: NaiveDateTime,
    ) -> Result<NextPeriodBudget> {
        let _guard = self.lock_budget(current_id).await;

        let source = self.repository.get_aggregate(current_id)?;
        if source.budget.is_retired() {
            return Err(rejected(&source.budget, "next period"));
        }
        let current = &source.budget;
        let window = next_period(current.period_type, current.start_date, current.end_date)?;

        let mut budget = Budget {
            id: Uuid::new_v4().to_string(),
            user_id: current.user_id.clone(),
            name: current.name.clone(),
            period_type: current.period_type,
            start_date: window.start,
            end_date: window.end,
            currency: current.currency.clone(),
            planned_income: Decimal::zero(),
            actual_income: Decimal::zero(),
            planned_expenses: Decimal::zero(),
            actual_expenses: Decimal::zero(),
            status: BudgetStatus::Draft,
            is_template: false,
            rollover_unused: current.rollover_unused,
            deduct_overspent: current.deduct_overspent,
            alert_percentage: current.alert_percentage,
            created_by: created_by.to_string(),
            approved_by: None,
            approved_at: None,
            created_at: as_of,
            updated_at: as_of,
            retired_at: None,
        };

        let copied = self.live_template_allocations(&source)?;
        let mut allocations = allocations_from_template(&budget.id, &copied, Vec::new(), as_of);
        let rollover = apply_rollover(current, &source.allocations, &mut allocations)?;
        let carried_over = rollover.carried_over_total()?;
        let deducted = rollover.deducted_total()?;
        recompute_planned_totals(&mut budget, &allocations)?;
        budget.validate()?;
        for allocation in &allocations {
            allocation.validate()?;
        }

        let created = self
            .repository
            .insert_aggregate(budget, allocations)
            .await
            .map_err(|e| {
                error!(
                    "Failed to persist next period budget of {}: {}",
                    current_id, e
                );
                e
            })?;

        info!(
            "Created next period budget {} ({}) from {}",
            created.budget.id, window, current_id
        );
        let mut events = vec![DomainEvent::BudgetCreated {
            budget_id: created.budget.id.clone(),
            user_id: created.budget.user_id.clone(),
        }];
        if current.rollover_unused {
            events.push(DomainEvent::BudgetRolledOver {
                source_budget_id: current_id.to_string(),
                new_budget_id: created.budget.id.clone(),
                carried_over,
                deducted,
                dropped_category_ids: rollover.dropped.clone(),
            });
        }
        self.event_sink.emit_batch(events);

        Ok(NextPeriodBudget {
            budget: created,
            rollover,
        })
    }

    async fn retire_budget(&self, budget_id: &str, as_of: NaiveDateTime) -> Result<Budget> {
        let _guard = self.lock_budget(budget_id).await;

        let mut budget = self.repository.get_by_id(budget_id)?;
        if budget.is_retired() {
            return Ok(budget);
        }
        budget.retired_at = Some(as_of);
        budget.updated_at = as_of;

        let saved = self.save_budget(budget, "retirement").await?;
        info!("Budget {} retired", budget_id);
        self.event_sink.emit(DomainEvent::BudgetRetired {
            budget_id: budget_id.to_string(),
        });
        Ok(saved)
    }

    fn get_performance_summary(
        &self,
        budget_id: &str,
        as_of: NaiveDate,
    ) -> Result<BudgetPerformanceSummary> {
        let aggregate = self.repository.get_aggregate(budget_id)?;
        performance_summary(&aggregate.budget, &aggregate.allocations, as_of)
    }

    fn get_over_budget_categories(&self, budget_id: &str) -> Result<Vec<BudgetAllocation>> {
        let aggregate = self.repository.get_aggregate(budget_id)?;
        Ok(by_priority(
            aggregate
                .allocations
                .into_iter()
                .filter(|a| a.is_over_budget())
                .collect(),
        ))
    }

    fn get_near_limit_categories(
        &self,
        budget_id: &str,
        threshold: Decimal,
    ) -> Result<Vec<BudgetAllocation>> {
        ensure_percentage("threshold", threshold)?;
        let aggregate = self.repository.get_aggregate(budget_id)?;
        let mut near_limit = Vec::new();
        for allocation in aggregate.allocations {
            if allocation.is_near_limit(threshold)? {
                near_limit.push(allocation);
            }
        }
        Ok(by_priority(near_limit))
    }

    async fn recalculate_active_budgets(
        &self,
        as_of: NaiveDateTime,
    ) -> Result<BulkRecalculationReport> {
        let budgets = self.repository.list_active()?;
        info!("Recalculating {} active budgets", budgets.len());

        let runs = budgets.into_iter().map(|budget| async move {
            let result = self.recalculate_actuals(&budget.id, as_of).await;
            (budget.id, result)
        });

        let mut report = BulkRecalculationReport::default();
        for (budget_id, result) in join_all(runs).await {
            match result {
                Ok(_) => report.recalculated.push(budget_id),
                Err(e) => {
                    warn!("Recalculation of budget {} failed: {}", budget_id, e);
                    report.failures.push(BudgetFailure {
                        budget_id,
                        error: e.to_string(),
                    });
                }
            }
        }
        info!(
            "Recalculated {} budgets, {} failed",
            report.recalculated.len(),
            report.failures.len()
        );
        Ok(report)
    }
}
