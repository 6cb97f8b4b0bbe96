use std::sync::Arc;

use budgetkit_core::{
    budgets::{BudgetService, BudgetServiceTrait},
    events::DomainEventSink,
    transactions::ActualsAggregator,
};
use budgetkit_storage_sqlite::{
    db, BudgetRepository, CategoryRepository, TransactionRepository,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{config::Config, domain_events::TracingEventSink};

pub struct AppState {
    pub budget_service: Arc<dyn BudgetServiceTrait>,
}

pub fn init_tracing() {
    let log_format = std::env::var("BUDGETKIT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // `init` also routes `log` records from the library crates into tracing.
    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Opens the database, applies migrations and wires the budget service.
/// Must run inside the tokio runtime, which hosts the writer actor.
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer(&pool)?;

    let budget_repository = Arc::new(BudgetRepository::new(pool.clone(), writer));
    let category_repository = Arc::new(CategoryRepository::new(pool.clone()));
    let transaction_repository = Arc::new(TransactionRepository::new(pool));
    let aggregator = Arc::new(ActualsAggregator::new(transaction_repository));
    let event_sink: Arc<dyn DomainEventSink> = Arc::new(TracingEventSink::new());

    let budget_service = Arc::new(BudgetService::new(
        budget_repository,
        category_repository,
        aggregator,
        event_sink,
        config.settings.clone(),
    ));

    Ok(AppState { budget_service })
}
