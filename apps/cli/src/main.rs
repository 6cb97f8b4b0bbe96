mod cli;
mod config;
mod domain_events;
mod main_lib;

use std::process::ExitCode;

use budgetkit_core::budgets::{BudgetServiceTrait, BudgetStatus};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use clap::Parser;
use serde::Serialize;

use cli::{Cli, Command};
use config::Config;
use main_lib::{build_state, init_tracing, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing();
    let state = build_state(&config).await?;
    run(&state, cli.command).await
}

async fn run(state: &AppState, command: Command) -> anyhow::Result<ExitCode> {
    let service = &state.budget_service;
    let now = Utc::now().naive_utc();

    match command {
        Command::RecalculateAll { as_of } => {
            let report = service
                .recalculate_active_budgets(timestamp(as_of, now))
                .await?;
            for failure in &report.failures {
                tracing::error!(
                    "Recalculation failed for budget {}: {}",
                    failure.budget_id,
                    failure.error
                );
            }
            tracing::info!(
                "Recalculated {} budget(s), {} failure(s)",
                report.recalculated.len(),
                report.failures.len()
            );
            print_json(&report)?;
            if !report.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Recalculate { budget_id } => {
            print_json(&service.recalculate_actuals(&budget_id, now).await?)?;
        }
        Command::Approve {
            budget_id,
            approver,
        } => {
            print_json(&service.approve(&budget_id, &approver, now).await?)?;
        }
        Command::Complete { budget_id } => {
            print_json(&service.complete(&budget_id, now).await?)?;
        }
        Command::NextPeriod {
            budget_id,
            created_by,
        } => {
            // Close the source first so rollover sees its final spending.
            if service.get_budget(&budget_id)?.status == BudgetStatus::Active {
                service.complete(&budget_id, now).await?;
            }
            let next = service
                .create_next_period_budget(&budget_id, &created_by, now)
                .await?;
            print_json(&next)?;
        }
        Command::Summary { budget_id, as_of } => {
            let as_of = as_of.unwrap_or_else(|| now.date());
            print_json(&service.get_performance_summary(&budget_id, as_of)?)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn timestamp(as_of: Option<NaiveDate>, now: NaiveDateTime) -> NaiveDateTime {
    match as_of {
        Some(date) => date.and_time(now.time()),
        None => now,
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
