use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Periodic budget maintenance: recalculation, approval, period close and rollover.
#[derive(Debug, Parser)]
#[command(name = "budgetkit", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Recalculate actuals for every active budget
    RecalculateAll {
        /// Timestamp the run as of this date instead of today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Recalculate actuals for one budget
    Recalculate { budget_id: String },
    /// Approve a pending budget (or a draft when approval is not required)
    Approve {
        budget_id: String,
        #[arg(long)]
        approver: String,
    },
    /// Run a final recalculation and close the budget
    Complete { budget_id: String },
    /// Generate the following period's draft budget, applying rollover
    NextPeriod {
        budget_id: String,
        #[arg(long)]
        created_by: String,
    },
    /// Print the performance summary as JSON
    Summary {
        budget_id: String,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
}
