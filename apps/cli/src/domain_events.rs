//! Domain event sink for the command line trigger.
//!
//! There is no downstream consumer in a one-shot process, so every event is
//! written to the log as a structured record.

use budgetkit_core::events::{DomainEvent, DomainEventSink};

#[derive(Clone, Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl DomainEventSink for TracingEventSink {
    fn emit(&self, event: DomainEvent) {
        match &event {
            DomainEvent::BudgetAlertRaised { .. } | DomainEvent::BudgetThresholdReached { .. } => {
                tracing::warn!(budget_id = event.budget_id(), event = ?event, "Budget alert");
            }
            _ => {
                tracing::info!(budget_id = event.budget_id(), event = ?event, "Domain event");
            }
        }
    }
}
