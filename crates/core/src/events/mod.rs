//! Domain events module.
//!
//! Provides domain event types and the sink trait for emitting events
//! after successful budget mutations. Delivery (email, push, UI refresh) is
//! left to whoever implements the sink.

mod domain_event;
mod sink;

pub use domain_event::*;
pub use sink::*;
