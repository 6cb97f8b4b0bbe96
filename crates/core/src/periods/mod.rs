//! Budget period boundaries.
//!
//! One rule per period type, expressed as a match rather than a type hierarchy.

mod period_calculator;
mod period_model;

pub use period_calculator::*;
pub use period_model::*;
