//! # Condition Model
//!
//! The value types every evaluator produces: [`Condition`], its
//! [`ConditionStatus`], the stable [`reasons`] strings, and the [`Clock`] that
//! stamps transitions.

pub mod clock;
pub mod reasons;
pub mod set;
pub mod types;

pub use clock::{Clock, FakeClock, SystemClock};
pub use set::AspectConditions;
pub use types::{new_condition_or_error, Condition, ConditionStatus, ConditionType};
