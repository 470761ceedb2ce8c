//! Arithmetic, tax and shipping checks.
//!
//! None of these fail: math issues become reason codes in the decision,
//! tax and shipping only ever annotate it.

mod math;
mod observers;

pub use math::*;
pub use observers::*;
