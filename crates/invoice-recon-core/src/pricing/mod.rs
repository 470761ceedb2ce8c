//! Price comparison engine.
//!
//! Pipeline: Normalize item → Resolve rate → Adjust for quantity → Classify

mod comparator;
mod quantity;
mod range;
mod rates;

pub use comparator::*;
pub use quantity::*;
pub use range::*;
pub use rates::*;

use thiserror::Error;

/// Pricing errors.
///
/// Absent prices and rates are classifications, not errors; only malformed
/// line items fail.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PricingError {
    #[error("Line item {index} has no description")]
    BlankDescription { index: usize },
}

pub type PricingResult<T> = Result<T, PricingError>;
