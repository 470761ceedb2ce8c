//! Domain models for invoice reconciliation.

mod comparison;
mod decision;
mod invoice;
mod matching;
mod pricing;

pub use comparison::*;
pub use decision::*;
pub use invoice::*;
pub use matching::*;
pub use pricing::*;
