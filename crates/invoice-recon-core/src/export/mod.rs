//! Export of reconciliation results for review tooling.

mod reconciliation;

pub use reconciliation::*;
