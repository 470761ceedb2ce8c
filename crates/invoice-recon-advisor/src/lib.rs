//! Advisory layer for invoice reconciliation.
//!
//! Builds prompts from a finished reconciliation decision, calls a
//! completion backend, and enforces guardrails on the response. The
//! decision record is read-only here: the advisor adds explanations and
//! questions for the reviewer but never changes status or reason codes.

pub mod analysis;
pub mod prompts;

pub use analysis::*;
pub use prompts::*;
