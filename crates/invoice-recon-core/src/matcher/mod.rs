//! Name matching: invoice vendor names to approved vendors, and invoice
//! descriptions to canonical item names.

mod items;
mod vendor;

pub use items::*;
pub use vendor::*;
