//! Provisioning of member tables, bootstrap tasks and connectors.

mod base;
mod memory;

pub use base::*;
pub use memory::*;
