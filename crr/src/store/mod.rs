//! Durable storage of replication group records.

mod base;
mod memory;

pub use base::*;
pub use memory::*;
