//! Configuration management for the replication coordinator.
//!
//! Provides environment detection, hierarchical configuration loading from
//! YAML files with environment variable overrides, and the shared
//! configuration types used across coordinator services.

mod environment;
mod load;
pub mod shared;

pub use environment::*;
pub use load::*;
