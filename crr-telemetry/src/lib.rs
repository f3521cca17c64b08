//! Tracing bootstrap for coordinator processes.

mod tracing;

pub use crate::tracing::*;
