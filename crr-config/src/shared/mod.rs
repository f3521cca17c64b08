//! Shared configuration types used by coordinator services.

mod base;
mod coordinator;
mod retry;

pub use base::*;
pub use coordinator::*;
pub use retry::*;
