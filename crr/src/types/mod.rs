//! Value types describing replication groups and their members.
//!
//! Groups and members are treated as immutable values: transitions work on
//! owned copies and write whole new record versions back through the
//! metadata store, never through shared mutation.

mod arn;
mod group;
mod member;

pub use arn::*;
pub use group::*;
pub use member::*;
