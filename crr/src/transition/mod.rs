//! Classification of record changes into group state transitions and their
//! convergence logic.

mod apply;
mod classify;
mod creation;
mod deletion;
mod member_direct;
mod member_priority;
mod update;

pub use apply::{ApplyError, apply_transition};
pub use classify::{GroupTransition, MemberChange, TransitionError, classify, diff_members};
