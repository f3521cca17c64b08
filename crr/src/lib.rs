//! Coordination of cross-region replication groups.
//!
//! A replication group is a set of physical table replicas (members) spread
//! across regions and accounts, kept in sync by bootstrap copy tasks and
//! continuously-running connectors. The desired state of each group lives in
//! a metadata store as a versioned record; this crate classifies ordered
//! before/after snapshots of that record into state transitions and drives
//! provisioning until the observed state converges to the desired state.
//!
//! All convergence is mediated by the metadata store's compare-and-swap
//! primitive, which keeps transition processing idempotent under at-least-once
//! event delivery and safe under concurrent coordinator instances.

pub mod event;
pub mod ordering;
pub mod provision;
pub mod store;
pub mod transition;
pub mod types;
