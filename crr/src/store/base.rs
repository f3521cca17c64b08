use std::future::Future;

use thiserror::Error;

use crate::types::ReplicationGroup;

/// Errors surfaced by a metadata store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Retryable backend condition, e.g. throttling or an internal server
    /// error. The convergence loop retries these in place.
    #[error("transient metadata store error: {0}")]
    Transient(String),

    /// Non-retryable backend failure. Aborts processing of the current event,
    /// which stays unacknowledged and will be redelivered.
    #[error("metadata store backend error: {0}")]
    Backend(String),

    /// The caller passed an argument pair `compare_and_write` cannot accept.
    #[error("invalid compare-and-write arguments: {0}")]
    InvalidWrite(&'static str),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

/// Compare-and-swap storage of replication group records.
///
/// The store is the only serialization point between concurrent coordinator
/// instances; no other locking is assumed anywhere.
pub trait MetadataStore {
    /// Reads the current record for `uuid`, or `None` if the group has been
    /// deleted.
    fn read_group(
        &self,
        uuid: &str,
    ) -> impl Future<Output = Result<Option<ReplicationGroup>, StoreError>> + Send;

    /// Lists the uuids of all stored groups.
    fn list_group_ids(&self) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Writes `next` if the stored record still matches `expected`, and
    /// returns the resulting stored value either way.
    ///
    /// `expected == None` inserts, `next == None` deletes. Both `None` is a
    /// caller bug; both present must differ in content and carry the same
    /// version. A caller detects success by comparing the returned value with
    /// `next`; any other return means a concurrent writer won and the caller
    /// should reread and recompute.
    fn compare_and_write(
        &self,
        expected: Option<&ReplicationGroup>,
        next: Option<&ReplicationGroup>,
    ) -> impl Future<Output = Result<Option<ReplicationGroup>, StoreError>> + Send;
}
