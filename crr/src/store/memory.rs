use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::store::base::{MetadataStore, StoreError};
use crate::types::ReplicationGroup;

#[derive(Debug, Default)]
struct Inner {
    groups: HashMap<String, ReplicationGroup>,
    read_failures: VecDeque<StoreError>,
    write_failures: VecDeque<StoreError>,
    contended_writes: u32,
}

/// In-memory [`MetadataStore`] with version-based compare-and-swap.
///
/// Backs local runs and tests. Failures can be injected per operation to
/// exercise the convergence loop's retry classification.
#[derive(Debug, Clone, Default)]
pub struct MemoryMetadataStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record directly, bypassing compare-and-swap. Test setup only.
    pub async fn insert_group(&self, group: ReplicationGroup) {
        let mut inner = self.inner.lock().await;
        inner.groups.insert(group.uuid.clone(), group);
    }

    /// Queues an error to be returned by the next read operation.
    pub async fn fail_next_read(&self, error: StoreError) {
        self.inner.lock().await.read_failures.push_back(error);
    }

    /// Queues an error to be returned by the next compare-and-write.
    pub async fn fail_next_write(&self, error: StoreError) {
        self.inner.lock().await.write_failures.push_back(error);
    }

    /// Arranges for the next `count` compare-and-writes to lose to a
    /// simulated concurrent writer. Test setup only.
    pub async fn contend_next_writes(&self, count: u32) {
        self.inner.lock().await.contended_writes += count;
    }
}

impl MetadataStore for MemoryMetadataStore {
    async fn read_group(&self, uuid: &str) -> Result<Option<ReplicationGroup>, StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(error) = inner.read_failures.pop_front() {
            return Err(error);
        }

        Ok(inner.groups.get(uuid).cloned())
    }

    async fn list_group_ids(&self) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock().await;

        let mut ids: Vec<String> = inner.groups.keys().cloned().collect();
        ids.sort();

        Ok(ids)
    }

    async fn compare_and_write(
        &self,
        expected: Option<&ReplicationGroup>,
        next: Option<&ReplicationGroup>,
    ) -> Result<Option<ReplicationGroup>, StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(error) = inner.write_failures.pop_front() {
            return Err(error);
        }

        // A concurrent writer landing between the caller's read and this
        // write, simulated by bumping the stored version out from under it.
        if inner.contended_writes > 0
            && let Some(expected) = expected
        {
            if let Some(current) = inner.groups.get_mut(&expected.uuid) {
                current.version += 1;
            }
            inner.contended_writes -= 1;
        }

        let (uuid, stored_version) = match (expected, next) {
            (None, None) => {
                return Err(StoreError::InvalidWrite(
                    "expected and next cannot both be absent",
                ));
            }
            (Some(expected), Some(next)) => {
                if expected.uuid != next.uuid {
                    return Err(StoreError::InvalidWrite("record uuid cannot change"));
                }
                if expected.version != next.version {
                    return Err(StoreError::InvalidWrite(
                        "expected and next must carry the same version",
                    ));
                }
                if expected == next {
                    return Err(StoreError::InvalidWrite(
                        "expected and next must differ in content",
                    ));
                }
                (&expected.uuid, Some(expected.version))
            }
            (Some(expected), None) => (&expected.uuid, Some(expected.version)),
            (None, Some(next)) => (&next.uuid, None),
        };

        let current = inner.groups.get(uuid);
        let matches = match (current, stored_version) {
            // Insert succeeds only if the record is still absent.
            (None, None) => true,
            (Some(current), Some(version)) => current.version == version,
            // Delete of an already-absent record is an idempotent success.
            (None, Some(_)) => return Ok(None),
            (Some(_), None) => false,
        };

        if !matches {
            return Ok(current.cloned());
        }

        match next {
            Some(next) => {
                let mut written = next.clone();
                written.version = next.version + 1;
                inner.groups.insert(uuid.clone(), written.clone());
                Ok(Some(written))
            }
            None => {
                inner.groups.remove(uuid);
                Ok(None)
            }
        }
    }
}
