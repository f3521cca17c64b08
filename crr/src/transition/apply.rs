use std::time::Duration;

use crr_config::shared::RetryConfig;
use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

use crate::provision::{ProvisionError, ResourceProvisioner};
use crate::store::{MetadataStore, StoreError};
use crate::transition::classify::{GroupTransition, TransitionError};
use crate::transition::{creation, deletion, member_direct, member_priority, update};
use crate::types::{GroupMember, ReplicationGroup};

/// Errors raised while converging a classified transition.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// A non-retryable store failure. The event stays unacknowledged.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The compare-and-swap retry budget ran out under write contention.
    #[error("gave up on group {uuid} after {attempts} conflicting writes")]
    RetriesExhausted { uuid: String, attempts: u32 },

    /// A record change derived during apply failed validation.
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Converges the state transition carried by `transition`.
///
/// Rereads the record before acting, so a transition observed from a stale
/// event degrades to a no-op. At most one provisioning side effect happens
/// per convergence step, and every record write goes through compare-and-swap
/// with conflicts retried under `retry`.
pub async fn apply_transition<S, P>(
    transition: &GroupTransition,
    store: &S,
    provisioner: &P,
    retry: &RetryConfig,
) -> Result<(), ApplyError>
where
    S: MetadataStore,
    P: ResourceProvisioner,
{
    match transition {
        GroupTransition::CreationStarted { new } => {
            creation::creation_started(new, store, provisioner, retry).await
        }
        GroupTransition::DeletionStarted { new } => {
            deletion::deletion_started(new, store, provisioner, retry).await
        }
        GroupTransition::UpdateStarted { old, new } => {
            update::update_started(old, new, store, provisioner, retry).await
        }
        GroupTransition::MemberPriority { new, arn } => {
            member_priority::member_priority(new, arn, store, provisioner, retry).await
        }
        GroupTransition::MemberDirect { old, new, arn } => {
            member_direct::member_direct(old, new, arn, store, provisioner, retry).await
        }
        GroupTransition::CreationCompleted { new } => {
            info!(uuid = %new.uuid, "replication group creation completed");
            Ok(())
        }
        GroupTransition::UpdateCompleted { new } => {
            info!(uuid = %new.uuid, "replication group update completed");
            Ok(())
        }
        GroupTransition::DeletionCompleted { old } => {
            info!(uuid = %old.uuid, "replication group deletion completed");
            Ok(())
        }
    }
}

/// Exponential backoff with jitter for compare-and-swap conflicts.
pub(crate) struct Backoff<'a> {
    config: &'a RetryConfig,
    attempt: u32,
}

impl<'a> Backoff<'a> {
    pub(crate) fn new(config: &'a RetryConfig) -> Self {
        Self { config, attempt: 0 }
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Sleeps before the next retry. Returns `false` once the attempt budget
    /// is spent.
    pub(crate) async fn wait(&mut self) -> bool {
        if self.attempt >= self.config.max_attempts {
            return false;
        }

        let exponential = self.config.initial_delay_ms as f64
            * f64::from(self.config.backoff_factor).powi(self.attempt as i32);
        let delay = (exponential as u64).min(self.config.max_delay_ms).max(1);
        let jitter = rand::rng().random_range(0..=delay / 2);
        tokio::time::sleep(Duration::from_millis(delay + jitter)).await;

        self.attempt += 1;

        true
    }
}

/// Reads the current record, retrying transient store errors in place.
pub(crate) async fn read_current<S: MetadataStore>(
    store: &S,
    uuid: &str,
    retry: &RetryConfig,
) -> Result<Option<ReplicationGroup>, StoreError> {
    loop {
        match store.read_group(uuid).await {
            Err(err) if err.is_transient() => {
                warn!(uuid, error = %err, "transient store error on read, retrying");
                tokio::time::sleep(Duration::from_millis(retry.initial_delay_ms)).await;
            }
            other => return other,
        }
    }
}

/// Compare-and-swap write, retrying transient store errors in place.
pub(crate) async fn write_record<S: MetadataStore>(
    store: &S,
    expected: Option<&ReplicationGroup>,
    next: Option<&ReplicationGroup>,
    retry: &RetryConfig,
) -> Result<Option<ReplicationGroup>, StoreError> {
    loop {
        match store.compare_and_write(expected, next).await {
            Err(err) if err.is_transient() => {
                warn!(error = %err, "transient store error on write, retrying");
                tokio::time::sleep(Duration::from_millis(retry.initial_delay_ms)).await;
            }
            other => return other,
        }
    }
}

/// Whether a compare-and-swap result means the write took effect.
///
/// Record equality ignores the version, so a returned record equal in content
/// to `next` is ours regardless of the version bump.
pub(crate) fn write_succeeded(
    result: Option<&ReplicationGroup>,
    next: Option<&ReplicationGroup>,
) -> bool {
    match (result, next) {
        (Some(written), Some(next)) => written == next,
        (None, None) => true,
        _ => false,
    }
}

/// Launches every connector of `member`, stopping at the first failure.
pub(crate) async fn launch_connectors<P: ResourceProvisioner>(
    provisioner: &P,
    member: &GroupMember,
) -> Result<(), ProvisionError> {
    for connector in &member.connectors {
        provisioner.launch_connector(member, connector).await?;
    }

    Ok(())
}

/// Deletes every connector of `member`, stopping at the first failure.
pub(crate) async fn delete_connectors<P: ResourceProvisioner>(
    provisioner: &P,
    member: &GroupMember,
) -> Result<(), ProvisionError> {
    for connector in &member.connectors {
        provisioner.delete_connector(member, connector).await?;
    }

    Ok(())
}
