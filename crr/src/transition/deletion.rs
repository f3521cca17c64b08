use crr_config::shared::RetryConfig;
use tracing::{debug, error, info, warn};

use crate::ordering::head_by_creating_priority;
use crate::provision::{ProvisionError, ResourceProvisioner};
use crate::store::MetadataStore;
use crate::transition::apply::{
    ApplyError, Backoff, delete_connectors, read_current, write_record, write_succeeded,
};
use crate::types::{GroupMember, GroupStatus, MemberStatus, ReplicationGroup};

/// Tears a DELETING group down one member at a time.
///
/// Each removed member writes a new record version, and the event that write
/// generates re-drives this transition until no members remain; the final
/// step deletes the record itself. Members whose bootstrap copy may still be
/// running are left for the external cancellation to release.
pub(crate) async fn deletion_started<S, P>(
    new: &ReplicationGroup,
    store: &S,
    provisioner: &P,
    retry: &RetryConfig,
) -> Result<(), ApplyError>
where
    S: MetadataStore,
    P: ResourceProvisioner,
{
    let uuid = new.uuid.as_str();
    info!(uuid, remaining = new.members.len(), "replication group deletion started");

    let mut backoff = Backoff::new(retry);
    loop {
        let Some(current) = read_current(store, uuid, retry).await? else {
            debug!(uuid, "group record already deleted, nothing to do");
            return Ok(());
        };
        if current.status != GroupStatus::Deleting {
            debug!(uuid, status = %current.status, "group is not deleting, nothing to do");
            return Ok(());
        }

        if current.members.is_empty() {
            let result = write_record(store, Some(&current), None, retry).await?;
            if write_succeeded(result.as_ref(), None) {
                info!(uuid, "replication group record deleted");
                return Ok(());
            }
        } else {
            let Some(head) = head_by_creating_priority(
                current
                    .members
                    .values()
                    .filter(|m| m.status != MemberStatus::DeleteFailed),
            ) else {
                warn!(uuid, "all remaining members failed teardown, external retry required");
                return Ok(());
            };
            let head = head.clone();

            // A bootstrap copy still attached to the member must be cancelled
            // externally before its table can be torn down.
            if matches!(
                head.status,
                MemberStatus::Bootstrapping | MemberStatus::Waiting
            ) {
                match provisioner.bootstrap_task_exists(&head.arn).await {
                    Ok(true) => {
                        info!(uuid, table = %head.arn, "waiting for bootstrap cancellation");
                        return Ok(());
                    }
                    Ok(false) => {}
                    Err(err) => {
                        warn!(uuid, table = %head.arn, error = %err, "could not check bootstrap task");
                        return Ok(());
                    }
                }
            }

            let mut candidate = current.clone();
            match teardown_member(provisioner, &head).await {
                Ok(()) => {
                    info!(uuid, table = %head.arn, "member torn down and removed");
                    candidate.members.remove(&head.arn);
                }
                Err(err) => {
                    error!(uuid, table = %head.arn, error = %err, "member teardown failed");
                    candidate.set_member_status(&head.arn, MemberStatus::DeleteFailed);
                }
            }

            let result = write_record(store, Some(&current), Some(&candidate), retry).await?;
            if write_succeeded(result.as_ref(), Some(&candidate)) {
                return Ok(());
            }
        }

        debug!(uuid, "lost record write race, rereading");
        if !backoff.wait().await {
            return Err(ApplyError::RetriesExhausted {
                uuid: uuid.to_owned(),
                attempts: backoff.attempts(),
            });
        }
    }
}

async fn teardown_member<P: ResourceProvisioner>(
    provisioner: &P,
    member: &GroupMember,
) -> Result<(), ProvisionError> {
    provisioner.delete_bootstrap_task(&member.arn).await?;
    delete_connectors(provisioner, member).await
}
