use crr_config::shared::RetryConfig;
use tracing::{debug, error, info};

use crate::ordering::head_by_creating_priority;
use crate::provision::ResourceProvisioner;
use crate::store::MetadataStore;
use crate::transition::apply::{
    ApplyError, Backoff, read_current, write_record, write_succeeded,
};
use crate::types::{GroupStatus, MemberStatus, ReplicationGroup};

/// Converges a freshly inserted group towards ACTIVE.
///
/// An empty group activates immediately. Otherwise the highest-priority
/// CREATING member gets its table created and moves to WAITING; subsequent
/// members advance through the member change events that write generates.
pub(crate) async fn creation_started<S, P>(
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
    info!(uuid, name = %new.name, members = new.members.len(), "replication group creation started");

    let mut backoff = Backoff::new(retry);
    loop {
        let Some(current) = read_current(store, uuid, retry).await? else {
            debug!(uuid, "group record no longer exists, nothing to do");
            return Ok(());
        };
        if current.status != GroupStatus::Creating {
            debug!(uuid, status = %current.status, "group is no longer creating, nothing to do");
            return Ok(());
        }

        let Some(candidate) = next_creation_step(&current, provisioner).await else {
            return Ok(());
        };

        let result = write_record(store, Some(&current), Some(&candidate), retry).await?;
        if write_succeeded(result.as_ref(), Some(&candidate)) {
            return Ok(());
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

/// Computes the next record to write, performing at most one provisioning
/// side effect. `None` means the record needs no change.
async fn next_creation_step<P: ResourceProvisioner>(
    current: &ReplicationGroup,
    provisioner: &P,
) -> Option<ReplicationGroup> {
    if current.members.is_empty() {
        let mut candidate = current.clone();
        candidate.status = GroupStatus::Active;
        return Some(candidate);
    }

    // Some member already advanced past CREATING: a concurrent coordinator
    // handled this event, and further progress is event-driven.
    if current
        .members
        .values()
        .any(|m| !matches!(m.status, MemberStatus::Creating | MemberStatus::Deleting))
    {
        debug!(uuid = %current.uuid, "group creation already in progress");
        return None;
    }

    let head = head_by_creating_priority(
        current
            .members
            .values()
            .filter(|m| m.status == MemberStatus::Creating),
    )?;
    let arn = head.arn.clone();

    let mut candidate = current.clone();
    match provisioner.create_table_if_not_exists(current, head).await {
        Ok(()) => {
            info!(uuid = %current.uuid, table = %arn, "member table created");
            candidate.set_member_status(&arn, MemberStatus::Waiting);
        }
        Err(err) => {
            error!(uuid = %current.uuid, table = %arn, error = %err, "member table creation failed");
            candidate.set_member_status(&arn, MemberStatus::CreateFailed);
        }
    }
    // Creation hints are meaningless once table creation was attempted.
    if let Some(member) = candidate.members.get_mut(&arn) {
        member.discard_creation_hints();
    }

    Some(candidate)
}
