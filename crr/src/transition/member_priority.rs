use crr_config::shared::RetryConfig;
use tracing::{debug, error, info, warn};

use crate::ordering::head_by_creating_priority;
use crate::provision::ResourceProvisioner;
use crate::store::MetadataStore;
use crate::transition::apply::{
    ApplyError, Backoff, launch_connectors, read_current, write_record, write_succeeded,
};
use crate::types::{GroupStatus, MemberStatus, ReplicationGroup, TableArn};

/// Advances the group after a member change that feeds the priority
/// scheduler.
///
/// The triggering member only selects the event; the step taken is always
/// recomputed from the current record, so any coordinator instance can pick
/// up where another left off. One member advances at a time: the
/// highest-priority WAITING member starts its bootstrap or goes straight to
/// ACTIVE, and failing that, the next CREATING member gets its table.
pub(crate) async fn member_priority<S, P>(
    new: &ReplicationGroup,
    arn: &TableArn,
    store: &S,
    provisioner: &P,
    retry: &RetryConfig,
) -> Result<(), ApplyError>
where
    S: MetadataStore,
    P: ResourceProvisioner,
{
    let uuid = new.uuid.as_str();
    debug!(uuid, table = %arn, "processing member change through the priority scheduler");

    let mut backoff = Backoff::new(retry);
    loop {
        let Some(current) = read_current(store, uuid, retry).await? else {
            debug!(uuid, "group record no longer exists, nothing to do");
            return Ok(());
        };
        if matches!(current.status, GroupStatus::Active | GroupStatus::Deleting) {
            debug!(uuid, status = %current.status, "group needs no member scheduling");
            return Ok(());
        }

        // Failed members stay where they are until an external retry; a
        // failed bootstrap additionally leaves its task behind.
        if let Some(member) = current.members.get(arn) {
            if member.status.is_failure() {
                warn!(uuid, table = %arn, status = %member.status, "member failed, external retry required");
                if member.status == MemberStatus::BootstrapFailed
                    && let Err(err) = provisioner.delete_bootstrap_task(arn).await
                {
                    warn!(uuid, table = %arn, error = %err, "failed to clean up bootstrap task");
                }
            }
        }

        let Some(candidate) = next_activation_step(&current, provisioner).await else {
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
async fn next_activation_step<P: ResourceProvisioner>(
    current: &ReplicationGroup,
    provisioner: &P,
) -> Option<ReplicationGroup> {
    // Every member settled: the group itself activates. Vacuously true when
    // the last member was removed.
    if current.all_members_in(MemberStatus::Active) {
        let mut candidate = current.clone();
        candidate.status = GroupStatus::Active;
        return Some(candidate);
    }

    if let Some(head) = head_by_creating_priority(
        current
            .members
            .values()
            .filter(|m| m.status == MemberStatus::Waiting),
    ) {
        let head = head.clone();
        let mut candidate = current.clone();

        if head.has_table_copy_task() {
            // One bootstrap copy runs at a time.
            if current.count_members_in(MemberStatus::Bootstrapping) == 0 {
                match provisioner.launch_bootstrap_task(&head).await {
                    Ok(()) => {
                        info!(uuid = %current.uuid, table = %head.arn, "bootstrap task launched");
                        candidate.set_member_status(&head.arn, MemberStatus::Bootstrapping);
                    }
                    Err(err) => {
                        error!(uuid = %current.uuid, table = %head.arn, error = %err, "bootstrap launch failed");
                        candidate.set_member_status(&head.arn, MemberStatus::BootstrapFailed);
                    }
                }
                return Some(candidate);
            }
            // Bootstrap slot busy; fall through to table creation.
        } else {
            match launch_connectors(provisioner, &head).await {
                Ok(()) => {
                    info!(uuid = %current.uuid, table = %head.arn, "member connectors launched");
                    candidate.set_member_status(&head.arn, MemberStatus::Active);
                }
                Err(err) => {
                    error!(uuid = %current.uuid, table = %head.arn, error = %err, "connector launch failed");
                    candidate.set_member_status(&head.arn, MemberStatus::CreateFailed);
                }
            }
            return Some(candidate);
        }
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
    if let Some(member) = candidate.members.get_mut(&arn) {
        member.discard_creation_hints();
    }

    Some(candidate)
}
