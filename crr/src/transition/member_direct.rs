use std::collections::BTreeSet;

use crr_config::shared::RetryConfig;
use tracing::{debug, error, info, warn};

use crate::provision::{ProvisionError, ResourceProvisioner};
use crate::store::MetadataStore;
use crate::transition::apply::{
    ApplyError, Backoff, delete_connectors, launch_connectors, read_current, write_record,
    write_succeeded,
};
use crate::transition::classify::TransitionError;
use crate::types::{ConnectorDescription, GroupStatus, MemberStatus, ReplicationGroup, TableArn};

/// Acts directly on a member that finished or requested a step: a completed
/// or cancelled bootstrap, a member marked for removal, or a connector set
/// change.
///
/// The event only identifies the member; the step is recomputed from the
/// current record, and a member whose status already moved on degrades to a
/// no-op.
pub(crate) async fn member_direct<S, P>(
    old: &ReplicationGroup,
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

    let Some(event_member) = new.members.get(arn) else {
        return member_removed(new, arn, store, retry).await;
    };
    let target = event_member.status;
    debug!(uuid, table = %arn, status = %target, "processing direct member change");

    let mut backoff = Backoff::new(retry);
    loop {
        let Some(current) = read_current(store, uuid, retry).await? else {
            debug!(uuid, "group record no longer exists, nothing to do");
            return Ok(());
        };
        if matches!(current.status, GroupStatus::Active | GroupStatus::Deleting) {
            debug!(uuid, status = %current.status, "group state leaves no member step to take");
            return Ok(());
        }
        let Some(member) = current.members.get(arn) else {
            debug!(uuid, table = %arn, "member already removed, nothing to do");
            return Ok(());
        };
        if member.status != target {
            debug!(uuid, table = %arn, status = %member.status, "member moved past {target}, nothing to do");
            return Ok(());
        }
        let member = member.clone();

        let mut candidate = current.clone();
        match target {
            MemberStatus::BootstrapCancelled => {
                match provisioner.delete_bootstrap_task(arn).await {
                    Ok(()) => {
                        info!(uuid, table = %arn, "cancelled bootstrap cleaned up, member removed");
                        candidate.members.remove(arn);
                    }
                    Err(err) => {
                        error!(uuid, table = %arn, error = %err, "bootstrap cleanup failed");
                        candidate.set_member_status(arn, MemberStatus::DeleteFailed);
                    }
                }
            }
            MemberStatus::BootstrapComplete => {
                let step: Result<(), ProvisionError> = async {
                    provisioner.delete_bootstrap_task(arn).await?;
                    launch_connectors(provisioner, &member).await
                }
                .await;
                match step {
                    Ok(()) => {
                        info!(uuid, table = %arn, "bootstrapped member activated");
                        candidate.set_member_status(arn, MemberStatus::Active);
                    }
                    Err(err) => {
                        error!(uuid, table = %arn, error = %err, "member activation failed");
                        candidate.set_member_status(arn, MemberStatus::CreateFailed);
                    }
                }
            }
            MemberStatus::Deleting => {
                // A running bootstrap must be cancelled externally first.
                match provisioner.bootstrap_task_exists(arn).await {
                    Ok(true) => {
                        info!(uuid, table = %arn, "waiting for bootstrap cancellation");
                        return Ok(());
                    }
                    Ok(false) => {}
                    Err(err) => {
                        warn!(uuid, table = %arn, error = %err, "could not check bootstrap task");
                        return Ok(());
                    }
                }
                match delete_connectors(provisioner, &member).await {
                    Ok(()) => {
                        info!(uuid, table = %arn, "member torn down and removed");
                        candidate.members.remove(arn);
                    }
                    Err(err) => {
                        error!(uuid, table = %arn, error = %err, "member teardown failed");
                        candidate.set_member_status(arn, MemberStatus::DeleteFailed);
                    }
                }
            }
            MemberStatus::Updating => {
                let previous: BTreeSet<ConnectorDescription> = old
                    .members
                    .get(arn)
                    .map(|m| m.connectors.iter().cloned().collect())
                    .unwrap_or_default();
                let desired: BTreeSet<ConnectorDescription> =
                    member.connectors.iter().cloned().collect();
                if previous == desired {
                    return Err(TransitionError::UnchangedConnectors { arn: arn.clone() }.into());
                }

                let step: Result<(), ProvisionError> = async {
                    for added in desired.difference(&previous) {
                        provisioner.launch_connector(&member, added).await?;
                    }
                    for removed in previous.difference(&desired) {
                        provisioner.delete_connector(&member, removed).await?;
                    }
                    Ok(())
                }
                .await;
                match step {
                    Ok(()) => {
                        info!(uuid, table = %arn, "member connector set updated");
                        candidate.set_member_status(arn, MemberStatus::Active);
                    }
                    Err(err) => {
                        error!(uuid, table = %arn, error = %err, "connector update failed");
                        candidate.set_member_status(arn, MemberStatus::UpdateFailed);
                    }
                }
            }
            other => {
                // Classification never routes other statuses here.
                debug!(uuid, table = %arn, status = %other, "no direct step for member status");
                return Ok(());
            }
        }

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

/// A member left the group; if it was the last one still settling, the group
/// itself activates.
async fn member_removed<S: MetadataStore>(
    new: &ReplicationGroup,
    arn: &TableArn,
    store: &S,
    retry: &RetryConfig,
) -> Result<(), ApplyError> {
    let uuid = new.uuid.as_str();
    debug!(uuid, table = %arn, "member removed from group");

    let mut backoff = Backoff::new(retry);
    loop {
        let Some(current) = read_current(store, uuid, retry).await? else {
            return Ok(());
        };
        if matches!(current.status, GroupStatus::Active | GroupStatus::Deleting) {
            return Ok(());
        }
        if current.members.contains_key(arn) {
            debug!(uuid, table = %arn, "member is back in the group, nothing to do");
            return Ok(());
        }
        if !current.all_members_in(MemberStatus::Active) {
            debug!(uuid, "remaining members still settling");
            return Ok(());
        }

        let mut candidate = current.clone();
        candidate.status = GroupStatus::Active;

        let result = write_record(store, Some(&current), Some(&candidate), retry).await?;
        if write_succeeded(result.as_ref(), Some(&candidate)) {
            info!(uuid, "all remaining members active, group activated");
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
