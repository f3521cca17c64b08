use crr_config::shared::RetryConfig;
use tracing::{debug, info};

use crate::provision::ResourceProvisioner;
use crate::store::MetadataStore;
use crate::transition::apply::ApplyError;
use crate::transition::classify::{GroupTransition, TransitionError, classify_member_change, diff_members};
use crate::transition::{deletion, member_direct, member_priority};
use crate::types::ReplicationGroup;

/// Handles the ACTIVE -> UPDATING flip.
///
/// The flip may carry a member change in the same write; when it does, the
/// change is classified like any standalone member event and handled here.
/// A bare flip needs no action, member edits follow in later writes.
pub(crate) async fn update_started<S, P>(
    old: &ReplicationGroup,
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
    info!(uuid, "replication group update started");

    let mut changes = diff_members(old, new);
    if changes.len() > 1 {
        return Err(TransitionError::MultipleMemberChanges {
            uuid: uuid.to_owned(),
            count: changes.len(),
        }
        .into());
    }
    let Some((arn, change)) = changes.pop() else {
        debug!(uuid, "update carries no member change yet");
        return Ok(());
    };

    match classify_member_change(old, new, arn, change)? {
        GroupTransition::MemberPriority { new, arn } => {
            member_priority::member_priority(&new, &arn, store, provisioner, retry).await
        }
        GroupTransition::MemberDirect { old, new, arn } => {
            member_direct::member_direct(&old, &new, &arn, store, provisioner, retry).await
        }
        GroupTransition::DeletionStarted { new } => {
            deletion::deletion_started(&new, store, provisioner, retry).await
        }
        transition => {
            debug!(uuid, %transition, "member change needs no convergence");
            Ok(())
        }
    }
}
