use std::fmt;

use thiserror::Error;

use crate::types::{GroupStatus, MemberStatus, ReplicationGroup, TableArn};

/// Errors raised while classifying a pair of record images.
///
/// Classification failures are caller bugs or corrupted records, never
/// retryable conditions; the offending event is rejected.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("change event carries neither an old nor a new record image")]
    MissingImages,

    #[error("record images carry different uuids: {old} and {new}")]
    UuidMismatch { old: String, new: String },

    #[error("replication group record {uuid} is structurally invalid")]
    InvalidGroup { uuid: String },

    #[error("group {uuid} was inserted with status {status}, expected CREATING")]
    IllegalInsertStatus { uuid: String, status: GroupStatus },

    #[error("group {uuid} was deleted while in status {status}, expected DELETING")]
    IllegalDeleteStatus { uuid: String, status: GroupStatus },

    #[error("group {uuid} was deleted while a member was not DELETING")]
    IllegalDeleteMemberStatus { uuid: String },

    #[error(
        "group {uuid} changed an immutable field (key schema, attribute definitions or connector type)"
    )]
    ImmutableFieldChanged { uuid: String },

    #[error("group {uuid} was marked ACTIVE while a member was not ACTIVE")]
    IllegalCompletionMemberStatus { uuid: String },

    #[error("group {uuid} began updating with no member change pending")]
    UpdateWithoutPendingMembers { uuid: String },

    #[error("illegal group status transition for {uuid}: {from} -> {to}")]
    IllegalGroupTransition {
        uuid: String,
        from: GroupStatus,
        to: GroupStatus,
    },

    #[error("illegal member status transition for {arn}: {from} -> {to}")]
    IllegalMemberTransition {
        arn: TableArn,
        from: MemberStatus,
        to: MemberStatus,
    },

    #[error("member {arn} was added with status {status}, expected CREATING")]
    IllegalMemberAddition { arn: TableArn, status: MemberStatus },

    #[error("member {arn} was removed while in status {status}")]
    IllegalMemberRemoval { arn: TableArn, status: MemberStatus },

    #[error("member {arn} changed without a status change")]
    MemberChangedWithoutStatus { arn: TableArn },

    #[error("event for group {uuid} changes {count} members, expected exactly one")]
    MultipleMemberChanges { uuid: String, count: usize },

    #[error("event for group {uuid} carries no observable change")]
    NoObservableChange { uuid: String },

    #[error("member {arn} is updating but its connector set is unchanged")]
    UnchangedConnectors { arn: TableArn },
}

/// How a single member differs between two record images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberChange {
    Added { status: MemberStatus },
    Removed { status: MemberStatus },
    Modified { from: MemberStatus, to: MemberStatus },
}

/// A classified change to a replication group record.
///
/// Group-level status flips classify by the status pair alone; events that
/// keep the status stable classify by the single member they change. Member
/// transitions split into two groups: those advanced through the priority
/// scheduler (the member contends with its peers for the next provisioning
/// slot) and those acted on directly.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupTransition {
    /// The record was inserted with status CREATING.
    CreationStarted { new: ReplicationGroup },
    /// The group moved CREATING -> ACTIVE. Logging only.
    CreationCompleted { new: ReplicationGroup },
    /// The group moved to DELETING, or changed while already DELETING.
    DeletionStarted { new: ReplicationGroup },
    /// The record was deleted. Logging only.
    DeletionCompleted { old: ReplicationGroup },
    /// The group moved ACTIVE -> UPDATING, possibly with a member change in
    /// the same write.
    UpdateStarted {
        old: ReplicationGroup,
        new: ReplicationGroup,
    },
    /// The group moved UPDATING -> ACTIVE. Logging only.
    UpdateCompleted { new: ReplicationGroup },
    /// A member changed into a status advanced via the priority scheduler.
    MemberPriority {
        new: ReplicationGroup,
        arn: TableArn,
    },
    /// A member changed into a status acted on directly, or was removed.
    MemberDirect {
        old: ReplicationGroup,
        new: ReplicationGroup,
        arn: TableArn,
    },
}

impl GroupTransition {
    /// Uuid of the group the transition concerns.
    pub fn uuid(&self) -> &str {
        match self {
            Self::CreationStarted { new }
            | Self::CreationCompleted { new }
            | Self::DeletionStarted { new }
            | Self::UpdateStarted { new, .. }
            | Self::UpdateCompleted { new }
            | Self::MemberPriority { new, .. }
            | Self::MemberDirect { new, .. } => &new.uuid,
            Self::DeletionCompleted { old } => &old.uuid,
        }
    }
}

impl fmt::Display for GroupTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreationStarted { .. } => "creation started",
            Self::CreationCompleted { .. } => "creation completed",
            Self::DeletionStarted { .. } => "deletion started",
            Self::DeletionCompleted { .. } => "deletion completed",
            Self::UpdateStarted { .. } => "update started",
            Self::UpdateCompleted { .. } => "update completed",
            Self::MemberPriority { .. } => "member change (priority)",
            Self::MemberDirect { .. } => "member change (direct)",
        };
        f.write_str(name)
    }
}

/// Computes the per-member differences between two images of the same group.
///
/// A member that changed in any field reports as `Modified` even when its
/// status is stable; validation rejects such changes later.
pub fn diff_members(
    old: &ReplicationGroup,
    new: &ReplicationGroup,
) -> Vec<(TableArn, MemberChange)> {
    let mut changes = Vec::new();

    for (arn, old_member) in &old.members {
        match new.members.get(arn) {
            None => changes.push((arn.clone(), MemberChange::Removed {
                status: old_member.status,
            })),
            Some(new_member) if new_member != old_member => {
                changes.push((arn.clone(), MemberChange::Modified {
                    from: old_member.status,
                    to: new_member.status,
                }));
            }
            Some(_) => {}
        }
    }

    for (arn, new_member) in &new.members {
        if !old.members.contains_key(arn) {
            changes.push((arn.clone(), MemberChange::Added {
                status: new_member.status,
            }));
        }
    }

    changes
}

/// Statuses a member may be moved into from each current status.
fn is_legal_member_transition(from: MemberStatus, to: MemberStatus) -> bool {
    use MemberStatus::*;

    match to {
        // CREATING is an initial status, never a destination.
        Creating => false,
        Waiting => matches!(from, Creating),
        Bootstrapping => matches!(from, Waiting | BootstrapFailed),
        BootstrapFailed => matches!(from, Bootstrapping),
        BootstrapCancelled => matches!(from, Bootstrapping | Waiting | Deleting),
        BootstrapComplete => matches!(from, Bootstrapping | Waiting),
        Active => matches!(from, Waiting | BootstrapComplete | Updating),
        Updating => matches!(from, Active),
        UpdateFailed => matches!(from, Updating),
        CreateFailed => matches!(from, Creating | Waiting),
        // Any member can be marked for removal.
        Deleting => true,
        DeleteFailed => matches!(from, Deleting),
    }
}

/// Validates a single member change.
///
/// Group-level deletion tears members down regardless of their status, so
/// removal checks are skipped when the group is DELETING.
pub(crate) fn validate_member_change(
    arn: &TableArn,
    change: MemberChange,
    group_deleting: bool,
) -> Result<(), TransitionError> {
    match change {
        MemberChange::Added { status } => {
            if status != MemberStatus::Creating {
                return Err(TransitionError::IllegalMemberAddition {
                    arn: arn.clone(),
                    status,
                });
            }
        }
        MemberChange::Removed { status } => {
            if !group_deleting
                && !matches!(
                    status,
                    MemberStatus::Deleting | MemberStatus::BootstrapCancelled
                )
            {
                return Err(TransitionError::IllegalMemberRemoval {
                    arn: arn.clone(),
                    status,
                });
            }
        }
        MemberChange::Modified { from, to } => {
            if from == to {
                return Err(TransitionError::MemberChangedWithoutStatus { arn: arn.clone() });
            }
            if !group_deleting && !is_legal_member_transition(from, to) {
                return Err(TransitionError::IllegalMemberTransition {
                    arn: arn.clone(),
                    from,
                    to,
                });
            }
        }
    }

    Ok(())
}

/// Whether a member moved into `status` is advanced via the priority
/// scheduler rather than acted on directly.
fn routes_to_priority(status: MemberStatus) -> bool {
    use MemberStatus::*;

    matches!(
        status,
        Active | Bootstrapping | Waiting | CreateFailed | BootstrapFailed | UpdateFailed
            | DeleteFailed
    )
}

/// Builds the transition for a validated single member change.
pub(crate) fn classify_member_change(
    old: &ReplicationGroup,
    new: &ReplicationGroup,
    arn: TableArn,
    change: MemberChange,
) -> Result<GroupTransition, TransitionError> {
    let group_deleting = new.status == GroupStatus::Deleting;
    validate_member_change(&arn, change, group_deleting)?;

    // While the group is deleting, every member change re-drives teardown.
    if group_deleting {
        return Ok(GroupTransition::DeletionStarted { new: new.clone() });
    }

    let transition = match change {
        MemberChange::Added { .. } => GroupTransition::MemberPriority {
            new: new.clone(),
            arn,
        },
        MemberChange::Removed { .. } => GroupTransition::MemberDirect {
            old: old.clone(),
            new: new.clone(),
            arn,
        },
        MemberChange::Modified { to, .. } if routes_to_priority(to) => {
            GroupTransition::MemberPriority {
                new: new.clone(),
                arn,
            }
        }
        MemberChange::Modified { .. } => GroupTransition::MemberDirect {
            old: old.clone(),
            new: new.clone(),
            arn,
        },
    };

    Ok(transition)
}

fn ensure_members_active(group: &ReplicationGroup) -> Result<(), TransitionError> {
    if !group.all_members_in(MemberStatus::Active) {
        return Err(TransitionError::IllegalCompletionMemberStatus {
            uuid: group.uuid.clone(),
        });
    }

    Ok(())
}

fn ensure_valid(group: &ReplicationGroup) -> Result<(), TransitionError> {
    if !group.is_valid() {
        return Err(TransitionError::InvalidGroup {
            uuid: group.uuid.clone(),
        });
    }

    Ok(())
}

/// Classifies an ordered pair of record images into a [`GroupTransition`].
pub fn classify(
    old: Option<&ReplicationGroup>,
    new: Option<&ReplicationGroup>,
) -> Result<GroupTransition, TransitionError> {
    match (old, new) {
        (None, None) => Err(TransitionError::MissingImages),
        (None, Some(new)) => {
            ensure_valid(new)?;
            if new.status != GroupStatus::Creating {
                return Err(TransitionError::IllegalInsertStatus {
                    uuid: new.uuid.clone(),
                    status: new.status,
                });
            }

            Ok(GroupTransition::CreationStarted { new: new.clone() })
        }
        (Some(old), None) => {
            if old.status != GroupStatus::Deleting {
                return Err(TransitionError::IllegalDeleteStatus {
                    uuid: old.uuid.clone(),
                    status: old.status,
                });
            }
            // A forceful external delete with members still live would leak
            // their provisioned resources.
            if !old.all_members_in(MemberStatus::Deleting) {
                return Err(TransitionError::IllegalDeleteMemberStatus {
                    uuid: old.uuid.clone(),
                });
            }

            Ok(GroupTransition::DeletionCompleted { old: old.clone() })
        }
        (Some(old), Some(new)) => {
            if old.uuid != new.uuid {
                return Err(TransitionError::UuidMismatch {
                    old: old.uuid.clone(),
                    new: new.uuid.clone(),
                });
            }
            ensure_valid(old)?;
            ensure_valid(new)?;

            // The schema and topology of a group are fixed at creation.
            if old.key_schema != new.key_schema
                || old.attribute_definitions != new.attribute_definitions
                || old.connector_type != new.connector_type
            {
                return Err(TransitionError::ImmutableFieldChanged {
                    uuid: new.uuid.clone(),
                });
            }

            if old.status != new.status {
                return classify_status_change(old, new);
            }

            let mut changes = diff_members(old, new);
            match changes.len() {
                0 => Err(TransitionError::NoObservableChange {
                    uuid: new.uuid.clone(),
                }),
                1 => {
                    // Validated length above, pop cannot fail.
                    let Some((arn, change)) = changes.pop() else {
                        return Err(TransitionError::NoObservableChange {
                            uuid: new.uuid.clone(),
                        });
                    };
                    classify_member_change(old, new, arn, change)
                }
                count => Err(TransitionError::MultipleMemberChanges {
                    uuid: new.uuid.clone(),
                    count,
                }),
            }
        }
    }
}

fn classify_status_change(
    old: &ReplicationGroup,
    new: &ReplicationGroup,
) -> Result<GroupTransition, TransitionError> {
    use GroupStatus::*;

    match (old.status, new.status) {
        // A completed group must not leave members behind in a non-terminal
        // status.
        (Creating, Active) => {
            ensure_members_active(new)?;
            Ok(GroupTransition::CreationCompleted { new: new.clone() })
        }
        (Updating, Active) => {
            ensure_members_active(new)?;
            Ok(GroupTransition::UpdateCompleted { new: new.clone() })
        }
        (Active, Updating) => {
            let pending = new.members.values().any(|m| {
                matches!(
                    m.status,
                    MemberStatus::Creating | MemberStatus::Updating | MemberStatus::Deleting
                )
            });
            let removed = old.members.keys().any(|arn| !new.members.contains_key(arn));
            if !pending && !removed {
                return Err(TransitionError::UpdateWithoutPendingMembers {
                    uuid: new.uuid.clone(),
                });
            }

            Ok(GroupTransition::UpdateStarted {
                old: old.clone(),
                new: new.clone(),
            })
        }
        (Creating | Active | Updating, Deleting) => {
            Ok(GroupTransition::DeletionStarted { new: new.clone() })
        }
        (from, to) => Err(TransitionError::IllegalGroupTransition {
            uuid: new.uuid.clone(),
            from,
            to,
        }),
    }
}
