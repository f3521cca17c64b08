//! Classification coverage over the full member status matrix.

mod support;

use std::collections::BTreeSet;

use crr::transition::{GroupTransition, TransitionError, classify};
use crr::types::{GroupStatus, MemberStatus};

use crate::support::{arn, group, master_member};

const UUID: &str = "c0ffee00-aaaa-bbbb-cccc-000000000001";

const ALL_STATUSES: [MemberStatus; 12] = [
    MemberStatus::Creating,
    MemberStatus::CreateFailed,
    MemberStatus::Waiting,
    MemberStatus::Bootstrapping,
    MemberStatus::BootstrapFailed,
    MemberStatus::BootstrapCancelled,
    MemberStatus::BootstrapComplete,
    MemberStatus::Active,
    MemberStatus::Updating,
    MemberStatus::UpdateFailed,
    MemberStatus::Deleting,
    MemberStatus::DeleteFailed,
];

/// Every member status move a caller or coordinator may legally write.
fn legal_member_moves() -> BTreeSet<(String, String)> {
    use MemberStatus::*;

    let mut legal = BTreeSet::new();
    let mut insert = |from: MemberStatus, to: MemberStatus| {
        legal.insert((from.to_string(), to.to_string()));
    };

    insert(Creating, Waiting);
    insert(Creating, CreateFailed);
    insert(Waiting, CreateFailed);
    insert(Waiting, Bootstrapping);
    insert(BootstrapFailed, Bootstrapping);
    insert(Bootstrapping, BootstrapFailed);
    insert(Bootstrapping, BootstrapCancelled);
    insert(Waiting, BootstrapCancelled);
    insert(Deleting, BootstrapCancelled);
    insert(Bootstrapping, BootstrapComplete);
    insert(Waiting, BootstrapComplete);
    insert(Waiting, Active);
    insert(BootstrapComplete, Active);
    insert(Updating, Active);
    insert(Active, Updating);
    insert(Updating, UpdateFailed);
    insert(Deleting, DeleteFailed);
    for from in ALL_STATUSES {
        insert(from, Deleting);
    }

    legal
}

#[test]
fn member_status_matrix_matches_legality_table() {
    let legal = legal_member_moves();

    for from in ALL_STATUSES {
        for to in ALL_STATUSES {
            if from == to {
                continue;
            }

            let mut before = master_member("us-east-1", "orders-east");
            before.status = from;
            let old = group(UUID, GroupStatus::Updating, vec![before]);
            let mut new = old.clone();
            new.set_member_status(&arn("us-east-1", "orders-east"), to);

            let result = classify(Some(&old), Some(&new));
            let expected_legal = legal.contains(&(from.to_string(), to.to_string()));
            match result {
                Ok(_) => {
                    assert!(expected_legal, "{from} -> {to} classified but should be illegal")
                }
                Err(TransitionError::IllegalMemberTransition { .. }) => {
                    assert!(!expected_legal, "{from} -> {to} rejected but should be legal")
                }
                Err(other) => panic!("{from} -> {to} failed unexpectedly: {other}"),
            }
        }
    }
}

#[test]
fn priority_and_direct_routing_splits_by_target_status() {
    use MemberStatus::*;

    let direct_targets = [BootstrapCancelled, BootstrapComplete, Deleting, Updating];

    for (from, to) in [
        (Creating, Waiting),
        (Waiting, Bootstrapping),
        (Bootstrapping, BootstrapFailed),
        (Waiting, Active),
        (Creating, CreateFailed),
        (Updating, UpdateFailed),
        (Deleting, DeleteFailed),
        (Bootstrapping, BootstrapCancelled),
        (Bootstrapping, BootstrapComplete),
        (Active, Deleting),
        (Active, Updating),
    ] {
        let mut before = master_member("us-east-1", "orders-east");
        before.status = from;
        let old = group(UUID, GroupStatus::Updating, vec![before]);
        let mut new = old.clone();
        new.set_member_status(&arn("us-east-1", "orders-east"), to);

        let transition = classify(Some(&old), Some(&new)).unwrap();
        if direct_targets.contains(&to) {
            assert!(
                matches!(transition, GroupTransition::MemberDirect { .. }),
                "{from} -> {to} should route direct"
            );
        } else {
            assert!(
                matches!(transition, GroupTransition::MemberPriority { .. }),
                "{from} -> {to} should route through the priority scheduler"
            );
        }
    }
}

#[test]
fn deleting_group_routes_all_member_changes_to_deletion() {
    let mut before = master_member("us-east-1", "orders-east");
    before.status = MemberStatus::Bootstrapping;
    let old = group(UUID, GroupStatus::Deleting, vec![before]);

    // Even a status move that is illegal outside deletion re-drives teardown.
    let mut new = old.clone();
    new.set_member_status(&arn("us-east-1", "orders-east"), MemberStatus::Active);
    assert!(matches!(
        classify(Some(&old), Some(&new)).unwrap(),
        GroupTransition::DeletionStarted { .. }
    ));

    let mut new = old.clone();
    new.members.clear();
    assert!(matches!(
        classify(Some(&old), Some(&new)).unwrap(),
        GroupTransition::DeletionStarted { .. }
    ));
}

#[test]
fn uuid_mismatch_is_rejected() {
    let old = group(UUID, GroupStatus::Active, vec![]);
    let mut new = old.clone();
    new.uuid = "deadbeef-aaaa-bbbb-cccc-000000000002".into();
    assert!(matches!(
        classify(Some(&old), Some(&new)),
        Err(TransitionError::UuidMismatch { .. })
    ));
}

#[test]
fn structurally_invalid_record_is_rejected() {
    let mut new = group(UUID, GroupStatus::Creating, vec![]);
    new.attribute_definitions.clear();
    assert!(matches!(
        classify(None, Some(&new)),
        Err(TransitionError::InvalidGroup { .. })
    ));
}
