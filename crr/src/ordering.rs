//! Deterministic member orderings used to pick the next member to advance.

use std::cmp::Ordering;

use crate::types::GroupMember;

/// Scheduling order for members contending for the next provisioning step.
///
/// Members that need no bootstrap sort before members with a table-copy task,
/// and among those, members without connectors sort before members with
/// connectors; remaining ties break by ARN. Light members are fast-tracked to
/// ACTIVE before members requiring heavier provisioning.
pub fn creating_priority(a: &GroupMember, b: &GroupMember) -> Ordering {
    // `false < true`, so "has no task" wins.
    let by_task = a.has_table_copy_task().cmp(&b.has_table_copy_task());
    if by_task != Ordering::Equal {
        return by_task;
    }

    let by_connectors = a.has_connectors().cmp(&b.has_connectors());
    if by_connectors != Ordering::Equal {
        return by_connectors;
    }

    a.arn.cmp(&b.arn)
}

/// Picks the highest-priority member from `candidates` under
/// [`creating_priority`].
pub fn head_by_creating_priority<'a, I>(candidates: I) -> Option<&'a GroupMember>
where
    I: IntoIterator<Item = &'a GroupMember>,
{
    candidates.into_iter().min_by(|a, b| creating_priority(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConnectorDescription, MemberStatus, TableCopyTask};

    fn member(name: &str, task: bool, connectors: usize) -> GroupMember {
        let source_arn = "arn:aws:dynamodb:us-west-2:123456789012:table/source"
            .parse()
            .unwrap();
        GroupMember {
            arn: format!("arn:aws:dynamodb:us-east-1:123456789012:table/{name}")
                .parse()
                .unwrap(),
            endpoint: "dynamodb.us-east-1.amazonaws.com".into(),
            streams_enabled: true,
            status: MemberStatus::Creating,
            table_copy_task: task.then(|| TableCopyTask {
                source_arn,
                source_endpoint: "dynamodb.us-west-2.amazonaws.com".into(),
            }),
            connectors: (0..connectors)
                .map(|_| ConnectorDescription {
                    source_arn: "arn:aws:dynamodb:us-west-2:123456789012:table/source"
                        .parse()
                        .unwrap(),
                    source_endpoint: "dynamodb.us-west-2.amazonaws.com".into(),
                })
                .collect(),
            provisioned_throughput: None,
            secondary_indexes: Vec::new(),
        }
    }

    #[test]
    fn bare_members_sort_first() {
        let a = member("aaa", false, 0);
        let b = member("bbb", true, 0);
        let c = member("ccc", true, 1);

        assert_eq!(creating_priority(&a, &b), Ordering::Less);
        assert_eq!(creating_priority(&b, &c), Ordering::Less);
        assert_eq!(creating_priority(&a, &c), Ordering::Less);
    }

    #[test]
    fn arn_breaks_remaining_ties() {
        let a = member("aaa", true, 1);
        let b = member("bbb", true, 1);
        assert_eq!(creating_priority(&a, &b), Ordering::Less);
        assert_eq!(creating_priority(&b, &a), Ordering::Greater);
        assert_eq!(creating_priority(&a, &a.clone()), Ordering::Equal);
    }

    #[test]
    fn head_prefers_member_with_least_work() {
        let members = vec![member("ccc", true, 1), member("bbb", true, 0), member("aaa", false, 1)];
        let head = head_by_creating_priority(members.iter()).unwrap();
        assert_eq!(head.arn.table_name(), "aaa");
    }
}
