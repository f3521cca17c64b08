use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{GroupMember, MemberStatus, TableArn};

/// Lifecycle status of a replication group.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupStatus {
    Creating,
    Active,
    Updating,
    Deleting,
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Creating => "CREATING",
            Self::Active => "ACTIVE",
            Self::Updating => "UPDATING",
            Self::Deleting => "DELETING",
        };
        f.write_str(name)
    }
}

/// Replication topology driven by the group's connectors.
///
/// Immutable after group creation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectorType {
    SingleMasterToReadReplica,
}

/// One element of a table's key schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchemaElement {
    pub attribute_name: String,
    pub key_type: String,
}

/// Declared attribute of a table's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub attribute_name: String,
    pub attribute_type: String,
}

/// Durable desired-state record for one replication group.
///
/// The `version` field drives compare-and-swap writes in the metadata store
/// and is deliberately excluded from equality: two records differing only in
/// version carry the same desired state and diff as unchanged.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct ReplicationGroup {
    /// Immutable key of the group record.
    pub uuid: String,
    pub name: String,

    /// Immutable after creation.
    pub key_schema: Vec<KeySchemaElement>,
    /// Immutable after creation.
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// Immutable after creation.
    pub connector_type: ConnectorType,

    pub status: GroupStatus,

    /// Monotonic record version used for optimistic concurrency.
    #[serde(default)]
    pub version: u64,

    /// Members keyed by their ARN; the map order doubles as the by-ARN
    /// member ordering.
    #[serde(default)]
    pub members: BTreeMap<TableArn, GroupMember>,
}

impl PartialEq for ReplicationGroup {
    fn eq(&self, other: &ReplicationGroup) -> bool {
        self.uuid == other.uuid
            && self.name == other.name
            && self.key_schema == other.key_schema
            && self.attribute_definitions == other.attribute_definitions
            && self.connector_type == other.connector_type
            && self.status == other.status
            && self.members == other.members
    }
}

impl ReplicationGroup {
    /// A group is valid when its identity and schema are present and every
    /// member is valid under its own key.
    pub fn is_valid(&self) -> bool {
        !self.uuid.is_empty()
            && !self.key_schema.is_empty()
            && !self.attribute_definitions.is_empty()
            && self
                .members
                .iter()
                .all(|(arn, member)| *arn == member.arn && member.is_valid())
    }

    /// Returns the number of members currently in `status`.
    pub fn count_members_in(&self, status: MemberStatus) -> usize {
        self.members
            .values()
            .filter(|member| member.status == status)
            .count()
    }

    /// Returns `true` when every member is in `status`. Vacuously true for an
    /// empty group.
    pub fn all_members_in(&self, status: MemberStatus) -> bool {
        self.members.values().all(|member| member.status == status)
    }

    /// Sets the status of the member stored under `arn`, if present.
    pub fn set_member_status(&mut self, arn: &TableArn, status: MemberStatus) {
        if let Some(member) = self.members.get_mut(arn) {
            member.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arn(name: &str) -> TableArn {
        format!("arn:aws:dynamodb:us-east-1:123456789012:table/{name}")
            .parse()
            .unwrap()
    }

    fn member(name: &str) -> GroupMember {
        GroupMember {
            arn: arn(name),
            endpoint: "dynamodb.us-east-1.amazonaws.com".into(),
            streams_enabled: true,
            status: MemberStatus::Creating,
            table_copy_task: None,
            connectors: Vec::new(),
            provisioned_throughput: None,
            secondary_indexes: Vec::new(),
        }
    }

    fn group() -> ReplicationGroup {
        ReplicationGroup {
            uuid: "c0ffee00-aaaa-bbbb-cccc-000000000001".into(),
            name: "orders".into(),
            key_schema: vec![KeySchemaElement {
                attribute_name: "id".into(),
                key_type: "HASH".into(),
            }],
            attribute_definitions: vec![AttributeDefinition {
                attribute_name: "id".into(),
                attribute_type: "S".into(),
            }],
            connector_type: ConnectorType::SingleMasterToReadReplica,
            status: GroupStatus::Creating,
            version: 1,
            members: BTreeMap::new(),
        }
    }

    #[test]
    fn version_is_excluded_from_equality() {
        let a = group();
        let mut b = a.clone();
        b.version = 42;
        assert_eq!(a, b);

        b.status = GroupStatus::Active;
        assert_ne!(a, b);
    }

    #[test]
    fn member_key_must_match_member_arn() {
        let mut g = group();
        g.members.insert(arn("orders-east"), member("orders-east"));
        assert!(g.is_valid());

        g.members.insert(arn("orders-west"), member("orders-east"));
        assert!(!g.is_valid());
    }

    #[test]
    fn empty_schema_is_invalid() {
        let mut g = group();
        g.key_schema.clear();
        assert!(!g.is_valid());
    }

    #[test]
    fn status_round_trips_screaming_snake_case() {
        let json = serde_json::to_string(&MemberStatus::BootstrapComplete).unwrap();
        assert_eq!(json, "\"BOOTSTRAP_COMPLETE\"");
        let back: MemberStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MemberStatus::BootstrapComplete);
    }
}
