use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::TableArn;

/// Lifecycle status of a single replication group member.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    /// Set by the caller when the member is first added; the coordinator has
    /// not created its table yet.
    Creating,

    /// Table creation failed; requires an external retry to recover.
    CreateFailed,

    /// Table exists, member is queued for bootstrap or activation.
    Waiting,

    /// A one-time table copy from the member's bootstrap source is running.
    Bootstrapping,

    /// The table copy failed; requires an external retry to recover.
    BootstrapFailed,

    /// The table copy was cancelled externally; the member is on its way out
    /// of the group.
    BootstrapCancelled,

    /// The table copy finished; connectors have not been launched yet.
    BootstrapComplete,

    /// Member is fully provisioned and replicating.
    Active,

    /// The member's connector set is being changed.
    Updating,

    /// The connector change failed; requires an external retry to recover.
    UpdateFailed,

    /// The member is being torn down and removed from the group.
    Deleting,

    /// Teardown failed; operator intervention required.
    DeleteFailed,
}

impl MemberStatus {
    /// Returns `true` for the terminal failure statuses a member can only
    /// leave through an external change event.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::CreateFailed | Self::BootstrapFailed | Self::UpdateFailed | Self::DeleteFailed
        )
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Creating => "CREATING",
            Self::CreateFailed => "CREATE_FAILED",
            Self::Waiting => "WAITING",
            Self::Bootstrapping => "BOOTSTRAPPING",
            Self::BootstrapFailed => "BOOTSTRAP_FAILED",
            Self::BootstrapCancelled => "BOOTSTRAP_CANCELLED",
            Self::BootstrapComplete => "BOOTSTRAP_COMPLETE",
            Self::Active => "ACTIVE",
            Self::Updating => "UPDATING",
            Self::UpdateFailed => "UPDATE_FAILED",
            Self::Deleting => "DELETING",
            Self::DeleteFailed => "DELETE_FAILED",
        };
        f.write_str(name)
    }
}

/// One-time copy of an existing source table into a new member, run before
/// the member joins live replication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCopyTask {
    pub source_arn: TableArn,
    pub source_endpoint: String,
}

/// A continuously-running process replicating live writes from a source
/// member into this member.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectorDescription {
    pub source_arn: TableArn,
    pub source_endpoint: String,
}

/// Provisioned read/write capacity requested for a member's table.
///
/// Only meaningful before the table is created; discarded afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedThroughputHint {
    pub read_capacity_units: u64,
    pub write_capacity_units: u64,
}

/// Secondary index requested for a member's table, pre-creation only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryIndexHint {
    pub index_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughputHint>,
}

/// One physical table replica of a replication group, keyed by its ARN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub arn: TableArn,
    pub endpoint: String,
    pub streams_enabled: bool,
    pub status: MemberStatus,

    /// Optional bootstrap copy run before the member joins live replication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_copy_task: Option<TableCopyTask>,

    /// Connectors feeding this member once it is active.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connectors: Vec<ConnectorDescription>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughputHint>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary_indexes: Vec<SecondaryIndexHint>,
}

impl GroupMember {
    /// A member is valid when its endpoint is present; the ARN is valid by
    /// construction.
    pub fn is_valid(&self) -> bool {
        !self.endpoint.is_empty()
    }

    pub fn has_table_copy_task(&self) -> bool {
        self.table_copy_task.is_some()
    }

    pub fn has_connectors(&self) -> bool {
        !self.connectors.is_empty()
    }

    /// Drops the table creation hints, which carry no meaning once the
    /// member's table exists.
    pub fn discard_creation_hints(&mut self) {
        self.provisioned_throughput = None;
        self.secondary_indexes.clear();
    }
}
