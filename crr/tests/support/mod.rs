//! Shared builders and a replay harness for coordinator integration tests.

#![allow(dead_code)]

use crr::event::{ChangeEvent, EventError, EventProcessor};
use crr::provision::MemoryResourceProvisioner;
use crr::store::{MemoryMetadataStore, MetadataStore};
use crr::types::{
    AttributeDefinition, ConnectorDescription, ConnectorType, GroupMember, GroupStatus,
    KeySchemaElement, MemberStatus, ReplicationGroup, TableArn, TableCopyTask,
};
use crr_config::shared::RetryConfig;

pub const ACCOUNT: &str = "123456789012";

/// Fresh group record uuid, one per test group.
pub fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn arn(region: &str, name: &str) -> TableArn {
    format!("arn:aws:dynamodb:{region}:{ACCOUNT}:table/{name}")
        .parse()
        .unwrap()
}

pub fn endpoint(region: &str) -> String {
    format!("dynamodb.{region}.amazonaws.com")
}

/// A member created empty in its region: no bootstrap copy, no incoming
/// connectors.
pub fn master_member(region: &str, name: &str) -> GroupMember {
    GroupMember {
        arn: arn(region, name),
        endpoint: endpoint(region),
        streams_enabled: true,
        status: MemberStatus::Creating,
        table_copy_task: None,
        connectors: Vec::new(),
        provisioned_throughput: None,
        secondary_indexes: Vec::new(),
    }
}

/// A member bootstrapped from `source` and fed by a connector from it.
pub fn replica_member(region: &str, name: &str, source_region: &str, source: &str) -> GroupMember {
    GroupMember {
        arn: arn(region, name),
        endpoint: endpoint(region),
        streams_enabled: false,
        status: MemberStatus::Creating,
        table_copy_task: Some(TableCopyTask {
            source_arn: arn(source_region, source),
            source_endpoint: endpoint(source_region),
        }),
        connectors: vec![ConnectorDescription {
            source_arn: arn(source_region, source),
            source_endpoint: endpoint(source_region),
        }],
        provisioned_throughput: None,
        secondary_indexes: Vec::new(),
    }
}

pub fn group(uuid: &str, status: GroupStatus, members: Vec<GroupMember>) -> ReplicationGroup {
    ReplicationGroup {
        uuid: uuid.into(),
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
        status,
        version: 0,
        members: members.into_iter().map(|m| (m.arn.clone(), m)).collect(),
    }
}

pub fn test_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 5,
        initial_delay_ms: 1,
        max_delay_ms: 5,
        backoff_factor: 2.0,
    }
}

pub fn event(
    sequence: u64,
    old: Option<&ReplicationGroup>,
    new: Option<&ReplicationGroup>,
) -> ChangeEvent {
    ChangeEvent {
        sequence_number: sequence.to_string(),
        old_image: old.map(|g| serde_json::to_value(g).unwrap()),
        new_image: new.map(|g| serde_json::to_value(g).unwrap()),
    }
}

/// Replays the change stream a metadata store would emit.
///
/// Tracks the last observed record per test group and synthesizes the change
/// event for every store write, feeding events back to the processor until
/// the record stops changing. Caller writes (the control-plane API in a real
/// deployment) go through [`Harness::caller_insert`] and
/// [`Harness::caller_update`].
pub struct Harness {
    pub processor: EventProcessor<MemoryMetadataStore, MemoryResourceProvisioner>,
    last: Option<ReplicationGroup>,
    sequence: u64,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            processor: EventProcessor::new(
                MemoryMetadataStore::new(),
                MemoryResourceProvisioner::new(),
                test_retry(),
            ),
            last: None,
            sequence: 0,
        }
    }

    pub fn store(&self) -> &MemoryMetadataStore {
        self.processor.store()
    }

    pub fn provisioner(&self) -> &MemoryResourceProvisioner {
        self.processor.provisioner()
    }

    /// Inserts a fresh group record, as the control plane would.
    pub async fn caller_insert(&self, group: ReplicationGroup) {
        self.store().insert_group(group).await;
    }

    /// Installs a record as already-settled history: no change event is
    /// synthesized for it.
    pub async fn seed(&mut self, group: ReplicationGroup) {
        self.store().insert_group(group.clone()).await;
        self.last = Some(group);
    }

    /// Edits the current group record in place, as the control plane would.
    pub async fn caller_update(&self, uuid: &str, edit: impl FnOnce(&mut ReplicationGroup)) {
        let mut current = self
            .store()
            .read_group(uuid)
            .await
            .unwrap()
            .expect("caller update requires an existing record");
        edit(&mut current);
        current.version += 1;
        self.store().insert_group(current).await;
    }

    /// Pumps change events until the record reaches a fixpoint.
    pub async fn drive(&mut self, uuid: &str) -> Result<(), EventError> {
        for _ in 0..64 {
            let current = self.store().read_group(uuid).await.unwrap();
            // Record equality ignores the version, so a settled record stops
            // the pump even after compare-and-swap bumps.
            if current == self.last {
                return Ok(());
            }

            let event = event(self.sequence, self.last.as_ref(), current.as_ref());
            self.sequence += 1;
            self.last = current;

            self.processor.process_event(&event).await?;
        }

        panic!("group {uuid} did not settle within the event budget");
    }
}
