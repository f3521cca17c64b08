use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::provision::base::{ProvisionError, ResourceProvisioner};
use crate::types::{ConnectorDescription, GroupMember, ReplicationGroup, TableArn};

/// Provisioner operation selector for failure injection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ProvisionerOp {
    CreateTable,
    LaunchBootstrap,
    DeleteBootstrap,
    DescribeBootstrap,
    LaunchConnector,
    DeleteConnector,
}

#[derive(Debug, Default)]
struct Inner {
    tables: BTreeSet<TableArn>,
    bootstrap_tasks: BTreeSet<TableArn>,
    connectors: BTreeMap<TableArn, BTreeSet<ConnectorDescription>>,
    failures: HashMap<ProvisionerOp, VecDeque<String>>,
}

impl Inner {
    fn take_failure(&mut self, op: ProvisionerOp) -> Option<String> {
        self.failures.get_mut(&op).and_then(VecDeque::pop_front)
    }
}

/// In-memory [`ResourceProvisioner`] recording what has been provisioned.
///
/// Backs local runs and tests. All operations are idempotent over the recorded
/// state, and any operation can be made to fail once via [`fail_next`].
///
/// [`fail_next`]: MemoryResourceProvisioner::fail_next
#[derive(Debug, Clone, Default)]
pub struct MemoryResourceProvisioner {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryResourceProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a failure for the next invocation of `op`.
    pub async fn fail_next(&self, op: ProvisionerOp, reason: &str) {
        let mut inner = self.inner.lock().await;
        inner.failures.entry(op).or_default().push_back(reason.into());
    }

    /// Marks a bootstrap task as already running. Test setup only.
    pub async fn insert_bootstrap_task(&self, arn: TableArn) {
        self.inner.lock().await.bootstrap_tasks.insert(arn);
    }

    pub async fn table_exists(&self, arn: &TableArn) -> bool {
        self.inner.lock().await.tables.contains(arn)
    }

    /// Snapshot of the connectors currently feeding `arn`.
    pub async fn connectors_into(&self, arn: &TableArn) -> BTreeSet<ConnectorDescription> {
        self.inner
            .lock()
            .await
            .connectors
            .get(arn)
            .cloned()
            .unwrap_or_default()
    }
}

impl ResourceProvisioner for MemoryResourceProvisioner {
    async fn create_table_if_not_exists(
        &self,
        _group: &ReplicationGroup,
        member: &GroupMember,
    ) -> Result<(), ProvisionError> {
        let mut inner = self.inner.lock().await;
        if let Some(reason) = inner.take_failure(ProvisionerOp::CreateTable) {
            return Err(ProvisionError::CreateTable {
                arn: member.arn.clone(),
                reason,
            });
        }

        inner.tables.insert(member.arn.clone());

        Ok(())
    }

    async fn launch_bootstrap_task(&self, member: &GroupMember) -> Result<(), ProvisionError> {
        let mut inner = self.inner.lock().await;
        if let Some(reason) = inner.take_failure(ProvisionerOp::LaunchBootstrap) {
            return Err(ProvisionError::LaunchBootstrap {
                arn: member.arn.clone(),
                reason,
            });
        }

        inner.bootstrap_tasks.insert(member.arn.clone());

        Ok(())
    }

    async fn delete_bootstrap_task(&self, arn: &TableArn) -> Result<(), ProvisionError> {
        let mut inner = self.inner.lock().await;
        if let Some(reason) = inner.take_failure(ProvisionerOp::DeleteBootstrap) {
            return Err(ProvisionError::DeleteBootstrap {
                arn: arn.clone(),
                reason,
            });
        }

        inner.bootstrap_tasks.remove(arn);

        Ok(())
    }

    async fn bootstrap_task_exists(&self, arn: &TableArn) -> Result<bool, ProvisionError> {
        let mut inner = self.inner.lock().await;
        if let Some(reason) = inner.take_failure(ProvisionerOp::DescribeBootstrap) {
            return Err(ProvisionError::DescribeBootstrap {
                arn: arn.clone(),
                reason,
            });
        }

        Ok(inner.bootstrap_tasks.contains(arn))
    }

    async fn launch_connector(
        &self,
        member: &GroupMember,
        connector: &ConnectorDescription,
    ) -> Result<(), ProvisionError> {
        let mut inner = self.inner.lock().await;
        if let Some(reason) = inner.take_failure(ProvisionerOp::LaunchConnector) {
            return Err(ProvisionError::LaunchConnector {
                arn: member.arn.clone(),
                reason,
            });
        }

        inner
            .connectors
            .entry(member.arn.clone())
            .or_default()
            .insert(connector.clone());

        Ok(())
    }

    async fn delete_connector(
        &self,
        member: &GroupMember,
        connector: &ConnectorDescription,
    ) -> Result<(), ProvisionError> {
        let mut inner = self.inner.lock().await;
        if let Some(reason) = inner.take_failure(ProvisionerOp::DeleteConnector) {
            return Err(ProvisionError::DeleteConnector {
                arn: member.arn.clone(),
                reason,
            });
        }

        if let Some(connectors) = inner.connectors.get_mut(&member.arn) {
            connectors.remove(connector);
            if connectors.is_empty() {
                inner.connectors.remove(&member.arn);
            }
        }

        Ok(())
    }
}
