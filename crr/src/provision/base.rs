use std::future::Future;

use thiserror::Error;

use crate::types::{ConnectorDescription, GroupMember, ReplicationGroup, TableArn};

/// Errors surfaced by a resource provisioner backend.
///
/// Each variant names the member table the operation was acting on. A failed
/// provisioning step never aborts convergence; the affected member is moved to
/// the matching failure status and the rest of the group keeps going.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to create table {arn}: {reason}")]
    CreateTable { arn: TableArn, reason: String },

    #[error("failed to launch bootstrap task for {arn}: {reason}")]
    LaunchBootstrap { arn: TableArn, reason: String },

    #[error("failed to delete bootstrap task for {arn}: {reason}")]
    DeleteBootstrap { arn: TableArn, reason: String },

    #[error("failed to check bootstrap task for {arn}: {reason}")]
    DescribeBootstrap { arn: TableArn, reason: String },

    #[error("failed to launch connector into {arn}: {reason}")]
    LaunchConnector { arn: TableArn, reason: String },

    #[error("failed to delete connector into {arn}: {reason}")]
    DeleteConnector { arn: TableArn, reason: String },
}

/// Side-effecting operations against the replicated infrastructure.
///
/// Every operation must be idempotent: the convergence loop re-applies
/// transitions after compare-and-swap conflicts and redelivered events, so
/// each call may be observed more than once for the same logical step.
pub trait ResourceProvisioner {
    /// Creates the member's table in its region using the group's schema, or
    /// does nothing if the table already exists.
    fn create_table_if_not_exists(
        &self,
        group: &ReplicationGroup,
        member: &GroupMember,
    ) -> impl Future<Output = Result<(), ProvisionError>> + Send;

    /// Starts the member's one-time table copy.
    fn launch_bootstrap_task(
        &self,
        member: &GroupMember,
    ) -> impl Future<Output = Result<(), ProvisionError>> + Send;

    /// Tears down the member's table copy task, running or finished. Deleting
    /// a task that does not exist is a success.
    fn delete_bootstrap_task(
        &self,
        arn: &TableArn,
    ) -> impl Future<Output = Result<(), ProvisionError>> + Send;

    /// Returns whether a table copy task currently exists for `arn`.
    fn bootstrap_task_exists(
        &self,
        arn: &TableArn,
    ) -> impl Future<Output = Result<bool, ProvisionError>> + Send;

    /// Starts a connector replicating from `connector.source_arn` into the
    /// member's table.
    fn launch_connector(
        &self,
        member: &GroupMember,
        connector: &ConnectorDescription,
    ) -> impl Future<Output = Result<(), ProvisionError>> + Send;

    /// Stops the connector replicating from `connector.source_arn` into the
    /// member's table. Deleting a connector that does not exist is a success.
    fn delete_connector(
        &self,
        member: &GroupMember,
        connector: &ConnectorDescription,
    ) -> impl Future<Output = Result<(), ProvisionError>> + Send;
}
