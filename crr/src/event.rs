//! Ordered change events over group records and their processing.

use crr_config::shared::RetryConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::provision::ResourceProvisioner;
use crate::store::MetadataStore;
use crate::transition::{ApplyError, TransitionError, apply_transition, classify};
use crate::types::ReplicationGroup;

/// One ordered change to a group record, as captured from the metadata
/// store's change stream.
///
/// Images are carried as raw JSON and decoded lazily, so a single malformed
/// record poisons only its own event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Stream position, used for acknowledgement and logging only.
    pub sequence_number: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_image: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_image: Option<serde_json::Value>,
}

impl ChangeEvent {
    /// Decodes the record images carried by this event.
    pub fn images(
        &self,
    ) -> Result<(Option<ReplicationGroup>, Option<ReplicationGroup>), serde_json::Error> {
        let old = self
            .old_image
            .clone()
            .map(serde_json::from_value)
            .transpose()?;
        let new = self
            .new_image
            .clone()
            .map(serde_json::from_value)
            .transpose()?;

        Ok((old, new))
    }
}

/// Errors raised while processing a single change event.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("failed to decode record image: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Apply(#[from] ApplyError),
}

/// Drives replication groups towards their desired state, one change event
/// at a time.
///
/// Events must be fed in stream order per group. Processing is idempotent,
/// so redelivering an already-processed event is safe.
#[derive(Debug, Clone)]
pub struct EventProcessor<S, P> {
    store: S,
    provisioner: P,
    retry: RetryConfig,
}

impl<S, P> EventProcessor<S, P>
where
    S: MetadataStore,
    P: ResourceProvisioner,
{
    pub fn new(store: S, provisioner: P, retry: RetryConfig) -> Self {
        Self {
            store,
            provisioner,
            retry,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn provisioner(&self) -> &P {
        &self.provisioner
    }

    /// Classifies and converges one change event.
    pub async fn process_event(&self, event: &ChangeEvent) -> Result<(), EventError> {
        let (old, new) = event.images()?;
        let transition = classify(old.as_ref(), new.as_ref())?;
        debug!(
            sequence = %event.sequence_number,
            uuid = transition.uuid(),
            %transition,
            "classified change event"
        );

        apply_transition(&transition, &self.store, &self.provisioner, &self.retry).await?;

        Ok(())
    }

    /// Processes events in order, stopping at the first failure.
    ///
    /// Returns the number of events processed; callers acknowledge exactly
    /// that prefix and redeliver the rest.
    pub async fn process_batch(&self, events: &[ChangeEvent]) -> (usize, Option<EventError>) {
        for (processed, event) in events.iter().enumerate() {
            if let Err(err) = self.process_event(event).await {
                error!(
                    sequence = %event.sequence_number,
                    error = %err,
                    "event processing failed"
                );
                return (processed, Some(err));
            }
        }

        (events.len(), None)
    }
}
