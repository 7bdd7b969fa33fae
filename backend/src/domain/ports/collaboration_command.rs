//! Driving port for the collaboration fan-out engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{CollaborationOptions, CollaborationOutcome, Error, UserId};

/// Request to attach invitees to a deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCollaboratorsRequest {
    /// The deadline being shared.
    pub deadline_id: Uuid,
    /// The authenticated user; must be the deadline owner.
    pub acting_user: UserId,
    /// Proposed collaborators. Deduplicated before processing, preserving
    /// first occurrence order.
    pub invitee_ids: Vec<UserId>,
    /// Fan-out options.
    pub options: CollaborationOptions,
}

/// Driving port for collaboration write operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollaborationCommand: Send + Sync {
    /// Attach each eligible invitee to the deadline, materializing copies and
    /// enqueueing notification intents per the request options.
    ///
    /// Invitees are processed independently: one invitee's skip or failure
    /// never aborts the others, and an all-skipped invocation returns
    /// normally with `success == false`.
    async fn add_collaborators(
        &self,
        request: AddCollaboratorsRequest,
    ) -> Result<CollaborationOutcome, Error>;
}
