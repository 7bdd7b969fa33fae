//! Driving port for relationship mutations.
//!
//! Every operation acts on behalf of `acting_user` towards `other_user` and
//! returns the relationship status after the transition. Failed transitions
//! surface as domain errors with conflict / forbidden / not-found codes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, RelationshipStatus, UserId};

/// A mutation request naming the two users involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipActionRequest {
    /// The authenticated user performing the action.
    pub acting_user: UserId,
    /// The user the action is directed at.
    pub other_user: UserId,
}

/// Relationship status after a successful mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipActionResponse {
    /// Status between the two users after the transition.
    pub status: RelationshipStatus,
}

/// Driving port for relationship write operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RelationshipCommand: Send + Sync {
    /// Send a friend request from the acting user.
    async fn send_request(
        &self,
        request: RelationshipActionRequest,
    ) -> Result<RelationshipActionResponse, Error>;

    /// Accept a pending request directed at the acting user.
    async fn accept_request(
        &self,
        request: RelationshipActionRequest,
    ) -> Result<RelationshipActionResponse, Error>;

    /// Decline a pending request directed at the acting user.
    async fn decline_request(
        &self,
        request: RelationshipActionRequest,
    ) -> Result<RelationshipActionResponse, Error>;

    /// Remove an accepted friendship, or cancel a pending request the acting
    /// user sent.
    async fn remove_friend(
        &self,
        request: RelationshipActionRequest,
    ) -> Result<RelationshipActionResponse, Error>;

    /// Block the other user, overwriting any non-blocked state.
    async fn block_user(
        &self,
        request: RelationshipActionRequest,
    ) -> Result<RelationshipActionResponse, Error>;

    /// Lift a block the acting user placed.
    async fn unblock_user(
        &self,
        request: RelationshipActionRequest,
    ) -> Result<RelationshipActionResponse, Error>;
}
