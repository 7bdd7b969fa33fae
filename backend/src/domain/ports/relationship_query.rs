//! Driving port for relationship reads.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, RelationshipStatus, RelationshipTally, User, UserId};

/// A directory entry annotated with its relationship to the querying user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserMatch {
    /// The matched user.
    pub user: User,
    /// Relationship status towards the querying user.
    pub status: RelationshipStatus,
}

/// Driving port for relationship read operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RelationshipQuery: Send + Sync {
    /// Relationship status between two users. Symmetric in its arguments.
    async fn status_between(
        &self,
        user_a: &UserId,
        user_b: &UserId,
    ) -> Result<RelationshipStatus, Error>;

    /// Accepted friends of the user.
    async fn list_friends(&self, user: &UserId) -> Result<Vec<User>, Error>;

    /// Users whose pending requests await this user's response.
    async fn list_pending(&self, user: &UserId) -> Result<Vec<User>, Error>;

    /// Users this user has sent still-pending requests to.
    async fn list_sent(&self, user: &UserId) -> Result<Vec<User>, Error>;

    /// Users this user has blocked.
    async fn list_blocked(&self, user: &UserId) -> Result<Vec<User>, Error>;

    /// Tally of the user's edges for the friends screen header.
    async fn friend_stats(&self, user: &UserId) -> Result<RelationshipTally, Error>;

    /// Directory search annotated with relationship status towards the
    /// querying user.
    async fn search_users(
        &self,
        user: &UserId,
        term: &str,
    ) -> Result<Vec<UserMatch>, Error>;
}
