//! Port abstraction for relationship graph persistence.
//!
//! The repository owns the concurrency contract the relationship state
//! machine relies on (one edge per unordered pair, serialized transitions):
//!
//! - [`RelationshipRepository::try_insert`] races are settled by the unique
//!   pair index; exactly one concurrent insert observes [`EdgeInsert::Inserted`].
//! - [`RelationshipRepository::update_if_status`] and
//!   [`RelationshipRepository::delete_if_status`] are compare-and-set
//!   primitives; a `false` return means the edge changed underneath the
//!   caller (or never existed) and the caller must re-read to classify the
//!   conflict.
//! - [`RelationshipRepository::remove_accepted`] and
//!   [`RelationshipRepository::overwrite_with_block`] bundle the collaborator
//!   cascade into one transaction guarded by an advisory lock on the pair, so
//!   a relationship downgrade and its attachment cleanup are atomic.

use async_trait::async_trait;

use crate::domain::{
    PairKey, RelationshipEdge, RelationshipState, RelationshipTally, UserId,
};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by relationship repository adapters.
    pub enum RelationshipRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "relationship repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "relationship repository query failed: {message}",
    }
}

/// Result of attempting to insert a new edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeInsert {
    /// The edge was created.
    Inserted,
    /// An edge for the pair already exists; nothing was written.
    AlreadyExists,
}

/// Fields a compare-and-set update may change on an edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeChange {
    /// New persisted state.
    pub state: RelationshipState,
    /// New initiator for the state (the requester for pending, the blocker
    /// for blocked).
    pub initiator: UserId,
    /// Transition timestamp.
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Port for relationship edge storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RelationshipRepository: Send + Sync {
    /// Fetch the edge for a pair, if one exists.
    async fn find(
        &self,
        pair: &PairKey,
    ) -> Result<Option<RelationshipEdge>, RelationshipRepositoryError>;

    /// Insert a new edge unless one already exists for the pair.
    async fn try_insert(
        &self,
        edge: &RelationshipEdge,
    ) -> Result<EdgeInsert, RelationshipRepositoryError>;

    /// Update the edge if its current state matches `expected`.
    ///
    /// Returns `false` when no row matched, either because the edge is
    /// missing or because a concurrent transition won.
    async fn update_if_status(
        &self,
        pair: &PairKey,
        expected: RelationshipState,
        change: &EdgeChange,
    ) -> Result<bool, RelationshipRepositoryError>;

    /// Delete the edge if its current state matches `expected`.
    ///
    /// Returns `false` when no row matched.
    async fn delete_if_status(
        &self,
        pair: &PairKey,
        expected: RelationshipState,
    ) -> Result<bool, RelationshipRepositoryError>;

    /// Remove an accepted friendship and cascade collaborator cleanup.
    ///
    /// In one advisory-locked transaction: delete the edge (expected state
    /// accepted) and every collaborator attachment where one of the pair owns
    /// the deadline and the other is attached, in either direction. Copies
    /// already materialized as independent deadlines are left untouched.
    ///
    /// Returns `false` when the edge was not in the accepted state.
    async fn remove_accepted(&self, pair: &PairKey)
    -> Result<bool, RelationshipRepositoryError>;

    /// Overwrite the pair's edge with a block and cascade collaborator cleanup.
    ///
    /// In one advisory-locked transaction: upsert the edge to the blocked
    /// state with the given blocker as initiator (creating the edge when the
    /// pair had none), and delete collaborator attachments between the two
    /// users as for [`Self::remove_accepted`].
    async fn overwrite_with_block(
        &self,
        pair: &PairKey,
        blocker: &UserId,
        blocked_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), RelationshipRepositoryError>;

    /// List every edge involving the user in the given state.
    async fn list_for_user(
        &self,
        user: &UserId,
        state: RelationshipState,
    ) -> Result<Vec<RelationshipEdge>, RelationshipRepositoryError>;

    /// Tally the user's edges by state and direction.
    async fn count_for_user(
        &self,
        user: &UserId,
    ) -> Result<RelationshipTally, RelationshipRepositoryError>;
}
