//! Relationship graph primitives.
//!
//! The graph stores exactly one edge per unordered pair of users. The pair is
//! kept canonical (`lower < upper` by UUID ordering) so mirrored rows cannot
//! exist, and the `initiator` column recovers direction semantics for pending
//! requests and blocks.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::UserId;

/// Error raised when a user is paired with themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfRelationshipError;

impl fmt::Display for SelfRelationshipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a user cannot have a relationship with themselves")
    }
}

impl std::error::Error for SelfRelationshipError {}

/// Canonical unordered pair of distinct users.
///
/// ## Invariants
/// - The two ids are distinct.
/// - `lower` sorts strictly before `upper` by UUID ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    lower: UserId,
    upper: UserId,
}

impl PairKey {
    /// Canonicalize two user ids into a pair key.
    ///
    /// The argument order does not matter; `new(a, b)` and `new(b, a)` yield
    /// equal keys.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::{PairKey, UserId};
    ///
    /// let a = UserId::random();
    /// let b = UserId::random();
    /// let forward = PairKey::new(a.clone(), b.clone()).expect("distinct users");
    /// let reverse = PairKey::new(b, a).expect("distinct users");
    /// assert_eq!(forward, reverse);
    /// ```
    pub fn new(a: UserId, b: UserId) -> Result<Self, SelfRelationshipError> {
        if a == b {
            return Err(SelfRelationshipError);
        }
        if a.as_uuid() < b.as_uuid() {
            Ok(Self { lower: a, upper: b })
        } else {
            Ok(Self { lower: b, upper: a })
        }
    }

    /// The id sorting first in the canonical ordering.
    pub fn lower(&self) -> &UserId {
        &self.lower
    }

    /// The id sorting last in the canonical ordering.
    pub fn upper(&self) -> &UserId {
        &self.upper
    }

    /// Whether the pair involves the given user.
    pub fn contains(&self, user: &UserId) -> bool {
        &self.lower == user || &self.upper == user
    }

    /// The counterpart of the given user, if the user is part of the pair.
    pub fn other(&self, user: &UserId) -> Option<&UserId> {
        if user == &self.lower {
            Some(&self.upper)
        } else if user == &self.upper {
            Some(&self.lower)
        } else {
            None
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.lower, self.upper)
    }
}

/// Persisted state of a relationship edge.
///
/// Absence of an edge means no relationship; a declined request collapses
/// back to absence rather than being stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipState {
    /// A request awaiting the non-initiator's response.
    Pending,
    /// Both parties are friends.
    Accepted,
    /// The initiator has blocked the other party.
    Blocked,
}

/// Relationship status between two users as seen by queries.
///
/// Extends [`RelationshipState`] with `None` for "no edge exists". `None` is
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    /// No relationship exists between the two users.
    None,
    /// A request awaiting a response.
    Pending,
    /// The two users are friends.
    Accepted,
    /// One party has blocked the other.
    Blocked,
}

impl From<RelationshipState> for RelationshipStatus {
    fn from(state: RelationshipState) -> Self {
        match state {
            RelationshipState::Pending => Self::Pending,
            RelationshipState::Accepted => Self::Accepted,
            RelationshipState::Blocked => Self::Blocked,
        }
    }
}

impl From<Option<RelationshipState>> for RelationshipStatus {
    fn from(state: Option<RelationshipState>) -> Self {
        state.map_or(Self::None, Into::into)
    }
}

/// A single relationship record between two users.
///
/// ## Invariants
/// - `initiator` is one of the two users in `pair`.
/// - For [`RelationshipState::Pending`] the initiator is the requester; for
///   [`RelationshipState::Blocked`] it is the blocker. For
///   [`RelationshipState::Accepted`] it records the original requester and
///   carries no authorization meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipEdge {
    pair: PairKey,
    state: RelationshipState,
    initiator: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Error raised when an edge's initiator is not part of its pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiatorOutsidePairError;

impl fmt::Display for InitiatorOutsidePairError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edge initiator must be one of the paired users")
    }
}

impl std::error::Error for InitiatorOutsidePairError {}

impl RelationshipEdge {
    /// Build an edge, enforcing that the initiator belongs to the pair.
    pub fn new(
        pair: PairKey,
        state: RelationshipState,
        initiator: UserId,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, InitiatorOutsidePairError> {
        if !pair.contains(&initiator) {
            return Err(InitiatorOutsidePairError);
        }
        Ok(Self {
            pair,
            state,
            initiator,
            created_at,
            updated_at,
        })
    }

    /// The canonical pair this edge connects.
    pub fn pair(&self) -> &PairKey {
        &self.pair
    }

    /// Current persisted state.
    pub fn state(&self) -> RelationshipState {
        self.state
    }

    /// The user who performed the current directional action.
    pub fn initiator(&self) -> &UserId {
        &self.initiator
    }

    /// When the edge was first created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the edge last changed state.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether the given user initiated the current state.
    pub fn initiated_by(&self, user: &UserId) -> bool {
        &self.initiator == user
    }

    /// The counterpart of the given user on this edge.
    pub fn other_of(&self, user: &UserId) -> Option<&UserId> {
        self.pair.other(user)
    }
}

/// Per-user tally of relationship edges, grouped the way the friends screen
/// presents them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipTally {
    /// Accepted friendships.
    pub friends: u64,
    /// Pending requests awaiting this user's response.
    pub pending_received: u64,
    /// Pending requests this user sent.
    pub pending_sent: u64,
    /// Users this user has blocked.
    pub blocked: u64,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    fn pair() -> (UserId, UserId, PairKey) {
        let a = UserId::random();
        let b = UserId::random();
        let key = PairKey::new(a.clone(), b.clone()).expect("distinct users");
        (a, b, key)
    }

    #[rstest]
    fn pair_key_is_order_insensitive() {
        let (a, b, key) = pair();
        let mirrored = PairKey::new(b, a).expect("distinct users");
        assert_eq!(key, mirrored);
        assert!(key.lower().as_uuid() < key.upper().as_uuid());
    }

    #[rstest]
    fn pair_key_rejects_self_pairs() {
        let a = UserId::random();
        assert_eq!(PairKey::new(a.clone(), a), Err(SelfRelationshipError));
    }

    #[rstest]
    fn pair_key_resolves_the_counterpart() {
        let (a, b, key) = pair();
        assert_eq!(key.other(&a), Some(&b));
        assert_eq!(key.other(&b), Some(&a));
        assert_eq!(key.other(&UserId::random()), None);
    }

    #[rstest]
    fn edge_rejects_foreign_initiators() {
        let (_, _, key) = pair();
        let now = Utc::now();
        let result = RelationshipEdge::new(
            key,
            RelationshipState::Pending,
            UserId::random(),
            now,
            now,
        );
        assert_eq!(result, Err(InitiatorOutsidePairError));
    }

    #[rstest]
    fn edge_reports_direction() {
        let (a, b, key) = pair();
        let now = Utc::now();
        let edge = RelationshipEdge::new(key, RelationshipState::Pending, a.clone(), now, now)
            .expect("initiator in pair");
        assert!(edge.initiated_by(&a));
        assert!(!edge.initiated_by(&b));
        assert_eq!(edge.other_of(&a), Some(&b));
    }

    #[rstest]
    fn missing_edges_map_to_status_none() {
        assert_eq!(RelationshipStatus::from(None), RelationshipStatus::None);
        assert_eq!(
            RelationshipStatus::from(Some(RelationshipState::Accepted)),
            RelationshipStatus::Accepted
        );
    }
}
