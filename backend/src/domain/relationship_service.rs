//! Relationship state machine service.
//!
//! Applies the friend-request state machine on top of the relationship
//! repository and enforces transition legality. Mutations are race-safe: the
//! repository's insert and compare-and-set primitives settle concurrent
//! transitions, and a missed compare-and-set is re-read and reported as the
//! conflict the concurrent winner implies.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::warn;

use crate::domain::ports::{
    EdgeChange, EdgeInsert, NotificationQueue, RelationshipActionRequest,
    RelationshipActionResponse, RelationshipCommand, RelationshipQuery, RelationshipRepository,
    RelationshipRepositoryError, UserDirectory, UserDirectoryError, UserMatch,
};
use crate::domain::retry::retry_once;
use crate::domain::{
    Error, NotificationIntent, PairKey, RelationshipEdge, RelationshipState, RelationshipStatus,
    RelationshipTally, User, UserId,
};

/// Maximum number of matches returned by the friend search.
const SEARCH_LIMIT: i64 = 20;

fn map_repository_error(error: RelationshipRepositoryError) -> Error {
    match error {
        RelationshipRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("relationship repository unavailable: {message}"))
        }
        RelationshipRepositoryError::Query { message } => {
            Error::internal(format!("relationship repository error: {message}"))
        }
    }
}

fn map_directory_error(error: UserDirectoryError) -> Error {
    match error {
        UserDirectoryError::Connection { message } => {
            Error::service_unavailable(format!("user directory unavailable: {message}"))
        }
        UserDirectoryError::Query { message } => {
            Error::internal(format!("user directory error: {message}"))
        }
    }
}

fn is_transient(error: &RelationshipRepositoryError) -> bool {
    matches!(error, RelationshipRepositoryError::Connection { .. })
}

fn pair_of(request: &RelationshipActionRequest) -> Result<PairKey, Error> {
    PairKey::new(request.acting_user.clone(), request.other_user.clone())
        .map_err(|err| Error::invalid_request(err.to_string()))
}

/// Relationship engine implementing the command and query driving ports.
#[derive(Clone)]
pub struct RelationshipService<R, D, N> {
    relationship_repo: Arc<R>,
    directory: Arc<D>,
    notifications: Arc<N>,
    clock: Arc<dyn Clock>,
}

impl<R, D, N> RelationshipService<R, D, N> {
    /// Create a new service over the repository, directory, and queue ports.
    pub fn new(
        relationship_repo: Arc<R>,
        directory: Arc<D>,
        notifications: Arc<N>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            relationship_repo,
            directory,
            notifications,
            clock,
        }
    }
}

impl<R, D, N> RelationshipService<R, D, N>
where
    R: RelationshipRepository,
    D: UserDirectory,
    N: NotificationQueue,
{
    async fn fetch_edge(&self, pair: &PairKey) -> Result<Option<RelationshipEdge>, Error> {
        retry_once(is_transient, || self.relationship_repo.find(pair))
            .await
            .map_err(map_repository_error)
    }

    /// Re-read the pair after a missed compare-and-set and report the
    /// conflict the concurrent winner implies.
    async fn race_error(&self, pair: &PairKey) -> Error {
        let status = match self.fetch_edge(pair).await {
            Ok(edge) => RelationshipStatus::from(edge.map(|e| e.state())),
            Err(error) => return error,
        };
        match status {
            RelationshipStatus::None => Error::not_found("the relationship no longer exists"),
            RelationshipStatus::Pending => Error::conflict("a friend request is already pending"),
            RelationshipStatus::Accepted => Error::conflict("already friends"),
            RelationshipStatus::Blocked => Error::conflict("relationship is blocked"),
        }
    }

    async fn notify(&self, intent: NotificationIntent) {
        // Best effort: the triggering mutation has already committed.
        if let Err(error) = self.notifications.enqueue(&intent).await {
            warn!(recipient = %intent.recipient(), %error, "notification intent dropped");
        }
    }

    async fn resolve_users(&self, ids: Vec<UserId>) -> Result<Vec<User>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.directory
            .find_by_ids(&ids)
            .await
            .map_err(map_directory_error)
    }

    async fn list_counterparts(
        &self,
        user: &UserId,
        state: RelationshipState,
        keep: impl Fn(&RelationshipEdge) -> bool,
    ) -> Result<Vec<User>, Error> {
        let edges = retry_once(is_transient, || {
            self.relationship_repo.list_for_user(user, state)
        })
        .await
        .map_err(map_repository_error)?;

        let ids = edges
            .iter()
            .filter(|edge| keep(edge))
            .filter_map(|edge| edge.other_of(user).cloned())
            .collect();
        self.resolve_users(ids).await
    }
}

#[async_trait]
impl<R, D, N> RelationshipCommand for RelationshipService<R, D, N>
where
    R: RelationshipRepository,
    D: UserDirectory,
    N: NotificationQueue,
{
    async fn send_request(
        &self,
        request: RelationshipActionRequest,
    ) -> Result<RelationshipActionResponse, Error> {
        let pair = pair_of(&request)?;

        match self.fetch_edge(&pair).await?.map(|edge| edge.state()) {
            Some(RelationshipState::Pending) => {
                return Err(Error::conflict("a friend request is already pending"));
            }
            Some(RelationshipState::Accepted) => {
                return Err(Error::conflict("already friends"));
            }
            Some(RelationshipState::Blocked) => {
                return Err(Error::conflict("relationship is blocked"));
            }
            None => {}
        }

        let now = self.clock.utc();
        let edge = RelationshipEdge::new(
            pair.clone(),
            RelationshipState::Pending,
            request.acting_user.clone(),
            now,
            now,
        )
        .map_err(|err| Error::internal(err.to_string()))?;

        let inserted = retry_once(is_transient, || self.relationship_repo.try_insert(&edge))
            .await
            .map_err(map_repository_error)?;

        match inserted {
            EdgeInsert::Inserted => {
                self.notify(NotificationIntent::FriendRequestReceived {
                    to: request.other_user.clone(),
                    from: request.acting_user.clone(),
                })
                .await;
                Ok(RelationshipActionResponse {
                    status: RelationshipStatus::Pending,
                })
            }
            // Lost an insert race; report what the winner created.
            EdgeInsert::AlreadyExists => Err(self.race_error(&pair).await),
        }
    }

    async fn accept_request(
        &self,
        request: RelationshipActionRequest,
    ) -> Result<RelationshipActionResponse, Error> {
        let pair = pair_of(&request)?;

        let edge = self
            .fetch_edge(&pair)
            .await?
            .ok_or_else(|| Error::not_found("no pending friend request"))?;

        match edge.state() {
            RelationshipState::Pending => {}
            RelationshipState::Accepted => return Err(Error::conflict("already friends")),
            RelationshipState::Blocked => {
                return Err(Error::conflict("relationship is blocked"));
            }
        }
        if edge.initiated_by(&request.acting_user) {
            return Err(Error::forbidden(
                "only the recipient of a friend request can accept it",
            ));
        }

        let change = EdgeChange {
            state: RelationshipState::Accepted,
            initiator: edge.initiator().clone(),
            updated_at: self.clock.utc(),
        };
        let updated = retry_once(is_transient, || {
            self.relationship_repo
                .update_if_status(&pair, RelationshipState::Pending, &change)
        })
        .await
        .map_err(map_repository_error)?;

        if !updated {
            return Err(self.race_error(&pair).await);
        }

        self.notify(NotificationIntent::FriendRequestAccepted {
            to: edge.initiator().clone(),
            by: request.acting_user.clone(),
        })
        .await;

        Ok(RelationshipActionResponse {
            status: RelationshipStatus::Accepted,
        })
    }

    async fn decline_request(
        &self,
        request: RelationshipActionRequest,
    ) -> Result<RelationshipActionResponse, Error> {
        let pair = pair_of(&request)?;

        let edge = self
            .fetch_edge(&pair)
            .await?
            .ok_or_else(|| Error::not_found("no pending friend request"))?;

        match edge.state() {
            RelationshipState::Pending => {}
            RelationshipState::Accepted => return Err(Error::conflict("already friends")),
            RelationshipState::Blocked => {
                return Err(Error::conflict("relationship is blocked"));
            }
        }
        if edge.initiated_by(&request.acting_user) {
            return Err(Error::forbidden(
                "only the recipient of a friend request can decline it",
            ));
        }

        let deleted = retry_once(is_transient, || {
            self.relationship_repo
                .delete_if_status(&pair, RelationshipState::Pending)
        })
        .await
        .map_err(map_repository_error)?;

        if !deleted {
            return Err(self.race_error(&pair).await);
        }

        // Declines are transient: the requester may resend later.
        Ok(RelationshipActionResponse {
            status: RelationshipStatus::None,
        })
    }

    async fn remove_friend(
        &self,
        request: RelationshipActionRequest,
    ) -> Result<RelationshipActionResponse, Error> {
        let pair = pair_of(&request)?;

        let edge = self
            .fetch_edge(&pair)
            .await?
            .ok_or_else(|| Error::not_found("no friendship or request to remove"))?;

        let removed = match edge.state() {
            // Removing a friendship cascades collaborator cleanup.
            RelationshipState::Accepted => {
                retry_once(is_transient, || self.relationship_repo.remove_accepted(&pair))
                    .await
                    .map_err(map_repository_error)?
            }
            // Either side may withdraw a pending request: the sender cancels,
            // the recipient discards.
            RelationshipState::Pending => {
                retry_once(is_transient, || {
                    self.relationship_repo
                        .delete_if_status(&pair, RelationshipState::Pending)
                })
                .await
                .map_err(map_repository_error)?
            }
            RelationshipState::Blocked => {
                return Err(Error::conflict("relationship is blocked"));
            }
        };

        if !removed {
            return Err(self.race_error(&pair).await);
        }

        Ok(RelationshipActionResponse {
            status: RelationshipStatus::None,
        })
    }

    async fn block_user(
        &self,
        request: RelationshipActionRequest,
    ) -> Result<RelationshipActionResponse, Error> {
        let pair = pair_of(&request)?;

        if let Some(edge) = self.fetch_edge(&pair).await?
            && edge.state() == RelationshipState::Blocked
        {
            return Err(Error::conflict("relationship is blocked"));
        }

        retry_once(is_transient, || {
            self.relationship_repo
                .overwrite_with_block(&pair, &request.acting_user, self.clock.utc())
        })
        .await
        .map_err(map_repository_error)?;

        Ok(RelationshipActionResponse {
            status: RelationshipStatus::Blocked,
        })
    }

    async fn unblock_user(
        &self,
        request: RelationshipActionRequest,
    ) -> Result<RelationshipActionResponse, Error> {
        let pair = pair_of(&request)?;

        let edge = self
            .fetch_edge(&pair)
            .await?
            .ok_or_else(|| Error::not_found("no block to lift"))?;

        if edge.state() != RelationshipState::Blocked {
            return Err(Error::not_found("no block to lift"));
        }
        if !edge.initiated_by(&request.acting_user) {
            return Err(Error::forbidden("only the blocker can lift a block"));
        }

        let deleted = retry_once(is_transient, || {
            self.relationship_repo
                .delete_if_status(&pair, RelationshipState::Blocked)
        })
        .await
        .map_err(map_repository_error)?;

        if !deleted {
            return Err(self.race_error(&pair).await);
        }

        Ok(RelationshipActionResponse {
            status: RelationshipStatus::None,
        })
    }
}

#[async_trait]
impl<R, D, N> RelationshipQuery for RelationshipService<R, D, N>
where
    R: RelationshipRepository,
    D: UserDirectory,
    N: NotificationQueue,
{
    async fn status_between(
        &self,
        user_a: &UserId,
        user_b: &UserId,
    ) -> Result<RelationshipStatus, Error> {
        let pair = PairKey::new(user_a.clone(), user_b.clone())
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let edge = self.fetch_edge(&pair).await?;
        Ok(RelationshipStatus::from(edge.map(|e| e.state())))
    }

    async fn list_friends(&self, user: &UserId) -> Result<Vec<User>, Error> {
        self.list_counterparts(user, RelationshipState::Accepted, |_| true)
            .await
    }

    async fn list_pending(&self, user: &UserId) -> Result<Vec<User>, Error> {
        self.list_counterparts(user, RelationshipState::Pending, |edge| {
            !edge.initiated_by(user)
        })
        .await
    }

    async fn list_sent(&self, user: &UserId) -> Result<Vec<User>, Error> {
        self.list_counterparts(user, RelationshipState::Pending, |edge| {
            edge.initiated_by(user)
        })
        .await
    }

    async fn list_blocked(&self, user: &UserId) -> Result<Vec<User>, Error> {
        // Only blocks the user placed; being blocked stays invisible.
        self.list_counterparts(user, RelationshipState::Blocked, |edge| {
            edge.initiated_by(user)
        })
        .await
    }

    async fn friend_stats(&self, user: &UserId) -> Result<RelationshipTally, Error> {
        retry_once(is_transient, || self.relationship_repo.count_for_user(user))
            .await
            .map_err(map_repository_error)
    }

    async fn search_users(&self, user: &UserId, term: &str) -> Result<Vec<UserMatch>, Error> {
        let term = term.trim();
        if term.is_empty() {
            return Err(Error::invalid_request("search term must not be empty"));
        }

        let matches = self
            .directory
            .search(term, SEARCH_LIMIT)
            .await
            .map_err(map_directory_error)?;

        let mut annotated = Vec::with_capacity(matches.len());
        for candidate in matches {
            if candidate.id() == user {
                continue;
            }
            let status = self.status_between(user, candidate.id()).await?;
            annotated.push(UserMatch {
                user: candidate,
                status,
            });
        }
        Ok(annotated)
    }
}

#[cfg(test)]
#[path = "relationship_service_tests.rs"]
mod tests;
