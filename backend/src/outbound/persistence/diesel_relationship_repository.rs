//! PostgreSQL-backed `RelationshipRepository` implementation using Diesel ORM.
//!
//! One row per unordered pair, stored canonically (`user_a < user_b`).
//! Mutations that must serialize per pair take a transaction-scoped advisory
//! lock derived from the pair before touching the edge, which also makes the
//! collaborator cascade atomic with the edge change.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{
    EdgeChange, EdgeInsert, RelationshipRepository, RelationshipRepositoryError,
};
use crate::domain::{
    PairKey, RelationshipEdge, RelationshipState, RelationshipTally, UserId,
};

use super::models::{NewRelationshipRow, RelationshipRow, RelationshipUpdate};
use super::pool::{DbPool, PoolError};
use super::schema::{deadline_collaborators, deadlines, relationships};

/// Diesel-backed implementation of the `RelationshipRepository` port.
#[derive(Clone)]
pub struct DieselRelationshipRepository {
    pool: DbPool,
}

impl DieselRelationshipRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Map pool errors to domain relationship repository errors.
fn map_pool_error(error: PoolError) -> RelationshipRepositoryError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            RelationshipRepositoryError::connection(message)
        }
    }
}

/// Map Diesel errors to domain relationship repository errors.
fn map_diesel_error(error: diesel::result::Error) -> RelationshipRepositoryError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => RelationshipRepositoryError::query("record not found"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
            RelationshipRepositoryError::connection(info.message().to_owned())
        }
        DieselError::DatabaseError(_, info) => {
            RelationshipRepositoryError::query(info.message().to_owned())
        }
        _ => RelationshipRepositoryError::query("database error"),
    }
}

/// Persisted representation of an edge state.
pub(crate) fn state_to_str(state: RelationshipState) -> &'static str {
    match state {
        RelationshipState::Pending => "pending",
        RelationshipState::Accepted => "accepted",
        RelationshipState::Blocked => "blocked",
    }
}

fn state_from_str(raw: &str) -> Result<RelationshipState, RelationshipRepositoryError> {
    match raw {
        "pending" => Ok(RelationshipState::Pending),
        "accepted" => Ok(RelationshipState::Accepted),
        "blocked" => Ok(RelationshipState::Blocked),
        other => Err(RelationshipRepositoryError::query(format!(
            "unrecognised relationship status '{other}'"
        ))),
    }
}

/// Convert a database row to a domain edge.
fn row_to_edge(row: RelationshipRow) -> Result<RelationshipEdge, RelationshipRepositoryError> {
    let pair = PairKey::new(UserId::from_uuid(row.user_a), UserId::from_uuid(row.user_b))
        .map_err(|err| RelationshipRepositoryError::query(err.to_string()))?;
    let state = state_from_str(&row.status)?;
    RelationshipEdge::new(
        pair,
        state,
        UserId::from_uuid(row.initiator),
        row.created_at,
        row.updated_at,
    )
    .map_err(|err| RelationshipRepositoryError::query(err.to_string()))
}

/// Stable 64-bit advisory lock key for a canonical pair.
///
/// Derived from the raw UUID bytes only, so every process computes the same
/// key for the same pair. The rotation keeps `xor` from cancelling shared
/// prefixes between the two ids.
pub(crate) fn advisory_lock_key(pair: &PairKey) -> i64 {
    let a = u128::from_be_bytes(*pair.lower().as_uuid().as_bytes());
    let b = u128::from_be_bytes(*pair.upper().as_uuid().as_bytes());
    let mixed = a ^ b.rotate_left(1);
    let folded = u64::try_from(mixed >> 64).unwrap_or(u64::MAX)
        ^ u64::try_from(mixed & u128::from(u64::MAX)).unwrap_or(u64::MAX);
    i64::from_ne_bytes(folded.to_ne_bytes())
}

/// Take the transaction-scoped advisory lock for a pair.
async fn lock_pair(
    conn: &mut AsyncPgConnection,
    pair: &PairKey,
) -> Result<(), diesel::result::Error> {
    diesel::sql_query("SELECT pg_advisory_xact_lock($1)")
        .bind::<diesel::sql_types::BigInt, _>(advisory_lock_key(pair))
        .execute(conn)
        .await
        .map(|_| ())
}

/// Delete every collaborator attachment connecting the two users, in either
/// ownership direction. Copies already materialized as independent deadline
/// rows are left untouched.
async fn cascade_attachments(
    conn: &mut AsyncPgConnection,
    pair: &PairKey,
) -> Result<usize, diesel::result::Error> {
    let a = *pair.lower().as_uuid();
    let b = *pair.upper().as_uuid();

    let owned_by_b = deadlines::table
        .filter(deadlines::owner_id.eq(b))
        .select(deadlines::id);
    let owned_by_a = deadlines::table
        .filter(deadlines::owner_id.eq(a))
        .select(deadlines::id);

    diesel::delete(
        deadline_collaborators::table.filter(
            deadline_collaborators::user_id
                .eq(a)
                .and(deadline_collaborators::deadline_id.eq_any(owned_by_b))
                .or(deadline_collaborators::user_id
                    .eq(b)
                    .and(deadline_collaborators::deadline_id.eq_any(owned_by_a))),
        ),
    )
    .execute(conn)
    .await
}

#[async_trait]
impl RelationshipRepository for DieselRelationshipRepository {
    async fn find(
        &self,
        pair: &PairKey,
    ) -> Result<Option<RelationshipEdge>, RelationshipRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<RelationshipRow> = relationships::table
            .find((*pair.lower().as_uuid(), *pair.upper().as_uuid()))
            .select(RelationshipRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_edge).transpose()
    }

    async fn try_insert(
        &self,
        edge: &RelationshipEdge,
    ) -> Result<EdgeInsert, RelationshipRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let new_row = NewRelationshipRow {
            user_a: *edge.pair().lower().as_uuid(),
            user_b: *edge.pair().upper().as_uuid(),
            status: state_to_str(edge.state()),
            initiator: *edge.initiator().as_uuid(),
            created_at: edge.created_at(),
            updated_at: edge.updated_at(),
        };

        // The primary key settles concurrent inserts: exactly one wins.
        let inserted = diesel::insert_into(relationships::table)
            .values(&new_row)
            .on_conflict((relationships::user_a, relationships::user_b))
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        if inserted == 0 {
            Ok(EdgeInsert::AlreadyExists)
        } else {
            Ok(EdgeInsert::Inserted)
        }
    }

    async fn update_if_status(
        &self,
        pair: &PairKey,
        expected: RelationshipState,
        change: &EdgeChange,
    ) -> Result<bool, RelationshipRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let update = RelationshipUpdate {
            status: state_to_str(change.state),
            initiator: *change.initiator.as_uuid(),
            updated_at: change.updated_at,
        };

        let updated = diesel::update(
            relationships::table
                .find((*pair.lower().as_uuid(), *pair.upper().as_uuid()))
                .filter(relationships::status.eq(state_to_str(expected))),
        )
        .set(&update)
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        Ok(updated > 0)
    }

    async fn delete_if_status(
        &self,
        pair: &PairKey,
        expected: RelationshipState,
    ) -> Result<bool, RelationshipRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(
            relationships::table
                .find((*pair.lower().as_uuid(), *pair.upper().as_uuid()))
                .filter(relationships::status.eq(state_to_str(expected))),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        Ok(deleted > 0)
    }

    async fn remove_accepted(
        &self,
        pair: &PairKey,
    ) -> Result<bool, RelationshipRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let removed = conn
            .transaction(|conn| {
                async move {
                    lock_pair(conn, pair).await?;

                    let deleted = diesel::delete(
                        relationships::table
                            .find((*pair.lower().as_uuid(), *pair.upper().as_uuid()))
                            .filter(
                                relationships::status
                                    .eq(state_to_str(RelationshipState::Accepted)),
                            ),
                    )
                    .execute(conn)
                    .await?;

                    if deleted == 0 {
                        return Ok(false);
                    }

                    cascade_attachments(conn, pair).await?;
                    Ok(true)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        Ok(removed)
    }

    async fn overwrite_with_block(
        &self,
        pair: &PairKey,
        blocker: &UserId,
        blocked_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), RelationshipRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                lock_pair(conn, pair).await?;

                let new_row = NewRelationshipRow {
                    user_a: *pair.lower().as_uuid(),
                    user_b: *pair.upper().as_uuid(),
                    status: state_to_str(RelationshipState::Blocked),
                    initiator: *blocker.as_uuid(),
                    created_at: blocked_at,
                    updated_at: blocked_at,
                };
                let update = RelationshipUpdate {
                    status: state_to_str(RelationshipState::Blocked),
                    initiator: *blocker.as_uuid(),
                    updated_at: blocked_at,
                };

                diesel::insert_into(relationships::table)
                    .values(&new_row)
                    .on_conflict((relationships::user_a, relationships::user_b))
                    .do_update()
                    .set(&update)
                    .execute(conn)
                    .await?;

                cascade_attachments(conn, pair).await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn list_for_user(
        &self,
        user: &UserId,
        state: RelationshipState,
    ) -> Result<Vec<RelationshipEdge>, RelationshipRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let id = *user.as_uuid();

        let rows: Vec<RelationshipRow> = relationships::table
            .filter(
                relationships::user_a
                    .eq(id)
                    .or(relationships::user_b.eq(id)),
            )
            .filter(relationships::status.eq(state_to_str(state)))
            .order(relationships::updated_at.desc())
            .select(RelationshipRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter().map(row_to_edge).collect()
    }

    async fn count_for_user(
        &self,
        user: &UserId,
    ) -> Result<RelationshipTally, RelationshipRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let id = *user.as_uuid();

        let rows: Vec<RelationshipRow> = relationships::table
            .filter(
                relationships::user_a
                    .eq(id)
                    .or(relationships::user_b.eq(id)),
            )
            .select(RelationshipRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let mut tally = RelationshipTally::default();
        for row in rows {
            match state_from_str(&row.status)? {
                RelationshipState::Accepted => tally.friends += 1,
                RelationshipState::Pending if row.initiator == id => tally.pending_sent += 1,
                RelationshipState::Pending => tally.pending_received += 1,
                // Blocks the user suffered stay invisible to them.
                RelationshipState::Blocked if row.initiator == id => tally.blocked += 1,
                RelationshipState::Blocked => {}
            }
        }
        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module's pure mapping logic.
    use super::*;
    use chrono::Utc;
    use rstest::rstest;
    use uuid::Uuid;

    fn sample_row(status: &str) -> RelationshipRow {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (user_a, user_b) = if a < b { (a, b) } else { (b, a) };
        RelationshipRow {
            user_a,
            user_b,
            status: status.to_owned(),
            initiator: user_a,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[rstest]
    fn pool_error_maps_to_connection_error() {
        let pool_err = PoolError::checkout("connection refused");
        let repo_err = map_pool_error(pool_err);

        assert!(matches!(
            repo_err,
            RelationshipRepositoryError::Connection { .. }
        ));
        assert!(repo_err.to_string().contains("connection refused"));
    }

    #[rstest]
    fn diesel_not_found_maps_to_query_error() {
        let repo_err = map_diesel_error(diesel::result::Error::NotFound);

        assert!(matches!(repo_err, RelationshipRepositoryError::Query { .. }));
        assert!(repo_err.to_string().contains("record not found"));
    }

    #[rstest]
    #[case("pending", RelationshipState::Pending)]
    #[case("accepted", RelationshipState::Accepted)]
    #[case("blocked", RelationshipState::Blocked)]
    fn states_round_trip_through_storage_strings(
        #[case] raw: &str,
        #[case] state: RelationshipState,
    ) {
        assert_eq!(state_to_str(state), raw);
        assert_eq!(state_from_str(raw).expect("known state"), state);
    }

    #[rstest]
    fn unknown_status_strings_are_rejected() {
        let error = state_from_str("declined").expect_err("unknown state");
        assert!(error.to_string().contains("declined"));
    }

    #[rstest]
    fn rows_convert_to_edges() {
        let row = sample_row("accepted");
        let initiator = row.initiator;

        let edge = row_to_edge(row).expect("valid row");

        assert_eq!(edge.state(), RelationshipState::Accepted);
        assert_eq!(edge.initiator().as_uuid(), &initiator);
    }

    #[rstest]
    fn advisory_key_is_stable_for_a_pair() {
        let pair = PairKey::new(UserId::random(), UserId::random()).expect("distinct users");
        assert_eq!(advisory_lock_key(&pair), advisory_lock_key(&pair));
    }

    #[rstest]
    fn advisory_keys_differ_across_pairs() {
        let first = PairKey::new(UserId::random(), UserId::random()).expect("distinct users");
        let second = PairKey::new(UserId::random(), UserId::random()).expect("distinct users");
        assert_ne!(advisory_lock_key(&first), advisory_lock_key(&second));
    }
}
