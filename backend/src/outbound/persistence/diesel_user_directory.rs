//! PostgreSQL-backed `UserDirectory` implementation using Diesel ORM.
//!
//! Reads the local projection of the identity subsystem's users. This adapter
//! is strictly read-only; user provisioning happens outside this service.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::{debug, warn};

use crate::domain::ports::{UserDirectory, UserDirectoryError};
use crate::domain::{User, UserId};

use super::models::UserRow;
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed implementation of the `UserDirectory` port.
#[derive(Clone)]
pub struct DieselUserDirectory {
    pool: DbPool,
}

impl DieselUserDirectory {
    /// Create a new directory with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Map pool errors to domain directory errors.
fn map_pool_error(error: PoolError) -> UserDirectoryError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            UserDirectoryError::connection(message)
        }
    }
}

/// Map Diesel errors to domain directory errors.
fn map_diesel_error(error: diesel::result::Error) -> UserDirectoryError {
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
        DieselError::NotFound => UserDirectoryError::query("record not found"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
            UserDirectoryError::connection(info.message().to_owned())
        }
        DieselError::DatabaseError(_, info) => {
            UserDirectoryError::query(info.message().to_owned())
        }
        _ => UserDirectoryError::query("database error"),
    }
}

/// Convert a database row to a domain user, dropping rows that fail the
/// domain's validation rules.
///
/// Identity rows are provisioned by another subsystem; a row this service
/// cannot represent is logged and skipped rather than failing the whole
/// listing.
fn row_to_user(row: UserRow) -> Option<User> {
    let id = row.id;
    match User::try_from_parts(id.to_string(), row.username, row.full_name, row.email) {
        Ok(user) => Some(user),
        Err(error) => {
            warn!(user_id = %id, %error, "skipping user row that fails validation");
            None
        }
    }
}

#[async_trait]
impl UserDirectory for DieselUserDirectory {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserDirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<UserRow> = users::table
            .find(id.as_uuid())
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(row.and_then(row_to_user))
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, UserDirectoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let uuids: Vec<uuid::Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows: Vec<UserRow> = users::table
            .filter(users::id.eq_any(&uuids))
            .select(UserRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        // Preserve the caller's ordering, dropping unknown ids.
        let mut by_id: HashMap<uuid::Uuid, User> = rows
            .into_iter()
            .filter_map(|row| row_to_user(row).map(|user| (*user.id().as_uuid(), user)))
            .collect();
        Ok(ids
            .iter()
            .filter_map(|id| by_id.remove(id.as_uuid()))
            .collect())
    }

    async fn search(&self, term: &str, limit: i64) -> Result<Vec<User>, UserDirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        let rows: Vec<UserRow> = users::table
            .filter(
                users::username
                    .ilike(pattern.clone())
                    .or(users::full_name.ilike(pattern)),
            )
            .order(users::username.asc())
            .limit(limit)
            .select(UserRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(rows.into_iter().filter_map(row_to_user).collect())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module's pure mapping logic.
    use super::*;
    use chrono::Utc;
    use rstest::rstest;
    use uuid::Uuid;

    fn sample_row(username: &str) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            username: username.to_owned(),
            full_name: "Sample User".to_owned(),
            email: "sample@example.com".to_owned(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[rstest]
    fn valid_rows_convert_to_users() {
        let row = sample_row("sample_user");
        let id = row.id;

        let user = row_to_user(row).expect("valid row");

        assert_eq!(user.id().as_uuid(), &id);
        assert_eq!(user.username().as_ref(), "sample_user");
    }

    #[rstest]
    fn rows_failing_validation_are_dropped() {
        assert!(row_to_user(sample_row("has space")).is_none());
    }

    #[rstest]
    fn pool_error_maps_to_connection_error() {
        let err = map_pool_error(PoolError::checkout("no connections"));
        assert!(matches!(err, UserDirectoryError::Connection { .. }));
    }
}
