//! PostgreSQL-backed `DeadlineRepository` implementation using Diesel ORM.
//!
//! The attach transaction re-verifies the owner/invitee friendship under a
//! share lock on the relationship edge before writing, closing the race
//! against a concurrent block or unfriending. The attachment insert itself is
//! settled by the `(deadline_id, user_id)` primary key.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{AttachOutcome, DeadlineRepository, DeadlineRepositoryError};
use crate::domain::{
    CollaboratorAttachment, CollaboratorRole, Deadline, DeadlinePriority, DeadlineStatus,
    PairKey, RelationshipState, UserId,
};

use super::diesel_relationship_repository::state_to_str;
use super::models::{CollaboratorRow, DeadlineRow, NewCollaboratorRow, NewDeadlineRow};
use super::pool::{DbPool, PoolError};
use super::schema::{deadline_collaborators, deadlines, relationships};

const COLLABORATOR_ROLE: &str = "collaborator";

/// Diesel-backed implementation of the `DeadlineRepository` port.
#[derive(Clone)]
pub struct DieselDeadlineRepository {
    pool: DbPool,
}

impl DieselDeadlineRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Map pool errors to domain deadline repository errors.
fn map_pool_error(error: PoolError) -> DeadlineRepositoryError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            DeadlineRepositoryError::connection(message)
        }
    }
}

/// Map Diesel errors to domain deadline repository errors.
fn map_diesel_error(error: diesel::result::Error) -> DeadlineRepositoryError {
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
        DieselError::NotFound => DeadlineRepositoryError::query("record not found"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
            DeadlineRepositoryError::connection(info.message().to_owned())
        }
        DieselError::DatabaseError(_, info) => {
            DeadlineRepositoryError::query(info.message().to_owned())
        }
        _ => DeadlineRepositoryError::query("database error"),
    }
}

fn priority_to_str(priority: DeadlinePriority) -> &'static str {
    match priority {
        DeadlinePriority::Low => "low",
        DeadlinePriority::Medium => "medium",
        DeadlinePriority::High => "high",
    }
}

fn priority_from_str(raw: &str) -> Result<DeadlinePriority, DeadlineRepositoryError> {
    match raw {
        "low" => Ok(DeadlinePriority::Low),
        "medium" => Ok(DeadlinePriority::Medium),
        "high" => Ok(DeadlinePriority::High),
        other => Err(DeadlineRepositoryError::query(format!(
            "unrecognised deadline priority '{other}'"
        ))),
    }
}

fn status_to_str(status: DeadlineStatus) -> &'static str {
    match status {
        DeadlineStatus::Pending => "pending",
        DeadlineStatus::InProgress => "in_progress",
        DeadlineStatus::Completed => "completed",
        DeadlineStatus::Cancelled => "cancelled",
    }
}

fn status_from_str(raw: &str) -> Result<DeadlineStatus, DeadlineRepositoryError> {
    match raw {
        "pending" => Ok(DeadlineStatus::Pending),
        "in_progress" => Ok(DeadlineStatus::InProgress),
        "completed" => Ok(DeadlineStatus::Completed),
        "cancelled" => Ok(DeadlineStatus::Cancelled),
        other => Err(DeadlineRepositoryError::query(format!(
            "unrecognised deadline status '{other}'"
        ))),
    }
}

/// Convert a database row to a domain deadline.
fn row_to_deadline(row: DeadlineRow) -> Result<Deadline, DeadlineRepositoryError> {
    Ok(Deadline {
        id: row.id,
        owner_id: UserId::from_uuid(row.owner_id),
        title: row.title,
        description: row.description,
        due_date: row.due_date,
        priority: priority_from_str(&row.priority)?,
        status: status_from_str(&row.status)?,
        category: row.category,
        estimated_hours: row.estimated_hours,
        completion_percentage: row.completion_percentage,
        notes: row.notes,
        origin_deadline_id: row.origin_deadline_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_attachment(row: CollaboratorRow) -> CollaboratorAttachment {
    CollaboratorAttachment {
        deadline_id: row.deadline_id,
        user_id: UserId::from_uuid(row.user_id),
        role: CollaboratorRole::Collaborator,
        created_at: row.created_at,
    }
}

/// Lock the owner/invitee edge for share and confirm it is accepted.
async fn friendship_still_accepted(
    conn: &mut AsyncPgConnection,
    pair: &PairKey,
) -> Result<bool, diesel::result::Error> {
    let locked: Option<Uuid> = relationships::table
        .find((*pair.lower().as_uuid(), *pair.upper().as_uuid()))
        .filter(relationships::status.eq(state_to_str(RelationshipState::Accepted)))
        .select(relationships::initiator)
        .for_share()
        .first(conn)
        .await
        .optional()?;
    Ok(locked.is_some())
}

#[async_trait]
impl DeadlineRepository for DieselDeadlineRepository {
    async fn find(
        &self,
        deadline_id: Uuid,
    ) -> Result<Option<Deadline>, DeadlineRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<DeadlineRow> = deadlines::table
            .find(deadline_id)
            .select(DeadlineRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_deadline).transpose()
    }

    async fn attach_collaborator(
        &self,
        deadline_id: Uuid,
        owner: &UserId,
        invitee: &UserId,
        copy: Option<Deadline>,
    ) -> Result<AttachOutcome, DeadlineRepositoryError> {
        let pair = PairKey::new(owner.clone(), invitee.clone())
            .map_err(|err| DeadlineRepositoryError::query(err.to_string()))?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let invitee_id = *invitee.as_uuid();
        let outcome = conn
            .transaction(|conn| {
                let pair = &pair;
                let copy = copy.as_ref();
                async move {
                    if !friendship_still_accepted(conn, pair).await? {
                        return Ok(AttachOutcome::NotEligible);
                    }

                    let attachment = NewCollaboratorRow {
                        deadline_id,
                        user_id: invitee_id,
                        role: COLLABORATOR_ROLE,
                        created_at: copy.map_or_else(chrono::Utc::now, |c| c.created_at),
                    };
                    let inserted = diesel::insert_into(deadline_collaborators::table)
                        .values(&attachment)
                        .on_conflict((
                            deadline_collaborators::deadline_id,
                            deadline_collaborators::user_id,
                        ))
                        .do_nothing()
                        .execute(conn)
                        .await?;

                    if inserted == 0 {
                        return Ok(AttachOutcome::AlreadyAttached);
                    }

                    let copy_id = match copy {
                        Some(copy) => {
                            let new_row = NewDeadlineRow {
                                id: copy.id,
                                owner_id: *copy.owner_id.as_uuid(),
                                title: &copy.title,
                                description: copy.description.as_deref(),
                                due_date: copy.due_date,
                                priority: priority_to_str(copy.priority),
                                status: status_to_str(copy.status),
                                category: copy.category.as_deref(),
                                estimated_hours: copy.estimated_hours,
                                completion_percentage: copy.completion_percentage,
                                notes: copy.notes.as_deref(),
                                origin_deadline_id: copy.origin_deadline_id,
                                created_at: copy.created_at,
                                updated_at: copy.updated_at,
                            };
                            diesel::insert_into(deadlines::table)
                                .values(&new_row)
                                .execute(conn)
                                .await?;
                            Some(copy.id)
                        }
                        None => None,
                    };

                    Ok(AttachOutcome::Attached { copy_id })
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        Ok(outcome)
    }

    async fn list_collaborators(
        &self,
        deadline_id: Uuid,
    ) -> Result<Vec<CollaboratorAttachment>, DeadlineRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<CollaboratorRow> = deadline_collaborators::table
            .filter(deadline_collaborators::deadline_id.eq(deadline_id))
            .order(deadline_collaborators::created_at.asc())
            .select(CollaboratorRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(rows.into_iter().map(row_to_attachment).collect())
    }
}
