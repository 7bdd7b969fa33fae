//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{deadline_collaborators, deadlines, relationships, users};

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: String,
    #[expect(dead_code, reason = "schema field for future audit trail support")]
    pub created_at: DateTime<Utc>,
    #[expect(dead_code, reason = "schema field for future audit trail support")]
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Relationship models
// ---------------------------------------------------------------------------

/// Row struct for reading from the relationships table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = relationships)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RelationshipRow {
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub status: String,
    pub initiator: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for creating new relationship edges.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = relationships)]
pub(crate) struct NewRelationshipRow<'a> {
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub status: &'a str,
    pub initiator: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changeset struct for compare-and-set edge transitions.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = relationships)]
pub(crate) struct RelationshipUpdate<'a> {
    pub status: &'a str,
    pub initiator: Uuid,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Deadline models
// ---------------------------------------------------------------------------

/// Row struct for reading from the deadlines table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = deadlines)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct DeadlineRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    pub priority: String,
    pub status: String,
    pub category: Option<String>,
    pub estimated_hours: Option<i32>,
    pub completion_percentage: i32,
    pub notes: Option<String>,
    pub origin_deadline_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for materializing collaboration copies.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = deadlines)]
pub(crate) struct NewDeadlineRow<'a> {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub due_date: DateTime<Utc>,
    pub priority: &'a str,
    pub status: &'a str,
    pub category: Option<&'a str>,
    pub estimated_hours: Option<i32>,
    pub completion_percentage: i32,
    pub notes: Option<&'a str>,
    pub origin_deadline_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row struct for reading from the deadline_collaborators table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = deadline_collaborators)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CollaboratorRow {
    pub deadline_id: Uuid,
    pub user_id: Uuid,
    #[expect(dead_code, reason = "single-role schema; read back for future role support")]
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for creating collaborator attachments.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = deadline_collaborators)]
pub(crate) struct NewCollaboratorRow<'a> {
    pub deadline_id: Uuid,
    pub user_id: Uuid,
    pub role: &'a str,
    pub created_at: DateTime<Utc>,
}
