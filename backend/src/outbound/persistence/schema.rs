//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are
//! used by Diesel for compile-time query validation and type-safe SQL
//! generation; regenerate with `diesel print-schema` when migrations change.

diesel::table! {
    /// Local projection of the identity subsystem's users.
    users (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Unique registered handle.
        username -> Varchar,
        /// Display name shown alongside the handle.
        full_name -> Varchar,
        /// Contact address.
        email -> Varchar,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// One relationship edge per unordered user pair.
    ///
    /// The pair is stored canonically (`user_a < user_b`, enforced by a
    /// check constraint) so mirrored rows cannot exist.
    relationships (user_a, user_b) {
        /// Lower id of the canonical pair.
        user_a -> Uuid,
        /// Upper id of the canonical pair.
        user_b -> Uuid,
        /// Persisted edge state: pending, accepted, or blocked.
        status -> Varchar,
        /// Who performed the current directional action.
        initiator -> Uuid,
        /// When the edge was first created.
        created_at -> Timestamptz,
        /// When the edge last changed state.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Tracked deadlines, including collaboration copies.
    deadlines (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Owning user.
        owner_id -> Uuid,
        /// Short human-readable title.
        title -> Varchar,
        /// Free-form description.
        description -> Nullable<Text>,
        /// When the work is due.
        due_date -> Timestamptz,
        /// Priority bucket: low, medium, or high.
        priority -> Varchar,
        /// Progress state: pending, in_progress, completed, or cancelled.
        status -> Varchar,
        /// Optional grouping label.
        category -> Nullable<Varchar>,
        /// Rough effort estimate in hours.
        estimated_hours -> Nullable<Int4>,
        /// Progress from 0 to 100.
        completion_percentage -> Int4,
        /// Private working notes.
        notes -> Nullable<Text>,
        /// Provenance link set on collaboration copies.
        origin_deadline_id -> Nullable<Uuid>,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Collaborator role attachments, unique per (deadline, user).
    deadline_collaborators (deadline_id, user_id) {
        /// The shared deadline.
        deadline_id -> Uuid,
        /// The attached user.
        user_id -> Uuid,
        /// Granted role; always `collaborator`.
        role -> Varchar,
        /// When the attachment was created.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(deadlines -> users (owner_id));
diesel::joinable!(deadline_collaborators -> deadlines (deadline_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    relationships,
    deadlines,
    deadline_collaborators,
);
