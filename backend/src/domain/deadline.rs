//! Deadline aggregate and collaborator attachments.
//!
//! Only the fields the sharing engine touches are modelled richly; everything
//! else is carried opaque so collaboration copies clone it verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::UserId;

/// Priority bucket a deadline is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeadlinePriority {
    /// Can slip without consequence.
    Low,
    /// Default priority.
    Medium,
    /// Must not slip.
    High,
}

/// Progress state of a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineStatus {
    /// Not started.
    Pending,
    /// Work has begun.
    InProgress,
    /// Finished.
    Completed,
    /// Abandoned.
    Cancelled,
}

/// A tracked deadline.
///
/// `origin_deadline_id` is set only on deadlines materialized as collaboration
/// copies and points at the deadline they were copied from. Copies are
/// autonomous once created: they never cascade edits or deletions back to the
/// source, and they are never re-copied transitively (the engine only reads
/// provenance from the source it was handed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Deadline {
    /// Stable identifier.
    pub id: Uuid,
    /// The user who owns and edits this deadline.
    #[schema(value_type = String, example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub owner_id: UserId,
    /// Short human-readable title.
    pub title: String,
    /// Free-form description.
    pub description: Option<String>,
    /// When the work is due.
    pub due_date: DateTime<Utc>,
    /// Priority bucket.
    pub priority: DeadlinePriority,
    /// Progress state.
    pub status: DeadlineStatus,
    /// Optional grouping label.
    pub category: Option<String>,
    /// Rough effort estimate in hours.
    pub estimated_hours: Option<i32>,
    /// Progress from 0 to 100.
    pub completion_percentage: i32,
    /// Private working notes.
    pub notes: Option<String>,
    /// Provenance link for collaboration copies.
    pub origin_deadline_id: Option<Uuid>,
    /// When the deadline was created.
    pub created_at: DateTime<Utc>,
    /// When the deadline last changed.
    pub updated_at: DateTime<Utc>,
}

impl Deadline {
    /// Build an independent copy of this deadline for a collaborator.
    ///
    /// Shareable fields (description, due date, priority, category, estimate,
    /// notes) are cloned verbatim; progress is reset so each collaborator
    /// tracks their own, and provenance points back at this deadline.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::{Deadline, DeadlinePriority, DeadlineStatus, UserId};
    /// use chrono::Utc;
    /// use uuid::Uuid;
    ///
    /// let now = Utc::now();
    /// let source = Deadline {
    ///     id: Uuid::new_v4(),
    ///     owner_id: UserId::random(),
    ///     title: "Thesis draft".to_owned(),
    ///     description: None,
    ///     due_date: now,
    ///     priority: DeadlinePriority::High,
    ///     status: DeadlineStatus::InProgress,
    ///     category: None,
    ///     estimated_hours: Some(40),
    ///     completion_percentage: 60,
    ///     notes: None,
    ///     origin_deadline_id: None,
    ///     created_at: now,
    ///     updated_at: now,
    /// };
    /// let copy = source.copy_for(&UserId::random(), " (My Copy)", Uuid::new_v4(), now);
    /// assert_eq!(copy.title, "Thesis draft (My Copy)");
    /// assert_eq!(copy.completion_percentage, 0);
    /// assert_eq!(copy.origin_deadline_id, Some(source.id));
    /// ```
    pub fn copy_for(
        &self,
        collaborator: &UserId,
        title_suffix: &str,
        copy_id: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: copy_id,
            owner_id: collaborator.clone(),
            title: format!("{}{title_suffix}", self.title),
            description: self.description.clone(),
            due_date: self.due_date,
            priority: self.priority,
            status: DeadlineStatus::Pending,
            category: self.category.clone(),
            estimated_hours: self.estimated_hours,
            completion_percentage: 0,
            notes: self.notes.clone(),
            origin_deadline_id: Some(self.id),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Role granted by a collaborator attachment.
///
/// The owner role is derived from [`Deadline::owner_id`] and never stored as
/// an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CollaboratorRole {
    /// May view the shared deadline; owns any copy made for them.
    Collaborator,
}

/// Join record granting a user a role on a deadline.
///
/// ## Invariants
/// - Unique on `(deadline_id, user_id)`; a user is attached at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorAttachment {
    /// The shared deadline.
    pub deadline_id: Uuid,
    /// The attached user.
    #[schema(value_type = String, example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub user_id: UserId,
    /// Granted role.
    pub role: CollaboratorRole,
    /// When the attachment was created.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    fn sample_deadline() -> Deadline {
        let now = Utc::now();
        Deadline {
            id: Uuid::new_v4(),
            owner_id: UserId::random(),
            title: "Exam revision".to_owned(),
            description: Some("chapters 4-9".to_owned()),
            due_date: now,
            priority: DeadlinePriority::High,
            status: DeadlineStatus::InProgress,
            category: Some("study".to_owned()),
            estimated_hours: Some(12),
            completion_percentage: 75,
            notes: Some("focus on chapter 7".to_owned()),
            origin_deadline_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    fn copy_resets_progress_and_links_provenance() {
        let source = sample_deadline();
        let invitee = UserId::random();
        let copy_id = Uuid::new_v4();
        let now = Utc::now();

        let copy = source.copy_for(&invitee, " (My Copy)", copy_id, now);

        assert_eq!(copy.id, copy_id);
        assert_eq!(copy.owner_id, invitee);
        assert_eq!(copy.title, "Exam revision (My Copy)");
        assert_eq!(copy.status, DeadlineStatus::Pending);
        assert_eq!(copy.completion_percentage, 0);
        assert_eq!(copy.origin_deadline_id, Some(source.id));
    }

    #[rstest]
    fn copy_clones_shareable_fields_verbatim() {
        let source = sample_deadline();
        let copy = source.copy_for(&UserId::random(), "", Uuid::new_v4(), Utc::now());

        assert_eq!(copy.title, source.title);
        assert_eq!(copy.description, source.description);
        assert_eq!(copy.due_date, source.due_date);
        assert_eq!(copy.priority, source.priority);
        assert_eq!(copy.category, source.category);
        assert_eq!(copy.estimated_hours, source.estimated_hours);
        assert_eq!(copy.notes, source.notes);
    }
}
