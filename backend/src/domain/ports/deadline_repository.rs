//! Port abstraction for deadline and attachment persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{CollaboratorAttachment, Deadline, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by deadline repository adapters.
    pub enum DeadlineRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "deadline repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "deadline repository query failed: {message}",
    }
}

/// Result of attempting to attach a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// The attachment (and copy, when requested) was created.
    Attached {
        /// Identifier of the copy created for the invitee, if one was.
        copy_id: Option<Uuid>,
    },
    /// An attachment for `(deadline, user)` already exists; nothing was
    /// written.
    AlreadyAttached,
    /// The relationship between owner and invitee was no longer accepted at
    /// commit time; nothing was written.
    NotEligible,
}

/// Port for deadline and collaborator attachment storage.
///
/// `attach_collaborator` carries the engine's check-then-act atomicity
/// requirement: within one transaction the adapter locks the relationship
/// edge between owner and invitee (share lock) and re-verifies it is
/// accepted, inserts the attachment guarded by the `(deadline_id, user_id)`
/// unique key, and inserts the copy row when one is supplied. A concurrent
/// block or unfriending therefore either commits before the attach (attach
/// observes [`AttachOutcome::NotEligible`]) or after it (the cascade removes
/// the fresh attachment).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeadlineRepository: Send + Sync {
    /// Fetch a deadline by id.
    async fn find(&self, deadline_id: Uuid)
    -> Result<Option<Deadline>, DeadlineRepositoryError>;

    /// Atomically attach `invitee` to `deadline_id`, materializing `copy`
    /// when supplied.
    async fn attach_collaborator(
        &self,
        deadline_id: Uuid,
        owner: &UserId,
        invitee: &UserId,
        copy: Option<Deadline>,
    ) -> Result<AttachOutcome, DeadlineRepositoryError>;

    /// List the collaborator attachments on a deadline.
    async fn list_collaborators(
        &self,
        deadline_id: Uuid,
    ) -> Result<Vec<CollaboratorAttachment>, DeadlineRepositoryError>;
}
