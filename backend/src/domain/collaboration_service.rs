//! Deadline collaboration fan-out engine.
//!
//! Given a source deadline and a list of invitees, decides per invitee
//! whether to attach them as a collaborator and/or materialize an
//! independent copy for them. Invitees are processed independently under one
//! request: a skip or failure for one never aborts the others, and the
//! aggregated outcome reports every skip with a reason code.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use mockable::Clock;
use tracing::warn;
use uuid::Uuid;

use crate::domain::ports::{
    AddCollaboratorsRequest, AttachOutcome, CollaborationCommand, DeadlineRepository,
    DeadlineRepositoryError, NotificationQueue, RelationshipQuery,
};
use crate::domain::retry::retry_once;
use crate::domain::{
    CollaborationOptions, CollaborationOutcome, Deadline, Error, InviteeOutcome, InviteeReport,
    NotificationIntent, RelationshipStatus, SkipReason, UserId,
};

fn map_repository_error(error: DeadlineRepositoryError) -> Error {
    match error {
        DeadlineRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("deadline repository unavailable: {message}"))
        }
        DeadlineRepositoryError::Query { message } => {
            Error::internal(format!("deadline repository error: {message}"))
        }
    }
}

fn is_transient(error: &DeadlineRepositoryError) -> bool {
    matches!(error, DeadlineRepositoryError::Connection { .. })
}

/// Deduplicate invitees preserving first occurrence order.
fn dedup_invitees(invitee_ids: Vec<UserId>) -> Vec<UserId> {
    let mut seen = HashSet::new();
    invitee_ids
        .into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Collaboration engine implementing the [`CollaborationCommand`] driving port.
#[derive(Clone)]
pub struct CollaborationService<Dl, Rq, N> {
    deadline_repo: Arc<Dl>,
    relationships: Arc<Rq>,
    notifications: Arc<N>,
    clock: Arc<dyn Clock>,
    fanout: usize,
}

impl<Dl, Rq, N> CollaborationService<Dl, Rq, N> {
    /// Create a new engine over the deadline store, relationship queries, and
    /// notification queue.
    ///
    /// `fanout` bounds how many invitees are processed concurrently; it is
    /// clamped to at least one.
    pub fn new(
        deadline_repo: Arc<Dl>,
        relationships: Arc<Rq>,
        notifications: Arc<N>,
        clock: Arc<dyn Clock>,
        fanout: usize,
    ) -> Self {
        Self {
            deadline_repo,
            relationships,
            notifications,
            clock,
            fanout: fanout.max(1),
        }
    }
}

impl<Dl, Rq, N> CollaborationService<Dl, Rq, N>
where
    Dl: DeadlineRepository,
    Rq: RelationshipQuery,
    N: NotificationQueue,
{
    async fn process_invitee(
        &self,
        source: &Deadline,
        options: &CollaborationOptions,
        already_attached: &HashSet<UserId>,
        invitee: UserId,
    ) -> InviteeReport {
        let outcome = self
            .invitee_outcome(source, options, already_attached, &invitee)
            .await;
        InviteeReport {
            user_id: invitee,
            outcome,
        }
    }

    async fn invitee_outcome(
        &self,
        source: &Deadline,
        options: &CollaborationOptions,
        already_attached: &HashSet<UserId>,
        invitee: &UserId,
    ) -> InviteeOutcome {
        if invitee == &source.owner_id {
            return InviteeOutcome::Skipped {
                reason: SkipReason::OwnerInvited,
            };
        }
        if already_attached.contains(invitee) {
            return InviteeOutcome::Skipped {
                reason: SkipReason::AlreadyCollaborator,
            };
        }

        let status = match self
            .relationships
            .status_between(&source.owner_id, invitee)
            .await
        {
            Ok(status) => status,
            Err(error) => {
                warn!(%invitee, %error, "eligibility check failed; invitee left unprocessed");
                return InviteeOutcome::Skipped {
                    reason: SkipReason::Unprocessed,
                };
            }
        };
        match status {
            RelationshipStatus::Accepted => {}
            RelationshipStatus::Blocked => {
                return InviteeOutcome::Skipped {
                    reason: SkipReason::UserBlocked,
                };
            }
            RelationshipStatus::None | RelationshipStatus::Pending => {
                return InviteeOutcome::Skipped {
                    reason: SkipReason::NotFriends,
                };
            }
        }

        let copy = options.wants_individual_copies().then(|| {
            source.copy_for(
                invitee,
                &options.title_suffix,
                Uuid::new_v4(),
                self.clock.utc(),
            )
        });

        let attached = retry_once(is_transient, || {
            self.deadline_repo
                .attach_collaborator(source.id, &source.owner_id, invitee, copy.clone())
        })
        .await;

        match attached {
            Ok(AttachOutcome::Attached { copy_id }) => {
                if options.notify_collaborators {
                    self.notify(NotificationIntent::DeadlineShared {
                        to: invitee.clone(),
                        deadline_id: copy_id.unwrap_or(source.id),
                        source_deadline_id: source.id,
                    })
                    .await;
                }
                InviteeOutcome::Added { copy_id }
            }
            // A concurrent call attached them first; idempotent skip.
            Ok(AttachOutcome::AlreadyAttached) => InviteeOutcome::Skipped {
                reason: SkipReason::AlreadyCollaborator,
            },
            // The friendship ended between the eligibility check and the
            // attach transaction's re-verification.
            Ok(AttachOutcome::NotEligible) => InviteeOutcome::Skipped {
                reason: SkipReason::NotFriends,
            },
            Err(error) => {
                warn!(%invitee, %error, "attach failed; invitee left unprocessed");
                InviteeOutcome::Skipped {
                    reason: SkipReason::Unprocessed,
                }
            }
        }
    }

    async fn notify(&self, intent: NotificationIntent) {
        // Best effort: the attachment has already committed.
        if let Err(error) = self.notifications.enqueue(&intent).await {
            warn!(recipient = %intent.recipient(), %error, "notification intent dropped");
        }
    }
}

#[async_trait]
impl<Dl, Rq, N> CollaborationCommand for CollaborationService<Dl, Rq, N>
where
    Dl: DeadlineRepository,
    Rq: RelationshipQuery,
    N: NotificationQueue,
{
    async fn add_collaborators(
        &self,
        request: AddCollaboratorsRequest,
    ) -> Result<CollaborationOutcome, Error> {
        let AddCollaboratorsRequest {
            deadline_id,
            acting_user,
            invitee_ids,
            options,
        } = request;

        let source = retry_once(is_transient, || self.deadline_repo.find(deadline_id))
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found(format!("deadline {deadline_id} not found")))?;

        if acting_user != source.owner_id {
            return Err(Error::forbidden(
                "only the deadline owner can add collaborators",
            ));
        }

        let already_attached: HashSet<UserId> = retry_once(is_transient, || {
            self.deadline_repo.list_collaborators(deadline_id)
        })
        .await
        .map_err(map_repository_error)?
        .into_iter()
        .map(|attachment| attachment.user_id)
        .collect();

        let invitees = dedup_invitees(invitee_ids);
        let reports = stream::iter(invitees)
            .map(|invitee| self.process_invitee(&source, &options, &already_attached, invitee))
            .buffered(self.fanout)
            .collect::<Vec<_>>()
            .await;

        Ok(CollaborationOutcome::from_reports(reports))
    }
}

#[cfg(test)]
#[path = "collaboration_service_tests.rs"]
mod tests;
