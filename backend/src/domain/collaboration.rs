//! Collaboration fan-out value types.
//!
//! One `add collaborators` invocation processes each invitee independently
//! and reports a per-invitee outcome plus a summary. Partial success is data,
//! not an error: callers inspect the skipped entries to decide what to show.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::UserId;

/// Default suffix appended to the title of a collaboration copy.
pub const DEFAULT_TITLE_SUFFIX: &str = " (My Copy)";

/// Knobs controlling how invitees are attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationOptions {
    /// Materialize copies for invitees at all. When false, invitees are
    /// attached to the original deadline only.
    pub create_copies: bool,
    /// Suffix appended to copy titles.
    pub title_suffix: String,
    /// Give each invitee their own copy. Only meaningful when `create_copies`
    /// is set; when false, everyone shares the original.
    pub create_individual_copies: bool,
    /// Enqueue a notification intent for each attached invitee.
    pub notify_collaborators: bool,
}

impl Default for CollaborationOptions {
    fn default() -> Self {
        Self {
            create_copies: true,
            title_suffix: DEFAULT_TITLE_SUFFIX.to_owned(),
            create_individual_copies: true,
            notify_collaborators: true,
        }
    }
}

impl CollaborationOptions {
    /// Whether the engine should materialize a copy per invitee.
    pub fn wants_individual_copies(&self) -> bool {
        self.create_copies && self.create_individual_copies
    }
}

/// Closed set of reasons an invitee can be skipped.
///
/// Presentation strings live at the HTTP boundary; the core only ever deals
/// in these codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The invitee is the deadline owner.
    OwnerInvited,
    /// The invitee already holds an attachment on this deadline.
    AlreadyCollaborator,
    /// The owner and invitee are not accepted friends.
    NotFriends,
    /// A block exists between the owner and invitee.
    UserBlocked,
    /// An infrastructure failure prevented processing this invitee; already
    /// processed invitees stay committed.
    Unprocessed,
}

/// Outcome for one invitee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum InviteeOutcome {
    /// The invitee was attached; `copy_id` is set when a copy was created.
    #[serde(rename_all = "camelCase")]
    Added {
        /// Identifier of the copy created for the invitee, if any.
        copy_id: Option<Uuid>,
    },
    /// The invitee was skipped for the given reason.
    Skipped {
        /// Why the invitee was not attached.
        reason: SkipReason,
    },
}

/// Per-invitee entry in a [`CollaborationOutcome`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteeReport {
    /// The invitee this entry describes.
    #[schema(value_type = String, example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub user_id: UserId,
    /// What happened to them.
    #[serde(flatten)]
    pub outcome: InviteeOutcome,
}

/// Aggregated result of one `add collaborators` invocation.
///
/// Entries appear in deduplicated input order. `success` is true when at
/// least one invitee was added; an all-skipped invocation returns normally
/// with `success == false` and the full skip list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationOutcome {
    /// Per-invitee outcomes in input order.
    pub invitees: Vec<InviteeReport>,
    /// Number of deduplicated invitees processed.
    pub requested_count: usize,
    /// Number of invitees attached.
    pub added_count: usize,
    /// Number of invitees skipped.
    pub skipped_count: usize,
    /// Whether anything was attached.
    pub success: bool,
}

impl CollaborationOutcome {
    /// Aggregate per-invitee reports into an outcome with summary counts.
    pub fn from_reports(invitees: Vec<InviteeReport>) -> Self {
        let requested_count = invitees.len();
        let added_count = invitees
            .iter()
            .filter(|entry| matches!(entry.outcome, InviteeOutcome::Added { .. }))
            .count();
        let skipped_count = requested_count - added_count;
        Self {
            invitees,
            requested_count,
            added_count,
            skipped_count,
            success: added_count > 0,
        }
    }

    /// Iterate over the entries that were skipped.
    pub fn skipped(&self) -> impl Iterator<Item = (&UserId, SkipReason)> {
        self.invitees.iter().filter_map(|entry| match entry.outcome {
            InviteeOutcome::Skipped { reason } => Some((&entry.user_id, reason)),
            InviteeOutcome::Added { .. } => None,
        })
    }
}
