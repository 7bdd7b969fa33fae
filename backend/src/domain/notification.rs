//! Notification intents.
//!
//! The engines enqueue *intents* describing who should be told about what;
//! the delivery pipeline behind the queue decides transport and timing.
//! Enqueueing is always fire-and-forget from the engines' perspective.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// A queued request to notify a user, decoupled from actual delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum NotificationIntent {
    /// A deadline was shared with the recipient.
    DeadlineShared {
        /// The user to notify.
        to: UserId,
        /// The deadline the recipient now sees: their copy when one was
        /// created, otherwise the shared original.
        deadline_id: Uuid,
        /// The deadline the share originated from.
        source_deadline_id: Uuid,
    },
    /// The recipient received a friend request.
    FriendRequestReceived {
        /// The user to notify.
        to: UserId,
        /// The requester.
        from: UserId,
    },
    /// A friend request the recipient sent was accepted.
    FriendRequestAccepted {
        /// The user to notify.
        to: UserId,
        /// The user who accepted.
        by: UserId,
    },
}

impl NotificationIntent {
    /// The user this intent targets.
    pub fn recipient(&self) -> &UserId {
        match self {
            Self::DeadlineShared { to, .. }
            | Self::FriendRequestReceived { to, .. }
            | Self::FriendRequestAccepted { to, .. } => to,
        }
    }
}
