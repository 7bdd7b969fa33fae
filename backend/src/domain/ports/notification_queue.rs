//! Port abstraction for the notification intent queue.

use async_trait::async_trait;

use crate::domain::NotificationIntent;

use super::define_port_error;

define_port_error! {
    /// Errors raised by notification queue adapters.
    pub enum NotificationQueueError {
        /// The queue backend rejected or could not accept the intent.
        Dispatch { message: String } => "notification intent dispatch failed: {message}",
    }
}

/// Port for handing notification intents to the delivery pipeline.
///
/// Enqueueing must not block the caller on delivery, and callers treat a
/// failed enqueue as best-effort: the triggering operation has already
/// committed and is never rolled back for a lost notification.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationQueue: Send + Sync {
    /// Submit an intent for asynchronous delivery.
    async fn enqueue(&self, intent: &NotificationIntent) -> Result<(), NotificationQueueError>;
}

/// Fixture queue that accepts and discards every intent.
///
/// Use it in tests that do not assert on notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureNotificationQueue;

#[async_trait]
impl NotificationQueue for FixtureNotificationQueue {
    async fn enqueue(&self, _intent: &NotificationIntent) -> Result<(), NotificationQueueError> {
        Ok(())
    }
}
