//! Notification intent queue adapters.
//!
//! Delivery transport (email, push) is outside this service; the default
//! adapter hands intents to structured logging where the delivery pipeline's
//! collector picks them up. A broker-backed adapter can replace it behind the
//! same port without touching the engines.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::domain::NotificationIntent;
use crate::domain::ports::{NotificationQueue, NotificationQueueError};

/// Queue adapter that emits each intent as a structured log event.
///
/// Enqueueing never blocks and never fails; the engines treat the queue as
/// fire-and-forget either way.
#[derive(Debug, Clone, Default)]
pub struct TracingNotificationQueue;

impl TracingNotificationQueue {
    /// Create a new logging queue instance.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationQueue for TracingNotificationQueue {
    async fn enqueue(&self, intent: &NotificationIntent) -> Result<(), NotificationQueueError> {
        let payload = serde_json::to_string(intent)
            .map_err(|err| NotificationQueueError::dispatch(err.to_string()))?;
        info!(recipient = %intent.recipient(), intent = %payload, "notification intent enqueued");
        Ok(())
    }
}

/// Queue adapter that records every intent in memory.
///
/// Intended for tests and local development where assertions need to observe
/// what would have been delivered.
#[derive(Debug, Default)]
pub struct RecordingNotificationQueue {
    intents: Mutex<Vec<NotificationIntent>>,
}

impl RecordingNotificationQueue {
    /// Create a new empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the intents recorded so far.
    pub fn recorded(&self) -> Vec<NotificationIntent> {
        self.intents
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationQueue for RecordingNotificationQueue {
    async fn enqueue(&self, intent: &NotificationIntent) -> Result<(), NotificationQueueError> {
        self.intents
            .lock()
            .map_err(|_| NotificationQueueError::dispatch("recorder poisoned"))?
            .push(intent.clone());
        Ok(())
    }
}
