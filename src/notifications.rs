//! User notification layer.
//!
//! Every terminal outcome of a flow and every completed step produces a
//! transient notification; a multi-step cross-chain operation gives the
//! user no other signal that progress is happening. Notifications are
//! fanned out to registered sinks through a central `Notifier`; delivery
//! failures are logged and never propagate into the flow.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Successful submission, step completion or fulfillment
    Success,

    /// Neutral status update (e.g. cancellation requested by the user)
    Info,

    /// A classified failure
    Error,
}

/// A single transient notification shown to the user
#[derive(Debug, Clone)]
pub struct Notification {
    /// Unique id, letting sinks deduplicate or replace toasts
    pub id: Uuid,

    pub kind: NotificationKind,

    /// Primary message
    pub message: String,

    /// Secondary line shown under the message
    pub description: Option<String>,

    /// Whether a "retry" affordance accompanies the notification
    pub retryable: bool,

    /// Emission time in milliseconds since the epoch
    pub timestamp: i64,
}

/// Delivery channel for notifications
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    /// Channel name, used when logging delivery failures
    fn name(&self) -> &str;

    /// Deliver one notification
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Default sink writing notifications to the log
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        match notification.kind {
            NotificationKind::Success => {
                info!(message = %notification.message, "notification");
            }
            NotificationKind::Info => {
                info!(message = %notification.message, "notification");
            }
            NotificationKind::Error => {
                warn!(
                    message = %notification.message,
                    description = notification.description.as_deref().unwrap_or(""),
                    "notification"
                );
            }
        }
        Ok(())
    }
}

/// Central notification manager fanning out to registered sinks
pub struct Notifier {
    sinks: RwLock<Vec<Arc<dyn NotificationSink>>>,
}

impl Notifier {
    /// Create a notifier with the default log sink registered
    pub fn new() -> Self {
        Self {
            sinks: RwLock::new(vec![Arc::new(LogSink) as Arc<dyn NotificationSink>]),
        }
    }

    /// Create a notifier with no sinks
    pub fn empty() -> Self {
        Self {
            sinks: RwLock::new(Vec::new()),
        }
    }

    /// Register an additional delivery channel
    pub async fn register(&self, sink: Arc<dyn NotificationSink>) {
        self.sinks.write().await.push(sink);
    }

    /// Emit a success notification
    pub async fn success(&self, message: impl Into<String>) {
        self.emit(Notification {
            id: Uuid::new_v4(),
            kind: NotificationKind::Success,
            message: message.into(),
            description: None,
            retryable: false,
            timestamp: Utc::now().timestamp_millis(),
        })
        .await;
    }

    /// Emit an informational notification
    pub async fn info(&self, message: impl Into<String>) {
        self.emit(Notification {
            id: Uuid::new_v4(),
            kind: NotificationKind::Info,
            message: message.into(),
            description: None,
            retryable: false,
            timestamp: Utc::now().timestamp_millis(),
        })
        .await;
    }

    /// Emit an error notification
    pub async fn failure(
        &self,
        message: impl Into<String>,
        description: Option<&str>,
        retryable: bool,
    ) {
        self.emit(Notification {
            id: Uuid::new_v4(),
            kind: NotificationKind::Error,
            message: message.into(),
            description: description.map(|d| d.to_string()),
            retryable,
            timestamp: Utc::now().timestamp_millis(),
        })
        .await;
    }

    async fn emit(&self, notification: Notification) {
        let sinks = self.sinks.read().await;
        for sink in sinks.iter() {
            if let Err(e) = sink.deliver(&notification).await {
                error!(
                    channel = sink.name(),
                    error = %e,
                    "Failed to deliver notification"
                );
            }
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
