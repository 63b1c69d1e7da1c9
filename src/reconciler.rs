//! Error and cancellation reconciler.
//!
//! Classifies failures from orchestrator calls or SDK error events and
//! forces the flow back to a clean terminal state. The single most
//! important invariant lives here: a failed transaction must never leave a
//! partially-completed step list frozen on screen, so the state reset
//! happens unconditionally, before and regardless of any notification.

use std::sync::Arc;

use tracing::error;

use crate::errors::FlowError;
use crate::history::{HistoryStore, RecordPatch};
use crate::notifications::Notifier;
use crate::sdk::{SdkError, PROVIDER_USER_REJECTED};
use crate::store::FlowStore;
use crate::types::TransactionStatus;

/// Markers a wallet provider puts in user-rejection messages
const REJECTION_MARKERS: [&str; 2] = [
    "user rejection during setting allowance",
    "user rejected the request",
];

/// Classify a thrown error into the user-facing taxonomy.
///
/// Priority order: user rejection (message marker or provider code 4001),
/// then insufficient funds, then gas, then general with the display message
/// truncated at the first colon to strip internal detail.
pub fn classify(error: &anyhow::Error) -> FlowError {
    let mut combined = String::new();
    for cause in error.chain() {
        combined.push_str(&cause.to_string().to_lowercase());
        combined.push('\n');
    }

    let rejected_by_code = error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<SdkError>())
        .any(|sdk| sdk.code == Some(PROVIDER_USER_REJECTED));

    if rejected_by_code || REJECTION_MARKERS.iter().any(|m| combined.contains(m)) {
        return FlowError::UserRejected;
    }
    if combined.contains("insufficient funds") {
        return FlowError::InsufficientFunds;
    }
    if combined.contains("gas") {
        return FlowError::InsufficientGas;
    }

    let message = error.to_string();
    let display = message
        .split_once(':')
        .map(|(head, _)| head.trim().to_string())
        .unwrap_or(message);
    FlowError::General(display)
}

/// Drives a flow back to a clean terminal state after any failure
pub struct Reconciler {
    store: Arc<FlowStore>,
    history: Arc<HistoryStore>,
    notifier: Arc<Notifier>,
}

impl Reconciler {
    pub fn new(store: Arc<FlowStore>, history: Arc<HistoryStore>, notifier: Arc<Notifier>) -> Self {
        Self {
            store,
            history,
            notifier,
        }
    }

    /// Classify the failure, reset the flow and notify the user.
    ///
    /// Returns the classification so the orchestrator can shape its result.
    pub async fn handle_failure(&self, operation: &str, err: &anyhow::Error) -> FlowError {
        let failure = classify(err);

        error!(
            operation,
            class = failure.name(),
            error = %err,
            "Transaction flow failed"
        );

        // Terminal state first; a stale step list after a failure is a
        // defect, not degraded state
        let snapshot = self.store.snapshot().await;
        self.store.reset_progress().await;
        self.store.set_current_transaction(None).await;
        self.store.set_awaiting_allowance(false).await;

        // A submitted attempt must not linger pending forever
        if let Some(current) = snapshot.current_transaction {
            self.history
                .update(
                    current.intent_hash,
                    RecordPatch::status(TransactionStatus::Failed),
                )
                .await;
        }

        self.store.set_error(Some(failure.to_string())).await;
        self.notifier
            .failure(failure.to_string(), failure.description(), failure.retryable())
            .await;

        failure
    }

    /// Handle a user-initiated cancellation before any error surfaced
    pub async fn handle_cancellation(&self) {
        self.store.reset_progress().await;
        self.store.set_current_transaction(None).await;
        self.store.set_awaiting_allowance(false).await;
        self.store.set_executing(false).await;
        self.store.set_error(None).await;
        self.notifier.info("Transaction cancelled").await;
    }
}
