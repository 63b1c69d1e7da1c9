//! User-confirmation hooks.
//!
//! During a flow the settlement SDK pauses twice for a user decision: once
//! to confirm the allowances it needs to set, and once to confirm the
//! intent (sources, destination, fees). This module carries the hook
//! payloads from the SDK to the confirmation UI and forwards the decision
//! back over a oneshot responder. The confirmation UI itself is out of
//! scope; only the payload plumbing lives here.

use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Mutex};
use tracing::warn;

use crate::sdk::AllowanceAmount;

/// One allowance requirement the SDK needs satisfied before proceeding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowanceSource {
    #[serde(rename = "chainId")]
    pub chain_id: u64,

    pub token: String,

    /// Minimum allowance the intent requires, in base units
    #[serde(rename = "minAllowance")]
    pub min_allowance: String,
}

/// Payload of the allowance confirmation hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowanceHookPayload {
    /// Requirements to confirm; the decision must carry one chosen amount
    /// per source
    pub sources: Vec<AllowanceSource>,
}

/// Decision returned to the SDK for an allowance hook
#[derive(Debug, Clone, PartialEq)]
pub enum AllowanceDecision {
    /// Continue with the chosen amount for each required source
    Allow(Vec<AllowanceAmount>),

    /// Stop the flow
    Deny,
}

/// Payload of the intent confirmation hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentHookPayload {
    /// Intent data (sources, destination, fees) for display
    pub intent: serde_json::Value,
}

/// Decision returned to the SDK for an intent hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentDecision {
    Allow,
    Deny,
}

/// A pending allowance confirmation awaiting the user
pub struct PendingAllowance {
    pub payload: AllowanceHookPayload,
    responder: oneshot::Sender<AllowanceDecision>,
}

impl PendingAllowance {
    /// Continue the flow with the chosen allowance amounts.
    ///
    /// `amounts` must contain one entry per source in the payload.
    pub fn allow(self, amounts: Vec<AllowanceAmount>) {
        if amounts.len() != self.payload.sources.len() {
            warn!(
                expected = self.payload.sources.len(),
                got = amounts.len(),
                "Allowance decision does not cover every source"
            );
        }
        if self.responder.send(AllowanceDecision::Allow(amounts)).is_err() {
            warn!("SDK stopped waiting for the allowance decision");
        }
    }

    /// Stop the flow
    pub fn deny(self) {
        if self.responder.send(AllowanceDecision::Deny).is_err() {
            warn!("SDK stopped waiting for the allowance decision");
        }
    }
}

/// A pending intent confirmation awaiting the user
pub struct PendingIntent {
    pub payload: IntentHookPayload,
    responder: oneshot::Sender<IntentDecision>,
}

impl PendingIntent {
    pub fn allow(self) {
        if self.responder.send(IntentDecision::Allow).is_err() {
            warn!("SDK stopped waiting for the intent decision");
        }
    }

    pub fn deny(self) {
        if self.responder.send(IntentDecision::Deny).is_err() {
            warn!("SDK stopped waiting for the intent decision");
        }
    }
}

/// Registry holding at most one pending confirmation of each kind.
///
/// The SDK side offers a payload and awaits the receiver; the UI side takes
/// the pending confirmation and resolves it. Offering a new confirmation
/// while one is pending replaces it (the superseded responder is dropped,
/// which the SDK observes as a deny).
pub struct HookRegistry {
    allowance: Mutex<Option<PendingAllowance>>,
    intent: Mutex<Option<PendingIntent>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            allowance: Mutex::new(None),
            intent: Mutex::new(None),
        }
    }

    /// SDK side: surface an allowance confirmation and get the decision
    /// channel to await
    pub async fn offer_allowance(
        &self,
        payload: AllowanceHookPayload,
    ) -> oneshot::Receiver<AllowanceDecision> {
        let (tx, rx) = oneshot::channel();
        let mut slot = self.allowance.lock().await;
        if slot.is_some() {
            warn!("Replacing an unresolved allowance confirmation");
        }
        *slot = Some(PendingAllowance {
            payload,
            responder: tx,
        });
        rx
    }

    /// SDK side: surface an intent confirmation and get the decision
    /// channel to await
    pub async fn offer_intent(
        &self,
        payload: IntentHookPayload,
    ) -> oneshot::Receiver<IntentDecision> {
        let (tx, rx) = oneshot::channel();
        let mut slot = self.intent.lock().await;
        if slot.is_some() {
            warn!("Replacing an unresolved intent confirmation");
        }
        *slot = Some(PendingIntent {
            payload,
            responder: tx,
        });
        rx
    }

    /// UI side: take the pending allowance confirmation, if any
    pub async fn take_allowance(&self) -> Option<PendingAllowance> {
        self.allowance.lock().await.take()
    }

    /// UI side: take the pending intent confirmation, if any
    pub async fn take_intent(&self) -> Option<PendingIntent> {
        self.intent.lock().await.take()
    }

    /// Whether an allowance confirmation is awaiting the user
    pub async fn has_pending_allowance(&self) -> bool {
        self.allowance.lock().await.is_some()
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
