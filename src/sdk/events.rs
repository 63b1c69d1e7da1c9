//! Settlement SDK event stream.
//!
//! The SDK reports multi-step operation progress through two event kinds:
//! the full ordered plan ("expected steps") and per-step completions. Both
//! are fanned out to subscribers on a broadcast channel so each flow can
//! attach a listener for the lifetime of its owning surface.
//!
//! The wire-level event names are pinned here as constants; they are an
//! adapter concern of the transport, not a core invariant.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Wire name of the expected-steps event
pub const EVENT_EXPECTED_STEPS: &str = "expected_steps";
/// Wire name of the step-complete event
pub const EVENT_STEP_COMPLETE: &str = "step_complete";
/// Wire name of the error event
pub const EVENT_ERROR: &str = "error";
/// Wire name of the transaction-failed event
pub const EVENT_TRANSACTION_FAILED: &str = "transaction_failed";

/// One step of the plan announced by the SDK before execution begins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStep {
    /// Human-oriented step category (e.g. "ALLOWANCE_SET")
    #[serde(rename = "type")]
    pub step_type: String,

    /// Stable short code identifying the step (e.g. "IS", "IF")
    #[serde(rename = "typeID")]
    pub type_id: String,

    /// Opaque payload attached by the SDK
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// A step-complete event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCompletion {
    /// Short code of the step that finished
    #[serde(rename = "typeID")]
    pub type_id: String,

    /// Payload carried by the completion, if any (the intent-submitted
    /// step carries the explorer URL and intent hash here)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Events consumed from the settlement SDK
#[derive(Debug, Clone)]
pub enum SdkEvent {
    /// Full ordered plan for the operation about to run; replaces any
    /// previous plan wholesale
    ExpectedSteps(Vec<PlannedStep>),

    /// One step of the current plan finished
    StepComplete(StepCompletion),

    /// The SDK reported a failure out-of-band
    TransactionFailed {
        message: String,
        code: Option<i64>,
    },
}

/// Broadcast fan-out for SDK events.
///
/// Subscribers that fall behind lose the oldest events (broadcast lag);
/// listeners treat that the same as any other missed delivery and rely on
/// the idempotent step matching to stay consistent.
pub struct SdkEventBus {
    tx: broadcast::Sender<SdkEvent>,
}

impl SdkEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Attach a new subscriber receiving events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SdkEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all current subscribers
    pub fn emit(&self, event: SdkEvent) {
        if self.tx.send(event).is_err() {
            debug!("SDK event dropped: no active subscribers");
        }
    }
}

impl Default for SdkEventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
