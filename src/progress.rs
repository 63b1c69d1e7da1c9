//! Step event listener and progress reducer.
//!
//! The settlement SDK announces a full step plan before an operation runs,
//! then reports completions one step at a time. The reducer here is pure:
//! it takes the current step list and one completion event and returns the
//! next list plus what the event meant. The `ProgressListener` wraps the
//! reducer with the actual subscription, history writes, notifications and
//! the delayed reset after fulfillment.
//!
//! Completion matching is keyed by `type_id` independent of position, so
//! duplicate or out-of-order delivery is idempotent; a completion for a
//! step that is unknown or already done is a no-op.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::history::{HistoryStore, RecordPatch};
use crate::notifications::Notifier;
use crate::reconciler::Reconciler;
use crate::sdk::events::{SdkEvent, StepCompletion};
use crate::store::FlowStore;
use crate::types::{
    IntentSubmitted, ProgressStep, TransactionKind, TransactionRecord, TransactionStatus,
};

/// Step code meaning the intent was submitted
pub const STEP_INTENT_SUBMITTED: &str = "IS";
/// Step code meaning the intent was fulfilled by a solver
pub const STEP_INTENT_FULFILLED: &str = "IF";

/// What a step-complete event meant for the current plan
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// No step with this code exists in the plan; safe no-op
    Unknown,

    /// The step was already done; duplicate delivery, no-op
    AlreadyDone,

    /// An ordinary step finished
    Completed(ProgressStep),

    /// The submission step finished and carried the intent identity
    Submitted {
        intent: IntentSubmitted,
        step: ProgressStep,
    },

    /// The terminal fulfillment step finished
    Fulfilled(ProgressStep),
}

impl StepOutcome {
    /// Whether the event changed the step list at all
    pub fn changed(&self) -> bool {
        !matches!(self, StepOutcome::Unknown | StepOutcome::AlreadyDone)
    }
}

/// Apply one completion event to a step list.
///
/// Pure: the input list is never mutated; the returned list differs from
/// the input in at most one step's `done` flag.
pub fn apply_completion(
    steps: &[ProgressStep],
    event: &StepCompletion,
) -> (Vec<ProgressStep>, StepOutcome) {
    let position = steps.iter().position(|s| s.type_id == event.type_id);

    let Some(index) = position else {
        return (steps.to_vec(), StepOutcome::Unknown);
    };
    if steps[index].done {
        return (steps.to_vec(), StepOutcome::AlreadyDone);
    }

    let mut next = steps.to_vec();
    next[index].done = true;
    let step = next[index].clone();

    let outcome = match event.type_id.as_str() {
        STEP_INTENT_FULFILLED => StepOutcome::Fulfilled(step),
        STEP_INTENT_SUBMITTED => {
            // A submission event without a parseable payload degrades to an
            // ordinary completion; the step is still done either way
            match event
                .data
                .clone()
                .map(serde_json::from_value::<IntentSubmitted>)
            {
                Some(Ok(intent)) => StepOutcome::Submitted { intent, step },
                _ => StepOutcome::Completed(step),
            }
        }
        _ => StepOutcome::Completed(step),
    };

    (next, outcome)
}

/// Turn a step category like "ALLOWANCE_SET" into "Allowance Set"
pub fn format_step_name(step_type: &str) -> String {
    step_type
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Listener binding the SDK event stream to one flow's progress state.
///
/// The listener never fails: malformed or irrelevant events are logged and
/// dropped, and every state transition it performs is idempotent.
pub struct ProgressListener {
    store: Arc<FlowStore>,
    history: Arc<HistoryStore>,
    notifier: Arc<Notifier>,
    reconciler: Arc<Reconciler>,
    reset_delay: Duration,
}

impl ProgressListener {
    pub fn new(
        store: Arc<FlowStore>,
        history: Arc<HistoryStore>,
        notifier: Arc<Notifier>,
        reconciler: Arc<Reconciler>,
        reset_delay: Duration,
    ) -> Self {
        Self {
            store,
            history,
            notifier,
            reconciler,
            reset_delay,
        }
    }

    /// Consume the event stream until the bus closes or the task is
    /// aborted. Lagged deliveries are logged and skipped; the idempotent
    /// step matching keeps the state consistent across gaps.
    pub fn spawn(self: Arc<Self>, mut events: broadcast::Receiver<SdkEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => self.handle_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, kind = %self.store.kind(), "Step listener lagged behind the event stream");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(kind = %self.store.kind(), "SDK event stream closed, stopping listener");
                        break;
                    }
                }
            }
        })
    }

    /// Handle one SDK event against this flow's state
    pub async fn handle_event(&self, event: SdkEvent) {
        match event {
            SdkEvent::ExpectedSteps(plan) => {
                // Only the flow with a call in flight owns the announced
                // plan; other flows must not pick it up
                if !self.store.snapshot().await.is_executing {
                    debug!(kind = %self.store.kind(), "Ignoring step plan for an idle flow");
                    return;
                }
                debug!(kind = %self.store.kind(), steps = plan.len(), "Expected steps received");
                self.store.set_planned_steps(plan).await;
            }
            SdkEvent::StepComplete(completion) => {
                self.handle_step_complete(completion).await;
            }
            SdkEvent::TransactionFailed { message, code } => {
                let snapshot = self.store.snapshot().await;
                if !snapshot.is_executing && !snapshot.has_active_steps() {
                    return;
                }
                let error = match code {
                    Some(code) => {
                        anyhow::Error::new(crate::sdk::SdkError::with_code(message, code))
                    }
                    None => anyhow::Error::new(crate::sdk::SdkError::new(message)),
                };
                self.reconciler
                    .handle_failure("sdk transaction event", &error)
                    .await;
            }
        }
    }

    async fn handle_step_complete(&self, completion: StepCompletion) {
        let snapshot = self.store.snapshot().await;
        let (next_steps, outcome) = apply_completion(&snapshot.steps, &completion);

        match outcome {
            StepOutcome::Unknown => {
                debug!(
                    type_id = %completion.type_id,
                    kind = %self.store.kind(),
                    "Completion for a step outside the current plan, ignored"
                );
            }
            StepOutcome::AlreadyDone => {
                debug!(
                    type_id = %completion.type_id,
                    kind = %self.store.kind(),
                    "Duplicate step completion, ignored"
                );
            }
            StepOutcome::Completed(step) => {
                self.store.set_steps(next_steps).await;
                self.notifier
                    .success(format!("{} completed!", format_step_name(&step.step_type)))
                    .await;
            }
            StepOutcome::Submitted { intent, .. } => {
                self.store.set_steps(next_steps).await;
                self.handle_submitted(intent).await;
            }
            StepOutcome::Fulfilled(_) => {
                self.store.set_steps(next_steps).await;
                self.handle_fulfilled().await;
            }
        }
    }

    /// The intent was submitted: create the pending history record and
    /// remember it as the transaction in flight
    async fn handle_submitted(&self, intent: IntentSubmitted) {
        let snapshot = self.store.snapshot().await;
        let kind = self.store.kind();
        let form = &snapshot.form;

        let timestamp = Utc::now().timestamp_millis();
        let record = TransactionRecord {
            id: TransactionRecord::derive_id(intent.intent_hash, timestamp),
            intent_hash: intent.intent_hash,
            kind,
            status: TransactionStatus::Pending,
            token: form.token.clone(),
            amount: if form.amount.is_empty() {
                None
            } else {
                Some(form.amount.clone())
            },
            from_chain: form.from_chain.clone(),
            // Transfers and deposits land on the connected chain
            to_chain: match kind {
                TransactionKind::Bridge | TransactionKind::Execute => form.to_chain.clone(),
                TransactionKind::Transfer | TransactionKind::Deposit => form.from_chain.clone(),
            },
            recipient_address: if kind == TransactionKind::Transfer {
                form.recipient.clone()
            } else {
                None
            },
            explorer_url: intent.explorer_url,
            timestamp,
        };

        self.history.add(record.clone()).await;
        self.store.set_current_transaction(Some(record)).await;
        self.notifier
            .success(format!(
                "{} transaction submitted successfully!",
                kind.label()
            ))
            .await;
    }

    /// The intent was fulfilled: complete the pending record and schedule
    /// the progress reset so the UI can show 100% first
    async fn handle_fulfilled(&self) {
        let snapshot = self.store.snapshot().await;

        if let Some(current) = snapshot.current_transaction.as_ref() {
            self.history
                .update(
                    current.intent_hash,
                    RecordPatch::status(TransactionStatus::Completed),
                )
                .await;
            self.notifier
                .success(format!(
                    "{} transaction completed successfully!",
                    current.kind.label()
                ))
                .await;
        } else {
            warn!(
                kind = %self.store.kind(),
                "Fulfillment event arrived with no transaction in flight"
            );
        }

        let store = self.store.clone();
        let delay = self.reset_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            store.reset_progress().await;
            store.set_current_transaction(None).await;
        });
    }
}
