//! Transaction orchestrator.
//!
//! One orchestrator drives all four transaction kinds; the kinds differ
//! only in their request payload and validation rule, captured by
//! `FlowRequest`. The orchestrator validates before the settlement SDK is
//! ever called, translates thrown errors through the reconciler into the
//! user-facing taxonomy, and returns a uniform outcome so callers never
//! need their own try/catch. History is written exclusively by the step
//! listener, which observes SDK events independently; entries therefore
//! exist even if the calling surface goes away mid-flight.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::FlowError;
use crate::notifications::Notifier;
use crate::reconciler::Reconciler;
use crate::sdk::{
    BridgeAndExecuteParams, BridgeParams, DepositParams, SettlementSdk, SimulationPreview,
    TransferParams,
};
use crate::store::FlowStore;
use crate::types::TransactionKind;

/// A transaction request of one of the four kinds
#[derive(Debug, Clone, PartialEq)]
pub enum FlowRequest {
    Bridge(BridgeParams),
    Transfer(TransferParams),
    Deposit(DepositParams),
    Execute(BridgeAndExecuteParams),
}

fn valid_amount(amount: &str) -> bool {
    amount.parse::<f64>().map(|v| v > 0.0).unwrap_or(false)
}

impl FlowRequest {
    pub fn kind(&self) -> TransactionKind {
        match self {
            FlowRequest::Bridge(_) => TransactionKind::Bridge,
            FlowRequest::Transfer(_) => TransactionKind::Transfer,
            FlowRequest::Deposit(_) => TransactionKind::Deposit,
            FlowRequest::Execute(_) => TransactionKind::Execute,
        }
    }

    /// Check that every required field is present before anything reaches
    /// the settlement SDK
    pub fn validate(&self) -> Result<(), FlowError> {
        let missing = |what: &str| {
            Err(FlowError::Validation(format!(
                "Missing required parameters for {} transaction: {}",
                self.kind(),
                what
            )))
        };

        match self {
            FlowRequest::Bridge(p) => {
                if p.token.is_empty() {
                    return missing("token");
                }
                if !valid_amount(&p.amount) {
                    return missing("amount");
                }
            }
            FlowRequest::Transfer(p) => {
                if p.token.is_empty() {
                    return missing("token");
                }
                if !valid_amount(&p.amount) {
                    return missing("amount");
                }
                if p.recipient.is_empty() {
                    return missing("recipient address");
                }
            }
            FlowRequest::Deposit(p) => {
                if p.contract_address.is_empty() {
                    return missing("contract address");
                }
                if p.function_name.is_empty() {
                    return missing("function name");
                }
                if !p
                    .contract_abi
                    .as_array()
                    .map(|a| !a.is_empty())
                    .unwrap_or(false)
                {
                    return missing("contract ABI");
                }
            }
            FlowRequest::Execute(p) => {
                if p.token.is_empty() {
                    return missing("token");
                }
                if !valid_amount(&p.amount) {
                    return missing("amount");
                }
                if p.contract_address.is_empty() {
                    return missing("contract address");
                }
                if p.function_name.is_empty() {
                    return missing("function name");
                }
            }
        }
        Ok(())
    }
}

/// Uniform result returned past the orchestrator boundary
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteOutcome {
    pub success: bool,

    /// Opaque SDK result on success
    pub data: Option<Value>,

    /// User-facing failure message
    pub error: Option<String>,
}

impl ExecuteOutcome {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Drives one flow's settlement calls and failure handling
pub struct Orchestrator {
    sdk: Arc<dyn SettlementSdk>,
    store: Arc<FlowStore>,
    notifier: Arc<Notifier>,
    reconciler: Arc<Reconciler>,
}

impl Orchestrator {
    pub fn new(
        sdk: Arc<dyn SettlementSdk>,
        store: Arc<FlowStore>,
        notifier: Arc<Notifier>,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            sdk,
            store,
            notifier,
            reconciler,
        }
    }

    /// Execute a transaction end to end. Never panics and never rethrows;
    /// every failure comes back as `success: false` plus a notification.
    pub async fn execute(&self, request: FlowRequest) -> ExecuteOutcome {
        let kind = request.kind();

        let precondition = if !self.sdk.is_ready() {
            Err(FlowError::Validation(format!(
                "Missing required parameters for {} transaction: settlement SDK is not initialized",
                kind
            )))
        } else {
            request.validate()
        };

        if let Err(validation) = precondition {
            let message = validation.to_string();
            warn!(kind = %kind, error = %message, "Transaction rejected before execution");

            // A malformed request must not leave stale progress from a
            // prior attempt on screen; same cleanup the reconciler does
            self.store.reset_progress().await;
            self.store.set_current_transaction(None).await;
            self.store.set_awaiting_allowance(false).await;
            self.store.set_error(Some(message.clone())).await;
            self.notifier.failure(&message, None, false).await;
            return ExecuteOutcome::failed(message);
        }

        self.store.set_executing(true).await;
        self.store.set_error(None).await;
        info!(kind = %kind, "Starting transaction");

        let result = match &request {
            FlowRequest::Bridge(p) => self.sdk.bridge(p).await,
            FlowRequest::Transfer(p) => self.sdk.transfer(p).await,
            FlowRequest::Deposit(p) => self.sdk.deposit(p).await,
            FlowRequest::Execute(p) => self.sdk.bridge_and_execute(p).await,
        };

        self.store.set_executing(false).await;

        match result {
            Ok(data) => {
                debug!(kind = %kind, "Transaction call returned");
                // History and progress belong to the step listener; the
                // orchestrator only clears the submitted form
                self.store.reset_form().await;
                ExecuteOutcome::ok(data)
            }
            Err(err) => {
                let failure = self
                    .reconciler
                    .handle_failure(&format!("{} transaction execution", kind), &err)
                    .await;
                ExecuteOutcome::failed(failure.to_string())
            }
        }
    }

    /// Run the SDK's cost-preview simulation for a request.
    ///
    /// Advisory only: invalid input and simulation failures yield `None`
    /// plus a log line, never a user-facing error. Transfers have no
    /// simulation endpoint.
    pub async fn simulate(&self, request: &FlowRequest) -> Option<SimulationPreview> {
        if !self.sdk.is_ready() || request.validate().is_err() {
            self.store.set_simulation(None).await;
            return None;
        }

        self.store.set_simulating(true).await;

        let result = match request {
            FlowRequest::Bridge(p) => Some(self.sdk.simulate_bridge(p).await),
            FlowRequest::Deposit(p) => Some(self.sdk.simulate_deposit(p).await),
            FlowRequest::Execute(p) => Some(self.sdk.simulate_bridge_and_execute(p).await),
            FlowRequest::Transfer(_) => None,
        };

        self.store.set_simulating(false).await;

        match result {
            Some(Ok(preview)) => {
                self.store.set_simulation(Some(preview.clone())).await;
                Some(preview)
            }
            Some(Err(err)) => {
                warn!(kind = %request.kind(), error = %err, "Simulation failed");
                self.store.set_simulation(None).await;
                None
            }
            None => {
                debug!(kind = %request.kind(), "No simulation endpoint for this kind");
                None
            }
        }
    }
}

/// Debounces form-change triggered simulations.
///
/// Scheduling a new simulation aborts the previous debounce timer
/// outright; a superseded timer must be cancelled, not merely outraced.
/// Once the window has elapsed the simulation call itself always runs to
/// completion, so `is_simulating` is guaranteed to be cleared again.
pub struct SimulationScheduler {
    debounce: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SimulationScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: Mutex::new(None),
        }
    }

    /// Schedule a simulation after the debounce window, superseding any
    /// previously scheduled one
    pub async fn schedule(&self, orchestrator: Arc<Orchestrator>, request: FlowRequest) {
        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        let debounce = self.debounce;
        // The held handle covers only the debounce window; the simulation
        // itself runs detached, where an abort could otherwise strand the
        // in-flight flag mid-call
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            tokio::spawn(async move {
                orchestrator.simulate(&request).await;
            });
        }));
    }

    /// Cancel a simulation still inside its debounce window
    pub async fn cancel(&self) {
        if let Some(previous) = self.pending.lock().await.take() {
            previous.abort();
        }
    }
}
