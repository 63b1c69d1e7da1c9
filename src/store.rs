//! Per-flow state container.
//!
//! Each transaction kind owns one `FlowStore` holding its form fields,
//! in-flight flags, progress steps and the pointer to the transaction
//! currently awaiting fulfillment. Keeping the slices separate means a
//! bridge attempt can never contaminate the step list of a concurrent
//! bridge-and-execute attempt.
//!
//! The store is single-writer-per-mutation: only the step listener mutates
//! progress and the current transaction, only the orchestrator mutates the
//! in-flight flags. Readers take cheap snapshots; a revision watch channel
//! lets any surface observe changes without polling.

use tokio::sync::{watch, RwLock};

use crate::sdk::events::PlannedStep;
use crate::sdk::SimulationPreview;
use crate::types::{ProgressStep, TransactionKind, TransactionRecord};

/// Form fields shared by all transaction kinds; kind-specific contract
/// fields travel inside the request itself.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormState {
    /// Selected token symbol
    pub token: Option<String>,

    /// Amount in display units
    pub amount: String,

    /// Name of the chain the wallet is connected to
    pub from_chain: Option<String>,

    /// Name of the selected destination chain
    pub to_chain: Option<String>,

    /// Recipient address (transfers only)
    pub recipient: Option<String>,
}

/// Point-in-time view of one flow's state
#[derive(Debug, Clone, Default)]
pub struct FlowSnapshot {
    pub form: FormState,

    /// Ordered step plan of the in-flight attempt, empty between attempts
    pub steps: Vec<ProgressStep>,

    /// The pending history record of the in-flight attempt, if submitted
    pub current_transaction: Option<TransactionRecord>,

    /// A settlement call is awaiting its result
    pub is_executing: bool,

    /// A cost-preview simulation is running
    pub is_simulating: bool,

    /// The SDK is paused waiting for an allowance confirmation
    pub awaiting_allowance: bool,

    /// Last user-facing error, cleared on the next attempt
    pub error: Option<String>,

    /// Latest cost preview for the current form values
    pub simulation: Option<SimulationPreview>,
}

impl FlowSnapshot {
    /// Whether a step plan is currently on screen
    pub fn has_active_steps(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn completed_steps(&self) -> Vec<&ProgressStep> {
        self.steps.iter().filter(|s| s.done).collect()
    }

    pub fn pending_steps(&self) -> Vec<&ProgressStep> {
        self.steps.iter().filter(|s| !s.done).collect()
    }

    /// First incomplete step, if any
    pub fn current_step(&self) -> Option<&ProgressStep> {
        self.steps.iter().find(|s| !s.done)
    }

    /// Completion percentage over the current plan (0 when no plan)
    pub fn progress_percentage(&self) -> f64 {
        if self.steps.is_empty() {
            return 0.0;
        }
        let done = self.steps.iter().filter(|s| s.done).count();
        (done as f64 / self.steps.len() as f64) * 100.0
    }

    /// True once every step of a non-empty plan is done
    pub fn all_steps_completed(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.done)
    }
}

/// State container for one transaction kind
pub struct FlowStore {
    kind: TransactionKind,
    state: RwLock<FlowSnapshot>,
    revision: watch::Sender<u64>,
}

impl FlowStore {
    pub fn new(kind: TransactionKind) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            kind,
            state: RwLock::new(FlowSnapshot::default()),
            revision,
        }
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Take a point-in-time copy of the flow state
    pub async fn snapshot(&self) -> FlowSnapshot {
        self.state.read().await.clone()
    }

    /// Watch channel ticking on every mutation
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    pub async fn set_token(&self, token: Option<String>) {
        let mut state = self.state.write().await;
        state.form.token = token;
        state.error = None;
        drop(state);
        self.bump();
    }

    pub async fn set_amount(&self, amount: impl Into<String>) {
        let mut state = self.state.write().await;
        state.form.amount = amount.into();
        state.error = None;
        drop(state);
        self.bump();
    }

    pub async fn set_from_chain(&self, chain: Option<String>) {
        let mut state = self.state.write().await;
        state.form.from_chain = chain;
        drop(state);
        self.bump();
    }

    pub async fn set_to_chain(&self, chain: Option<String>) {
        let mut state = self.state.write().await;
        state.form.to_chain = chain;
        state.form.token = None;
        state.error = None;
        drop(state);
        self.bump();
    }

    pub async fn set_recipient(&self, recipient: Option<String>) {
        let mut state = self.state.write().await;
        state.form.recipient = recipient;
        state.error = None;
        drop(state);
        self.bump();
    }

    /// Clear the form after a successful submission; the wallet chain is
    /// not a user entry and survives the reset
    pub async fn reset_form(&self) {
        let mut state = self.state.write().await;
        let from_chain = state.form.from_chain.take();
        state.form = FormState {
            from_chain,
            ..FormState::default()
        };
        state.error = None;
        drop(state);
        self.bump();
    }

    /// Replace the step plan wholesale; a fresh plan must never inherit
    /// stale steps from a previous attempt
    pub async fn set_steps(&self, steps: Vec<ProgressStep>) {
        let mut state = self.state.write().await;
        state.steps = steps;
        drop(state);
        self.bump();
    }

    /// Install a new expected-steps plan with all steps incomplete
    pub async fn set_planned_steps(&self, plan: Vec<PlannedStep>) {
        self.set_steps(plan.into_iter().map(ProgressStep::from).collect())
            .await;
    }

    /// Discard the step plan entirely
    pub async fn reset_progress(&self) {
        let mut state = self.state.write().await;
        state.steps = Vec::new();
        drop(state);
        self.bump();
    }

    pub async fn set_current_transaction(&self, record: Option<TransactionRecord>) {
        let mut state = self.state.write().await;
        state.current_transaction = record;
        drop(state);
        self.bump();
    }

    pub async fn set_executing(&self, executing: bool) {
        let mut state = self.state.write().await;
        state.is_executing = executing;
        drop(state);
        self.bump();
    }

    pub async fn set_simulating(&self, simulating: bool) {
        let mut state = self.state.write().await;
        state.is_simulating = simulating;
        drop(state);
        self.bump();
    }

    pub async fn set_awaiting_allowance(&self, awaiting: bool) {
        let mut state = self.state.write().await;
        state.awaiting_allowance = awaiting;
        drop(state);
        self.bump();
    }

    pub async fn set_error(&self, error: Option<String>) {
        let mut state = self.state.write().await;
        state.error = error;
        drop(state);
        self.bump();
    }

    pub async fn set_simulation(&self, simulation: Option<SimulationPreview>) {
        let mut state = self.state.write().await;
        state.simulation = simulation;
        drop(state);
        self.bump();
    }
}
