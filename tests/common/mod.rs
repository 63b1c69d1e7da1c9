//! Shared test doubles: a scripted settlement SDK, a collecting
//! notification sink and a wiring fixture for one flow.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use unibridge::history::{HistoryStore, MemorySlot};
use unibridge::notifications::{Notification, NotificationSink, Notifier};
use unibridge::orchestrator::Orchestrator;
use unibridge::progress::ProgressListener;
use unibridge::reconciler::Reconciler;
use unibridge::sdk::events::{PlannedStep, SdkEventBus, StepCompletion};
use unibridge::sdk::{
    AllowanceAmount, AllowanceInfo, BridgeAndExecuteParams, BridgeParams, DepositParams,
    SettlementSdk, SimulationPreview, TransferParams, UnifiedBalance, WalletProvider,
};
use unibridge::store::FlowStore;
use unibridge::types::{TransactionKind, TransactionRecord, TransactionStatus};

/// Settlement SDK double returning scripted results and recording calls
pub struct ScriptedSdk {
    bus: SdkEventBus,
    ready: AtomicBool,
    action_results: Mutex<VecDeque<Result<Value>>>,
    simulation_results: Mutex<VecDeque<Result<SimulationPreview>>>,
    simulation_delay: Mutex<Option<Duration>>,
    balances: Mutex<Vec<UnifiedBalance>>,
    allowances: Mutex<Vec<AllowanceInfo>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSdk {
    /// An SDK that still needs `initialize`
    pub fn new() -> Self {
        Self {
            bus: SdkEventBus::default(),
            ready: AtomicBool::new(false),
            action_results: Mutex::new(VecDeque::new()),
            simulation_results: Mutex::new(VecDeque::new()),
            simulation_delay: Mutex::new(None),
            balances: Mutex::new(Vec::new()),
            allowances: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// An SDK that is already initialized
    pub fn ready() -> Self {
        let sdk = Self::new();
        sdk.ready.store(true, Ordering::SeqCst);
        sdk
    }

    /// Queue the result of the next action call (bridge, transfer, ...)
    pub fn push_action(&self, result: Result<Value>) {
        self.action_results.lock().unwrap().push_back(result);
    }

    /// Queue the result of the next simulation call
    pub fn push_simulation(&self, result: Result<SimulationPreview>) {
        self.simulation_results.lock().unwrap().push_back(result);
    }

    /// Make every simulation call sleep before returning
    pub fn set_simulation_delay(&self, delay: Duration) {
        *self.simulation_delay.lock().unwrap() = Some(delay);
    }

    async fn simulate_latency(&self) {
        let delay = *self.simulation_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn set_allowances(&self, allowances: Vec<AllowanceInfo>) {
        *self.allowances.lock().unwrap() = allowances;
    }

    pub fn set_balances(&self, balances: Vec<UnifiedBalance>) {
        *self.balances.lock().unwrap() = balances;
    }

    /// How many times a method was invoked
    pub fn call_count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == name)
            .count()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }

    fn next_action(&self) -> Result<Value> {
        self.action_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({ "success": true })))
    }

    fn next_simulation(&self) -> Result<SimulationPreview> {
        self.simulation_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SimulationPreview::default()))
    }
}

#[async_trait]
impl SettlementSdk for ScriptedSdk {
    async fn initialize(&self, _provider: &WalletProvider) -> Result<()> {
        self.record("initialize");
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn deinit(&self) -> Result<()> {
        self.record("deinit");
        self.ready.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn bridge(&self, _params: &BridgeParams) -> Result<Value> {
        self.record("bridge");
        self.next_action()
    }

    async fn transfer(&self, _params: &TransferParams) -> Result<Value> {
        self.record("transfer");
        self.next_action()
    }

    async fn deposit(&self, _params: &DepositParams) -> Result<Value> {
        self.record("deposit");
        self.next_action()
    }

    async fn bridge_and_execute(&self, _params: &BridgeAndExecuteParams) -> Result<Value> {
        self.record("bridge_and_execute");
        self.next_action()
    }

    async fn simulate_bridge(&self, _params: &BridgeParams) -> Result<SimulationPreview> {
        self.record("simulate_bridge");
        self.simulate_latency().await;
        self.next_simulation()
    }

    async fn simulate_deposit(&self, _params: &DepositParams) -> Result<SimulationPreview> {
        self.record("simulate_deposit");
        self.simulate_latency().await;
        self.next_simulation()
    }

    async fn simulate_bridge_and_execute(
        &self,
        _params: &BridgeAndExecuteParams,
    ) -> Result<SimulationPreview> {
        self.record("simulate_bridge_and_execute");
        self.simulate_latency().await;
        self.next_simulation()
    }

    async fn get_unified_balances(&self) -> Result<Vec<UnifiedBalance>> {
        self.record("get_unified_balances");
        Ok(self.balances.lock().unwrap().clone())
    }

    async fn get_allowance(&self, _chain_id: u64, _tokens: &[String]) -> Result<Vec<AllowanceInfo>> {
        self.record("get_allowance");
        Ok(self.allowances.lock().unwrap().clone())
    }

    async fn set_allowance(
        &self,
        _chain_id: u64,
        _tokens: &[String],
        _amount: AllowanceAmount,
    ) -> Result<()> {
        self.record("set_allowance");
        Ok(())
    }

    fn events(&self) -> &SdkEventBus {
        &self.bus
    }
}

/// Notification sink keeping every delivered notification for assertions
#[derive(Default)]
pub struct CollectingSink {
    notifications: Mutex<Vec<Notification>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for CollectingSink {
    fn name(&self) -> &str {
        "collect"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// One fully wired flow over a scripted SDK and an in-memory ledger
pub struct FlowFixture {
    pub sdk: Arc<ScriptedSdk>,
    pub store: Arc<FlowStore>,
    pub history: Arc<HistoryStore>,
    pub notifier: Arc<Notifier>,
    pub sink: Arc<CollectingSink>,
    pub reconciler: Arc<Reconciler>,
    pub listener: Arc<ProgressListener>,
    pub orchestrator: Arc<Orchestrator>,
}

impl FlowFixture {
    pub async fn new(kind: TransactionKind, reset_delay: Duration) -> Self {
        let sdk = Arc::new(ScriptedSdk::ready());
        let store = Arc::new(FlowStore::new(kind));
        let history = Arc::new(HistoryStore::new(Arc::new(MemorySlot::new()), 100));
        let notifier = Arc::new(Notifier::empty());
        let sink = Arc::new(CollectingSink::new());
        notifier.register(sink.clone()).await;

        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            history.clone(),
            notifier.clone(),
        ));
        let listener = Arc::new(ProgressListener::new(
            store.clone(),
            history.clone(),
            notifier.clone(),
            reconciler.clone(),
            reset_delay,
        ));
        let orchestrator = Arc::new(Orchestrator::new(
            sdk.clone(),
            store.clone(),
            notifier.clone(),
            reconciler.clone(),
        ));

        Self {
            sdk,
            store,
            history,
            notifier,
            sink,
            reconciler,
            listener,
            orchestrator,
        }
    }
}

pub fn planned(step_type: &str, type_id: &str) -> PlannedStep {
    PlannedStep {
        step_type: step_type.to_string(),
        type_id: type_id.to_string(),
        data: None,
    }
}

pub fn completion(type_id: &str, data: Option<Value>) -> StepCompletion {
    StepCompletion {
        type_id: type_id.to_string(),
        data,
    }
}

/// Payload the intent-submitted completion carries on the wire
pub fn submitted_payload(intent_hash: u64, explorer_url: &str) -> Value {
    json!({ "explorerURL": explorer_url, "intentHash": intent_hash })
}

/// A standard three-step bridge plan: allowance, submission, fulfillment
pub fn bridge_plan() -> Vec<PlannedStep> {
    vec![
        planned("ALLOWANCE_SET", "A1"),
        planned("INTENT_SUBMITTED", "IS"),
        planned("INTENT_FULFILLED", "IF"),
    ]
}

pub fn record(
    intent_hash: u64,
    status: TransactionStatus,
    timestamp: i64,
) -> TransactionRecord {
    TransactionRecord {
        id: TransactionRecord::derive_id(intent_hash, timestamp),
        intent_hash,
        kind: TransactionKind::Bridge,
        status,
        token: Some("USDC".to_string()),
        amount: Some("10".to_string()),
        from_chain: Some("Base".to_string()),
        to_chain: Some("Arbitrum".to_string()),
        recipient_address: None,
        explorer_url: format!("https://explorer.example/intent/{}", intent_hash),
        timestamp,
    }
}
