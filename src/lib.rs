//! Unibridge flow core
//!
//! Client-side core of a cross-chain unified balance / bridge / transfer /
//! swap experience built over an external settlement SDK. The SDK owns
//! bridging, settlement and signing; this crate owns the transaction
//! progress and history reconciliation around it: tracking multi-step
//! plans emitted by the SDK, persisting a bounded transaction ledger, and
//! recovering cleanly from user rejection and errors at any step.

pub mod allowance;
pub mod config;
pub mod errors;
pub mod history;
pub mod hooks;
pub mod notifications;
pub mod orchestrator;
pub mod progress;
pub mod reconciler;
pub mod sdk;
pub mod store;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::allowance::AllowanceManager;
use crate::config::{AppConfig, ConfigManager};
use crate::history::{FileSlot, HistoryStore};
use crate::hooks::HookRegistry;
use crate::notifications::Notifier;
use crate::orchestrator::{Orchestrator, SimulationScheduler};
use crate::progress::ProgressListener;
use crate::reconciler::Reconciler;
use crate::sdk::{SettlementSdk, UnifiedBalance, WalletProvider};
use crate::store::FlowStore;
use crate::types::TransactionKind;

/// Everything one transaction kind needs: its state slice, orchestrator
/// and debounced simulation scheduler
pub struct FlowHandle {
    pub store: Arc<FlowStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub scheduler: Arc<SimulationScheduler>,
    reconciler: Arc<Reconciler>,
    listener: Arc<ProgressListener>,
    listener_task: Option<JoinHandle<()>>,
}

impl FlowHandle {
    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }
}

/// Application state wiring the settlement SDK, the shared history ledger
/// and the per-kind flows together.
///
/// Each transaction kind gets an independent state slice so concurrent
/// flows cannot contaminate each other's step lists; the history ledger is
/// the durable superset shared by all of them.
pub struct AppState {
    pub config: Arc<ConfigManager>,
    pub history: Arc<HistoryStore>,
    pub notifier: Arc<Notifier>,
    pub hooks: Arc<HookRegistry>,
    pub allowance: Arc<AllowanceManager>,
    sdk: Arc<dyn SettlementSdk>,
    flows: HashMap<TransactionKind, FlowHandle>,
}

impl AppState {
    /// Build the application state around a settlement SDK implementation
    pub async fn new(config: AppConfig, sdk: Arc<dyn SettlementSdk>) -> Self {
        let slot = Arc::new(FileSlot::new(config.history.storage_path.clone()));
        Self::with_slot(config, sdk, slot).await
    }

    /// Build with an explicit persistence slot (tests use the in-memory one)
    pub async fn with_slot(
        config: AppConfig,
        sdk: Arc<dyn SettlementSdk>,
        slot: Arc<dyn history::KeyValueSlot>,
    ) -> Self {
        let history = Arc::new(HistoryStore::new(slot, config.history.max_entries));
        let notifier = Arc::new(Notifier::new());
        let hooks = Arc::new(HookRegistry::new());
        let allowance = Arc::new(AllowanceManager::new(sdk.clone()));
        let reset_delay = Duration::from_millis(config.progress.reset_delay_ms);
        let debounce = Duration::from_millis(config.simulation.debounce_ms);

        let mut flows = HashMap::new();
        for kind in [
            TransactionKind::Bridge,
            TransactionKind::Transfer,
            TransactionKind::Deposit,
            TransactionKind::Execute,
        ] {
            let store = Arc::new(FlowStore::new(kind));
            let reconciler = Arc::new(Reconciler::new(
                store.clone(),
                history.clone(),
                notifier.clone(),
            ));
            let orchestrator = Arc::new(Orchestrator::new(
                sdk.clone(),
                store.clone(),
                notifier.clone(),
                reconciler.clone(),
            ));
            let listener = Arc::new(ProgressListener::new(
                store.clone(),
                history.clone(),
                notifier.clone(),
                reconciler.clone(),
                reset_delay,
            ));

            flows.insert(
                kind,
                FlowHandle {
                    store,
                    orchestrator,
                    scheduler: Arc::new(SimulationScheduler::new(debounce)),
                    reconciler,
                    listener,
                    listener_task: None,
                },
            );
        }

        Self {
            config: Arc::new(ConfigManager::new(config)),
            history,
            notifier,
            hooks,
            allowance,
            sdk,
            flows,
        }
    }

    /// Bind to a connected wallet: initialize the SDK session, load the
    /// persisted history, expire stale pending entries and attach a step
    /// listener per flow.
    pub async fn connect(&mut self, provider: &WalletProvider) -> Result<()> {
        info!(address = %provider.address, "Connecting wallet");

        self.sdk
            .initialize(provider)
            .await
            .context("Failed to initialize the settlement SDK")?;

        self.history.load().await;
        let config = self.config.get_config().await;
        self.history
            .expire_stale_pending(chrono::Duration::hours(config.history.stale_pending_hours))
            .await;

        for handle in self.flows.values_mut() {
            handle
                .store
                .set_from_chain(Some(provider.chain_name.clone()))
                .await;
            let task = handle.listener.clone().spawn(self.sdk.events().subscribe());
            handle.listener_task = Some(task);
        }

        info!("Settlement SDK ready");
        Ok(())
    }

    /// Tear down on wallet disconnect: detach listeners and close the SDK
    /// session. An in-flight settlement call is not aborted; the SDK owns
    /// its own abort semantics.
    pub async fn disconnect(&mut self) {
        for handle in self.flows.values_mut() {
            if let Some(task) = handle.listener_task.take() {
                task.abort();
            }
            handle.scheduler.cancel().await;
        }

        if let Err(e) = self.sdk.deinit().await {
            warn!(error = %e, "Settlement SDK teardown reported an error");
        }
        debug!("Wallet disconnected");
    }

    /// The flow handle for one transaction kind
    pub fn flow(&self, kind: TransactionKind) -> &FlowHandle {
        // Every kind is inserted in the constructor
        &self.flows[&kind]
    }

    /// Balances aggregated across chains, straight from the SDK
    pub async fn unified_balances(&self) -> Result<Vec<UnifiedBalance>> {
        self.sdk
            .get_unified_balances()
            .await
            .context("Failed to fetch unified balances")
    }
}

/// Initialize logging
pub fn init_logging(log_level: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global default subscriber")?;

    info!("Logging initialized at {} level", log_level);
    Ok(())
}

/// Version information
pub mod version {
    /// Current version from Cargo.toml
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
