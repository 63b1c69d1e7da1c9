//! REST transport for the settlement SDK.
//!
//! `RestSettlementClient` implements the `SettlementSdk` contract against
//! an HTTP settlement service. Action and simulation calls map onto JSON
//! endpoints; failures come back as `{message, code}` bodies and are
//! surfaced as `SdkError` so the reconciler can classify provider-style
//! rejection codes. Server-pushed progress events are translated onto the
//! local event bus by `ingest_wire_event` using the pinned wire names.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::events::{
    PlannedStep, SdkEvent, SdkEventBus, StepCompletion, EVENT_ERROR, EVENT_EXPECTED_STEPS,
    EVENT_STEP_COMPLETE, EVENT_TRANSACTION_FAILED,
};
use super::{
    AllowanceAmount, AllowanceInfo, BridgeAndExecuteParams, BridgeParams, DepositParams, SdkError,
    SettlementSdk, SimulationPreview, TransferParams, UnifiedBalance, WalletProvider,
};

/// Error body returned by the settlement service
#[derive(Debug, Deserialize)]
struct ServiceError {
    message: String,
    code: Option<i64>,
}

/// HTTP-backed settlement SDK client
pub struct RestSettlementClient {
    base_url: String,
    network: String,
    client: reqwest::Client,
    events: SdkEventBus,
    initialized: AtomicBool,
}

impl RestSettlementClient {
    /// Create a client for the given service endpoint
    pub fn new(base_url: &str, network: &str, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client for settlement service")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            network: network.to_string(),
            client,
            events: SdkEventBus::default(),
            initialized: AtomicBool::new(false),
        })
    }

    /// Translate a wire event pushed by the service onto the local bus.
    ///
    /// Unknown event names and malformed payloads are logged and dropped;
    /// the event stream must never take a flow down.
    pub fn ingest_wire_event(&self, name: &str, payload: Value) {
        match name {
            EVENT_EXPECTED_STEPS => match serde_json::from_value::<Vec<PlannedStep>>(payload) {
                Ok(steps) => self.events.emit(SdkEvent::ExpectedSteps(steps)),
                Err(e) => warn!(error = %e, "Malformed expected_steps event, dropped"),
            },
            EVENT_STEP_COMPLETE => match serde_json::from_value::<StepCompletion>(payload) {
                Ok(step) => self.events.emit(SdkEvent::StepComplete(step)),
                Err(e) => warn!(error = %e, "Malformed step_complete event, dropped"),
            },
            EVENT_ERROR | EVENT_TRANSACTION_FAILED => {
                let message = payload
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("Transaction failed")
                    .to_string();
                let code = payload.get("code").and_then(|c| c.as_i64());
                self.events.emit(SdkEvent::TransactionFailed { message, code });
            }
            other => debug!(event = other, "Ignoring unknown settlement event"),
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(%url, "Calling settlement service");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Settlement service request failed: {}", path))?;

        let status = response.status();
        if status.is_success() {
            let value = response
                .json::<Value>()
                .await
                .context("Settlement service returned a malformed body")?;
            return Ok(value);
        }

        let error = match response.json::<ServiceError>().await {
            Ok(e) => SdkError {
                message: e.message,
                code: e.code,
            },
            Err(_) => SdkError::new(format!(
                "Settlement service returned {} for {}",
                status, path
            )),
        };

        Err(error.into())
    }

    async fn post_typed<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T> {
        let value = self.post(path, body).await?;
        serde_json::from_value(value)
            .with_context(|| format!("Unexpected response shape from {}", path))
    }
}

#[async_trait]
impl SettlementSdk for RestSettlementClient {
    async fn initialize(&self, provider: &WalletProvider) -> Result<()> {
        let body = serde_json::json!({
            "network": self.network,
            "address": provider.address,
            "chainId": provider.chain_id,
        });
        self.post("v1/session", &body).await?;
        self.initialized.store(true, Ordering::SeqCst);
        debug!(address = %provider.address, "Settlement session established");
        Ok(())
    }

    async fn deinit(&self) -> Result<()> {
        self.initialized.store(false, Ordering::SeqCst);
        let body = serde_json::json!({});
        // Best-effort: the local session is gone either way
        if let Err(e) = self.post("v1/session/close", &body).await {
            warn!(error = %e, "Settlement session close failed");
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    async fn bridge(&self, params: &BridgeParams) -> Result<Value> {
        self.post("v1/bridge", &serde_json::to_value(params)?).await
    }

    async fn transfer(&self, params: &TransferParams) -> Result<Value> {
        self.post("v1/transfer", &serde_json::to_value(params)?).await
    }

    async fn deposit(&self, params: &DepositParams) -> Result<Value> {
        self.post("v1/deposit", &serde_json::to_value(params)?).await
    }

    async fn bridge_and_execute(&self, params: &BridgeAndExecuteParams) -> Result<Value> {
        self.post("v1/bridge-execute", &serde_json::to_value(params)?)
            .await
    }

    async fn simulate_bridge(&self, params: &BridgeParams) -> Result<SimulationPreview> {
        self.post_typed("v1/simulate/bridge", &serde_json::to_value(params)?)
            .await
    }

    async fn simulate_deposit(&self, params: &DepositParams) -> Result<SimulationPreview> {
        self.post_typed("v1/simulate/deposit", &serde_json::to_value(params)?)
            .await
    }

    async fn simulate_bridge_and_execute(
        &self,
        params: &BridgeAndExecuteParams,
    ) -> Result<SimulationPreview> {
        self.post_typed("v1/simulate/bridge-execute", &serde_json::to_value(params)?)
            .await
    }

    async fn get_unified_balances(&self) -> Result<Vec<UnifiedBalance>> {
        self.post_typed("v1/balances", &serde_json::json!({})).await
    }

    async fn get_allowance(&self, chain_id: u64, tokens: &[String]) -> Result<Vec<AllowanceInfo>> {
        let body = serde_json::json!({ "chainId": chain_id, "tokens": tokens });
        self.post_typed("v1/allowance", &body).await
    }

    async fn set_allowance(
        &self,
        chain_id: u64,
        tokens: &[String],
        amount: AllowanceAmount,
    ) -> Result<()> {
        let body = serde_json::json!({
            "chainId": chain_id,
            "tokens": tokens,
            "amount": amount,
        });
        self.post("v1/allowance/set", &body).await?;
        Ok(())
    }

    fn events(&self) -> &SdkEventBus {
        &self.events
    }
}
