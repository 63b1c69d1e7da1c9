//! Settlement SDK boundary.
//!
//! The application contains no bridging, settlement or signing logic; all
//! of that is delegated to an external settlement SDK consumed through the
//! `SettlementSdk` trait. The trait covers the action methods, their
//! simulation mirrors, the balance/allowance queries and the event stream.
//! Errors thrown by implementations carry an optional provider-style
//! numeric code (4001 marks a user rejection).

pub mod events;
pub mod rest;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use events::SdkEventBus;

/// Error raised by a settlement SDK implementation.
///
/// `code` follows the EIP-1193 provider convention where present; 4001
/// means the user rejected the request.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SdkError {
    pub message: String,
    pub code: Option<i64>,
}

impl SdkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: i64) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }
}

/// Provider code meaning the user rejected a request
pub const PROVIDER_USER_REJECTED: i64 = 4001;

/// Wallet provider handle passed to `initialize`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletProvider {
    /// Connected account address
    pub address: String,

    /// Chain the wallet is currently connected to
    pub chain_id: u64,

    /// Display name of the connected chain
    pub chain_name: String,
}

/// Parameters for a bridge operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeParams {
    /// Destination chain
    #[serde(rename = "chainId")]
    pub chain_id: u64,

    /// Token symbol to bridge
    pub token: String,

    /// Amount in display units
    pub amount: String,
}

/// Parameters for a same-chain transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferParams {
    #[serde(rename = "chainId")]
    pub chain_id: u64,

    pub token: String,

    pub amount: String,

    /// Recipient address
    pub recipient: String,
}

/// Parameters for a funded contract call on a destination chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositParams {
    #[serde(rename = "toChainId")]
    pub to_chain_id: u64,

    #[serde(rename = "contractAddress")]
    pub contract_address: String,

    /// Contract ABI fragment covering the called function
    #[serde(rename = "contractAbi")]
    pub contract_abi: serde_json::Value,

    #[serde(rename = "functionName")]
    pub function_name: String,

    #[serde(rename = "functionParams")]
    pub function_params: Vec<serde_json::Value>,

    /// Native value to attach, in display units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(rename = "gasLimit", skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<String>,
}

/// Parameters for bridging funds and executing a contract call in one flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeAndExecuteParams {
    #[serde(rename = "toChainId")]
    pub to_chain_id: u64,

    pub token: String,

    pub amount: String,

    #[serde(rename = "contractAddress")]
    pub contract_address: String,

    #[serde(rename = "contractAbi")]
    pub contract_abi: serde_json::Value,

    #[serde(rename = "functionName")]
    pub function_name: String,

    #[serde(rename = "functionParams")]
    pub function_params: Vec<serde_json::Value>,
}

/// Cost/fee preview returned by the simulation endpoints.
///
/// Advisory only; a failed simulation never blocks the real transaction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationPreview {
    /// Proposed intent (sources, destination, fees) for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<serde_json::Value>,

    /// Token metadata for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<serde_json::Value>,

    /// Estimated gas, in display units
    #[serde(rename = "gasUsed", skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<String>,

    /// Total fee including the solver fee, in display units
    #[serde(rename = "totalFee", skip_serializing_if = "Option::is_none")]
    pub total_fee: Option<String>,
}

/// Per-chain share of a unified balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainBalance {
    #[serde(rename = "chainId")]
    pub chain_id: u64,

    #[serde(rename = "chainName")]
    pub chain_name: String,

    pub balance: String,
}

/// Aggregated balance of one token across all supported chains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedBalance {
    pub symbol: String,

    /// Total across chains, in display units
    pub balance: String,

    /// Fiat value of the total
    #[serde(rename = "balanceInFiat")]
    pub balance_fiat: f64,

    /// Per-chain breakdown
    pub breakdown: Vec<ChainBalance>,
}

/// Current allowance of one token on one chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowanceInfo {
    #[serde(rename = "chainId")]
    pub chain_id: u64,

    pub token: String,

    /// Current allowance in base units, decimal string
    pub allowance: String,
}

/// Allowance amount chosen by the user for one required source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllowanceAmount {
    /// Exactly the minimum the intent requires
    Min,

    /// Unlimited approval
    Max,

    /// An explicit amount in base units
    Exact(String),
}

/// The external cross-chain settlement SDK, treated as a black box beyond
/// this contract.
#[async_trait]
pub trait SettlementSdk: Send + Sync + 'static {
    /// Bind the SDK to a connected wallet; called once per connection
    async fn initialize(&self, provider: &WalletProvider) -> Result<()>;

    /// Tear down the SDK session on wallet disconnect
    async fn deinit(&self) -> Result<()>;

    /// Whether `initialize` has completed for the current session
    fn is_ready(&self) -> bool;

    async fn bridge(&self, params: &BridgeParams) -> Result<serde_json::Value>;

    async fn transfer(&self, params: &TransferParams) -> Result<serde_json::Value>;

    async fn deposit(&self, params: &DepositParams) -> Result<serde_json::Value>;

    async fn bridge_and_execute(
        &self,
        params: &BridgeAndExecuteParams,
    ) -> Result<serde_json::Value>;

    async fn simulate_bridge(&self, params: &BridgeParams) -> Result<SimulationPreview>;

    async fn simulate_deposit(&self, params: &DepositParams) -> Result<SimulationPreview>;

    async fn simulate_bridge_and_execute(
        &self,
        params: &BridgeAndExecuteParams,
    ) -> Result<SimulationPreview>;

    /// Balances of all supported tokens aggregated across chains
    async fn get_unified_balances(&self) -> Result<Vec<UnifiedBalance>>;

    /// Current allowances for the given tokens on one chain
    async fn get_allowance(&self, chain_id: u64, tokens: &[String]) -> Result<Vec<AllowanceInfo>>;

    /// Grant allowances for the given tokens on one chain
    async fn set_allowance(
        &self,
        chain_id: u64,
        tokens: &[String],
        amount: AllowanceAmount,
    ) -> Result<()>;

    /// Event stream carrying expected-steps and step-complete events
    fn events(&self) -> &SdkEventBus;
}
