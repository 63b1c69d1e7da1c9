//! Types module
//!
//! Core types shared across the transaction flow engine: transaction kinds,
//! lifecycle status, progress steps and the persisted history record shape.

use serde::{Deserialize, Serialize};

use crate::sdk::events::PlannedStep;

/// Kind of cross-chain operation driven through the settlement SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Move funds from source chains to a destination chain
    Bridge,

    /// Send funds to a recipient on the connected chain
    Transfer,

    /// Call a contract function on a destination chain, funding it on the way
    Deposit,

    /// Bridge funds and execute a contract call in one flow
    Execute,
}

impl Default for TransactionKind {
    fn default() -> Self {
        TransactionKind::Bridge
    }
}

impl TransactionKind {
    /// Human-oriented label used in notifications ("Bridge transaction submitted ...")
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Bridge => "Bridge",
            TransactionKind::Transfer => "Transfer",
            TransactionKind::Deposit => "Deposit",
            TransactionKind::Execute => "Bridge & Execute",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransactionKind::Bridge => "bridge",
            TransactionKind::Transfer => "transfer",
            TransactionKind::Deposit => "deposit",
            TransactionKind::Execute => "execute",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle status of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Intent submitted, awaiting solver fulfillment
    Pending,

    /// Intent fulfilled
    Completed,

    /// Flow failed or was cancelled
    Failed,
}

/// One unit of a multi-step transaction plan, plus the local completion flag.
///
/// The `step_type` and `type_id` pair comes verbatim from the settlement
/// SDK's expected-steps plan and is never modified locally; `done` is the
/// only mutable field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressStep {
    /// Human-oriented step category (e.g. "ALLOWANCE_SET")
    #[serde(rename = "type")]
    pub step_type: String,

    /// Stable short code identifying the step (e.g. "IS", "IF")
    #[serde(rename = "typeID")]
    pub type_id: String,

    /// Opaque payload attached to the step by the SDK
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Whether the matching step-complete event has arrived
    pub done: bool,
}

impl From<PlannedStep> for ProgressStep {
    fn from(step: PlannedStep) -> Self {
        Self {
            step_type: step.step_type,
            type_id: step.type_id,
            data: step.data,
            done: false,
        }
    }
}

/// Payload carried by the intent-submitted step completion event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentSubmitted {
    /// Explorer link for the submitted intent
    #[serde(rename = "explorerURL")]
    pub explorer_url: String,

    /// Hash identifying the intent, used to deduplicate history entries
    #[serde(rename = "intentHash")]
    pub intent_hash: u64,
}

/// A single entry in the persisted transaction history.
///
/// At most one record exists per `intent_hash`. The serialized field names
/// match the legacy storage layout so previously persisted ledgers keep
/// loading; records written before `id`/`type` existed are back-filled on
/// load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Stable identifier derived from intent hash and timestamp
    #[serde(default)]
    pub id: String,

    #[serde(rename = "intentHash")]
    pub intent_hash: u64,

    /// Transaction kind; legacy records default to bridge
    #[serde(rename = "type", default)]
    pub kind: TransactionKind,

    pub status: TransactionStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,

    #[serde(rename = "fromChain", skip_serializing_if = "Option::is_none")]
    pub from_chain: Option<String>,

    #[serde(rename = "toChain", skip_serializing_if = "Option::is_none")]
    pub to_chain: Option<String>,

    #[serde(rename = "recipientAddress", skip_serializing_if = "Option::is_none")]
    pub recipient_address: Option<String>,

    #[serde(rename = "explorerURL")]
    pub explorer_url: String,

    /// Submission time in milliseconds since the epoch
    pub timestamp: i64,
}

impl TransactionRecord {
    /// Derive the stable record identifier from intent hash and timestamp
    pub fn derive_id(intent_hash: u64, timestamp: i64) -> String {
        format!("{}-{}", intent_hash, timestamp)
    }
}
