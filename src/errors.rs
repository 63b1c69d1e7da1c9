//! Error taxonomy for transaction flows.
//!
//! Every failure that can surface to a user is mapped onto one of these
//! variants before display. Classification itself lives in the reconciler;
//! this module only defines the shapes and their user-facing wording.

use thiserror::Error;

/// User-facing failure classes for a transaction flow.
///
/// `Validation` is raised before the settlement SDK is ever called; all
/// other variants classify errors thrown by the SDK or the wallet provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// A required field was missing or malformed; the SDK was not called
    #[error("{0}")]
    Validation(String),

    /// The user rejected an allowance or a signature request (incl. provider code 4001)
    #[error("Token approval was cancelled")]
    UserRejected,

    /// The wallet lacks funds to cover the transaction
    #[error("Insufficient funds to complete the transaction")]
    InsufficientFunds,

    /// Gas estimation or gas payment failed
    #[error("Transaction failed due to gas estimation")]
    InsufficientGas,

    /// Anything else; the message is truncated at the first colon for display
    #[error("{0}")]
    General(String),
}

impl FlowError {
    /// Short stable name used in structured log fields
    pub fn name(&self) -> &'static str {
        match self {
            FlowError::Validation(_) => "validation",
            FlowError::UserRejected => "user_rejected",
            FlowError::InsufficientFunds => "insufficient_funds",
            FlowError::InsufficientGas => "insufficient_gas",
            FlowError::General(_) => "general",
        }
    }

    /// Secondary line shown under the toast message, when one helps
    pub fn description(&self) -> Option<&'static str> {
        match self {
            FlowError::UserRejected => {
                Some("Please approve the token allowance to continue")
            }
            FlowError::InsufficientFunds => {
                Some("Top up the selected token and try again")
            }
            _ => None,
        }
    }

    /// Whether the failed flow can be retried as-is.
    ///
    /// A rejected allowance must be re-initiated from scratch, so it is
    /// never retryable; validation failures need a form change first.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            FlowError::InsufficientGas | FlowError::General(_)
        )
    }
}
