//! Allowance management.
//!
//! Thin layer over the settlement SDK's allowance queries: check what a
//! token is currently approved for, request an approval, and cache the
//! last verified values so the UI can show allowance state without
//! re-querying on every render.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::sdk::{AllowanceAmount, AllowanceInfo, SettlementSdk};

/// Checks and grants token allowances through the settlement SDK
pub struct AllowanceManager {
    sdk: Arc<dyn SettlementSdk>,
    /// Last verified allowance per (chain, token), in base units
    verified: RwLock<HashMap<(u64, String), String>>,
}

impl AllowanceManager {
    pub fn new(sdk: Arc<dyn SettlementSdk>) -> Self {
        Self {
            sdk,
            verified: RwLock::new(HashMap::new()),
        }
    }

    /// Query current allowances for the given tokens and refresh the cache
    pub async fn check(&self, chain_id: u64, tokens: &[String]) -> Result<Vec<AllowanceInfo>> {
        let allowances = self
            .sdk
            .get_allowance(chain_id, tokens)
            .await
            .context("Failed to query token allowances")?;

        let mut verified = self.verified.write().await;
        for info in &allowances {
            verified.insert((info.chain_id, info.token.clone()), info.allowance.clone());
        }

        Ok(allowances)
    }

    /// Whether the token needs a new approval to cover `required` base
    /// units, querying the SDK for the current value
    pub async fn needs_approval(&self, chain_id: u64, token: &str, required: &str) -> Result<bool> {
        let allowances = self.check(chain_id, &[token.to_string()]).await?;
        let current = allowances
            .iter()
            .find(|a| a.token == token)
            .map(|a| a.allowance.as_str())
            .unwrap_or("0");

        Ok(!covers(current, required))
    }

    /// Grant allowances for the given tokens
    pub async fn approve(
        &self,
        chain_id: u64,
        tokens: &[String],
        amount: AllowanceAmount,
    ) -> Result<()> {
        info!(chain_id, tokens = ?tokens, "Requesting token approval");
        self.sdk
            .set_allowance(chain_id, tokens, amount)
            .await
            .context("Failed to set token allowance")?;

        // Cached values are stale after an approval
        let mut verified = self.verified.write().await;
        for token in tokens {
            verified.remove(&(chain_id, token.clone()));
        }
        debug!(chain_id, "Allowance cache invalidated after approval");
        Ok(())
    }

    /// Last verified allowance for a token, if one was fetched this session
    pub async fn cached(&self, chain_id: u64, token: &str) -> Option<String> {
        self.verified
            .read()
            .await
            .get(&(chain_id, token.to_string()))
            .cloned()
    }
}

/// Whether allowance `current` covers `required`. Values are decimal
/// strings in base units; unparseable values never count as covering.
fn covers(current: &str, required: &str) -> bool {
    match (current.parse::<u128>(), required.parse::<u128>()) {
        (Ok(current), Ok(required)) => current >= required,
        _ => false,
    }
}
