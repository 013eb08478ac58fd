use ethers::types::{Address, U256};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::chain::ChainClient;
use crate::error::EngineError;
use crate::tokens::short_address;
use crate::utils::activity_log::ActivityLog;

/// Per-(chain, address) nonce issuance.
///
/// The next nonce is `max(pending, last_issued + 1)`, so a lagging pending pool
/// never makes us reuse a nonce and a leading one is adopted immediately.
/// Evicting an entry makes the next call re-derive from the chain alone.
#[derive(Debug, Default)]
pub struct NonceCoordinator {
    issued: Mutex<HashMap<(u64, Address), U256>>,
}

impl NonceCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn next_nonce(
        &self,
        chain: &dyn ChainClient,
        address: Address,
        chain_id: u64,
        cancel: &CancellationToken,
        log: &ActivityLog,
    ) -> Result<U256, EngineError> {
        if cancel.is_cancelled() {
            log.info("Nonce fetch stopped due to stop request.");
            return Err(EngineError::Cancelled);
        }
        if address.is_zero() {
            log.error(format!("Invalid wallet address: {:?}", address));
            return Err(EngineError::InvalidAddress {
                address: format!("{:?}", address),
            });
        }

        let pending = chain.pending_nonce(address).await.map_err(|e| {
            log.error(format!(
                "Failed to fetch nonce for {} on chain {}: {}",
                short_address(&address),
                chain_id,
                e
            ));
            e
        })?;

        let mut issued = self.issued.lock().await;
        let next = match issued.get(&(chain_id, address)) {
            Some(last) => pending.max(*last + 1),
            None => pending,
        };
        issued.insert((chain_id, address), next);

        log.debug(format!(
            "Debug: Fetched nonce {} for {} on chain {}",
            next,
            short_address(&address),
            chain_id
        ));
        Ok(next)
    }

    pub async fn evict(&self, chain_id: u64, address: Address) {
        self.issued.lock().await.remove(&(chain_id, address));
    }

    pub async fn clear(&self) {
        self.issued.lock().await.clear();
    }

    pub async fn last_issued(&self, chain_id: u64, address: Address) -> Option<U256> {
        self.issued.lock().await.get(&(chain_id, address)).copied()
    }
}

/// Whether a node rejection is about the nonce.
pub fn is_nonce_conflict(message: &str) -> bool {
    message.to_ascii_lowercase().contains("nonce")
}
