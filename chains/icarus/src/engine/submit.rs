use ethers::types::{H256, U256};
use tokio::time::timeout;

use super::{EngineContext, Session};
use crate::chain::{ReceiptStatus, TxCall, TxParams};
use crate::error::EngineError;
use crate::tokens::short_hash;
use crate::utils::gas::FeeParams;
use crate::utils::is_nonce_conflict;

/// Nonce, send, then a bounded wait for inclusion.
///
/// A rejection mentioning the nonce evicts the cached entry and surfaces as
/// [`EngineError::NonceConflict`]; the caller gets a fresh nonce on its next
/// attempt. A reverted receipt and an expired deadline are distinct errors.
pub async fn submit_and_confirm(
    ctx: &EngineContext,
    session: &Session,
    call: TxCall,
    fees: FeeParams,
    gas_limit: U256,
    value: U256,
    label: &str,
) -> Result<H256, EngineError> {
    let address = session.chain.address();
    let chain_id = ctx.config.chain_id;

    let nonce = ctx
        .nonces
        .next_nonce(
            session.chain.as_ref(),
            address,
            chain_id,
            &session.cancel,
            &ctx.log,
        )
        .await?;

    let params = TxParams {
        nonce,
        gas_limit,
        value,
        fees,
    };

    let hash = match session.chain.send(&call, &params).await {
        Ok(hash) => hash,
        Err(e) => {
            ctx.log.error(format!("Transaction failed: {}", e));
            let message = e.to_string();
            if is_nonce_conflict(&message) {
                ctx.nonces.evict(chain_id, address).await;
                ctx.log
                    .warn("Nonce error detected, resetting nonce for next attempt.");
                return Err(EngineError::NonceConflict { message });
            }
            return Err(e);
        }
    };
    ctx.log
        .warn(format!("{} Transaction sent: {}", label, short_hash(&hash)));

    let deadline = ctx.config.gas.confirmation_timeout();
    let outcome = match timeout(deadline, session.chain.wait_for_receipt(hash)).await {
        Ok(Ok(ReceiptStatus::Success)) => Ok(hash),
        Ok(Ok(ReceiptStatus::Reverted)) => Err(EngineError::Reverted { hash }),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(EngineError::ConfirmationTimeout {
            hash,
            timeout_secs: deadline.as_secs(),
        }),
    };

    if let Err(e) = &outcome {
        ctx.log.error(format!("Transaction failed: {}", e));
    }
    outcome
}
