use ethers::types::{Address, U256};

use super::submit::submit_and_confirm;
use super::{EngineContext, Session};
use crate::chain::TxCall;
use crate::error::EngineError;
use crate::tokens::{format_amount, short_hash, Token};
use crate::utils::gas::get_fee_params;

/// Raises `spender`'s allowance on `token` to `amount` unless it already
/// covers it. Allowance is re-read on every call, so no state is kept between
/// invocations and an approval is never submitted twice for the same need.
pub async fn ensure_approval(
    ctx: &EngineContext,
    session: &Session,
    token: &Token,
    spender: Address,
    amount: U256,
) -> Result<(), EngineError> {
    let token_address = token.erc20_address()?;
    let owner = session.chain.address();
    let display = format_amount(amount, token.decimals, token.decimals.min(6) as usize);

    let allowance = session
        .chain
        .allowance(token_address, owner, spender)
        .await?;
    if allowance >= amount {
        ctx.log.info(format!(
            "Token {} already approved for {}",
            token.symbol, display
        ));
        return Ok(());
    }

    let fees = get_fee_params(
        session.chain.as_ref(),
        ctx.config.gas.fallback_gas_price(),
        &ctx.log,
    )
    .await;
    let gas_limit = U256::from(ctx.config.gas.approve_limit);
    ctx.log.debug(format!(
        "Using fixed gas limit for approve: {}",
        gas_limit
    ));

    let call = TxCall::Approve {
        token: token_address,
        spender,
        amount,
    };
    let hash = submit_and_confirm(ctx, session, call, fees, gas_limit, U256::zero(), "Approve")
        .await
        .map_err(|e| match e {
            EngineError::Reverted { hash } => EngineError::ApprovalReverted {
                symbol: token.symbol.to_string(),
                hash,
            },
            other => other,
        })?;

    ctx.log.success(format!(
        "Token {} approved successfully, Hash: {}",
        token.symbol,
        short_hash(&hash)
    ));
    Ok(())
}
