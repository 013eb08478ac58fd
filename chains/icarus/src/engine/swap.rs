use ethers::types::U256;

use super::approval::ensure_approval;
use super::submit::submit_and_confirm;
use super::{EngineContext, Session};
use crate::chain::TxCall;
use crate::error::EngineError;
use crate::tokens::{format_amount, short_hash, to_base_units, Asset, SwapDirective};
use crate::utils::gas::get_fee_params;

/// Quote-and-execute swap of `amount` (decimal string) along `directive`.
///
/// Gates, in order, each before any gas is spent: source balance, quote
/// validity, router allowance, native balance against gas cost plus value.
pub async fn perform_swap(
    ctx: &EngineContext,
    session: &Session,
    directive: &SwapDirective,
    amount: &str,
) -> Result<(), EngineError> {
    let from = &directive.from;
    let to = &directive.to;
    let owner = session.chain.address();
    let amount_wei = to_base_units(amount, directive.decimals())?;

    let balance = match from.asset {
        Asset::Native => session.chain.native_balance(owner).await?,
        Asset::Erc20(token) => session.chain.token_balance(token, owner).await?,
    };
    if balance < amount_wei {
        return Err(EngineError::InsufficientBalance {
            symbol: from.symbol.to_string(),
            available: format_amount(balance, from.decimals, directive.display_places()),
            required: amount.to_string(),
        });
    }

    let route = session
        .quotes
        .quote(&from.quote_id(), &to.quote_id(), amount_wei)
        .await?
        .into_route()?;

    let router = ctx.config.deployment.swap_router;
    if !from.is_native() {
        ensure_approval(ctx, session, from, router, amount_wei).await?;
    }

    let fees = get_fee_params(
        session.chain.as_ref(),
        ctx.config.gas.fallback_gas_price(),
        &ctx.log,
    )
    .await;
    let gas_limit = U256::from(ctx.config.gas.swap_limit);
    ctx.log.debug(format!(
        "Using fixed gas limit: {} for swap on Icarus",
        gas_limit
    ));

    let value = if from.is_native() {
        amount_wei
    } else {
        U256::zero()
    };
    let required = fees.max_cost(gas_limit, value);
    let native = session.chain.native_balance(owner).await?;
    if native < required {
        return Err(EngineError::InsufficientGas {
            available: format_amount(native, 18, 6),
            required: format_amount(required, 18, 6),
        });
    }

    let hash = submit_and_confirm(
        ctx,
        session,
        TxCall::Execute { router, route },
        fees,
        gas_limit,
        value,
        "Swap",
    )
    .await?;

    ctx.log.success(format!(
        "Swap {} {} ➯ {} Successfully, Hash: {}",
        amount,
        from.symbol,
        to.symbol,
        short_hash(&hash)
    ));
    Ok(())
}
