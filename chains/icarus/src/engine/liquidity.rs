use ethers::types::U256;

use super::approval::ensure_approval;
use super::submit::submit_and_confirm;
use super::{EngineContext, Session};
use crate::chain::{AddLiquidityArgs, LiquidityQuoteRequest, TxCall};
use crate::error::EngineError;
use crate::tokens::{format_amount, short_hash, to_base_units, LiquidityPairSpec};
use crate::utils::gas::get_fee_params;

/// Slippage tolerance in thousandths.
pub const SLIPPAGE_PER_MILLE: u64 = 5;

const DEADLINE_SECS: i64 = 3600;

/// `floor(amount * 995 / 1000)`.
pub fn min_with_slippage(amount: U256) -> U256 {
    amount.saturating_mul(U256::from(1000 - SLIPPAGE_PER_MILLE)) / U256::from(1000u64)
}

/// Deposits `amount_primary` (decimal string) of the pair's primary token,
/// with the secondary side capped by the pool quote.
pub async fn perform_add_liquidity(
    ctx: &EngineContext,
    session: &Session,
    pair: &LiquidityPairSpec,
    amount_primary: &str,
) -> Result<(), EngineError> {
    let owner = session.chain.address();
    let router = ctx.config.deployment.liquidity_router;
    let token_a = pair.primary.erc20_address()?;
    let token_b = pair.secondary.erc20_address()?;

    let amount_a_desired = to_base_units(amount_primary, pair.primary.decimals)?;
    let amount_b_desired =
        to_base_units(LiquidityPairSpec::SECONDARY_DESIRED, pair.secondary.decimals)?;

    let factory = session.chain.default_factory(router).await?;
    match session
        .chain
        .reserves(router, token_a, token_b, pair.stable, factory)
        .await
    {
        Ok((reserve_a, reserve_b)) => ctx.log.debug(format!(
            "Pool {}/{} reserves: {} / {}",
            pair.primary.symbol,
            pair.secondary.symbol,
            format_amount(reserve_a, pair.primary.decimals, 6),
            format_amount(reserve_b, pair.secondary.decimals, 6)
        )),
        Err(e) => ctx.log.debug(format!("Failed to read pool reserves: {}", e)),
    }

    let quote = session
        .chain
        .quote_add_liquidity(
            router,
            &LiquidityQuoteRequest {
                token_a,
                token_b,
                stable: pair.stable,
                factory,
                amount_a_desired,
                amount_b_desired,
            },
        )
        .await?;
    if quote.amount_a.is_zero() || quote.amount_b.is_zero() {
        return Err(EngineError::InvalidQuote {
            reason: "Invalid liquidity amounts".to_string(),
        });
    }

    let amount_a_min = min_with_slippage(quote.amount_a);
    let amount_b_min = min_with_slippage(quote.amount_b);

    ensure_approval(ctx, session, &pair.primary, router, amount_a_desired).await?;
    ensure_approval(ctx, session, &pair.secondary, router, amount_b_desired).await?;

    let deadline = U256::from((chrono::Utc::now().timestamp() + DEADLINE_SECS).max(0) as u64);

    let fees = get_fee_params(
        session.chain.as_ref(),
        ctx.config.gas.fallback_gas_price(),
        &ctx.log,
    )
    .await;
    let gas_limit = U256::from(ctx.config.gas.liquidity_limit);
    ctx.log.debug(format!(
        "Using fixed gas limit: {} for add liquidity on Icarus",
        gas_limit
    ));

    let required = fees.max_cost(gas_limit, U256::zero());
    let native = session.chain.native_balance(owner).await?;
    if native < required {
        return Err(EngineError::InsufficientGas {
            available: format_amount(native, 18, 6),
            required: format_amount(required, 18, 6),
        });
    }

    let args = AddLiquidityArgs {
        token_a,
        token_b,
        stable: pair.stable,
        amount_a_desired,
        amount_b_desired,
        amount_a_min,
        amount_b_min,
        to: owner,
        deadline,
    };
    let hash = submit_and_confirm(
        ctx,
        session,
        TxCall::AddLiquidity { router, args },
        fees,
        gas_limit,
        U256::zero(),
        "Add Liquidity",
    )
    .await?;

    ctx.log.success(format!(
        "Add Liquidity {} {} and {} {} Successfully, Hash: {}",
        amount_primary,
        pair.primary.symbol,
        format_amount(
            quote.amount_b,
            pair.secondary.decimals,
            LiquidityPairSpec::DISPLAY_PLACES
        ),
        pair.secondary.symbol,
        short_hash(&hash)
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_with_slippage_floors() {
        assert_eq!(min_with_slippage(U256::from(1000u64)), U256::from(995u64));
        assert_eq!(min_with_slippage(U256::from(999u64)), U256::from(994u64));
        assert_eq!(min_with_slippage(U256::from(1u64)), U256::zero());
        assert_eq!(min_with_slippage(U256::zero()), U256::zero());
    }
}
