mod common;

use common::*;
use ethers::types::U256;
use icarus_project::chain::{LiquidityQuote, ReceiptStatus, TxCall};
use icarus_project::engine::{ensure_approval, perform_add_liquidity, perform_swap, EngineContext};
use icarus_project::tokens::{to_base_units, SwapDirective};
use icarus_project::utils::FeeParams;
use icarus_project::EngineError;
use std::sync::Arc;
use std::time::Duration;

fn directive(ctx: &EngineContext, label: &str) -> SwapDirective {
    ctx.tokens
        .swap_catalog()
        .into_iter()
        .find(|d| d.label() == label)
        .unwrap()
}

fn setup(chain: MockChain) -> (EngineContext, Arc<MockChain>, Arc<MockQuotes>) {
    (engine(), Arc::new(chain), Arc::new(MockQuotes::valid()))
}

#[tokio::test]
async fn test_approval_is_submitted_once_per_need() {
    let (ctx, chain, quotes) = setup(MockChain::funded(account(1).address()));
    let session = session(chain.clone(), quotes);
    let rise = ctx.tokens.rise;
    let router = addr(SWAP_ROUTER);

    ensure_approval(&ctx, &session, &rise, router, U256::from(500)).await.unwrap();
    ensure_approval(&ctx, &session, &rise, router, U256::from(500)).await.unwrap();
    ensure_approval(&ctx, &session, &rise, router, U256::from(100)).await.unwrap();
    assert_eq!(chain.count(is_approve), 1);
    assert!(ctx
        .log
        .messages()
        .iter()
        .any(|m| m.starts_with("Token RISE already approved")));

    ensure_approval(&ctx, &session, &rise, router, U256::from(501)).await.unwrap();
    assert_eq!(chain.count(is_approve), 2);
    assert_eq!(
        chain.sent()[0].1.gas_limit,
        U256::from(ctx.config.gas.approve_limit)
    );
}

#[tokio::test]
async fn test_token_swap_approves_then_executes() {
    let (ctx, chain, quotes) = setup(MockChain::funded(account(1).address()));
    let session = session(chain.clone(), quotes.clone());
    let rise_eth = directive(&ctx, "RISE ➯ ETH");

    perform_swap(&ctx, &session, &rise_eth, "2").await.unwrap();

    let sent = chain.sent();
    assert_eq!(sent.len(), 2);
    assert!(is_approve(&sent[0].0));
    match &sent[1].0 {
        TxCall::Execute { router, route } => {
            assert_eq!(*router, addr(SWAP_ROUTER));
            assert_eq!(route.inputs.len(), 2);
        }
        other => panic!("expected execute, got {other:?}"),
    }
    assert_eq!(sent[0].1.nonce, U256::zero());
    assert_eq!(sent[1].1.nonce, U256::one());
    assert_eq!(sent[1].1.value, U256::zero());
    assert_eq!(sent[1].1.gas_limit, U256::from(650_000u64));
    assert_eq!(quotes.calls(), 1);
    assert!(ctx
        .log
        .messages()
        .iter()
        .any(|m| m.starts_with("Swap 2 RISE ➯ ETH Successfully, Hash: ")));
}

#[tokio::test]
async fn test_native_swap_sends_value_without_approval() {
    let (ctx, chain, quotes) = setup(MockChain::funded(account(1).address()));
    let session = session(chain.clone(), quotes);
    let eth_rise = directive(&ctx, "ETH ➯ RISE");

    perform_swap(&ctx, &session, &eth_rise, "0.00005").await.unwrap();

    let sent = chain.sent();
    assert_eq!(sent.len(), 1);
    assert!(is_swap(&sent[0].0));
    assert_eq!(sent[0].1.value, to_base_units("0.00005", 18).unwrap());
}

#[tokio::test]
async fn test_balance_gate_blocks_before_quote() {
    let address = account(1).address();
    let needed = to_base_units("2", 18).unwrap();
    let (ctx, chain, quotes) = setup(
        MockChain::funded(address).with(|s| {
            s.tokens.insert(addr(RISE), needed - 1);
        }),
    );
    let session = session(chain.clone(), quotes.clone());

    let err = perform_swap(&ctx, &session, &directive(&ctx, "RISE ➯ ETH"), "2")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance { ref symbol, .. } if symbol == "RISE"));
    assert!(err.is_precondition());
    assert!(chain.sent().is_empty());
    assert_eq!(quotes.calls(), 0);
}

#[tokio::test]
async fn test_empty_quote_blocks_submission() {
    let chain = Arc::new(MockChain::funded(account(1).address()));
    let ctx = engine();
    let session = session(chain.clone(), Arc::new(MockQuotes::empty()));

    let err = perform_swap(&ctx, &session, &directive(&ctx, "RISE ➯ USDC"), "0.5")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidQuote { .. }));
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn test_gas_gate_counts_value() {
    let amount = to_base_units("0.0001", 18).unwrap();
    let (ctx, chain, quotes) = setup(
        MockChain::funded(account(1).address()).with(|s| s.native = amount + 1),
    );
    let session = session(chain.clone(), quotes);

    let err = perform_swap(&ctx, &session, &directive(&ctx, "ETH ➯ RISE"), "0.0001")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientGas { .. }));
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn test_fee_fallback_is_one_gwei_legacy() {
    let (ctx, chain, quotes) = setup(
        MockChain::funded(account(1).address()).with(|s| s.fee_data = None),
    );
    let session = session(chain.clone(), quotes);

    perform_swap(&ctx, &session, &directive(&ctx, "ETH ➯ RISE"), "0.0001")
        .await
        .unwrap();
    assert_eq!(
        chain.sent()[0].1.fees,
        FeeParams::Legacy {
            gas_price: U256::from(1_000_000_000u64)
        }
    );
}

#[tokio::test]
async fn test_liquidity_minimums_follow_quote() {
    let (ctx, chain, quotes) = setup(
        MockChain::funded(account(1).address()).with(|s| {
            s.liquidity_quote = Some(LiquidityQuote {
                amount_a: U256::from(1000u64),
                amount_b: U256::from(2000u64),
                liquidity: U256::one(),
            })
        }),
    );
    let session = session(chain.clone(), quotes);
    let pair = ctx.tokens.liquidity_catalog()[0];
    assert_eq!(pair.label(), "USDT for USDC");

    perform_add_liquidity(&ctx, &session, &pair, "0.5").await.unwrap();

    let sent = chain.sent_calls();
    assert_eq!(sent.iter().filter(|c| is_approve(c)).count(), 2);
    let args = sent
        .iter()
        .find_map(|c| match c {
            TxCall::AddLiquidity { router, args } => {
                assert_eq!(*router, addr(LIQUIDITY_ROUTER));
                Some(args.clone())
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(args.token_a, addr(USDT));
    assert_eq!(args.token_b, addr(USDC));
    assert!(args.stable);
    assert_eq!(args.amount_a_desired, U256::from(500_000u64));
    assert_eq!(args.amount_b_desired, U256::from(1_000_000_000u64));
    assert_eq!(args.amount_a_min, U256::from(995u64));
    assert_eq!(args.amount_b_min, U256::from(1990u64));
    assert_eq!(args.to, account(1).address());
    assert!(ctx
        .log
        .messages()
        .iter()
        .any(|m| m.starts_with("Add Liquidity 0.5 USDT and ")));
}

#[tokio::test]
async fn test_wbtc_side_uses_eighteen_decimals() {
    let (ctx, chain, quotes) = setup(MockChain::funded(account(1).address()));
    let session = session(chain.clone(), quotes);
    let pair = ctx.tokens.liquidity_catalog()[2];
    assert_eq!(pair.label(), "USDC for WBTC");

    perform_add_liquidity(&ctx, &session, &pair, "0.1").await.unwrap();

    let thousand = to_base_units("1000", 18).unwrap();
    let sent = chain.sent_calls();
    let args = sent
        .iter()
        .find_map(|c| match c {
            TxCall::AddLiquidity { args, .. } => Some(args.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(args.token_b, addr(WBTC));
    assert_eq!(args.amount_a_desired, U256::from(100_000u64));
    assert_eq!(args.amount_b_desired, thousand);
    assert_eq!(args.amount_b_min, thousand * U256::from(995u64) / U256::from(1000u64));

    let wbtc_approval = sent.iter().find_map(|c| match c {
        TxCall::Approve { token, amount, .. } if *token == addr(WBTC) => Some(*amount),
        _ => None,
    });
    assert_eq!(wbtc_approval, Some(thousand));
    assert!(ctx
        .log
        .messages()
        .iter()
        .any(|m| m.starts_with("Add Liquidity 0.1 USDC and 1000.000000 WBTC")));
}

#[tokio::test]
async fn test_zero_liquidity_quote_is_rejected() {
    let (ctx, chain, quotes) = setup(
        MockChain::funded(account(1).address()).with(|s| {
            s.liquidity_quote = Some(LiquidityQuote {
                amount_a: U256::from(1000u64),
                amount_b: U256::zero(),
                liquidity: U256::zero(),
            })
        }),
    );
    let session = session(chain.clone(), quotes);
    let pair = ctx.tokens.liquidity_catalog()[2];

    let err = perform_add_liquidity(&ctx, &session, &pair, "0.1")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidQuote {
            reason: "Invalid liquidity amounts".to_string()
        }
    );
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn test_nonce_rejection_evicts_cached_nonce() {
    let address = account(1).address();
    let (ctx, chain, quotes) = setup(MockChain::funded(address));
    let session = session(chain.clone(), quotes);
    let eth_rise = directive(&ctx, "ETH ➯ RISE");

    perform_swap(&ctx, &session, &eth_rise, "0.0001").await.unwrap();
    assert_eq!(
        ctx.nonces.last_issued(ctx.config.chain_id, address).await,
        Some(U256::zero())
    );

    chain
        .state
        .lock()
        .unwrap()
        .send_errors
        .push_back(EngineError::Submission {
            message: "nonce too low".into(),
        });
    let err = perform_swap(&ctx, &session, &eth_rise, "0.0001")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NonceConflict { .. }));
    assert_eq!(ctx.nonces.last_issued(ctx.config.chain_id, address).await, None);
    assert!(ctx
        .log
        .messages()
        .iter()
        .any(|m| m == "Nonce error detected, resetting nonce for next attempt."));

    perform_swap(&ctx, &session, &eth_rise, "0.0001").await.unwrap();
    let sent = chain.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].1.nonce, U256::one());
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_deadline() {
    let (ctx, chain, quotes) = setup(
        MockChain::funded(account(1).address())
            .with(|s| s.receipt_delay = Duration::from_secs(3600)),
    );
    let session = session(chain.clone(), quotes);

    let start = tokio::time::Instant::now();
    let err = perform_swap(&ctx, &session, &directive(&ctx, "ETH ➯ RISE"), "0.0001")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::ConfirmationTimeout {
            timeout_secs: 300,
            ..
        }
    ));
    let waited = start.elapsed();
    assert!(waited >= Duration::from_secs(300));
    assert!(waited < Duration::from_secs(301));
    assert_eq!(chain.count(is_swap), 1);
}

#[tokio::test]
async fn test_reverted_approval_stops_swap() {
    let (ctx, chain, quotes) = setup(
        MockChain::funded(account(1).address()).with(|s| s.receipt = ReceiptStatus::Reverted),
    );
    let session = session(chain.clone(), quotes);

    let err = perform_swap(&ctx, &session, &directive(&ctx, "USDT ➯ RISE"), "0.2")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ApprovalReverted { ref symbol, .. } if symbol == "USDT"));
    assert_eq!(chain.count(is_approve), 1);
    assert_eq!(chain.count(is_swap), 0);
}
