#![allow(dead_code)]

use async_trait::async_trait;
use core_logic::ProxyConfig;
use ethers::prelude::*;
use icarus_project::accounts::Account;
use icarus_project::chain::{
    ChainClient, LiquidityQuote, LiquidityQuoteRequest, ReceiptStatus, TxCall, TxParams,
};
use icarus_project::config::IcarusConfig;
use icarus_project::engine::{EngineContext, Session};
use icarus_project::provider::ClientFactory;
use icarus_project::quote::{QuoteSource, SwapQuote};
use icarus_project::utils::FeeData;
use icarus_project::EngineError;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const SWAP_ROUTER: &str = "0x00000000000000000000000000000000000000a1";
pub const LIQUIDITY_ROUTER: &str = "0x00000000000000000000000000000000000000a2";
pub const RISE: &str = "0x00000000000000000000000000000000000000b1";
pub const USDT: &str = "0x00000000000000000000000000000000000000b2";
pub const USDC: &str = "0x00000000000000000000000000000000000000b3";
pub const WBTC: &str = "0x00000000000000000000000000000000000000b4";
pub const FACTORY: &str = "0x00000000000000000000000000000000000000f1";

pub fn addr(s: &str) -> Address {
    s.parse().unwrap()
}

pub fn eth(n: u64) -> U256 {
    U256::from(n) * U256::exp10(18)
}

pub fn test_config() -> IcarusConfig {
    serde_json::from_value(serde_json::json!({
        "rpc_url": "http://127.0.0.1:8545",
        "chain_id": 11155931u64,
        "deployment": {
            "swap_router": SWAP_ROUTER,
            "liquidity_router": LIQUIDITY_ROUTER,
            "rise": RISE,
            "usdt": USDT,
            "usdc": USDC,
            "wbtc": WBTC
        }
    }))
    .unwrap()
}

pub fn engine() -> EngineContext {
    EngineContext::new(Arc::new(test_config()))
}

pub fn account(n: u64) -> Account {
    let wallet: LocalWallet = format!("{:064x}", n).parse().unwrap();
    Account::from_wallet(wallet)
}

pub fn session(chain: Arc<MockChain>, quotes: Arc<MockQuotes>) -> Session {
    Session {
        chain,
        quotes,
        cancel: CancellationToken::new(),
    }
}

pub struct MockState {
    pub pending_nonce: U256,
    pub native: U256,
    pub tokens: HashMap<Address, U256>,
    pub allowances: HashMap<(Address, Address), U256>,
    pub fee_data: Option<FeeData>,
    pub liquidity_quote: Option<LiquidityQuote>,
    pub send_errors: VecDeque<EngineError>,
    pub receipt: ReceiptStatus,
    pub receipt_delay: Duration,
    pub sent: Vec<(TxCall, TxParams)>,
}

/// In-memory chain: records every submission and applies approvals and
/// nonces the way a node would.
pub struct MockChain {
    address: Address,
    pub state: Mutex<MockState>,
}

impl MockChain {
    /// 100 ETH and a large balance of every token, no allowances.
    pub fn funded(address: Address) -> Self {
        let big = U256::exp10(30);
        let tokens = [RISE, USDT, USDC, WBTC]
            .into_iter()
            .map(|t| (addr(t), big))
            .collect();
        Self {
            address,
            state: Mutex::new(MockState {
                pending_nonce: U256::zero(),
                native: eth(100),
                tokens,
                allowances: HashMap::new(),
                fee_data: Some(FeeData {
                    max_fee_per_gas: Some(U256::from(2_000_000_000u64)),
                    max_priority_fee_per_gas: Some(U256::from(1_000_000_000u64)),
                    gas_price: Some(U256::from(1_000_000_000u64)),
                }),
                liquidity_quote: None,
                send_errors: VecDeque::new(),
                receipt: ReceiptStatus::Success,
                receipt_delay: Duration::from_millis(10),
                sent: Vec::new(),
            }),
        }
    }

    pub fn with<F: FnOnce(&mut MockState)>(self, f: F) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn sent(&self) -> Vec<(TxCall, TxParams)> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_calls(&self) -> Vec<TxCall> {
        self.sent().into_iter().map(|(call, _)| call).collect()
    }

    pub fn count<F: Fn(&TxCall) -> bool>(&self, f: F) -> usize {
        self.sent_calls().iter().filter(|c| f(c)).count()
    }
}

pub fn is_approve(call: &TxCall) -> bool {
    matches!(call, TxCall::Approve { .. })
}

pub fn is_swap(call: &TxCall) -> bool {
    matches!(call, TxCall::Execute { .. })
}

pub fn is_add_liquidity(call: &TxCall) -> bool {
    matches!(call, TxCall::AddLiquidity { .. })
}

#[async_trait]
impl ChainClient for MockChain {
    fn address(&self) -> Address {
        self.address
    }

    async fn pending_nonce(&self, _address: Address) -> Result<U256, EngineError> {
        Ok(self.state.lock().unwrap().pending_nonce)
    }

    async fn native_balance(&self, _owner: Address) -> Result<U256, EngineError> {
        Ok(self.state.lock().unwrap().native)
    }

    async fn token_balance(&self, token: Address, _owner: Address) -> Result<U256, EngineError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .tokens
            .get(&token)
            .copied()
            .unwrap_or_default())
    }

    async fn allowance(
        &self,
        token: Address,
        _owner: Address,
        spender: Address,
    ) -> Result<U256, EngineError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .allowances
            .get(&(token, spender))
            .copied()
            .unwrap_or_default())
    }

    async fn fee_data(&self) -> Result<FeeData, EngineError> {
        self.state
            .lock()
            .unwrap()
            .fee_data
            .ok_or_else(|| EngineError::provider("fee data", "unavailable"))
    }

    async fn default_factory(&self, _router: Address) -> Result<Address, EngineError> {
        Ok(addr(FACTORY))
    }

    async fn quote_add_liquidity(
        &self,
        _router: Address,
        request: &LiquidityQuoteRequest,
    ) -> Result<LiquidityQuote, EngineError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .liquidity_quote
            .unwrap_or(LiquidityQuote {
                amount_a: request.amount_a_desired,
                amount_b: request.amount_b_desired,
                liquidity: U256::one(),
            }))
    }

    async fn reserves(
        &self,
        _router: Address,
        _token_a: Address,
        _token_b: Address,
        _stable: bool,
        _factory: Address,
    ) -> Result<(U256, U256), EngineError> {
        Ok((eth(1000), eth(1000)))
    }

    async fn send(&self, call: &TxCall, params: &TxParams) -> Result<H256, EngineError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.send_errors.pop_front() {
            return Err(err);
        }
        if let TxCall::Approve {
            token,
            spender,
            amount,
        } = call
        {
            state.allowances.insert((*token, *spender), *amount);
        }
        state.pending_nonce = params.nonce + 1;
        state.sent.push((call.clone(), *params));
        Ok(H256::from_low_u64_be(state.sent.len() as u64))
    }

    async fn wait_for_receipt(&self, _hash: H256) -> Result<ReceiptStatus, EngineError> {
        let (delay, status) = {
            let state = self.state.lock().unwrap();
            (state.receipt_delay, state.receipt)
        };
        tokio::time::sleep(delay).await;
        Ok(status)
    }
}

/// Quote service answering every request with the same route.
pub struct MockQuotes {
    pub calls: AtomicUsize,
    pub response: Mutex<SwapQuote>,
}

impl MockQuotes {
    pub fn valid() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            response: Mutex::new(SwapQuote {
                encoded_commands: Some("0x0b08".into()),
                pretty_encoded_inputs: Some(vec!["0x01".into(), "0x02".into()]),
            }),
        }
    }

    pub fn empty() -> Self {
        let quotes = Self::valid();
        *quotes.response.lock().unwrap() = SwapQuote::default();
        quotes
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for MockQuotes {
    async fn quote(
        &self,
        _token_from: &str,
        _token_to: &str,
        _amount: U256,
    ) -> Result<SwapQuote, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.lock().unwrap().clone())
    }
}

/// Hands out one funded [`MockChain`] per account address.
pub struct MockFactory {
    pub chains: Mutex<HashMap<Address, Arc<MockChain>>>,
    pub quotes: Arc<MockQuotes>,
    pub connects: Mutex<Vec<(Address, Option<String>)>>,
    pub unreachable: Mutex<HashSet<Address>>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            chains: Mutex::new(HashMap::new()),
            quotes: Arc::new(MockQuotes::valid()),
            connects: Mutex::new(Vec::new()),
            unreachable: Mutex::new(HashSet::new()),
        }
    }

    /// Replaces the chain handed out for `address`.
    pub fn install(&self, address: Address, chain: MockChain) -> Arc<MockChain> {
        let chain = Arc::new(chain);
        self.chains.lock().unwrap().insert(address, chain.clone());
        chain
    }

    /// Makes `connect` fail for `address` as if every RPC attempt failed.
    pub fn refuse(&self, address: Address) {
        self.unreachable.lock().unwrap().insert(address);
    }

    pub fn chain(&self, address: Address) -> Arc<MockChain> {
        self.chains
            .lock()
            .unwrap()
            .entry(address)
            .or_insert_with(|| Arc::new(MockChain::funded(address)))
            .clone()
    }

    pub fn total(&self, f: fn(&TxCall) -> bool) -> usize {
        self.chains
            .lock()
            .unwrap()
            .values()
            .map(|c| c.count(f))
            .sum()
    }
}

#[async_trait]
impl ClientFactory for MockFactory {
    async fn connect(
        &self,
        account: &Account,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Arc<dyn ChainClient>, EngineError> {
        self.connects
            .lock()
            .unwrap()
            .push((account.address(), proxy.map(|p| p.url.clone())));
        if self.unreachable.lock().unwrap().contains(&account.address()) {
            return Err(EngineError::ProviderInit {
                chain_id: 11155931,
                attempts: 3,
                reason: "connection refused".into(),
            });
        }
        Ok(self.chain(account.address()))
    }

    fn quote_source(
        &self,
        _proxy: Option<&ProxyConfig>,
    ) -> Result<Arc<dyn QuoteSource>, EngineError> {
        Ok(self.quotes.clone())
    }
}
