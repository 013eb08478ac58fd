//! Signer-bound access to the chain, behind the [`ChainClient`] seam.

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::contracts::{IErc20, ILiquidityRouter, ISwapRouter};
use crate::error::EngineError;
use crate::quote::SwapRoute;
use crate::utils::gas::{FeeData, FeeParams};

/// Arguments of `addLiquidity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLiquidityArgs {
    pub token_a: Address,
    pub token_b: Address,
    pub stable: bool,
    pub amount_a_desired: U256,
    pub amount_b_desired: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub to: Address,
    pub deadline: U256,
}

/// Arguments of `quoteAddLiquidity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityQuoteRequest {
    pub token_a: Address,
    pub token_b: Address,
    pub stable: bool,
    pub factory: Address,
    pub amount_a_desired: U256,
    pub amount_b_desired: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityQuote {
    pub amount_a: U256,
    pub amount_b: U256,
    pub liquidity: U256,
}

/// State-changing calls the engine submits.
#[derive(Debug, Clone, PartialEq)]
pub enum TxCall {
    Approve {
        token: Address,
        spender: Address,
        amount: U256,
    },
    Execute {
        router: Address,
        route: SwapRoute,
    },
    AddLiquidity {
        router: Address,
        args: AddLiquidityArgs,
    },
}

/// Envelope fields chosen by the engine, never by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxParams {
    pub nonce: U256,
    pub gas_limit: U256,
    pub value: U256,
    pub fees: FeeParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address of the bound signer.
    fn address(&self) -> Address;

    async fn pending_nonce(&self, address: Address) -> Result<U256, EngineError>;
    async fn native_balance(&self, owner: Address) -> Result<U256, EngineError>;
    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, EngineError>;
    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, EngineError>;
    async fn fee_data(&self) -> Result<FeeData, EngineError>;

    async fn default_factory(&self, router: Address) -> Result<Address, EngineError>;
    async fn quote_add_liquidity(
        &self,
        router: Address,
        request: &LiquidityQuoteRequest,
    ) -> Result<LiquidityQuote, EngineError>;
    async fn reserves(
        &self,
        router: Address,
        token_a: Address,
        token_b: Address,
        stable: bool,
        factory: Address,
    ) -> Result<(U256, U256), EngineError>;

    /// Signs and broadcasts. Node rejections surface as [`EngineError::Submission`].
    async fn send(&self, call: &TxCall, params: &TxParams) -> Result<H256, EngineError>;

    /// Resolves once the transaction is included. Unbounded; callers race it
    /// against their own deadline.
    async fn wait_for_receipt(&self, hash: H256) -> Result<ReceiptStatus, EngineError>;
}

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

pub struct EthersClient {
    client: Arc<SignerClient>,
    chain_id: u64,
    poll_interval: Duration,
}

impl EthersClient {
    pub fn new(
        provider: Provider<Http>,
        wallet: LocalWallet,
        chain_id: u64,
        poll_interval: Duration,
    ) -> Self {
        let wallet = wallet.with_chain_id(chain_id);
        Self {
            client: Arc::new(SignerMiddleware::new(provider, wallet)),
            chain_id,
            poll_interval,
        }
    }

    fn calldata(&self, call: &TxCall) -> (Address, Option<Bytes>) {
        match call {
            TxCall::Approve {
                token,
                spender,
                amount,
            } => (
                *token,
                IErc20::new(*token, self.client.clone())
                    .approve(*spender, *amount)
                    .calldata(),
            ),
            TxCall::Execute { router, route } => (
                *router,
                ISwapRouter::new(*router, self.client.clone())
                    .execute(route.commands.clone(), route.inputs.clone())
                    .calldata(),
            ),
            TxCall::AddLiquidity { router, args } => (
                *router,
                ILiquidityRouter::new(*router, self.client.clone())
                    .add_liquidity(
                        args.token_a,
                        args.token_b,
                        args.stable,
                        args.amount_a_desired,
                        args.amount_b_desired,
                        args.amount_a_min,
                        args.amount_b_min,
                        args.to,
                        args.deadline,
                    )
                    .calldata(),
            ),
        }
    }
}

#[async_trait]
impl ChainClient for EthersClient {
    fn address(&self) -> Address {
        self.client.address()
    }

    async fn pending_nonce(&self, address: Address) -> Result<U256, EngineError> {
        self.client
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await
            .map_err(|e| EngineError::provider("eth_getTransactionCount", e))
    }

    async fn native_balance(&self, owner: Address) -> Result<U256, EngineError> {
        self.client
            .get_balance(owner, None)
            .await
            .map_err(|e| EngineError::provider("eth_getBalance", e))
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, EngineError> {
        IErc20::new(token, self.client.clone())
            .balance_of(owner)
            .call()
            .await
            .map_err(|e| EngineError::provider("balanceOf", e))
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, EngineError> {
        IErc20::new(token, self.client.clone())
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| EngineError::provider("allowance", e))
    }

    async fn fee_data(&self) -> Result<FeeData, EngineError> {
        let gas_price = self
            .client
            .get_gas_price()
            .await
            .map_err(|e| EngineError::provider("eth_gasPrice", e))?;

        // Pre-London nodes reject the fee-history call; that is not an error here.
        let (max_fee_per_gas, max_priority_fee_per_gas) =
            match self.client.estimate_eip1559_fees(None).await {
                Ok((max_fee, priority)) => (Some(max_fee), Some(priority)),
                Err(_) => (None, None),
            };

        Ok(FeeData {
            max_fee_per_gas,
            max_priority_fee_per_gas,
            gas_price: Some(gas_price),
        })
    }

    async fn default_factory(&self, router: Address) -> Result<Address, EngineError> {
        ILiquidityRouter::new(router, self.client.clone())
            .default_factory()
            .call()
            .await
            .map_err(|e| EngineError::provider("defaultFactory", e))
    }

    async fn quote_add_liquidity(
        &self,
        router: Address,
        request: &LiquidityQuoteRequest,
    ) -> Result<LiquidityQuote, EngineError> {
        let (amount_a, amount_b, liquidity) = ILiquidityRouter::new(router, self.client.clone())
            .quote_add_liquidity(
                request.token_a,
                request.token_b,
                request.stable,
                request.factory,
                request.amount_a_desired,
                request.amount_b_desired,
            )
            .call()
            .await
            .map_err(|e| EngineError::provider("quoteAddLiquidity", e))?;

        Ok(LiquidityQuote {
            amount_a,
            amount_b,
            liquidity,
        })
    }

    async fn reserves(
        &self,
        router: Address,
        token_a: Address,
        token_b: Address,
        stable: bool,
        factory: Address,
    ) -> Result<(U256, U256), EngineError> {
        ILiquidityRouter::new(router, self.client.clone())
            .get_reserves(token_a, token_b, stable, factory)
            .call()
            .await
            .map_err(|e| EngineError::provider("getReserves", e))
    }

    async fn send(&self, call: &TxCall, params: &TxParams) -> Result<H256, EngineError> {
        let (to, data) = self.calldata(call);
        let data = data.ok_or_else(|| EngineError::Submission {
            message: "failed to encode calldata".to_string(),
        })?;

        let tx: TypedTransaction = match params.fees {
            FeeParams::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => Eip1559TransactionRequest::new()
                .from(self.address())
                .to(to)
                .data(data)
                .value(params.value)
                .gas(params.gas_limit)
                .nonce(params.nonce)
                .max_fee_per_gas(max_fee_per_gas)
                .max_priority_fee_per_gas(max_priority_fee_per_gas)
                .chain_id(self.chain_id)
                .into(),
            FeeParams::Legacy { gas_price } => TransactionRequest::new()
                .from(self.address())
                .to(to)
                .data(data)
                .value(params.value)
                .gas(params.gas_limit)
                .nonce(params.nonce)
                .gas_price(gas_price)
                .chain_id(self.chain_id)
                .into(),
        };

        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| EngineError::Submission {
                message: e.to_string(),
            })?;

        Ok(*pending)
    }

    async fn wait_for_receipt(&self, hash: H256) -> Result<ReceiptStatus, EngineError> {
        let client = self.client.clone();
        let status = poll_receipt(self.poll_interval, || {
            let client = client.clone();
            async move {
                let receipt = client
                    .get_transaction_receipt(hash)
                    .await
                    .map_err(|e| EngineError::provider("eth_getTransactionReceipt", e))?;
                Ok(receipt.map(|r| match r.status {
                    Some(status) if status.is_zero() => ReceiptStatus::Reverted,
                    _ => ReceiptStatus::Success,
                }))
            }
        })
        .await;
        Ok(status)
    }
}

/// Polls until a receipt shows up. Lookup errors are logged and polling goes
/// on; the caller bounds the wait.
pub async fn poll_receipt<F, Fut>(interval: Duration, mut fetch: F) -> ReceiptStatus
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Option<ReceiptStatus>, EngineError>>,
{
    loop {
        match fetch().await {
            Ok(Some(status)) => return status,
            Ok(None) => {}
            Err(e) => warn!("Receipt lookup failed, retrying: {}", e),
        }
        tokio::time::sleep(interval).await;
    }
}
