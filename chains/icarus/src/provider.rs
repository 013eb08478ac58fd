//! RPC connectivity: proxy tunnelling, retried provider construction and the
//! per-account client factory.

use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::{with_retry, ProxyConfig, ProxyKind, RetryConfig};
use ethers::prelude::*;
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

use crate::accounts::Account;
use crate::chain::{ChainClient, EthersClient};
use crate::config::IcarusConfig;
use crate::error::EngineError;
use crate::quote::{QuoteSource, SugarQuoteClient};

/// HTTP client tunnelled through `proxy` when given. The scheme picks the
/// tunnel: `socks*` goes through SOCKS, anything else through HTTP CONNECT.
pub fn build_http_client(proxy: Option<&ProxyConfig>, headers: HeaderMap) -> Result<Client> {
    let mut builder = Client::builder().default_headers(headers);
    if let Some(proxy_conf) = proxy {
        let mut proxy = reqwest::Proxy::all(&proxy_conf.url)
            .with_context(|| format!("Invalid proxy {}", proxy_conf.display_url()))?;
        if let (Some(u), Some(p)) = (&proxy_conf.username, &proxy_conf.password) {
            proxy = proxy.basic_auth(u, p);
        }
        let kind = match proxy_conf.kind() {
            ProxyKind::Socks => "SOCKS",
            ProxyKind::Http => "HTTP",
        };
        debug!("Routing through {} proxy {}", kind, proxy_conf.display_url());
        builder = builder.proxy(proxy);
    }
    Ok(builder.build()?)
}

fn build_provider(rpc_url: &str, proxy: Option<&ProxyConfig>) -> Result<Provider<Http>> {
    let client = build_http_client(proxy, HeaderMap::new())?;
    let url =
        reqwest::Url::parse(rpc_url).with_context(|| format!("Invalid RPC URL {}", rpc_url))?;
    Ok(Provider::new(Http::new_with_client(url, client)))
}

/// Builds a provider, retrying construction with `retry`. Exhaustion is an
/// error for the caller, never a silent default.
pub async fn get_provider(
    rpc_url: &str,
    chain_id: u64,
    proxy: Option<&ProxyConfig>,
    retry: RetryConfig,
) -> Result<Provider<Http>, EngineError> {
    let attempts = retry.attempts();
    with_retry(retry, "provider init", || async move {
        build_provider(rpc_url, proxy)
    })
    .await
    .map_err(|e| EngineError::ProviderInit {
        chain_id,
        attempts,
        reason: format!("{:#}", e),
    })
}

/// Opens per-account connections. Tests swap in in-memory implementations.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(
        &self,
        account: &Account,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Arc<dyn ChainClient>, EngineError>;

    fn quote_source(
        &self,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Arc<dyn QuoteSource>, EngineError>;
}

pub struct EthersClientFactory {
    config: Arc<IcarusConfig>,
}

impl EthersClientFactory {
    pub fn new(config: Arc<IcarusConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ClientFactory for EthersClientFactory {
    async fn connect(
        &self,
        account: &Account,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Arc<dyn ChainClient>, EngineError> {
        let direction = self.config.direction();
        let provider = get_provider(
            &direction.rpc_url,
            direction.chain_id,
            proxy,
            self.config.gas.provider_retry(),
        )
        .await?;

        Ok(Arc::new(EthersClient::new(
            provider,
            account.wallet().clone(),
            direction.chain_id,
            self.config.gas.receipt_poll(),
        )))
    }

    fn quote_source(
        &self,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Arc<dyn QuoteSource>, EngineError> {
        let quote = &self.config.quote;
        let client = SugarQuoteClient::new(&quote.url, quote.slippage, &quote.origin, proxy)
            .map_err(|e| EngineError::provider("quote client init", format!("{:#}", e)))?;
        Ok(Arc::new(client))
    }
}
