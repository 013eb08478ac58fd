//! Swap routes from the external quote service.

use async_trait::async_trait;
use core_logic::ProxyConfig;
use ethers::types::{Bytes, U256};
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use serde::Deserialize;
use std::str::FromStr;

use crate::error::EngineError;
use crate::provider::build_http_client;

const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Raw quote payload. Fields are optional so that a partial response is
/// reported as an invalid quote instead of a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SwapQuote {
    pub encoded_commands: Option<String>,
    pub pretty_encoded_inputs: Option<Vec<String>>,
}

/// Validated arguments for the router's `execute`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRoute {
    pub commands: Bytes,
    pub inputs: Vec<Bytes>,
}

impl SwapQuote {
    pub fn into_route(self) -> Result<SwapRoute, EngineError> {
        let commands = self
            .encoded_commands
            .filter(|c| !c.trim().is_empty() && c.trim() != "0x")
            .ok_or_else(|| invalid("missing encoded_commands"))?;
        let inputs = self
            .pretty_encoded_inputs
            .filter(|i| !i.is_empty())
            .ok_or_else(|| invalid("missing pretty_encoded_inputs"))?;

        let commands = Bytes::from_str(commands.trim())
            .map_err(|e| invalid(&format!("encoded_commands is not hex: {}", e)))?;
        let inputs = inputs
            .iter()
            .map(|input| Bytes::from_str(input.trim()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| invalid(&format!("pretty_encoded_inputs is not hex: {}", e)))?;

        Ok(SwapRoute { commands, inputs })
    }
}

fn invalid(reason: &str) -> EngineError {
    EngineError::InvalidQuote {
        reason: reason.to_string(),
    }
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quote(
        &self,
        token_from: &str,
        token_to: &str,
        amount: U256,
    ) -> Result<SwapQuote, EngineError>;
}

pub struct SugarQuoteClient {
    http: reqwest::Client,
    url: String,
    slippage: f64,
}

impl SugarQuoteClient {
    pub fn new(
        url: &str,
        slippage: f64,
        origin: &str,
        proxy: Option<&ProxyConfig>,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_AGENT));
        headers.insert(ORIGIN, HeaderValue::from_str(origin)?);
        headers.insert(REFERER, HeaderValue::from_str(&format!("{}/", origin.trim_end_matches('/')))?);

        Ok(Self {
            http: build_http_client(proxy, headers)?,
            url: url.to_string(),
            slippage,
        })
    }
}

#[async_trait]
impl QuoteSource for SugarQuoteClient {
    async fn quote(
        &self,
        token_from: &str,
        token_to: &str,
        amount: U256,
    ) -> Result<SwapQuote, EngineError> {
        let response = self
            .http
            .get(&self.url)
            .query(&[
                ("token_from", token_from.to_string()),
                ("token_to", token_to.to_string()),
                ("amount", amount.to_string()),
                ("slippage", self.slippage.to_string()),
            ])
            .send()
            .await
            .map_err(|e| EngineError::provider("quote", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::provider(
                "quote",
                format!("HTTP {} from quote service", status),
            ));
        }

        response
            .json::<SwapQuote>()
            .await
            .map_err(|e| invalid(&format!("malformed payload: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_from_complete_quote() {
        let quote: SwapQuote = serde_json::from_str(
            r#"{"encoded_commands":"0x0b08","pretty_encoded_inputs":["0x01","0xabcd"],"amount_out":"12"}"#,
        )
        .unwrap();
        let route = quote.into_route().unwrap();
        assert_eq!(route.commands, Bytes::from(vec![0x0b, 0x08]));
        assert_eq!(route.inputs.len(), 2);
    }

    #[test]
    fn test_rejects_missing_or_empty_fields() {
        let missing: SwapQuote = serde_json::from_str(r#"{"encoded_commands":"0x0b"}"#).unwrap();
        assert!(matches!(
            missing.into_route(),
            Err(EngineError::InvalidQuote { .. })
        ));

        let empty = SwapQuote {
            encoded_commands: Some("0x".into()),
            pretty_encoded_inputs: Some(vec!["0x01".into()]),
        };
        assert!(empty.into_route().is_err());

        let not_hex = SwapQuote {
            encoded_commands: Some("0x0b".into()),
            pretty_encoded_inputs: Some(vec!["zz".into()]),
        };
        assert!(not_hex.into_route().is_err());
    }
}
