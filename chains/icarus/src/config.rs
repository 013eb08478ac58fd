use anyhow::{Context, Result};
use config::{Config, File};
use core_logic::{ConfigError, RetryConfig};
use ethers::types::{Address, U256};
use serde::Deserialize;
use std::time::Duration;

use crate::tokens::Direction;

#[derive(Debug, Deserialize, Clone)]
pub struct IcarusConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    #[serde(default = "default_chain_name")]
    pub chain_name: String,
    #[serde(default = "default_accounts_file")]
    pub accounts_file: String,
    #[serde(default = "default_proxies_file")]
    pub proxies_file: String,
    #[serde(default = "default_run_config_file")]
    pub run_config_file: String,
    #[serde(default)]
    pub debug: bool,
    pub deployment: Deployment,
    #[serde(default)]
    pub quote: QuoteSettings,
    #[serde(default)]
    pub gas: GasSettings,
}

/// Contract addresses of the exchange deployment.
#[derive(Debug, Deserialize, Clone)]
pub struct Deployment {
    pub swap_router: Address,
    pub liquidity_router: Address,
    pub rise: Address,
    pub usdt: Address,
    pub usdc: Address,
    pub wbtc: Address,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuoteSettings {
    pub url: String,
    pub slippage: f64,
    pub origin: String,
}

impl Default for QuoteSettings {
    fn default() -> Self {
        Self {
            url: "https://sugar-sdk-production.up.railway.app/quote".to_string(),
            slippage: 0.5,
            origin: "https://www.icarus.finance".to_string(),
        }
    }
}

/// Fixed gas limits and timing knobs. The limits are tied to the targeted
/// contracts and are never estimated.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GasSettings {
    pub approve_limit: u64,
    pub swap_limit: u64,
    pub liquidity_limit: u64,
    pub fallback_gas_price_gwei: u64,
    pub confirmation_timeout_secs: u64,
    pub receipt_poll_ms: u64,
    pub provider_retries: u32,
    pub provider_retry_delay_ms: u64,
}

impl Default for GasSettings {
    fn default() -> Self {
        Self {
            approve_limit: 100_000,
            swap_limit: 650_000,
            liquidity_limit: 650_000,
            fallback_gas_price_gwei: 1,
            confirmation_timeout_secs: 300,
            receipt_poll_ms: 2_000,
            provider_retries: 3,
            provider_retry_delay_ms: 1_000,
        }
    }
}

impl GasSettings {
    pub fn fallback_gas_price(&self) -> U256 {
        U256::from(self.fallback_gas_price_gwei) * U256::exp10(9)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn receipt_poll(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }

    pub fn provider_retry(&self) -> RetryConfig {
        RetryConfig::fixed(self.provider_retries, self.provider_retry_delay_ms)
    }
}

fn default_chain_name() -> String {
    "icarus".to_string()
}

fn default_accounts_file() -> String {
    core_logic::KeyFileLoader::KEY_FILE.to_string()
}

fn default_proxies_file() -> String {
    core_logic::ProxyManager::PROXY_FILE.to_string()
}

fn default_run_config_file() -> String {
    "config.json".to_string()
}

impl IcarusConfig {
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path))
            .build()
            .with_context(|| format!("Failed to read {}", path))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!(e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.rpc_url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::InvalidRpcUrl {
                    url: self.rpc_url.clone(),
                })
            }
        }
        if self.gas.provider_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gas.provider_retries".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn direction(&self) -> Direction {
        Direction {
            rpc_url: self.rpc_url.clone(),
            chain_id: self.chain_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TOML: &str = r#"
rpc_url = "https://testnet.riselabs.xyz"
chain_id = 11155931

[deployment]
swap_router = "0xA33BE72Bf5f5fA7B98c104cFB56cE83072d872dE"
liquidity_router = "0x93f504193778ebe3cC7986D85E02502B46e616D7"
rise = "0xd6e1afe5cA8D00A2EFC01B89997abE2De47fdfAf"
usdt = "0x40918Ba7f132E0aCba2CE4de4c4baF9BD2D7D849"
usdc = "0x8A93d247134d91e0de6f96547cB0204e5BE8e5D8"
wbtc = "0xF32D39ff9f6Aa7a7A64d7a4F00a54826Ef791a55"

[gas]
swap_limit = 700000
"#;

    #[test]
    fn test_load_applies_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(TOML.as_bytes()).unwrap();

        let config = IcarusConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.chain_id, 11155931);
        assert_eq!(config.accounts_file, "pk.txt");
        assert_eq!(config.gas.swap_limit, 700_000);
        assert_eq!(config.gas.approve_limit, 100_000);
        assert_eq!(config.gas.fallback_gas_price(), U256::from(1_000_000_000u64));
        assert_eq!(config.quote.slippage, 0.5);
        assert_eq!(
            config.deployment.swap_router,
            "0xA33BE72Bf5f5fA7B98c104cFB56cE83072d872dE"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[test]
    fn test_rejects_non_http_rpc_url() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(TOML.replace("https://", "ftp://").as_bytes())
            .unwrap();
        assert!(IcarusConfig::load(file.path().to_str().unwrap()).is_err());
    }
}
