//! Token catalog and action directives for the Icarus deployment.

use ethers::types::{Address, H256, U256};
use ethers::utils::{format_units, parse_units, to_checksum};

use crate::config::Deployment;
use crate::error::EngineError;
use crate::run_config::RangeKey;

/// Where transactions are submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Direction {
    pub rpc_url: String,
    pub chain_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asset {
    Native,
    Erc20(Address),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub symbol: &'static str,
    pub asset: Asset,
    pub decimals: u32,
}

impl Token {
    pub fn is_native(&self) -> bool {
        matches!(self.asset, Asset::Native)
    }

    /// Identifier understood by the quote service.
    pub fn quote_id(&self) -> String {
        match self.asset {
            Asset::Native => "ETH".to_string(),
            Asset::Erc20(address) => to_checksum(&address, None),
        }
    }

    pub fn erc20_address(&self) -> Result<Address, EngineError> {
        match self.asset {
            Asset::Erc20(address) => Ok(address),
            Asset::Native => Err(EngineError::InvalidAddress {
                address: format!("{} has no token contract", self.symbol),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenBook {
    pub eth: Token,
    pub rise: Token,
    pub usdt: Token,
    pub usdc: Token,
    pub wbtc: Token,
}

impl TokenBook {
    pub fn new(deployment: &Deployment) -> Self {
        Self {
            eth: Token {
                symbol: "ETH",
                asset: Asset::Native,
                decimals: 18,
            },
            rise: Token {
                symbol: "RISE",
                asset: Asset::Erc20(deployment.rise),
                decimals: 18,
            },
            usdt: Token {
                symbol: "USDT",
                asset: Asset::Erc20(deployment.usdt),
                decimals: 6,
            },
            usdc: Token {
                symbol: "USDC",
                asset: Asset::Erc20(deployment.usdc),
                decimals: 6,
            },
            wbtc: Token {
                symbol: "WBTC",
                asset: Asset::Erc20(deployment.wbtc),
                // The deployed WBTC mock uses 18 decimals.
                decimals: 18,
            },
        }
    }

    /// Columns of the wallet table.
    pub fn balance_columns(&self) -> [Token; 4] {
        [self.eth, self.rise, self.usdt, self.usdc]
    }

    pub fn swap_catalog(&self) -> Vec<SwapDirective> {
        vec![
            SwapDirective::new(self.rise, self.eth, RangeKey::RiseSwap),
            SwapDirective::new(self.eth, self.rise, RangeKey::EthSwap),
            SwapDirective::new(self.rise, self.usdc, RangeKey::RiseSwap),
            SwapDirective::new(self.usdc, self.rise, RangeKey::UsdcSwap),
            SwapDirective::new(self.rise, self.usdt, RangeKey::RiseSwap),
            SwapDirective::new(self.usdt, self.rise, RangeKey::UsdtSwap),
        ]
    }

    pub fn liquidity_catalog(&self) -> Vec<LiquidityPairSpec> {
        vec![
            LiquidityPairSpec {
                primary: self.usdt,
                secondary: self.usdc,
                stable: true,
                range: RangeKey::UsdtLiq,
            },
            LiquidityPairSpec {
                primary: self.usdt,
                secondary: self.rise,
                stable: false,
                range: RangeKey::UsdtLiq,
            },
            LiquidityPairSpec {
                primary: self.usdc,
                secondary: self.wbtc,
                stable: false,
                range: RangeKey::UsdcLiq,
            },
        ]
    }
}

/// One kind of swap the scheduler can pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapDirective {
    pub from: Token,
    pub to: Token,
    pub range: RangeKey,
}

impl SwapDirective {
    pub fn new(from: Token, to: Token, range: RangeKey) -> Self {
        Self { from, to, range }
    }

    pub fn decimals(&self) -> u32 {
        self.from.decimals
    }

    pub fn label(&self) -> String {
        format!("{} ➯ {}", self.from.symbol, self.to.symbol)
    }

    /// Places kept when a sampled amount is rendered: 6 for the native asset, 2 otherwise.
    pub fn display_places(&self) -> usize {
        if self.from.is_native() {
            6
        } else {
            2
        }
    }
}

/// One pool the liquidity phase can deposit into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityPairSpec {
    pub primary: Token,
    pub secondary: Token,
    pub stable: bool,
    pub range: RangeKey,
}

impl LiquidityPairSpec {
    /// Desired amount of the secondary token, in whole units. The pool quote caps it.
    pub const SECONDARY_DESIRED: &'static str = "1000";
    pub const DISPLAY_PLACES: usize = 6;

    pub fn label(&self) -> String {
        format!("{} for {}", self.primary.symbol, self.secondary.symbol)
    }
}

pub fn short_address(address: &Address) -> String {
    shorten(&to_checksum(address, None))
}

pub fn short_hash(hash: &H256) -> String {
    shorten(&format!("{:?}", hash))
}

fn shorten(full: &str) -> String {
    if full.len() <= 10 {
        return full.to_string();
    }
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

/// Decimal string to base units.
pub fn to_base_units(amount: &str, decimals: u32) -> Result<U256, EngineError> {
    parse_units(amount, decimals)
        .map(Into::into)
        .map_err(|e| EngineError::InvalidAmount {
            amount: amount.to_string(),
            reason: e.to_string(),
        })
}

/// Base units to a decimal string with exactly `places` fractional digits.
pub fn format_amount(value: U256, decimals: u32, places: usize) -> String {
    match format_units(value, decimals) {
        Ok(s) => match s.parse::<f64>() {
            Ok(v) => format!("{:.*}", places, v),
            Err(_) => s,
        },
        Err(_) => value.to_string(),
    }
}
