//! Operator-tunable run parameters, persisted as `config.json`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    #[error("{field} must be a positive number, got '{input}'")]
    NotANumber { field: String, input: String },

    #[error("{field} must be greater than 0")]
    NonPositive { field: String },

    #[error("{field}: min ({min}) cannot be greater than max ({max})")]
    InvertedRange { field: String, min: f64, max: f64 },
}

/// The six named amount ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeKey {
    RiseSwap,
    EthSwap,
    UsdtSwap,
    UsdcSwap,
    UsdtLiq,
    UsdcLiq,
}

impl RangeKey {
    pub const ALL: [RangeKey; 6] = [
        RangeKey::RiseSwap,
        RangeKey::EthSwap,
        RangeKey::UsdtSwap,
        RangeKey::UsdcSwap,
        RangeKey::UsdtLiq,
        RangeKey::UsdcLiq,
    ];

    pub fn json_key(&self) -> &'static str {
        match self {
            RangeKey::RiseSwap => "riseSwapRange",
            RangeKey::EthSwap => "ethSwapRange",
            RangeKey::UsdtSwap => "usdtSwapRange",
            RangeKey::UsdcSwap => "usdcSwapRange",
            RangeKey::UsdtLiq => "usdtLiqRange",
            RangeKey::UsdcLiq => "usdcLiqRange",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RangeKey::RiseSwap => "RISE Swap Range",
            RangeKey::EthSwap => "ETH Swap Range",
            RangeKey::UsdtSwap => "USDT Swap Range",
            RangeKey::UsdcSwap => "USDC Swap Range",
            RangeKey::UsdtLiq => "USDT Liquidity Range",
            RangeKey::UsdcLiq => "USDC Liquidity Range",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

impl AmountRange {
    pub const fn new_unchecked(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn new(field: &str, min: f64, max: f64) -> Result<Self, ConfigValidationError> {
        if !(min > 0.0) || !(max > 0.0) {
            return Err(ConfigValidationError::NonPositive {
                field: field.to_string(),
            });
        }
        if min > max {
            return Err(ConfigValidationError::InvertedRange {
                field: field.to_string(),
                min,
                max,
            });
        }
        Ok(Self { min, max })
    }
}

/// Single validated mutation of a [`RunConfig`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigUpdate {
    SwapRepetitions(u32),
    AddLiqRepetitions(u32),
    Range(RangeKey, AmountRange),
    LoopHours(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub swap_repetitions: u32,
    pub add_liq_repetitions: u32,
    pub rise_swap_range: AmountRange,
    pub eth_swap_range: AmountRange,
    pub usdt_swap_range: AmountRange,
    pub usdc_swap_range: AmountRange,
    pub usdt_liq_range: AmountRange,
    pub usdc_liq_range: AmountRange,
    pub loop_hours: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            swap_repetitions: 1,
            add_liq_repetitions: 1,
            rise_swap_range: AmountRange::new_unchecked(1.0, 3.0),
            eth_swap_range: AmountRange::new_unchecked(0.00005, 0.0001),
            usdt_swap_range: AmountRange::new_unchecked(0.1, 0.5),
            usdc_swap_range: AmountRange::new_unchecked(0.1, 0.5),
            usdt_liq_range: AmountRange::new_unchecked(0.1, 0.2),
            usdc_liq_range: AmountRange::new_unchecked(0.1, 0.2),
            loop_hours: 24,
        }
    }
}

impl RunConfig {
    pub fn range(&self, key: RangeKey) -> AmountRange {
        match key {
            RangeKey::RiseSwap => self.rise_swap_range,
            RangeKey::EthSwap => self.eth_swap_range,
            RangeKey::UsdtSwap => self.usdt_swap_range,
            RangeKey::UsdcSwap => self.usdc_swap_range,
            RangeKey::UsdtLiq => self.usdt_liq_range,
            RangeKey::UsdcLiq => self.usdc_liq_range,
        }
    }

    fn range_mut(&mut self, key: RangeKey) -> &mut AmountRange {
        match key {
            RangeKey::RiseSwap => &mut self.rise_swap_range,
            RangeKey::EthSwap => &mut self.eth_swap_range,
            RangeKey::UsdtSwap => &mut self.usdt_swap_range,
            RangeKey::UsdcSwap => &mut self.usdc_swap_range,
            RangeKey::UsdtLiq => &mut self.usdt_liq_range,
            RangeKey::UsdcLiq => &mut self.usdc_liq_range,
        }
    }

    /// Applies `update` if it passes validation; the config is untouched otherwise.
    pub fn apply(&mut self, update: ConfigUpdate) -> Result<(), ConfigValidationError> {
        match update {
            ConfigUpdate::SwapRepetitions(n) => {
                self.swap_repetitions = require_positive("swapRepetitions", n)?
            }
            ConfigUpdate::AddLiqRepetitions(n) => {
                self.add_liq_repetitions = require_positive("addLiqRepetitions", n)?
            }
            ConfigUpdate::LoopHours(n) => self.loop_hours = require_positive("loopHours", n)?,
            ConfigUpdate::Range(key, range) => {
                *self.range_mut(key) = AmountRange::new(key.json_key(), range.min, range.max)?
            }
        }
        Ok(())
    }

    /// Builds a config from a loosely-typed document. Missing, non-numeric and
    /// non-positive fields fall back to defaults, as do inverted ranges.
    pub fn from_value(value: &Value) -> Self {
        let defaults = Self::default();
        let mut config = defaults.clone();

        config.swap_repetitions = positive_int(value.get("swapRepetitions"))
            .unwrap_or(defaults.swap_repetitions);
        config.add_liq_repetitions = positive_int(value.get("addLiqRepetitions"))
            .unwrap_or(defaults.add_liq_repetitions);
        config.loop_hours = positive_int(value.get("loopHours")).unwrap_or(defaults.loop_hours);

        for key in RangeKey::ALL {
            if let Some(range) = value.get(key.json_key()).and_then(|r| {
                let min = positive_float(r.get("min"))?;
                let max = positive_float(r.get("max"))?;
                AmountRange::new(key.json_key(), min, max).ok()
            }) {
                *config.range_mut(key) = range;
            }
        }

        config
    }
}

fn require_positive(field: &str, n: u32) -> Result<u32, ConfigValidationError> {
    if n == 0 {
        return Err(ConfigValidationError::NonPositive {
            field: field.to_string(),
        });
    }
    Ok(n)
}

fn positive_float(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n.is_finite() && n > 0.0).then_some(n)
}

fn positive_int(value: Option<&Value>) -> Option<u32> {
    let n = positive_float(value)?;
    (n >= 1.0 && n <= u32::MAX as f64).then(|| n.trunc() as u32)
}

/// Owns the live [`RunConfig`] and writes it back after every accepted update.
pub struct RunConfigStore {
    path: PathBuf,
    current: RwLock<RunConfig>,
}

impl RunConfigStore {
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let config = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(value) => {
                    info!("Loaded run config from {}", path.display());
                    RunConfig::from_value(&value)
                }
                Err(e) => {
                    error!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    RunConfig::default()
                }
            },
            Err(_) => {
                info!("No {} found, using default run config.", path.display());
                RunConfig::default()
            }
        };

        Self {
            path,
            current: RwLock::new(config),
        }
    }

    pub fn in_memory(path: impl Into<PathBuf>, config: RunConfig) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(config),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> RunConfig {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Validates and applies `update`, then persists. A failed write is logged,
    /// the in-memory value stays updated.
    pub fn update(&self, update: ConfigUpdate) -> Result<RunConfig, ConfigValidationError> {
        let updated = {
            let mut current = self
                .current
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            current.apply(update)?;
            current.clone()
        };

        if let Err(e) = self.save(&updated) {
            error!("Failed to save {}: {:#}", self.path.display(), e);
        }
        Ok(updated)
    }

    fn save(&self, config: &RunConfig) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
