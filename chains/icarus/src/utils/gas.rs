use ethers::types::U256;

use crate::chain::ChainClient;
use crate::utils::activity_log::ActivityLog;

/// Raw fee fields as the node reports them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeData {
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub gas_price: Option<U256>,
}

/// Submission-ready fee configuration. Resolved per transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeParams {
    Eip1559 {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
    Legacy {
        gas_price: U256,
    },
}

impl FeeParams {
    /// Per-gas price used for the cost check: `gasPrice` or `maxFeePerGas`.
    pub fn fee_per_gas(&self) -> U256 {
        match self {
            FeeParams::Eip1559 {
                max_fee_per_gas, ..
            } => *max_fee_per_gas,
            FeeParams::Legacy { gas_price } => *gas_price,
        }
    }

    /// Upper bound of what `gas_limit` units can cost, plus `value`.
    pub fn max_cost(&self, gas_limit: U256, value: U256) -> U256 {
        self.fee_per_gas()
            .saturating_mul(gas_limit)
            .saturating_add(value)
    }

    pub fn resolve(data: &FeeData, fallback_gas_price: U256) -> Self {
        match (data.max_fee_per_gas, data.max_priority_fee_per_gas) {
            (Some(max_fee_per_gas), Some(max_priority_fee_per_gas)) => FeeParams::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            },
            _ => FeeParams::Legacy {
                gas_price: data.gas_price.unwrap_or(fallback_gas_price),
            },
        }
    }
}

/// Never fails: a query error degrades to a legacy fee of `fallback_gas_price`.
pub async fn get_fee_params(
    chain: &dyn ChainClient,
    fallback_gas_price: U256,
    log: &ActivityLog,
) -> FeeParams {
    match chain.fee_data().await {
        Ok(data) => FeeParams::resolve(&data, fallback_gas_price),
        Err(e) => {
            log.debug(format!("Failed to get fee data: {}. Using default.", e));
            FeeParams::Legacy {
                gas_price: fallback_gas_price,
            }
        }
    }
}
