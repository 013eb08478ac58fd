//! Icarus - DEX activity bot for the RISE testnet
//!
//! Walks a set of accounts through randomised swaps and liquidity adds on the
//! Icarus routers, one cycle at a time, with a terminal dashboard on top.
//!
//! # Architecture
//!
//! - **[`chain::ChainClient`]**: RPC seam; [`chain::EthersClient`] signs and sends
//!   through an ethers `SignerMiddleware`
//! - **[`utils::NonceCoordinator`]**: nonce issuance keyed by chain and address
//! - **[`engine`]**: approval, swap and liquidity engines with precondition gates
//! - **[`scheduler::Scheduler`]**: cycle loop, cooperative stop and drain
//! - **[`dashboard::Dashboard`]**: menus, status line, wallet table and log tail

pub mod accounts;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod provider;
pub mod quote;
pub mod run_config;
pub mod scheduler;
pub mod tokens;
pub mod utils;

pub use error::EngineError;
