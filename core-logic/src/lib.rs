//! # Core Logic - Shared Utilities for Testnet Automation
//!
//! Chain-agnostic building blocks used by the chain crates in this workspace.
//!
//! ## Modules
//!
//! - [`config`] - Proxy configuration shared by every transport
//! - [`error`] - Typed error handling with thiserror
//! - `utils` - logging setup, key and proxy file loaders, retry helpers

pub mod config;
pub mod error;
pub(crate) mod utils;

pub use config::{ProxyConfig, ProxyKind};
pub use error::{ConfigError, NetworkError, WalletError};

pub use utils::{setup_logger, KeyFileLoader, ProxyManager, RawKey, ACTIVITY_TARGET};

pub use utils::retry::{with_retry, RetryConfig};
