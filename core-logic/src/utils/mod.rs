//! # Utilities Module
//!
//! Internal utility modules for the core-logic crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

pub(crate) mod key_loader;
pub(crate) mod logger;
pub(crate) mod proxy_manager;
pub(crate) mod retry;

pub use key_loader::{KeyFileLoader, RawKey};
pub use logger::{setup_logger, ACTIVITY_TARGET};
pub use proxy_manager::ProxyManager;
