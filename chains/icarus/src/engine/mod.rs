//! Per-action transaction engines.
//!
//! Every engine runs its precondition gates before anything is signed and
//! funnels submission through [`submit::submit_and_confirm`], which owns nonce
//! issuance, conflict eviction and the confirmation deadline. Engines never
//! retry; the scheduler decides what happens next.

pub mod approval;
pub mod liquidity;
pub mod submit;
pub mod swap;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::chain::ChainClient;
use crate::config::IcarusConfig;
use crate::quote::QuoteSource;
use crate::tokens::TokenBook;
use crate::utils::{ActivityLog, NonceCoordinator};

pub use approval::ensure_approval;
pub use liquidity::{min_with_slippage, perform_add_liquidity};
pub use swap::perform_swap;

/// State shared by every engine call of a run.
pub struct EngineContext {
    pub config: Arc<IcarusConfig>,
    pub tokens: TokenBook,
    pub nonces: NonceCoordinator,
    pub log: ActivityLog,
}

impl EngineContext {
    pub fn new(config: Arc<IcarusConfig>) -> Self {
        let tokens = TokenBook::new(&config.deployment);
        let log = ActivityLog::new(config.debug);
        Self {
            config,
            tokens,
            nonces: NonceCoordinator::new(),
            log,
        }
    }
}

/// One account's connection for the duration of its turn.
pub struct Session {
    pub chain: Arc<dyn ChainClient>,
    pub quotes: Arc<dyn QuoteSource>,
    pub cancel: CancellationToken,
}
