//! Cycle scheduler: walks every account through its swaps and liquidity adds,
//! then parks until the next cycle.

pub mod run_state;

use core_logic::ProxyConfig;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::accounts::Account;
use crate::engine::{perform_add_liquidity, perform_swap, EngineContext, Session};
use crate::error::EngineError;
use crate::provider::ClientFactory;
use crate::run_config::{AmountRange, RunConfig, RunConfigStore};
use crate::tokens::{short_address, LiquidityPairSpec};

pub use run_state::{interruptible_sleep, InFlightGuard, RunSnapshot, RunState, SchedulerState};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error("No valid accounts found.")]
    NoAccounts,
    #[error("Activity already {}", .0.label())]
    AlreadyActive(SchedulerState),
}

#[derive(Debug, Clone, Copy)]
pub struct CycleTimings {
    pub jitter_min: Duration,
    pub jitter_max: Duration,
    pub phase_gap: Duration,
    pub account_gap: Duration,
    pub drain_poll: Duration,
}

impl Default for CycleTimings {
    fn default() -> Self {
        Self {
            jitter_min: Duration::from_secs(10),
            jitter_max: Duration::from_secs(15),
            phase_gap: Duration::from_secs(10),
            account_gap: Duration::from_secs(10),
            drain_poll: Duration::from_secs(1),
        }
    }
}

/// Everything a cycle touches, owned in one place and shared with the dashboard.
pub struct OrchestrationContext {
    pub engine: EngineContext,
    pub run_state: RunState,
    pub run_config: RunConfigStore,
    pub accounts: Vec<Account>,
    pub proxies: Vec<ProxyConfig>,
    pub factory: Arc<dyn ClientFactory>,
    pub timings: CycleTimings,
    rng: Mutex<StdRng>,
    active_account: AtomicUsize,
    attempts: watch::Sender<u64>,
}

impl OrchestrationContext {
    pub fn new(
        engine: EngineContext,
        run_config: RunConfigStore,
        accounts: Vec<Account>,
        proxies: Vec<ProxyConfig>,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            engine,
            run_state: RunState::new(),
            run_config,
            accounts,
            proxies,
            factory,
            timings: CycleTimings::default(),
            rng: Mutex::new(StdRng::from_entropy()),
            active_account: AtomicUsize::new(0),
            attempts: watch::channel(0).0,
        }
    }

    /// Makes directive, amount and delay selection reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_timings(mut self, timings: CycleTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Index of the account currently (or last) processed.
    pub fn active_account(&self) -> usize {
        self.active_account.load(Ordering::SeqCst)
    }

    /// Account `i` uses proxy `i mod n`.
    pub fn proxy_for(&self, index: usize) -> Option<&ProxyConfig> {
        if self.proxies.is_empty() {
            None
        } else {
            self.proxies.get(index % self.proxies.len())
        }
    }

    /// Count of finished swap and liquidity attempts, successful or not.
    pub fn subscribe_attempts(&self) -> watch::Receiver<u64> {
        self.attempts.subscribe()
    }

    fn attempt_finished(&self) {
        self.attempts.send_modify(|n| *n += 1);
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn jitter(&self) -> Duration {
        let min = self.timings.jitter_min.as_millis() as u64;
        let max = (self.timings.jitter_max.as_millis() as u64).max(min);
        Duration::from_millis(self.rng().gen_range(min..=max))
    }

    async fn pause(&self, cancel: &CancellationToken, duration: Duration) -> bool {
        interruptible_sleep(&self.run_state, cancel, duration).await
    }

    /// One pass over every account. Failures never leave this function.
    pub async fn run_cycle(&self, config: &RunConfig, cancel: &CancellationToken) {
        let log = &self.engine.log;
        if self.accounts.is_empty() {
            log.error("No valid accounts found.");
            return;
        }

        log.info(format!(
            "Starting daily activity for all accounts. Auto Swap: {}x, Auto Add Liq: {}x",
            config.swap_repetitions, config.add_liq_repetitions
        ));

        for (index, account) in self.accounts.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            if let Err(e) = self.process_account(index, account, config, cancel).await {
                log.error(format!(
                    "Account {} - Processing failed: {}. Moving to next account.",
                    index + 1,
                    e
                ));
            }

            if index + 1 < self.accounts.len() && !cancel.is_cancelled() {
                log.delay(format!(
                    "Waiting {} seconds before next account...",
                    self.timings.account_gap.as_secs()
                ));
                self.pause(cancel, self.timings.account_gap).await;
            }
        }
    }

    async fn process_account(
        &self,
        index: usize,
        account: &Account,
        config: &RunConfig,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let log = &self.engine.log;
        let n = index + 1;

        log.info(format!("Starting processing for account {}", n));
        self.active_account.store(index, Ordering::SeqCst);

        let proxy = self.proxy_for(index);
        log.info(format!(
            "Account {}: Using Proxy {}",
            n,
            proxy
                .map(|p| p.display_url())
                .unwrap_or_else(|| "none".to_string())
        ));

        if account.address().is_zero() {
            return Err(EngineError::InvalidAddress {
                address: format!("{:?}", account.address()),
            });
        }
        log.wait(format!(
            "Processing account {}: {}",
            n,
            short_address(&account.address())
        ));

        let session = Session {
            chain: self.factory.connect(account, proxy).await?,
            quotes: self.factory.quote_source(proxy)?,
            cancel: cancel.clone(),
        };

        let swaps = self.engine.tokens.swap_catalog();
        for k in 0..config.swap_repetitions {
            if cancel.is_cancelled() {
                break;
            }
            let picked = {
                let mut rng = self.rng();
                swaps.choose(&mut *rng).copied().map(|d| {
                    let amount = sample_amount(&mut *rng, config.range(d.range), d.display_places());
                    (d, amount)
                })
            };
            let Some((directive, amount)) = picked else {
                break;
            };

            log.warn(format!(
                "Account {} - Swap {}: {} with {}",
                n,
                k + 1,
                directive.label(),
                amount
            ));
            {
                let _op = self.run_state.track();
                if let Err(e) = perform_swap(&self.engine, &session, &directive, &amount).await {
                    log.error(format!(
                        "Account {} - Swap {}: Failed: {}. Skipping to next.",
                        n,
                        k + 1,
                        e
                    ));
                }
            }
            self.attempt_finished();

            if k + 1 < config.swap_repetitions && !cancel.is_cancelled() {
                let delay = self.jitter();
                log.delay(format!(
                    "Account {} - Waiting {} seconds before next swap...",
                    n,
                    delay.as_secs()
                ));
                self.pause(cancel, delay).await;
            }
        }

        if config.add_liq_repetitions > 0 && !cancel.is_cancelled() {
            log.delay(format!(
                "Account {} - Waiting {} seconds before starting add liquidity...",
                n,
                self.timings.phase_gap.as_secs()
            ));
            self.pause(cancel, self.timings.phase_gap).await;
        }

        let pairs = self.engine.tokens.liquidity_catalog();
        for k in 0..config.add_liq_repetitions {
            if cancel.is_cancelled() {
                break;
            }
            let picked = {
                let mut rng = self.rng();
                pairs.choose(&mut *rng).copied().map(|p| {
                    let amount = sample_amount(
                        &mut *rng,
                        config.range(p.range),
                        LiquidityPairSpec::DISPLAY_PLACES,
                    );
                    (p, amount)
                })
            };
            let Some((pair, amount)) = picked else {
                break;
            };

            log.warn(format!(
                "Account {} - Add Liquidity {}: {} {}",
                n,
                k + 1,
                amount,
                pair.label()
            ));
            {
                let _op = self.run_state.track();
                if let Err(e) = perform_add_liquidity(&self.engine, &session, &pair, &amount).await
                {
                    log.error(format!(
                        "Account {} - Add Liquidity {}: Failed: {}. Skipping to next.",
                        n,
                        k + 1,
                        e
                    ));
                }
            }
            self.attempt_finished();

            if k + 1 < config.add_liq_repetitions && !cancel.is_cancelled() {
                let delay = self.jitter();
                log.delay(format!(
                    "Account {} - Waiting {} seconds before next add liquidity...",
                    n,
                    delay.as_secs()
                ));
                self.pause(cancel, delay).await;
            }
        }

        Ok(())
    }
}

/// Uniform sample from `range`, rendered with `places` fractional digits.
pub fn sample_amount<R: Rng + ?Sized>(rng: &mut R, range: AmountRange, places: usize) -> String {
    let value = if range.min < range.max {
        rng.gen_range(range.min..=range.max)
    } else {
        range.min
    };
    format!("{:.*}", places, value)
}

/// Drives [`OrchestrationContext`] through the Idle / Running /
/// WaitingNextCycle / Stopping cycle.
#[derive(Clone)]
pub struct Scheduler {
    ctx: Arc<OrchestrationContext>,
}

impl Scheduler {
    pub fn new(ctx: OrchestrationContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub fn context(&self) -> &Arc<OrchestrationContext> {
        &self.ctx
    }

    pub fn state(&self) -> SchedulerState {
        self.ctx.run_state.state()
    }

    /// Spawns the run loop. Rejected without accounts or while a cycle is
    /// running or scheduled.
    pub fn start(&self) -> Result<(), StartError> {
        let log = &self.ctx.engine.log;
        if self.ctx.accounts.is_empty() {
            log.error("No valid accounts found.");
            return Err(StartError::NoAccounts);
        }
        let cancel = self.ctx.run_state.begin().map_err(|state| {
            log.warn(format!("Daily activity is already {}.", state.label()));
            StartError::AlreadyActive(state)
        })?;

        // Taken before spawning so a stop issued right away still waits for the loop.
        let alive = self.ctx.run_state.track();
        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            let _alive = alive;
            run_loop(ctx, cancel).await;
        });
        Ok(())
    }

    /// Requests a stop and returns once every in-flight operation has finished
    /// and the scheduler is back to Idle.
    pub async fn stop(&self) {
        let log = &self.ctx.engine.log;
        if !self.ctx.run_state.request_stop() {
            log.info("No activity is running.");
            return;
        }
        log.info("Stopping daily activity. Please wait for ongoing process to complete.");

        self.ctx
            .run_state
            .drain(self.ctx.timings.drain_poll, log)
            .await;
        self.ctx.engine.nonces.clear().await;
        log.success("Daily activity stopped successfully.");
    }
}

async fn run_loop(ctx: Arc<OrchestrationContext>, cancel: CancellationToken) {
    loop {
        if !ctx.run_state.resume() {
            break;
        }

        let config = ctx.run_config.snapshot();
        ctx.run_cycle(&config, &cancel).await;
        ctx.engine.nonces.clear().await;

        if cancel.is_cancelled() {
            ctx.engine.log.info("Process stopped successfully.");
            break;
        }

        ctx.engine.log.success(format!(
            "All accounts processed. Waiting {} hours for next cycle.",
            config.loop_hours
        ));
        ctx.run_state.park();

        let cool_down = Duration::from_secs(u64::from(config.loop_hours) * 3600);
        if !interruptible_sleep(&ctx.run_state, &cancel, cool_down).await {
            break;
        }
    }
}
