//! Operator surface: menus, status line, wallet table and log tail.

use anyhow::Result;
use colored::*;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use ethers::types::Address;
use futures::future::join_all;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::EngineError;
use crate::run_config::{AmountRange, ConfigUpdate, ConfigValidationError, RangeKey, RunConfig};
use crate::scheduler::{OrchestrationContext, RunSnapshot, Scheduler, SchedulerState};
use crate::tokens::{format_amount, short_address, Asset};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const STATUS_EVERY: Duration = Duration::from_millis(500);
const LOG_TAIL: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    SwapRepetitions,
    AddLiqRepetitions,
    Range(RangeKey),
    LoopHours,
    Back,
}

impl ConfigField {
    pub fn all() -> Vec<ConfigField> {
        let mut fields = vec![ConfigField::SwapRepetitions, ConfigField::AddLiqRepetitions];
        fields.extend(RangeKey::ALL.into_iter().map(ConfigField::Range));
        fields.push(ConfigField::LoopHours);
        fields.push(ConfigField::Back);
        fields
    }

    pub fn label(&self, config: &RunConfig) -> String {
        match self {
            ConfigField::SwapRepetitions => {
                format!("Swap Repetitions ({})", config.swap_repetitions)
            }
            ConfigField::AddLiqRepetitions => {
                format!("Add Liquidity Repetitions ({})", config.add_liq_repetitions)
            }
            ConfigField::Range(key) => {
                let range = config.range(*key);
                format!("{} ({} - {})", key.label(), range.min, range.max)
            }
            ConfigField::LoopHours => format!("Loop Hours ({})", config.loop_hours),
            ConfigField::Back => "Back to Main Menu".to_string(),
        }
    }

    /// Number of operator inputs the field needs.
    pub fn arity(&self) -> usize {
        match self {
            ConfigField::Range(_) => 2,
            ConfigField::Back => 0,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Configure(ConfigField),
    ClearLogs,
    Refresh,
    Exit,
}

/// Entries of the main menu. `Config` opens the field submenu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Start,
    Stop,
    Config,
    ClearLogs,
    Refresh,
    Exit,
}

impl MenuItem {
    /// Start is swapped for Stop while a cycle is running or scheduled.
    pub fn main_menu(active: bool) -> Vec<MenuItem> {
        let first = if active {
            MenuItem::Stop
        } else {
            MenuItem::Start
        };
        vec![
            first,
            MenuItem::Config,
            MenuItem::ClearLogs,
            MenuItem::Refresh,
            MenuItem::Exit,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            MenuItem::Start => "Start Auto Daily Activity",
            MenuItem::Stop => "Stop Activity",
            MenuItem::Config => "Set Manual Config",
            MenuItem::ClearLogs => "Clear Logs",
            MenuItem::Refresh => "Refresh",
            MenuItem::Exit => "Exit",
        }
    }
}

/// Turns operator text into a validated update. `Back` yields `None`.
pub fn parse_update(
    field: ConfigField,
    inputs: &[String],
) -> Result<Option<ConfigUpdate>, ConfigValidationError> {
    let input = |i: usize| inputs.get(i).map(|s| s.trim()).unwrap_or("");

    let update = match field {
        ConfigField::Back => return Ok(None),
        ConfigField::SwapRepetitions => {
            ConfigUpdate::SwapRepetitions(parse_count("swapRepetitions", input(0))?)
        }
        ConfigField::AddLiqRepetitions => {
            ConfigUpdate::AddLiqRepetitions(parse_count("addLiqRepetitions", input(0))?)
        }
        ConfigField::LoopHours => ConfigUpdate::LoopHours(parse_count("loopHours", input(0))?),
        ConfigField::Range(key) => {
            let field = key.json_key();
            let min = parse_decimal(field, input(0))?;
            let max = parse_decimal(field, input(1))?;
            ConfigUpdate::Range(key, AmountRange::new(field, min, max)?)
        }
    };
    Ok(Some(update))
}

fn parse_count(field: &str, input: &str) -> Result<u32, ConfigValidationError> {
    let n: i64 = input.parse().map_err(|_| ConfigValidationError::NotANumber {
        field: field.to_string(),
        input: input.to_string(),
    })?;
    if n < 1 || n > u32::MAX as i64 {
        return Err(ConfigValidationError::NonPositive {
            field: field.to_string(),
        });
    }
    Ok(n as u32)
}

fn parse_decimal(field: &str, input: &str) -> Result<f64, ConfigValidationError> {
    let n: f64 = input.parse().map_err(|_| ConfigValidationError::NotANumber {
        field: field.to_string(),
        input: input.to_string(),
    })?;
    if !n.is_finite() || n <= 0.0 {
        return Err(ConfigValidationError::NonPositive {
            field: field.to_string(),
        });
    }
    Ok(n)
}

/// Inputs of the status line.
#[derive(Debug, Clone)]
pub struct StatusLine {
    pub run: RunSnapshot,
    pub active_address: Option<Address>,
    pub total_accounts: usize,
    pub config: RunConfig,
}

impl StatusLine {
    pub fn capture(ctx: &OrchestrationContext) -> Self {
        Self {
            run: ctx.run_state.snapshot(),
            active_address: ctx.accounts.get(ctx.active_account()).map(|a| a.address()),
            total_accounts: ctx.accounts.len(),
            config: ctx.run_config.snapshot(),
        }
    }

    pub fn render(&self, frame: usize) -> String {
        let state = match self.run.state {
            SchedulerState::Idle => self.run.state.label().green(),
            SchedulerState::Running => self.run.state.label().yellow(),
            SchedulerState::WaitingNextCycle => self.run.state.label().cyan(),
            SchedulerState::Stopping => self.run.state.label().red(),
        };
        let spinner = if self.run.cycle_running {
            format!("{} ", SPINNER[frame % SPINNER.len()])
        } else {
            String::new()
        };
        let address = self
            .active_address
            .map(|a| short_address(&a))
            .unwrap_or_else(|| "N/A".to_string());

        format!(
            "{}Status: {} | Active Account: {} | Total Accounts: {} | Auto Swap: {}x | Auto Add Liq: {}x | Loop: {}h | ICARUS AUTO BOT",
            spinner,
            state,
            address,
            self.total_accounts,
            self.config.swap_repetitions,
            self.config.add_liq_repetitions,
            self.config.loop_hours
        )
    }
}

/// Refreshes the status line every 500ms on its own task, independent of the
/// orchestration flow.
pub fn spawn_status_task(ctx: Arc<OrchestrationContext>) -> watch::Receiver<String> {
    let (tx, rx) = watch::channel(StatusLine::capture(&ctx).render(0));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(STATUS_EVERY);
        let mut frame = 0usize;
        loop {
            ticker.tick().await;
            frame = frame.wrapping_add(1);
            if tx.send(StatusLine::capture(&ctx).render(frame)).is_err() {
                break;
            }
        }
    });
    rx
}

#[derive(Debug, Clone)]
pub struct WalletRow {
    pub index: usize,
    pub address: Address,
    pub balances: Option<[String; 4]>,
}

async fn fetch_balances(
    ctx: &OrchestrationContext,
    index: usize,
) -> Result<(Address, [String; 4]), EngineError> {
    let account = &ctx.accounts[index];
    let address = account.address();
    let chain = ctx.factory.connect(account, ctx.proxy_for(index)).await?;

    let mut balances: [String; 4] = Default::default();
    for (slot, token) in balances
        .iter_mut()
        .zip(ctx.engine.tokens.balance_columns().iter())
    {
        let raw = match token.asset {
            Asset::Native => chain.native_balance(address).await?,
            Asset::Erc20(contract) => chain.token_balance(contract, address).await?,
        };
        *slot = format_amount(raw, token.decimals, 6);
    }
    Ok((address, balances))
}

/// ETH/RISE/USDT/USDC balances of every account, queried concurrently.
/// A failed account yields a row without balances.
pub async fn refresh_wallets(ctx: &OrchestrationContext) -> Vec<WalletRow> {
    let rows = join_all((0..ctx.accounts.len()).map(|index| async move {
        match fetch_balances(ctx, index).await {
            Ok((address, balances)) => WalletRow {
                index,
                address,
                balances: Some(balances),
            },
            Err(e) => {
                ctx.engine.log.error(format!(
                    "Failed to fetch wallet data for account #{}: {}",
                    index + 1,
                    e
                ));
                WalletRow {
                    index,
                    address: ctx.accounts[index].address(),
                    balances: None,
                }
            }
        }
    }))
    .await;

    ctx.engine.log.success("Wallet data updated.");
    rows
}

pub fn render_wallet_table(rows: &[WalletRow], active: usize) -> String {
    let mut out = format!(
        "  {:<15} {:<12} {:<12} {:<12} {:<12}\n",
        "Address", "ETH", "RISE", "USDT", "USDC"
    );
    for row in rows {
        let marker = if row.index == active { "→ " } else { "  " };
        match &row.balances {
            Some([eth, rise, usdt, usdc]) => out.push_str(&format!(
                "{}{:<15} {:<12} {:<12} {:<12} {:<12}\n",
                marker,
                short_address(&row.address).bright_magenta().bold(),
                eth.bright_cyan(),
                rise.bright_yellow(),
                usdt.bright_green(),
                usdc.bright_blue()
            )),
            None => out.push_str(&format!(
                "{}{:<15} {:<12} {:<12} {:<12} {:<12}\n",
                marker, "N/A", "0.000000", "0.000000", "0.000000", "0.000000"
            )),
        }
    }
    out
}

pub type WalletTable = Arc<Mutex<Vec<WalletRow>>>;

fn store_rows(wallets: &WalletTable, rows: Vec<WalletRow>) {
    *wallets.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = rows;
}

fn load_rows(wallets: &WalletTable) -> Vec<WalletRow> {
    wallets
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Reloads the wallet table after every swap or liquidity attempt.
pub fn spawn_wallet_follower(
    ctx: Arc<OrchestrationContext>,
    wallets: WalletTable,
) -> JoinHandle<()> {
    let mut attempts = ctx.subscribe_attempts();
    tokio::spawn(async move {
        while attempts.changed().await.is_ok() {
            let rows = refresh_wallets(&ctx).await;
            store_rows(&wallets, rows);
        }
    })
}

/// Everything above the menu. The height only depends on the number of
/// wallet rows, so a repaint never pushes the menu around.
pub fn render_frame(
    status: &str,
    wallets: &[WalletRow],
    active: usize,
    logs: &[String],
) -> Vec<String> {
    let mut lines = vec![
        "ICARUS TESTNET AUTO BOT".bright_yellow().bold().to_string(),
        status.to_string(),
        String::new(),
        " Wallet Information".cyan().bold().to_string(),
    ];
    lines.extend(render_wallet_table(wallets, active).lines().map(str::to_string));
    lines.push(" Transaction Logs".cyan().bold().to_string());

    let skip = logs.len().saturating_sub(LOG_TAIL);
    lines.extend(logs.iter().skip(skip).cloned());
    lines.extend((logs.len() - skip..LOG_TAIL).map(|_| String::new()));
    lines.push(String::new());
    lines
}

fn current_frame(ctx: &OrchestrationContext, wallets: &WalletTable, status: &str) -> Vec<String> {
    let logs: Vec<String> = ctx
        .engine
        .log
        .tail(LOG_TAIL)
        .iter()
        .map(ToString::to_string)
        .collect();
    render_frame(status, &load_rows(wallets), ctx.active_account(), &logs)
}

/// Rewrites the frame from the top of the screen and puts the cursor back
/// where the prompt left it.
fn paint_in_place(frame: &[String]) {
    let mut out = String::from("\x1B7\x1B[H");
    for line in frame {
        out.push_str(line);
        out.push_str("\x1B[K\n");
    }
    out.push_str("\x1B8");

    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(out.as_bytes());
    let _ = stdout.flush();
}

/// Repaints the frame on every status tick, whatever the menu is doing.
fn spawn_repaint_task(
    ctx: Arc<OrchestrationContext>,
    wallets: WalletTable,
    mut status: watch::Receiver<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let line = status.borrow_and_update().clone();
            paint_in_place(&current_frame(&ctx, &wallets, &line));
        }
    })
}

pub struct Dashboard {
    scheduler: Scheduler,
    wallets: WalletTable,
}

impl Dashboard {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            wallets: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn ctx(&self) -> &Arc<OrchestrationContext> {
        self.scheduler.context()
    }

    pub async fn run(self) -> Result<()> {
        let status = spawn_status_task(self.ctx().clone());
        self.refresh().await;
        spawn_wallet_follower(self.ctx().clone(), self.wallets.clone());
        spawn_repaint_task(self.ctx().clone(), self.wallets.clone(), status.clone());

        loop {
            self.draw(&status);

            let active = self.scheduler.state().is_active();
            let items = MenuItem::main_menu(active);
            let labels = items.iter().map(|i| i.label().to_string()).collect();
            let picked = self.select("Main Menu".to_string(), labels).await?;

            let command = match items[picked] {
                MenuItem::Start => Command::Start,
                MenuItem::Stop => Command::Stop,
                MenuItem::ClearLogs => Command::ClearLogs,
                MenuItem::Refresh => Command::Refresh,
                MenuItem::Exit => Command::Exit,
                MenuItem::Config => {
                    let config = self.ctx().run_config.snapshot();
                    let fields = ConfigField::all();
                    let labels = fields.iter().map(|f| f.label(&config)).collect();
                    let idx = self.select("Manual Config Options".to_string(), labels).await?;
                    Command::Configure(fields[idx])
                }
            };

            self.dispatch(command).await?;
        }
    }

    pub async fn dispatch(&self, command: Command) -> Result<()> {
        let log = &self.ctx().engine.log;
        match command {
            Command::Start => {
                // Rejections are already in the log.
                let _ = self.scheduler.start();
            }
            Command::Stop => {
                let scheduler = self.scheduler.clone();
                tokio::spawn(async move { scheduler.stop().await });
            }
            Command::Configure(ConfigField::Back) => {}
            Command::Configure(field) => {
                let inputs = self.prompt_inputs(field).await?;
                match parse_update(field, &inputs) {
                    Ok(Some(update)) => match self.ctx().run_config.update(update) {
                        Ok(_) => log.success("Configuration saved successfully."),
                        Err(e) => log.error(format!("Invalid config: {}", e)),
                    },
                    Ok(None) => {}
                    Err(e) => log.error(format!("Invalid input: {}", e)),
                }
            }
            Command::ClearLogs => {
                log.clear();
                log.success("Transaction logs cleared.");
            }
            Command::Refresh => self.refresh().await,
            Command::Exit => std::process::exit(0),
        }
        Ok(())
    }

    async fn refresh(&self) {
        let rows = refresh_wallets(self.ctx()).await;
        store_rows(&self.wallets, rows);
    }

    fn draw(&self, status: &watch::Receiver<String>) {
        let line = status.borrow().clone();
        print!("\x1B[2J\x1B[1;1H");
        for line in current_frame(self.ctx(), &self.wallets, &line) {
            println!("{}", line);
        }
    }

    async fn select(&self, prompt: String, items: Vec<String>) -> Result<usize> {
        let idx = tokio::task::spawn_blocking(move || {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .items(&items)
                .default(0)
                .interact()
        })
        .await??;
        Ok(idx)
    }

    async fn prompt_inputs(&self, field: ConfigField) -> Result<Vec<String>> {
        let prompts: Vec<String> = match field {
            ConfigField::Range(key) => vec![
                format!("Enter min value for {}", key.label()),
                format!("Enter max value for {}", key.label()),
            ],
            ConfigField::Back => Vec::new(),
            other => {
                let config = self.ctx().run_config.snapshot();
                vec![format!("Enter new value for {}", other.label(&config))]
            }
        };
        debug_assert_eq!(prompts.len(), field.arity());

        let inputs = tokio::task::spawn_blocking(move || {
            let theme = ColorfulTheme::default();
            prompts
                .into_iter()
                .map(|p| {
                    Input::<String>::with_theme(&theme)
                        .with_prompt(p)
                        .interact_text()
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .await??;
        Ok(inputs)
    }
}
