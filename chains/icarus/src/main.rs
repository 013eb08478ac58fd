use icarus_project::accounts::load_accounts;
use icarus_project::config::IcarusConfig;
use icarus_project::dashboard::Dashboard;
use icarus_project::engine::EngineContext;
use icarus_project::provider::EthersClientFactory;
use icarus_project::run_config::RunConfigStore;
use icarus_project::scheduler::{OrchestrationContext, Scheduler};

use anyhow::Result;
use clap::Parser;
use core_logic::{setup_logger, ProxyManager};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "chains/icarus/config.toml")]
    config: String,
    /// Seed for amount and directive selection
    #[arg(long)]
    seed: Option<u64>,
    /// Start the daily activity right away without the dashboard
    #[arg(long)]
    auto_start: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    // Dashboard mode keeps the activity stream off the console.
    let _log_guard = setup_logger(args.auto_start);
    dotenv().ok();

    info!("Loading config from: {}", args.config);
    let config = match IcarusConfig::load(&args.config) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Failed to load config: {:#}", e);
            return Ok(());
        }
    };
    info!(
        "Configuration loaded for {} (chain ID {})",
        config.chain_name, config.chain_id
    );

    let accounts = match load_accounts(&config.accounts_file) {
        Ok(accounts) => accounts,
        Err(e) => {
            error!("Failed to load accounts: {:#}", e);
            Vec::new()
        }
    };
    let proxies = match ProxyManager::load_from(&config.proxies_file) {
        Ok(proxies) => proxies,
        Err(e) => {
            warn!("Running without proxies: {:#}", e);
            Vec::new()
        }
    };
    let run_config = RunConfigStore::load(&config.run_config_file);

    let engine = EngineContext::new(config.clone());
    let factory = Arc::new(EthersClientFactory::new(config.clone()));
    let mut ctx = OrchestrationContext::new(engine, run_config, accounts, proxies, factory);
    if let Some(seed) = args.seed {
        ctx = ctx.with_seed(seed);
    }
    let scheduler = Scheduler::new(ctx);

    if args.auto_start {
        if scheduler.start().is_err() {
            return Ok(());
        }
        tokio::signal::ctrl_c().await?;
        scheduler.stop().await;
        return Ok(());
    }

    Dashboard::new(scheduler).run().await
}
