mod args;
mod prompt;

use std::{path::PathBuf, sync::Arc};

use args::{Args, Config};
use clap::Parser;
use evm_chain::{EvmChain, SolcCompiler};
use prompt::Mode;
use snafu::{ResultExt, Snafu};
use swap_engine::{
    Deployer, EngineContext, GasPriceResolver, SwapExecutor, TokenCompiler, TokioPacer, Wallet,
    WalletIterationController,
};
use tokio::signal;
use tracing::{error, info};

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("Failed to load env file {}: {source}", path.display()))]
    EnvFile { path: PathBuf, source: dotenvy::Error },

    #[snafu(display("Failed to initialize logger: {source}"))]
    Logger {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[snafu(display("Invalid configuration: {source}"))]
    Config { source: swap_engine::Error },

    #[snafu(display("Prompt failed: {source}"))]
    Prompt { source: dialoguer::Error },

    #[snafu(display("Failed to load wallets: {source}"))]
    Keys { source: evm_chain::Error },

    #[snafu(display("Failed to connect to chain: {source}"))]
    Chain { source: evm_chain::Error },

    #[snafu(display("Run failed: {source}"))]
    Run { source: swap_engine::Error },
}

type Result<T, E = Error> = std::result::Result<T, E>;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse args once to get the env_file path if specified
    let args = Args::parse();

    if let Some(env_file) = &args.env_file {
        dotenvy::from_path(env_file).context(EnvFileSnafu { path: env_file })?;
    } else {
        let _ = dotenvy::dotenv();
    }

    // Re-parse args to pick up environment variables from the loaded file
    let config = Args::parse().into_config().context(ConfigSnafu)?;
    init_logger(&config.log_level)?;

    let mode = match config.mode {
        Some(mode) => mode,
        None => prompt::prompt_mode().context(PromptSnafu)?,
    };
    let wallet_delay = match (mode, config.wallet_delay) {
        (Mode::Swap, Some(delay)) => delay,
        (Mode::Swap, None) => prompt::prompt_delay().context(PromptSnafu)?,
        (Mode::Deploy, _) => 0,
    };

    let wallets = evm_chain::load_wallets(&config.private_key_file)
        .await
        .context(KeysSnafu)?;
    let ctx = build_context(&config).await?;

    info!(%mode, wallets = wallets.len(), "starting run");

    tokio::select! {
        result = run(mode, &config, ctx, &wallets, wallet_delay) => result,
        _ = signal::ctrl_c() => {
            info!("Interrupt received, shutting down");
            Ok(())
        }
    }
}

fn init_logger(log_level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .try_init()
        .context(LoggerSnafu)
}

async fn build_context(config: &Config) -> Result<EngineContext> {
    let chain = EvmChain::connect(
        &config.network.rpc_url,
        config.network.chain_id,
        config.receipt_poll_interval,
    )
    .await
    .context(ChainSnafu)?;
    let gas = GasPriceResolver::new(&config.gas).context(ConfigSnafu)?;

    Ok(EngineContext {
        chain: Arc::new(chain),
        gas: Arc::new(gas),
        pacer: Arc::new(TokioPacer),
        network: config.network.clone(),
    })
}

async fn run(
    mode: Mode,
    config: &Config,
    ctx: EngineContext,
    wallets: &[Wallet],
    wallet_delay: u64,
) -> Result<()> {
    match mode {
        Mode::Swap => {
            let executor = SwapExecutor::new(ctx, config.swap.clone()).context(ConfigSnafu)?;
            let summary = WalletIterationController::new(executor)
                .run_for_all_wallets(wallets, wallet_delay)
                .await;
            info!(
                wallets_completed = summary.wallets_completed,
                wallets_abandoned = summary.wallets_abandoned,
                swaps = summary.swaps_succeeded,
                failed_attempts = summary.swap_failures,
                "swap run complete"
            );
        }
        Mode::Deploy => {
            let artifact = SolcCompiler::new(&config.solc_path)
                .compile()
                .await
                .context(RunSnafu)?;
            let summary = Deployer::new(ctx, config.deploy.clone())
                .deploy_for_all_wallets(wallets, &artifact)
                .await;
            if summary.failed > 0 {
                error!(failed = summary.failed, "some deployments failed");
            }
            info!(
                deployed = summary.deployed,
                failed = summary.failed,
                "deploy run complete"
            );
        }
    }
    Ok(())
}
