use std::{path::PathBuf, sync::Arc, time::Duration};

use alloy::primitives::U256;
use clap::Parser;
use reqwest::Url;
use swap_engine::{
    config::{
        DelayRange, DeployPolicy, GasConfig, RetryPolicy, SwapPolicy, FALLBACK_GAS_PRICE_WEI,
        GALILEO_GAS_ORACLE_URL, GALILEO_RPC_URL,
    },
    NetworkConfig,
};

use crate::prompt::{parse_delay, parse_mode, Mode};

#[derive(Parser, Debug, Clone)]
#[command(name = "og-autoswap")]
#[command(about = "Automated swaps and token deployments on the 0G Galileo testnet")]
pub struct Args {
    /// Path to .env file to load environment variables from
    #[arg(long, env = "ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Global log level (e.g. trace, debug, info)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// File with one hex private key per line
    #[arg(long, env = "PRIVATE_KEY_FILE", default_value = "private_key.txt")]
    pub private_key_file: PathBuf,

    /// JSON-RPC endpoint of the network
    #[arg(long, env = "RPC_URL", default_value = GALILEO_RPC_URL)]
    pub rpc_url: Url,

    /// Gas price tracker endpoint
    #[arg(long, env = "GAS_ORACLE_URL", default_value = GALILEO_GAS_ORACLE_URL)]
    pub gas_oracle_url: Url,

    /// Gas price in wei used whenever the tracker is unavailable
    #[arg(long, env = "GAS_FALLBACK_WEI", default_value_t = FALLBACK_GAS_PRICE_WEI)]
    pub gas_fallback_wei: u128,

    /// Successful swaps required before moving to the next wallet
    #[arg(long, env = "SWAPS_PER_WALLET", default_value_t = swap_engine::config::DEFAULT_SWAPS_PER_WALLET)]
    pub swaps_per_wallet: u32,

    /// Abandon a wallet after this many failed attempts on one swap (retries forever when unset)
    #[arg(long, env = "SWAP_MAX_ATTEMPTS")]
    pub swap_max_attempts: Option<u32>,

    /// Attempts per token deployment
    #[arg(long, env = "DEPLOY_MAX_ATTEMPTS", default_value_t = 1)]
    pub deploy_max_attempts: u32,

    /// Maximum wait for a transaction receipt, humantime syntax ("0s" waits forever)
    #[arg(long, env = "CONFIRMATION_TIMEOUT", default_value = "5m", value_parser = parse_duration)]
    pub confirmation_timeout: Duration,

    /// Polling cadence while waiting for receipts
    #[arg(long, env = "RECEIPT_POLL_INTERVAL", default_value = "2s", value_parser = parse_duration)]
    pub receipt_poll_interval: Duration,

    /// Minimum output accepted by the router, in base units (decimal or 0x hex)
    #[arg(long, env = "MIN_AMOUNT_OUT", default_value = "0", value_parser = parse_u256)]
    pub min_amount_out: U256,

    /// Solidity compiler used by the deploy mode
    #[arg(long, env = "SOLC_PATH", default_value = "solc")]
    pub solc_path: PathBuf,

    /// Run mode, 1 = auto swap, 2 = auto deploy (prompted when unset)
    #[arg(long, env = "MODE", value_parser = parse_mode)]
    pub mode: Option<Mode>,

    /// Extra seconds between wallets in swap mode (prompted when unset)
    #[arg(long, env = "WALLET_DELAY", value_parser = parse_delay)]
    pub wallet_delay: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub private_key_file: PathBuf,
    pub network: Arc<NetworkConfig>,
    pub gas: GasConfig,
    pub swap: SwapPolicy,
    pub deploy: DeployPolicy,
    pub receipt_poll_interval: Duration,
    pub solc_path: PathBuf,
    pub mode: Option<Mode>,
    pub wallet_delay: Option<u64>,
}

impl Args {
    pub fn into_config(self) -> swap_engine::Result<Config> {
        let Args {
            env_file: _,
            log_level,
            private_key_file,
            rpc_url,
            gas_oracle_url,
            gas_fallback_wei,
            swaps_per_wallet,
            swap_max_attempts,
            deploy_max_attempts,
            confirmation_timeout,
            receipt_poll_interval,
            min_amount_out,
            solc_path,
            mode,
            wallet_delay,
        } = self;

        if swap_max_attempts == Some(0) {
            return Err(swap_engine::Error::InvalidConfig {
                reason: "swap_max_attempts must be greater than zero".to_string(),
            });
        }
        if deploy_max_attempts == 0 {
            return Err(swap_engine::Error::InvalidConfig {
                reason: "deploy_max_attempts must be greater than zero".to_string(),
            });
        }

        let network = NetworkConfig {
            rpc_url,
            ..NetworkConfig::galileo()
        };
        network.validate()?;

        let confirmation_timeout = (!confirmation_timeout.is_zero()).then_some(confirmation_timeout);
        let backoff = DelayRange::from_secs(8, 15);

        let swap = SwapPolicy {
            quota: swaps_per_wallet,
            min_amount_out,
            retry: RetryPolicy {
                backoff,
                max_attempts: swap_max_attempts,
            },
            confirmation_timeout,
            ..SwapPolicy::default()
        };
        let deploy = DeployPolicy {
            retry: RetryPolicy {
                backoff,
                max_attempts: Some(deploy_max_attempts),
            },
            confirmation_timeout,
            ..DeployPolicy::default()
        };

        Ok(Config {
            log_level,
            private_key_file,
            network: Arc::new(network),
            gas: GasConfig {
                oracle_url: gas_oracle_url,
                fallback_wei: gas_fallback_wei,
                ..GasConfig::default()
            },
            swap,
            deploy,
            receipt_poll_interval,
            solc_path,
            mode,
            wallet_delay,
        })
    }
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|err| err.to_string())
}

fn parse_u256(value: &str) -> Result<U256, String> {
    let trimmed = value.trim();
    if let Some(hex) = trimmed.strip_prefix("0x") {
        U256::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        U256::from_str_radix(trimmed, 10).map_err(|e| e.to_string())
    }
}
