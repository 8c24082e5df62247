pub mod approval;
pub mod chain;
pub mod config;
pub mod controller;
pub mod deploy;
mod error;
pub mod executor;
pub mod gas;
pub mod pacing;
pub mod random;

#[cfg(test)]
mod testing;

use std::sync::Arc;

pub use chain::{ChainClient, SwapRequest, TxReceiptSummary, Wallet};
pub use config::NetworkConfig;
pub use controller::{RunSummary, WalletIterationController};
pub use deploy::{ContractArtifact, DeploySummary, Deployer, TokenCompiler};
pub use error::*;
pub use executor::SwapExecutor;
pub use gas::{GasOracle, GasPrice, GasPriceResolver};
pub use pacing::{Pacer, PauseReason, TokioPacer};

/// Shared handles every component is built from. The chain client is the
/// single provider connection for the whole run.
#[derive(Clone)]
pub struct EngineContext {
    pub chain: Arc<dyn ChainClient>,
    pub gas: Arc<dyn GasOracle>,
    pub pacer: Arc<dyn Pacer>,
    pub network: Arc<NetworkConfig>,
}
