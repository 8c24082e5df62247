use alloy::{
    primitives::{Address, Bytes},
    sol_types::SolValue,
};
use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::{
    chain::{confirm, Wallet},
    config::DeployPolicy,
    pacing::PauseReason,
    random::{random_delay, random_name},
    EngineContext, Error, Result,
};

/// ABI and creation bytecode of the throwaway ERC-20 style token.
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub abi: serde_json::Value,
    pub bytecode: Bytes,
}

impl ContractArtifact {
    /// Creation bytecode followed by the encoded `(string name, string symbol)`
    /// constructor arguments.
    pub fn init_code(&self, name: &str, symbol: &str) -> Bytes {
        let mut code = self.bytecode.to_vec();
        code.extend((name.to_string(), symbol.to_string()).abi_encode_params());
        code.into()
    }
}

#[async_trait]
pub trait TokenCompiler: Send + Sync {
    async fn compile(&self) -> Result<ContractArtifact>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeploySummary {
    pub deployed: usize,
    pub failed: usize,
}

/// Deploys one freshly named token per wallet. Failures are logged and the
/// run moves on; retries only happen when the policy allows more than one
/// attempt.
pub struct Deployer {
    ctx: EngineContext,
    policy: DeployPolicy,
}

impl Deployer {
    pub fn new(ctx: EngineContext, policy: DeployPolicy) -> Self {
        Self { ctx, policy }
    }

    pub async fn deploy_for_all_wallets(
        &self,
        wallets: &[Wallet],
        artifact: &ContractArtifact,
    ) -> DeploySummary {
        let mut summary = DeploySummary::default();

        for (index, wallet) in wallets.iter().enumerate() {
            info!(
                wallet = %wallet.address(),
                "[{}/{}] deploying token",
                index + 1,
                wallets.len()
            );

            match self.deploy_with_policy(wallet, artifact).await {
                Ok(address) => {
                    summary.deployed += 1;
                    info!(wallet = %wallet.address(), contract = %address, "deployed token");
                }
                Err(err) => {
                    summary.failed += 1;
                    error!(wallet = %wallet.address(), error = %err, "deploy failed");
                }
            }

            let wait = random_delay(&mut rand::thread_rng(), &self.policy.inter_wallet_delay);
            info!(wait_secs = wait.as_secs_f64(), "waiting before next wallet");
            self.ctx.pacer.pause(PauseReason::InterDeploy, wait).await;
        }

        summary
    }

    async fn deploy_with_policy(
        &self,
        wallet: &Wallet,
        artifact: &ContractArtifact,
    ) -> Result<Address> {
        let (name, symbol) = {
            let mut rng = rand::thread_rng();
            (
                random_name(&mut rng, self.policy.name_length),
                random_name(&mut rng, self.policy.symbol_length),
            )
        };
        let init_code = artifact.init_code(&name, &symbol);

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.deploy_once(wallet, &name, &symbol, init_code.clone()).await {
                Ok(address) => return Ok(address),
                Err(err) if self.policy.retry.allows_another(attempts) => {
                    warn!(error = %err, attempts, "deploy attempt failed, retrying");
                    let backoff = random_delay(&mut rand::thread_rng(), &self.policy.retry.backoff);
                    self.ctx.pacer.pause(PauseReason::RetryBackoff, backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn deploy_once(
        &self,
        wallet: &Wallet,
        name: &str,
        symbol: &str,
        init_code: Bytes,
    ) -> Result<Address> {
        let chain = self.ctx.chain.as_ref();
        let gas_price = self.ctx.gas.gas_price().await;

        let tx_hash = chain.deploy(wallet, init_code, gas_price.wei).await?;
        info!(name, symbol, %tx_hash, gas_price = %gas_price, "deploying token");

        let receipt = confirm(chain, tx_hash, self.policy.confirmation_timeout).await?;
        receipt
            .contract_address
            .ok_or(Error::MissingContractAddress { tx_hash })
    }
}
