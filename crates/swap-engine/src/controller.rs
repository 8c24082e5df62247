use std::time::Duration;

use tracing::{error, info};

use crate::{
    chain::Wallet,
    config::DelayRange,
    executor::SwapExecutor,
    pacing::PauseReason,
    random::random_delay,
    Error,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub wallets_completed: usize,
    pub wallets_abandoned: usize,
    pub swaps_succeeded: u32,
    pub swap_failures: u32,
}

/// Processes wallets one after another, each to completion, with a
/// randomized pause of `delay + [30s, 40s]` after every wallet.
pub struct WalletIterationController {
    executor: SwapExecutor,
}

impl WalletIterationController {
    pub fn new(executor: SwapExecutor) -> Self {
        Self { executor }
    }

    pub async fn run_for_all_wallets(
        &self,
        wallets: &[Wallet],
        inter_wallet_delay_secs: u64,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        let pacing = inter_wallet_delay(inter_wallet_delay_secs);

        for (index, wallet) in wallets.iter().enumerate() {
            info!(
                wallet = %wallet.address(),
                "[{}/{}] starting wallet",
                index + 1,
                wallets.len()
            );

            match self.executor.run_wallet(wallet).await {
                Ok(report) => {
                    summary.wallets_completed += 1;
                    summary.swaps_succeeded += report.swaps;
                    summary.swap_failures += report.failures;
                }
                Err(err) => {
                    summary.wallets_abandoned += 1;
                    if let Error::RetryBudgetExhausted { report, .. } = &err {
                        summary.swaps_succeeded += report.swaps;
                        summary.swap_failures += report.failures;
                    }
                    error!(wallet = %wallet.address(), error = %err, "abandoning wallet");
                }
            }

            let wait = random_delay(&mut rand::thread_rng(), &pacing);
            info!(wait_secs = wait.as_secs_f64(), "done with wallet, waiting");
            self.executor
                .context()
                .pacer
                .pause(PauseReason::InterWallet, wait)
                .await;
        }

        summary
    }
}

fn inter_wallet_delay(delay_secs: u64) -> DelayRange {
    let base = Duration::from_secs(delay_secs);
    DelayRange {
        min: base + Duration::from_secs(30),
        max: base + Duration::from_secs(40),
    }
}
