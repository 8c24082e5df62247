use std::fmt;

use alloy::primitives::{TxHash, U256};
use rand::seq::SliceRandom;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::{
    approval::{ensure_approval, ApprovalOptions},
    chain::{confirm, SwapRequest, Wallet},
    config::{SwapPolicy, Token, TradingPair},
    gas::GasPrice,
    pacing::PauseReason,
    random::{random_amount, random_delay, scale_amount},
    EngineContext, Error, Result,
};

/// Successful swaps for one wallet. Never exceeds its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapQuota {
    target: u32,
    completed: u32,
}

impl SwapQuota {
    pub fn new(target: u32) -> Self {
        Self {
            target,
            completed: 0,
        }
    }

    pub fn record_success(&mut self) -> u32 {
        if self.completed < self.target {
            self.completed += 1;
        }
        self.completed
    }

    pub fn completed(&self) -> u32 {
        self.completed
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn is_reached(&self) -> bool {
        self.completed >= self.target
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapStage {
    SelectPair,
    CheckApproval,
    FetchGas,
    Submit,
    Confirm,
    Success,
}

impl fmt::Display for SwapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SwapStage::SelectPair => "select-pair",
            SwapStage::CheckApproval => "check-approval",
            SwapStage::FetchGas => "fetch-gas",
            SwapStage::Submit => "submit",
            SwapStage::Confirm => "confirm",
            SwapStage::Success => "success",
        };
        f.write_str(label)
    }
}

/// One try at filling a swap slot. Discarded once the outcome is known.
#[derive(Debug, Clone)]
pub struct SwapAttempt {
    pub stage: SwapStage,
    pub pair: Option<TradingPair>,
    pub amount: Decimal,
    pub amount_in: U256,
    pub gas_price: Option<GasPrice>,
    pub tx_hash: Option<TxHash>,
}

impl SwapAttempt {
    fn new() -> Self {
        Self {
            stage: SwapStage::SelectPair,
            pair: None,
            amount: Decimal::ZERO,
            amount_in: U256::ZERO,
            gas_price: None,
            tx_hash: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalletReport {
    pub swaps: u32,
    pub failures: u32,
}

/// Drives a single wallet through its swap quota, retrying failed slots
/// according to the policy's [`RetryPolicy`](crate::config::RetryPolicy).
pub struct SwapExecutor {
    ctx: EngineContext,
    policy: SwapPolicy,
}

impl SwapExecutor {
    pub fn new(ctx: EngineContext, policy: SwapPolicy) -> Result<Self> {
        ctx.network.validate()?;
        Ok(Self { ctx, policy })
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn policy(&self) -> &SwapPolicy {
        &self.policy
    }

    pub async fn run_wallet(&self, wallet: &Wallet) -> Result<WalletReport> {
        let mut quota = SwapQuota::new(self.policy.quota);
        let mut report = WalletReport::default();
        let mut slot_failures = 0u32;

        while !quota.is_reached() {
            let slot = quota.completed() + 1;
            let mut attempt = SwapAttempt::new();

            match self.attempt(wallet, &mut attempt).await {
                Ok(()) => {
                    let done = quota.record_success();
                    slot_failures = 0;
                    info!(
                        wallet = %wallet.address(),
                        tx_hash = ?attempt.tx_hash,
                        "swap {done}/{} completed",
                        quota.target()
                    );

                    let wait = random_delay(&mut rand::thread_rng(), &self.policy.inter_swap_delay);
                    info!(wait_secs = wait.as_secs_f64(), "waiting before next swap");
                    self.ctx.pacer.pause(PauseReason::InterSwap, wait).await;
                }
                Err(err) => {
                    slot_failures += 1;
                    report.failures += 1;
                    warn!(
                        wallet = %wallet.address(),
                        slot,
                        stage = %attempt.stage,
                        error = %err,
                        "swap failed"
                    );

                    if !self.policy.retry.allows_another(slot_failures) {
                        report.swaps = quota.completed();
                        return Err(Error::RetryBudgetExhausted {
                            slot,
                            attempts: slot_failures,
                            report,
                        });
                    }

                    let backoff = random_delay(&mut rand::thread_rng(), &self.policy.retry.backoff);
                    info!(wait_secs = backoff.as_secs_f64(), slot, "retrying swap");
                    self.ctx.pacer.pause(PauseReason::RetryBackoff, backoff).await;
                }
            }
        }

        report.swaps = quota.completed();
        Ok(report)
    }

    async fn attempt(&self, wallet: &Wallet, attempt: &mut SwapAttempt) -> Result<()> {
        let network = &self.ctx.network;
        let chain = self.ctx.chain.as_ref();

        let pair = self.select_pair()?;
        let token_in = network.tokens.get(pair.from_symbol())?;
        let token_out = network.tokens.get(pair.to_symbol())?;
        attempt.amount = random_amount(
            &mut rand::thread_rng(),
            &token_in.amount_range,
            self.policy.amount_precision,
        );
        attempt.amount_in = scale_amount(attempt.amount, token_in.decimals)?;
        attempt.pair = Some(pair);

        attempt.stage = SwapStage::CheckApproval;
        ensure_approval(
            chain,
            wallet,
            token_in,
            network.router,
            attempt.amount_in,
            ApprovalOptions {
                await_receipt: self.policy.await_approval_receipt,
                confirmation_timeout: self.policy.confirmation_timeout,
            },
        )
        .await?;

        attempt.stage = SwapStage::FetchGas;
        let gas_price = self.ctx.gas.gas_price().await;
        attempt.gas_price = Some(gas_price);

        attempt.stage = SwapStage::Submit;
        let request = self.swap_request(wallet, token_in, token_out, attempt.amount_in);
        let tx_hash = chain.send_swap(wallet, &request, gas_price.wei).await?;
        attempt.tx_hash = Some(tx_hash);
        info!(
            wallet = %wallet.address(),
            amount = %attempt.amount,
            from = %token_in.symbol,
            to = %token_out.symbol,
            gas_price = %gas_price,
            %tx_hash,
            "swapping"
        );

        attempt.stage = SwapStage::Confirm;
        confirm(chain, tx_hash, self.policy.confirmation_timeout).await?;
        attempt.stage = SwapStage::Success;
        Ok(())
    }

    fn select_pair(&self) -> Result<TradingPair> {
        self.ctx
            .network
            .pairs
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| Error::InvalidConfig {
                reason: "no trading pairs configured".to_string(),
            })
    }

    fn swap_request(
        &self,
        wallet: &Wallet,
        token_in: &Token,
        token_out: &Token,
        amount_in: U256,
    ) -> SwapRequest {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        SwapRequest {
            router: self.ctx.network.router,
            token_in: token_in.address,
            token_out: token_out.address,
            fee: self.ctx.network.fee_tier,
            recipient: wallet.address(),
            deadline: U256::from(now + self.policy.deadline.as_secs()),
            amount_in,
            amount_out_minimum: self.policy.min_amount_out,
            sqrt_price_limit_x96: self.policy.sqrt_price_limit_x96,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use alloy::primitives::aliases::U160;

    use super::*;
    use crate::{
        config::{DelayRange, NetworkConfig, RetryPolicy},
        gas::FixedGasPrice,
        pacing::RecordingPacer,
        testing::MockChain,
    };

    fn executor(
        chain: &Arc<MockChain>,
        pacer: &Arc<RecordingPacer>,
        policy: SwapPolicy,
    ) -> SwapExecutor {
        let ctx = EngineContext {
            chain: chain.clone(),
            gas: Arc::new(FixedGasPrice(4_000_000_000)),
            pacer: pacer.clone(),
            network: Arc::new(NetworkConfig::galileo()),
        };
        SwapExecutor::new(ctx, policy).unwrap()
    }

    fn policy(quota: u32) -> SwapPolicy {
        SwapPolicy {
            quota,
            ..SwapPolicy::default()
        }
    }

    #[test]
    fn quota_saturates_at_target() {
        let mut quota = SwapQuota::new(2);
        assert_eq!(quota.record_success(), 1);
        assert!(!quota.is_reached());
        assert_eq!(quota.record_success(), 2);
        assert_eq!(quota.record_success(), 2);
        assert!(quota.is_reached());
    }

    #[tokio::test]
    async fn fills_quota_with_paced_swaps() {
        let chain = Arc::new(MockChain::new());
        let pacer = Arc::new(RecordingPacer::new());
        let wallet = MockChain::wallet();

        let report = executor(&chain, &pacer, SwapPolicy::default())
            .run_wallet(&wallet)
            .await
            .unwrap();

        assert_eq!(report, WalletReport { swaps: 10, failures: 0 });
        assert_eq!(chain.swaps().len(), 10);

        let waits = pacer.pauses_for(PauseReason::InterSwap);
        assert_eq!(waits.len(), 10);
        assert!(waits.iter().all(|w| DelayRange::from_secs(35, 120).contains(*w)));
        assert!(pacer.pauses_for(PauseReason::RetryBackoff).is_empty());
    }

    #[tokio::test]
    async fn swap_request_carries_router_parameters() {
        let chain = Arc::new(MockChain::new());
        let pacer = Arc::new(RecordingPacer::new());
        let wallet = MockChain::wallet();
        let network = NetworkConfig::galileo();

        executor(&chain, &pacer, policy(5))
            .run_wallet(&wallet)
            .await
            .unwrap();

        let now = chrono::Utc::now().timestamp() as u64;
        for (sender, request, gas_price) in chain.swaps() {
            assert_eq!(sender, wallet.address());
            assert_eq!(gas_price, 4_000_000_000);
            assert_eq!(request.router, network.router);
            assert_eq!(request.fee, 3000);
            assert_eq!(request.recipient, wallet.address());
            assert_eq!(request.amount_out_minimum, U256::ZERO);
            assert_eq!(request.sqrt_price_limit_x96, U160::ZERO);
            assert_ne!(request.token_in, request.token_out);
            let deadline = request.deadline.to::<u64>();
            assert!(deadline > now && deadline <= now + 60);
        }
    }

    #[tokio::test]
    async fn approves_the_scaled_input_amount() {
        let chain = Arc::new(MockChain::new());
        let pacer = Arc::new(RecordingPacer::new());
        let wallet = MockChain::wallet();

        executor(&chain, &pacer, policy(1))
            .run_wallet(&wallet)
            .await
            .unwrap();

        let (_, request, _) = chain.swaps().remove(0);
        assert_eq!(
            chain.approvals(),
            vec![(request.token_in, request.router, request.amount_in)]
        );
    }

    #[tokio::test]
    async fn retries_failed_slot_without_consuming_quota() {
        let chain = Arc::new(MockChain::new());
        chain.fail_swap_sends(2);
        let pacer = Arc::new(RecordingPacer::new());
        let wallet = MockChain::wallet();

        let report = executor(&chain, &pacer, policy(1))
            .run_wallet(&wallet)
            .await
            .unwrap();

        assert_eq!(report, WalletReport { swaps: 1, failures: 2 });
        assert_eq!(chain.swaps().len(), 1);

        let backoffs = pacer.pauses_for(PauseReason::RetryBackoff);
        assert_eq!(backoffs.len(), 2);
        assert!(backoffs.iter().all(|b| DelayRange::from_secs(8, 15).contains(*b)));
        assert_eq!(pacer.pauses_for(PauseReason::InterSwap).len(), 1);
    }

    #[tokio::test]
    async fn reverted_swap_is_retried() {
        let chain = Arc::new(MockChain::new());
        chain.revert_swaps(1);
        let pacer = Arc::new(RecordingPacer::new());

        let report = executor(&chain, &pacer, policy(1))
            .run_wallet(&MockChain::wallet())
            .await
            .unwrap();

        assert_eq!(report, WalletReport { swaps: 1, failures: 1 });
        assert_eq!(chain.swaps().len(), 2);
    }

    #[tokio::test]
    async fn abandons_slot_when_attempt_ceiling_is_hit() {
        let chain = Arc::new(MockChain::new());
        chain.fail_swap_sends(u32::MAX);
        let pacer = Arc::new(RecordingPacer::new());
        let mut policy = policy(10);
        policy.retry = RetryPolicy {
            max_attempts: Some(3),
            ..policy.retry
        };

        let err = executor(&chain, &pacer, policy)
            .run_wallet(&MockChain::wallet())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::RetryBudgetExhausted {
                slot: 1,
                attempts: 3,
                report: WalletReport { swaps: 0, failures: 3 },
            }
        ));
        assert_eq!(pacer.pauses_for(PauseReason::RetryBackoff).len(), 2);
    }

    #[tokio::test]
    async fn confirmation_timeout_counts_as_failure() {
        let chain = Arc::new(MockChain::new());
        chain.hang_receipts();
        let pacer = Arc::new(RecordingPacer::new());
        let mut policy = policy(1);
        policy.await_approval_receipt = false;
        policy.confirmation_timeout = Some(Duration::from_millis(20));
        policy.retry.max_attempts = Some(1);

        let err = executor(&chain, &pacer, policy)
            .run_wallet(&MockChain::wallet())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RetryBudgetExhausted { attempts: 1, .. }));
        assert_eq!(chain.swaps().len(), 1);
    }

    #[tokio::test]
    async fn abandoned_wallet_reports_failures_from_every_slot() {
        let chain = Arc::new(MockChain::new());
        chain.fail_swap_sends_at(&[1, 3, 4]);
        let pacer = Arc::new(RecordingPacer::new());
        let mut policy = policy(2);
        policy.retry.max_attempts = Some(2);

        let err = executor(&chain, &pacer, policy)
            .run_wallet(&MockChain::wallet())
            .await
            .unwrap_err();

        match err {
            Error::RetryBudgetExhausted {
                slot,
                attempts,
                report,
            } => {
                assert_eq!(slot, 2);
                assert_eq!(attempts, 2);
                assert_eq!(report, WalletReport { swaps: 1, failures: 3 });
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(pacer.pauses_for(PauseReason::RetryBackoff).len(), 2);
        assert_eq!(chain.swaps().len(), 1);
    }

    #[test]
    fn rejects_invalid_network() {
        let mut network = NetworkConfig::galileo();
        network.pairs.clear();
        let ctx = EngineContext {
            chain: Arc::new(MockChain::new()),
            gas: Arc::new(FixedGasPrice(1)),
            pacer: Arc::new(RecordingPacer::new()),
            network: Arc::new(network),
        };
        assert!(SwapExecutor::new(ctx, SwapPolicy::default()).is_err());
    }
}
