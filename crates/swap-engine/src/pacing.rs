use std::{fmt, sync::Mutex, time::Duration};

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// After a confirmed swap.
    InterSwap,
    /// Before retrying a failed attempt.
    RetryBackoff,
    /// After a wallet finished its swap quota.
    InterWallet,
    /// After a wallet's deployment attempt.
    InterDeploy,
}

impl fmt::Display for PauseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PauseReason::InterSwap => "inter-swap",
            PauseReason::RetryBackoff => "retry-backoff",
            PauseReason::InterWallet => "inter-wallet",
            PauseReason::InterDeploy => "inter-deploy",
        };
        f.write_str(label)
    }
}

/// Source of the randomized waits between swaps, retries and wallets.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, reason: PauseReason, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, _reason: PauseReason, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records every requested pause and returns immediately.
///
/// Meant for tests, including tests in downstream crates; not for live runs.
#[derive(Debug, Default)]
pub struct RecordingPacer {
    pauses: Mutex<Vec<(PauseReason, Duration)>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> Vec<(PauseReason, Duration)> {
        self.pauses
            .lock()
            .map(|pauses| pauses.clone())
            .unwrap_or_default()
    }

    pub fn pauses_for(&self, reason: PauseReason) -> Vec<Duration> {
        self.pauses()
            .into_iter()
            .filter(|(r, _)| *r == reason)
            .map(|(_, duration)| duration)
            .collect()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, reason: PauseReason, duration: Duration) {
        if let Ok(mut pauses) = self.pauses.lock() {
            pauses.push((reason, duration));
        }
    }
}
