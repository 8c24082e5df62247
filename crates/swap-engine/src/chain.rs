use std::{fmt, time::Duration};

use alloy::{
    primitives::{aliases::U160, Address, Bytes, TxHash, U256},
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use tracing::debug;

use crate::{Error, Result};

/// A signing identity derived from one line of the key file.
#[derive(Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

// The key stays out of logs.
impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Single-hop exact-input swap, mirroring the router's `ExactInputSingleParams`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub router: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub fee: u32,
    pub recipient: Address,
    pub deadline: U256,
    pub amount_in: U256,
    pub amount_out_minimum: U256,
    pub sqrt_price_limit_x96: U160,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceiptSummary {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub success: bool,
    pub contract_address: Option<Address>,
}

/// Everything the engine needs from the network. Reads go through the shared
/// provider; writes are signed by the given wallet.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256>;

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256>;

    /// Submit `approve(spender, amount)` and return once the node accepted it.
    async fn approve(
        &self,
        wallet: &Wallet,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash>;

    async fn send_swap(&self, wallet: &Wallet, swap: &SwapRequest, gas_price: u128)
        -> Result<TxHash>;

    /// Submit a contract creation transaction with the given init code.
    async fn deploy(&self, wallet: &Wallet, init_code: Bytes, gas_price: u128) -> Result<TxHash>;

    /// Resolves once the transaction is included, whatever its status.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceiptSummary>;
}

/// Waits for inclusion, bounded by `timeout` when set, and turns a failed
/// status into [`Error::Reverted`].
pub async fn confirm(
    client: &dyn ChainClient,
    tx_hash: TxHash,
    timeout: Option<Duration>,
) -> Result<TxReceiptSummary> {
    let receipt = match timeout {
        Some(timeout) => tokio::time::timeout(timeout, client.wait_for_receipt(tx_hash))
            .await
            .map_err(|_| Error::ConfirmationTimeout { tx_hash, timeout })??,
        None => client.wait_for_receipt(tx_hash).await?,
    };

    debug!(%tx_hash, block = ?receipt.block_number, success = receipt.success, "receipt observed");
    if !receipt.success {
        return Err(Error::Reverted { tx_hash });
    }
    Ok(receipt)
}
