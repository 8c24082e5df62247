use std::time::Duration;

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::{aliases::U24, Address, Bytes, TxHash, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::{
        client::RpcClient,
        types::{TransactionReceipt, TransactionRequest},
    },
    sol_types::SolCall,
};
use async_trait::async_trait;
use reqwest::Url;
use snafu::ResultExt;
use swap_engine::{ChainClient, SwapRequest, TxReceiptSummary, Wallet};
use tracing::{debug, info, warn};

use crate::{
    contracts::{ISwapRouter, IERC20},
    error::{ContractSnafu, RpcSnafu},
    Result,
};

pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// One RPC client shared by the whole run. Reads go through `provider`;
/// each write builds a short-lived signing provider on top of the same client.
pub struct EvmChain {
    client: RpcClient,
    provider: DynProvider,
    poll_interval: Duration,
}

impl EvmChain {
    pub async fn connect(rpc_url: &Url, expected_chain_id: u64, poll_interval: Duration) -> Result<Self> {
        let client = alloy::rpc::client::ClientBuilder::default().http(rpc_url.clone());
        let chain = Self::from_client(client, poll_interval);

        let chain_id = chain.provider.get_chain_id().await.context(RpcSnafu)?;
        if chain_id != expected_chain_id {
            warn!(chain_id, expected_chain_id, "RPC endpoint reports an unexpected chain id");
        } else {
            info!(chain_id, rpc = %rpc_url, "connected to RPC endpoint");
        }

        Ok(chain)
    }

    pub fn from_client(client: RpcClient, poll_interval: Duration) -> Self {
        let provider = ProviderBuilder::new()
            .connect_client(client.clone())
            .erased();

        Self {
            client,
            provider,
            poll_interval,
        }
    }

    fn signing_provider(&self, wallet: &Wallet) -> DynProvider {
        ProviderBuilder::new()
            .wallet(EthereumWallet::from(wallet.signer().clone()))
            .connect_client(self.client.clone())
            .erased()
    }

    async fn allowance_inner(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        IERC20::new(token, self.provider.clone())
            .allowance(owner, spender)
            .call()
            .await
            .context(ContractSnafu)
    }

    async fn balance_inner(&self, token: Address, owner: Address) -> Result<U256> {
        IERC20::new(token, self.provider.clone())
            .balanceOf(owner)
            .call()
            .await
            .context(ContractSnafu)
    }

    async fn approve_inner(
        &self,
        wallet: &Wallet,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash> {
        let pending = IERC20::new(token, self.signing_provider(wallet))
            .approve(spender, amount)
            .send()
            .await
            .context(ContractSnafu)?;
        Ok(*pending.tx_hash())
    }

    async fn send_inner(&self, wallet: &Wallet, tx: TransactionRequest) -> Result<TxHash> {
        let pending = self
            .signing_provider(wallet)
            .send_transaction(tx)
            .await
            .context(RpcSnafu)?;
        Ok(*pending.tx_hash())
    }

    /// Polls until the node returns a receipt. RPC errors are logged and
    /// polled through; the caller bounds the wait.
    async fn wait_for_receipt_inner(&self, tx_hash: TxHash) -> TxReceiptSummary {
        loop {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => return receipt_summary(tx_hash, &receipt),
                Ok(None) => debug!(%tx_hash, "receipt not available yet"),
                Err(err) => warn!(%tx_hash, error = %err, "receipt lookup failed, polling again"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn exact_input_single(swap: &SwapRequest) -> ISwapRouter::ExactInputSingleParams {
    ISwapRouter::ExactInputSingleParams {
        tokenIn: swap.token_in,
        tokenOut: swap.token_out,
        fee: U24::saturating_from(swap.fee),
        recipient: swap.recipient,
        deadline: swap.deadline,
        amountIn: swap.amount_in,
        amountOutMinimum: swap.amount_out_minimum,
        sqrtPriceLimitX96: swap.sqrt_price_limit_x96,
    }
}

/// Legacy-priced `exactInputSingle` call to the router.
fn swap_transaction(from: Address, swap: &SwapRequest, gas_price: u128) -> TransactionRequest {
    let call = ISwapRouter::exactInputSingleCall {
        params: exact_input_single(swap),
    };
    TransactionRequest::default()
        .with_from(from)
        .with_to(swap.router)
        .with_input(call.abi_encode())
        .with_gas_price(gas_price)
}

fn deploy_transaction(from: Address, init_code: Bytes, gas_price: u128) -> TransactionRequest {
    TransactionRequest::default()
        .with_from(from)
        .with_deploy_code(init_code)
        .with_gas_price(gas_price)
}

fn receipt_summary(tx_hash: TxHash, receipt: &TransactionReceipt) -> TxReceiptSummary {
    TxReceiptSummary {
        tx_hash,
        block_number: receipt.block_number,
        success: receipt.status(),
        contract_address: receipt.contract_address,
    }
}

#[async_trait]
impl ChainClient for EvmChain {
    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> swap_engine::Result<U256> {
        Ok(self.allowance_inner(token, owner, spender).await?)
    }

    async fn balance_of(&self, token: Address, owner: Address) -> swap_engine::Result<U256> {
        Ok(self.balance_inner(token, owner).await?)
    }

    async fn approve(
        &self,
        wallet: &Wallet,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> swap_engine::Result<TxHash> {
        Ok(self.approve_inner(wallet, token, spender, amount).await?)
    }

    async fn send_swap(
        &self,
        wallet: &Wallet,
        swap: &SwapRequest,
        gas_price: u128,
    ) -> swap_engine::Result<TxHash> {
        let tx = swap_transaction(wallet.address(), swap, gas_price);
        Ok(self.send_inner(wallet, tx).await?)
    }

    async fn deploy(
        &self,
        wallet: &Wallet,
        init_code: Bytes,
        gas_price: u128,
    ) -> swap_engine::Result<TxHash> {
        let tx = deploy_transaction(wallet.address(), init_code, gas_price);
        Ok(self.send_inner(wallet, tx).await?)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> swap_engine::Result<TxReceiptSummary> {
        Ok(self.wait_for_receipt_inner(tx_hash).await)
    }
}
