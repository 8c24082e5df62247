use std::{collections::HashMap, sync::Mutex};

use alloy::{
    primitives::{keccak256, Address, Bytes, TxHash, U256},
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use snafu::location;

use crate::{
    chain::{ChainClient, SwapRequest, TxReceiptSummary, Wallet},
    Error, Result,
};

#[derive(Default)]
struct State {
    allowances: HashMap<(Address, Address, Address), U256>,
    approvals: Vec<(Address, Address, U256)>,
    swaps: Vec<(Address, SwapRequest, u128)>,
    deploys: Vec<(Address, Bytes, u128)>,
    receipts: HashMap<TxHash, TxReceiptSummary>,
    nonce: u64,
    revert_approvals: bool,
    swap_send_failures: u32,
    swap_send_calls: u32,
    failing_swap_sends: Vec<u32>,
    swap_reverts: u32,
    deploy_failures: u32,
    hang_receipts: bool,
}

impl State {
    fn next_hash(&mut self) -> TxHash {
        self.nonce += 1;
        keccak256(self.nonce.to_be_bytes())
    }

    fn record(&mut self, success: bool, contract_address: Option<Address>) -> TxHash {
        let tx_hash = self.next_hash();
        let block_number = Some(self.nonce);
        self.receipts.insert(
            tx_hash,
            TxReceiptSummary {
                tx_hash,
                block_number,
                success,
                contract_address,
            },
        );
        tx_hash
    }
}

/// In-memory chain: approvals update allowances immediately and every
/// transaction gets a receipt unless told otherwise.
#[derive(Default)]
pub struct MockChain {
    state: Mutex<State>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wallet() -> Wallet {
        Wallet::new(PrivateKeySigner::random())
    }

    fn with<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.with(|s| s.allowances.insert((token, owner, spender), amount));
    }

    pub fn revert_approvals(&self) {
        self.with(|s| s.revert_approvals = true);
    }

    /// The next `count` swap submissions fail at the RPC layer.
    pub fn fail_swap_sends(&self, count: u32) {
        self.with(|s| s.swap_send_failures = count);
    }

    /// Swap submissions with these 1-based call numbers fail at the RPC layer.
    pub fn fail_swap_sends_at(&self, calls: &[u32]) {
        self.with(|s| s.failing_swap_sends = calls.to_vec());
    }

    /// The next `count` swaps are mined but revert.
    pub fn revert_swaps(&self, count: u32) {
        self.with(|s| s.swap_reverts = count);
    }

    pub fn fail_deploys(&self, count: u32) {
        self.with(|s| s.deploy_failures = count);
    }

    pub fn hang_receipts(&self) {
        self.with(|s| s.hang_receipts = true);
    }

    pub fn approvals(&self) -> Vec<(Address, Address, U256)> {
        self.with(|s| s.approvals.clone())
    }

    pub fn swaps(&self) -> Vec<(Address, SwapRequest, u128)> {
        self.with(|s| s.swaps.clone())
    }

    pub fn deploys(&self) -> Vec<(Address, Bytes, u128)> {
        self.with(|s| s.deploys.clone())
    }
}

fn rpc_error(message: &str) -> Error {
    Error::Chain {
        source: message.into(),
        loc: location!(),
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        Ok(self.with(|s| {
            s.allowances
                .get(&(token, owner, spender))
                .copied()
                .unwrap_or_default()
        }))
    }

    async fn balance_of(&self, _token: Address, _owner: Address) -> Result<U256> {
        Ok(U256::ZERO)
    }

    async fn approve(
        &self,
        wallet: &Wallet,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash> {
        Ok(self.with(|s| {
            s.approvals.push((token, spender, amount));
            let success = !s.revert_approvals;
            if success {
                s.allowances.insert((token, wallet.address(), spender), amount);
            }
            s.record(success, None)
        }))
    }

    async fn send_swap(
        &self,
        wallet: &Wallet,
        swap: &SwapRequest,
        gas_price: u128,
    ) -> Result<TxHash> {
        self.with(|s| {
            s.swap_send_calls += 1;
            if s.failing_swap_sends.contains(&s.swap_send_calls) {
                return Err(rpc_error("swap submission rejected"));
            }
            if s.swap_send_failures > 0 {
                s.swap_send_failures -= 1;
                return Err(rpc_error("swap submission rejected"));
            }
            s.swaps.push((wallet.address(), swap.clone(), gas_price));
            let success = if s.swap_reverts > 0 {
                s.swap_reverts -= 1;
                false
            } else {
                true
            };
            Ok(s.record(success, None))
        })
    }

    async fn deploy(&self, wallet: &Wallet, init_code: Bytes, gas_price: u128) -> Result<TxHash> {
        self.with(|s| {
            if s.deploy_failures > 0 {
                s.deploy_failures -= 1;
                return Err(rpc_error("deployment rejected"));
            }
            s.deploys.push((wallet.address(), init_code, gas_price));
            let contract = Address::with_last_byte(s.deploys.len() as u8);
            Ok(s.record(true, Some(contract)))
        })
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceiptSummary> {
        if self.with(|s| s.hang_receipts) {
            std::future::pending::<()>().await;
        }
        self.with(|s| s.receipts.get(&tx_hash).cloned())
            .ok_or_else(|| rpc_error("unknown transaction"))
    }
}
