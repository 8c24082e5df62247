use std::time::Duration;

use alloy::primitives::{utils::format_units, Address, TxHash, U256};
use tracing::info;

use crate::{
    chain::{confirm, ChainClient, Wallet},
    config::Token,
    Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    AlreadySufficient { allowance: U256 },
    Approved { tx_hash: TxHash },
}

#[derive(Debug, Clone, Copy)]
pub struct ApprovalOptions {
    /// Wait for the approval to be included before returning.
    pub await_receipt: bool,
    pub confirmation_timeout: Option<Duration>,
}

/// Makes sure `spender` may move `required` units of `token` on behalf of
/// `wallet`. Approves exactly `required` when the current allowance is short.
///
/// The balance is read and logged only; an underfunded wallet still proceeds
/// and fails at the swap.
pub async fn ensure_approval(
    client: &dyn ChainClient,
    wallet: &Wallet,
    token: &Token,
    spender: Address,
    required: U256,
    options: ApprovalOptions,
) -> Result<ApprovalOutcome> {
    let owner = wallet.address();
    let allowance = client.allowance(token.address, owner, spender).await?;
    let balance = client.balance_of(token.address, owner).await?;

    info!(
        wallet = %owner,
        token = %token.symbol,
        balance = %display_units(balance, token.decimals),
        need = %display_units(required, token.decimals),
        "checked balance"
    );

    if allowance >= required {
        return Ok(ApprovalOutcome::AlreadySufficient { allowance });
    }

    let tx_hash = client.approve(wallet, token.address, spender, required).await?;
    if options.await_receipt {
        confirm(client, tx_hash, options.confirmation_timeout).await?;
    }
    info!(wallet = %owner, token = %token.symbol, %tx_hash, "approved token for swap");

    Ok(ApprovalOutcome::Approved { tx_hash })
}

fn display_units(amount: U256, decimals: u8) -> String {
    format_units(amount, decimals).unwrap_or_else(|_| amount.to_string())
}
