use std::time::Duration;

use alloy::primitives::TxHash;
use rust_decimal::Decimal;
use snafu::{Location, Snafu};

use crate::executor::WalletReport;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Chain client error at {loc}: {source}"))]
    Chain {
        source: Box<dyn std::error::Error + Send + Sync>,
        #[snafu(implicit)]
        loc: Location,
    },

    #[snafu(display("Transaction {tx_hash} reverted"))]
    Reverted { tx_hash: TxHash },

    #[snafu(display("Transaction {tx_hash} was not confirmed within {timeout:?}"))]
    ConfirmationTimeout { tx_hash: TxHash, timeout: Duration },

    #[snafu(display("Deployment {tx_hash} confirmed without a contract address"))]
    MissingContractAddress { tx_hash: TxHash },

    #[snafu(display("Unknown token symbol: {symbol}"))]
    UnknownToken { symbol: String },

    #[snafu(display("Invalid trading pair {from}/{to}: {reason}"))]
    InvalidPair {
        from: String,
        to: String,
        reason: String,
    },

    #[snafu(display("Invalid configuration: {reason}"))]
    InvalidConfig { reason: String },

    #[snafu(display("Cannot scale {amount} to {decimals} decimals"))]
    AmountScale { amount: Decimal, decimals: u8 },

    #[snafu(display("Failed to build HTTP client: {source}"))]
    HttpClientBuild { source: reqwest::Error },

    /// `report` covers the whole wallet up to the point it was abandoned.
    #[snafu(display("Gave up on swap slot {slot} after {attempts} failed attempts"))]
    RetryBudgetExhausted {
        slot: u32,
        attempts: u32,
        report: WalletReport,
    },

    #[snafu(display("Token compilation failed: {message}"))]
    Compile { message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
