mod client;
pub mod contracts;
mod error;
pub mod keys;
pub mod solc;

pub use client::{EvmChain, DEFAULT_RECEIPT_POLL_INTERVAL};
pub use error::*;
pub use keys::load_wallets;
pub use solc::SolcCompiler;
