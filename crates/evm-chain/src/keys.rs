use std::{path::Path, str::FromStr};

use alloy::signers::local::PrivateKeySigner;
use snafu::{ensure, ResultExt};
use swap_engine::Wallet;
use tracing::info;
use zeroize::Zeroizing;

use crate::{
    error::{InvalidKeySnafu, NoKeysSnafu, ReadKeyFileSnafu},
    Result,
};

/// Reads one hex private key per line. Blank lines are skipped; the first
/// malformed line aborts the load.
pub async fn load_wallets(path: &Path) -> Result<Vec<Wallet>> {
    let contents = Zeroizing::new(
        tokio::fs::read_to_string(path)
            .await
            .context(ReadKeyFileSnafu { path })?,
    );

    let wallets = parse_wallets(&contents)?;
    ensure!(!wallets.is_empty(), NoKeysSnafu { path });

    info!(count = wallets.len(), path = %path.display(), "loaded wallets");
    Ok(wallets)
}

pub fn parse_wallets(contents: &str) -> Result<Vec<Wallet>> {
    contents
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let key = line.trim();
            (!key.is_empty()).then_some((index + 1, key))
        })
        .map(|(line, key)| {
            PrivateKeySigner::from_str(key)
                .map(Wallet::new)
                .map_err(|_| InvalidKeySnafu { line }.build())
        })
        .collect()
}
