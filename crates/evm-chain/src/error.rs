use std::path::PathBuf;

use snafu::{GenerateImplicitData, Location, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("EVM RPC error at {loc}: {source}"))]
    Rpc {
        source: alloy::transports::RpcError<alloy::transports::TransportErrorKind>,
        #[snafu(implicit)]
        loc: Location,
    },

    #[snafu(display("Contract call failed at {loc}: {source}"))]
    Contract {
        source: alloy::contract::Error,
        #[snafu(implicit)]
        loc: Location,
    },

    #[snafu(display("Failed to read key file {}: {source}", path.display()))]
    ReadKeyFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Invalid private key on line {line}"))]
    InvalidKey { line: usize },

    #[snafu(display("Key file {} contains no private keys", path.display()))]
    NoKeys { path: PathBuf },

    #[snafu(display("Failed to run solc at {}: {source}", path.display()))]
    SolcSpawn {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("solc exited with {status}: {stderr}"))]
    SolcExit { status: std::process::ExitStatus, stderr: String },

    #[snafu(display("Unreadable solc output: {source}"))]
    SolcJson { source: serde_json::Error },

    #[snafu(display("solc reported errors: {message}"))]
    SolcErrors { message: String },

    #[snafu(display("solc output is missing {field}"))]
    SolcMissing { field: String },

    #[snafu(display("solc bytecode is not valid hex: {source}"))]
    SolcBytecode { source: alloy::hex::FromHexError },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// `?` propagates the caller location, so `loc` points at the conversion site.
impl From<Error> for swap_engine::Error {
    #[track_caller]
    fn from(error: Error) -> Self {
        swap_engine::Error::Chain {
            source: Box::new(error),
            loc: Location::generate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(line: usize) -> swap_engine::Result<()> {
        let parsed: Result<()> = InvalidKeySnafu { line }.fail();
        parsed?;
        Ok(())
    }

    fn convert_elsewhere() -> swap_engine::Result<()> {
        let loaded: Result<()> = NoKeysSnafu { path: "keys.txt" }.fail();
        loaded?;
        Ok(())
    }

    fn location_of(result: swap_engine::Result<()>) -> Location {
        match result {
            Err(swap_engine::Error::Chain { loc, .. }) => loc,
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn conversion_records_the_propagation_site() {
        let first = location_of(convert(1));
        let second = location_of(convert_elsewhere());

        assert!(first.file.ends_with("error.rs"), "{}", first.file);
        assert_ne!(first.line, second.line);
    }

    #[test]
    fn conversion_keeps_the_source_error() {
        match convert(7) {
            Err(swap_engine::Error::Chain { source, .. }) => {
                assert_eq!(source.to_string(), "Invalid private key on line 7");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
