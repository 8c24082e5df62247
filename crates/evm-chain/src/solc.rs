use std::{path::PathBuf, process::Stdio};

use alloy::{hex, primitives::Bytes};
use async_trait::async_trait;
use serde_json::{json, Value};
use snafu::{ensure, OptionExt, ResultExt};
use swap_engine::{ContractArtifact, TokenCompiler};
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, info};

use crate::{
    error::{
        SolcBytecodeSnafu, SolcErrorsSnafu, SolcExitSnafu, SolcJsonSnafu, SolcMissingSnafu,
        SolcSpawnSnafu,
    },
    Result,
};

const SOURCE_FILE: &str = "Token.sol";
const CONTRACT_NAME: &str = "Token";

pub const TOKEN_CONTRACT_SOURCE: &str = r#"
pragma solidity ^0.8.0;
contract Token {
    string public name;
    string public symbol;
    uint8 public decimals = 18;
    uint256 public totalSupply;
    mapping(address => uint256) public balanceOf;

    constructor(string memory _name, string memory _symbol) {
        name = _name;
        symbol = _symbol;
        totalSupply = 1000000 * 10 ** uint256(decimals);
        balanceOf[msg.sender] = totalSupply;
    }
}
"#;

/// Compiles the token contract by piping standard JSON through an external
/// `solc` binary.
#[derive(Debug, Clone)]
pub struct SolcCompiler {
    solc_path: PathBuf,
}

impl SolcCompiler {
    pub fn new(solc_path: impl Into<PathBuf>) -> Self {
        Self {
            solc_path: solc_path.into(),
        }
    }

    async fn run(&self) -> Result<ContractArtifact> {
        let input = standard_json_input().to_string();

        let mut child = Command::new(&self.solc_path)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context(SolcSpawnSnafu {
                path: &self.solc_path,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .await
                .context(SolcSpawnSnafu {
                    path: &self.solc_path,
                })?;
        }

        let output = child.wait_with_output().await.context(SolcSpawnSnafu {
            path: &self.solc_path,
        })?;
        ensure!(
            output.status.success(),
            SolcExitSnafu {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }
        );

        parse_solc_output(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Default for SolcCompiler {
    fn default() -> Self {
        Self::new("solc")
    }
}

#[async_trait]
impl TokenCompiler for SolcCompiler {
    async fn compile(&self) -> swap_engine::Result<ContractArtifact> {
        let artifact = self
            .run()
            .await
            .map_err(|e| swap_engine::Error::Compile {
                message: e.to_string(),
            })?;
        info!(
            bytecode_len = artifact.bytecode.len(),
            solc = %self.solc_path.display(),
            "compiled token contract"
        );
        Ok(artifact)
    }
}

pub fn standard_json_input() -> Value {
    json!({
        "language": "Solidity",
        "sources": {
            SOURCE_FILE: { "content": TOKEN_CONTRACT_SOURCE }
        },
        "settings": {
            "outputSelection": {
                "*": { "*": ["abi", "evm.bytecode.object"] }
            }
        }
    })
}

/// Extracts the token's ABI and creation bytecode from solc's standard JSON
/// output. Warnings are ignored; any entry with severity `error` fails.
pub fn parse_solc_output(raw: &str) -> Result<ContractArtifact> {
    let output: Value = serde_json::from_str(raw).context(SolcJsonSnafu)?;

    let errors: Vec<&str> = output
        .get("errors")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|entry| entry.get("severity").and_then(Value::as_str) == Some("error"))
        .map(|entry| {
            entry
                .get("formattedMessage")
                .or_else(|| entry.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("unknown compiler error")
        })
        .collect();
    ensure!(
        errors.is_empty(),
        SolcErrorsSnafu {
            message: errors.join("\n"),
        }
    );

    let contract = output
        .pointer(&format!("/contracts/{SOURCE_FILE}/{CONTRACT_NAME}"))
        .context(SolcMissingSnafu {
            field: format!("contracts.{SOURCE_FILE}.{CONTRACT_NAME}"),
        })?;
    let abi = contract
        .get("abi")
        .cloned()
        .context(SolcMissingSnafu { field: "abi" })?;
    let object = contract
        .pointer("/evm/bytecode/object")
        .and_then(Value::as_str)
        .filter(|object| !object.is_empty())
        .context(SolcMissingSnafu {
            field: "evm.bytecode.object",
        })?;

    let bytecode = Bytes::from(hex::decode(object).context(SolcBytecodeSnafu)?);
    debug!(bytes = bytecode.len(), "decoded token bytecode");
    Ok(ContractArtifact { abi, bytecode })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn input_selects_abi_and_bytecode_for_token_source() {
        let input = standard_json_input();
        assert_eq!(input["language"], "Solidity");
        assert!(input["sources"]["Token.sol"]["content"]
            .as_str()
            .unwrap()
            .contains("constructor(string memory _name, string memory _symbol)"));
        assert_eq!(
            input["settings"]["outputSelection"]["*"]["*"],
            json!(["abi", "evm.bytecode.object"])
        );
    }

    #[test]
    fn parses_successful_output() {
        let raw = json!({
            "errors": [{ "severity": "warning", "message": "SPDX license identifier not provided" }],
            "contracts": {
                "Token.sol": {
                    "Token": {
                        "abi": [{ "type": "constructor" }],
                        "evm": { "bytecode": { "object": "6080604052" } }
                    }
                }
            }
        })
        .to_string();

        let artifact = parse_solc_output(&raw).unwrap();
        assert_eq!(artifact.bytecode.as_ref(), &[0x60, 0x80, 0x60, 0x40, 0x52]);
        assert_eq!(artifact.abi, json!([{ "type": "constructor" }]));
    }

    #[test]
    fn compiler_errors_are_surfaced() {
        let raw = json!({
            "errors": [
                { "severity": "error", "formattedMessage": "ParserError: Expected ';'" },
                { "severity": "warning", "message": "ignored" }
            ]
        })
        .to_string();

        match parse_solc_output(&raw).unwrap_err() {
            Error::SolcErrors { message } => {
                assert!(message.contains("ParserError"));
                assert!(!message.contains("ignored"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_contract_is_reported() {
        let raw = json!({ "contracts": {} }).to_string();
        assert!(matches!(
            parse_solc_output(&raw).unwrap_err(),
            Error::SolcMissing { .. }
        ));
    }

    #[test]
    fn non_json_output_is_rejected() {
        assert!(matches!(
            parse_solc_output("solc: command not found").unwrap_err(),
            Error::SolcJson { .. }
        ));
    }

    #[tokio::test]
    async fn missing_binary_maps_to_compile_error() {
        let compiler = SolcCompiler::new("/nonexistent/solc-binary");
        let err = compiler.compile().await.unwrap_err();
        assert!(matches!(err, swap_engine::Error::Compile { .. }));
    }
}
