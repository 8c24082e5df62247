use std::fmt;

use alloy::primitives::{utils::format_units, U256};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use snafu::{ResultExt, Snafu};
use tracing::{info, warn};

use crate::{config::GasConfig, HttpClientBuildSnafu, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasPriceSource {
    Oracle,
    Fallback,
}

/// Gas price in wei and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPrice {
    pub wei: u128,
    pub source: GasPriceSource,
}

impl GasPrice {
    pub fn is_fallback(&self) -> bool {
        self.source == GasPriceSource::Fallback
    }

    pub fn gwei(&self) -> String {
        format_units(U256::from(self.wei), "gwei").unwrap_or_else(|_| format!("{} wei", self.wei))
    }
}

impl fmt::Display for GasPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} gwei", self.gwei())
    }
}

#[async_trait]
pub trait GasOracle: Send + Sync {
    /// Never fails; implementations degrade to a fallback value.
    async fn gas_price(&self) -> GasPrice;
}

#[derive(Debug, Snafu)]
pub enum GasOracleError {
    #[snafu(display("Gas oracle request failed: {source}"))]
    Request { source: reqwest::Error },

    #[snafu(display("Gas oracle returned HTTP {status}"))]
    Status { status: StatusCode },

    #[snafu(display("Gas oracle response is malformed: {source}"))]
    Decode { source: reqwest::Error },

    #[snafu(display("Gas oracle tp50 is not a wei amount: {value}"))]
    InvalidValue { value: String },
}

#[derive(Debug, Deserialize)]
struct TrackerResponse {
    result: TrackerResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackerResult {
    gas_price_market: GasPriceMarket,
}

#[derive(Debug, Deserialize)]
struct GasPriceMarket {
    tp50: Numeric,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Text(String),
    Integer(u64),
}

/// Reads the median market gas price from the chain explorer's tracker
/// endpoint, falling back to a fixed price on any failure.
#[derive(Debug, Clone)]
pub struct GasPriceResolver {
    http_client: Client,
    oracle_url: Url,
    fallback_wei: u128,
}

impl GasPriceResolver {
    pub fn new(config: &GasConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context(HttpClientBuildSnafu)?;

        Ok(Self {
            http_client,
            oracle_url: config.oracle_url.clone(),
            fallback_wei: config.fallback_wei,
        })
    }

    pub async fn resolve(&self) -> GasPrice {
        match self.fetch().await {
            Ok(wei) => {
                let price = GasPrice {
                    wei,
                    source: GasPriceSource::Oracle,
                };
                info!(gas_price = %price, "fetched gas price");
                price
            }
            Err(err) => {
                let price = GasPrice {
                    wei: self.fallback_wei,
                    source: GasPriceSource::Fallback,
                };
                warn!(error = %err, gas_price = %price, "failed to fetch gas price, using fallback");
                price
            }
        }
    }

    async fn fetch(&self) -> Result<u128, GasOracleError> {
        let response = self
            .http_client
            .get(self.oracle_url.clone())
            .send()
            .await
            .context(RequestSnafu)?;

        let status = response.status();
        if !status.is_success() {
            return StatusSnafu { status }.fail();
        }

        let body: TrackerResponse = response.json().await.context(DecodeSnafu)?;
        parse_wei(body.result.gas_price_market.tp50)
    }
}

#[async_trait]
impl GasOracle for GasPriceResolver {
    async fn gas_price(&self) -> GasPrice {
        self.resolve().await
    }
}

fn parse_wei(value: Numeric) -> Result<u128, GasOracleError> {
    let text = match value {
        Numeric::Integer(wei) => return Ok(u128::from(wei)),
        Numeric::Text(text) => text,
    };
    U256::from_str_radix(text.trim(), 10)
        .ok()
        .and_then(|wei| u128::try_from(wei).ok())
        .ok_or(GasOracleError::InvalidValue { value: text })
}

/// Always returns the same oracle-sourced price.
///
/// Meant for tests and for pinning the price in downstream test setups.
#[derive(Debug, Clone, Copy)]
pub struct FixedGasPrice(pub u128);

#[async_trait]
impl GasOracle for FixedGasPrice {
    async fn gas_price(&self) -> GasPrice {
        GasPrice {
            wei: self.0,
            source: GasPriceSource::Oracle,
        }
    }
}
