use std::{collections::BTreeMap, time::Duration};

use alloy::primitives::{address, aliases::U160, Address, U256};
use reqwest::Url;
use rust_decimal::Decimal;

use crate::{Error, Result};

pub const GALILEO_CHAIN_ID: u64 = 16601;
pub const GALILEO_RPC_URL: &str = "https://evmrpc-testnet.0g.ai";
pub const GALILEO_GAS_ORACLE_URL: &str = "https://chainscan-galileo.0g.ai/stat/gasprice/tracker";
pub const GALILEO_ROUTER: Address = address!("0xb95B5953FF8ee5D5d9818CdbEfE363ff2191318c");
pub const USDT_ADDRESS: Address = address!("0x3eC8A8705bE1D5ca90066b37ba62c4183B024ebf");
pub const BTC_ADDRESS: Address = address!("0x36f6414FF1df609214dDAbA71c84f18bcf00F67d");
pub const ETH_ADDRESS: Address = address!("0x0fE9B43625fA7EdD663aDcEC0728DD635e4AbF7c");

/// 0.3% pool.
pub const DEFAULT_FEE_TIER: u32 = 3000;
/// 3 gwei.
pub const FALLBACK_GAS_PRICE_WEI: u128 = 3_000_000_000;
pub const DEFAULT_SWAPS_PER_WALLET: u32 = 10;

const MAX_FEE_TIER: u32 = (1 << 24) - 1;

/// Inclusive bounds for a randomly drawn input amount, in whole tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl AmountRange {
    pub const fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, amount: Decimal) -> bool {
        amount >= self.min && amount <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
    /// Range used when this token is the input side of a swap.
    pub amount_range: AmountRange,
}

#[derive(Debug, Clone, Default)]
pub struct TokenCatalog {
    tokens: BTreeMap<String, Token>,
}

impl TokenCatalog {
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        Self {
            tokens: tokens
                .into_iter()
                .map(|token| (token.symbol.clone(), token))
                .collect(),
        }
    }

    pub fn get(&self, symbol: &str) -> Result<&Token> {
        self.tokens.get(symbol).ok_or_else(|| Error::UnknownToken {
            symbol: symbol.to_string(),
        })
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.tokens.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The three tokens listed on the Galileo testnet router, all with 18 decimals.
    pub fn galileo() -> Self {
        Self::new([
            Token {
                symbol: "USDT".to_string(),
                address: USDT_ADDRESS,
                decimals: 18,
                amount_range: AmountRange::new(Decimal::from(100), Decimal::from(1111)),
            },
            Token {
                symbol: "BTC".to_string(),
                address: BTC_ADDRESS,
                decimals: 18,
                amount_range: AmountRange::new(Decimal::new(5, 4), Decimal::new(51, 4)),
            },
            Token {
                symbol: "ETH".to_string(),
                address: ETH_ADDRESS,
                decimals: 18,
                amount_range: AmountRange::new(Decimal::new(1, 2), Decimal::new(12, 2)),
            },
        ])
    }
}

/// Ordered (from, to) symbols. Construct through [`TradingPair::new`] to
/// guarantee the two sides differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingPair {
    from: String,
    to: String,
}

impl TradingPair {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Result<Self> {
        let (from, to) = (from.into(), to.into());
        if from == to {
            return Err(Error::InvalidPair {
                reason: "both sides are the same token".to_string(),
                from,
                to,
            });
        }
        Ok(Self { from, to })
    }

    pub fn from_symbol(&self) -> &str {
        &self.from
    }

    pub fn to_symbol(&self) -> &str {
        &self.to
    }
}

impl std::fmt::Display for TradingPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} → {}", self.from, self.to)
    }
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub rpc_url: Url,
    pub router: Address,
    pub fee_tier: u32,
    pub tokens: TokenCatalog,
    pub pairs: Vec<TradingPair>,
}

impl NetworkConfig {
    pub fn galileo() -> Self {
        let pairs = [("USDT", "BTC"), ("USDT", "ETH"), ("BTC", "USDT"), ("ETH", "USDT")]
            .into_iter()
            .map(|(from, to)| TradingPair {
                from: from.to_string(),
                to: to.to_string(),
            })
            .collect();

        Self {
            chain_id: GALILEO_CHAIN_ID,
            rpc_url: Url::parse(GALILEO_RPC_URL).expect("static RPC URL is valid"),
            router: GALILEO_ROUTER,
            fee_tier: DEFAULT_FEE_TIER,
            tokens: TokenCatalog::galileo(),
            pairs,
        }
    }

    /// Every pair must reference two distinct catalog tokens and the fee
    /// tier must fit in a `uint24`.
    pub fn validate(&self) -> Result<()> {
        if self.pairs.is_empty() {
            return Err(Error::InvalidConfig {
                reason: "no trading pairs configured".to_string(),
            });
        }
        if self.fee_tier > MAX_FEE_TIER {
            return Err(Error::InvalidConfig {
                reason: format!("fee tier {} does not fit in uint24", self.fee_tier),
            });
        }
        for pair in &self.pairs {
            for symbol in [pair.from_symbol(), pair.to_symbol()] {
                if !self.tokens.contains(symbol) {
                    return Err(Error::InvalidPair {
                        from: pair.from.clone(),
                        to: pair.to.clone(),
                        reason: format!("{symbol} is not in the token catalog"),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GasConfig {
    pub oracle_url: Url,
    pub fallback_wei: u128,
    pub request_timeout: Duration,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            oracle_url: Url::parse(GALILEO_GAS_ORACLE_URL).expect("static oracle URL is valid"),
            fallback_wei: FALLBACK_GAS_PRICE_WEI,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Inclusive bounds for a randomized pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub const fn from_secs(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_secs(min),
            max: Duration::from_secs(max),
        }
    }

    pub fn contains(&self, duration: Duration) -> bool {
        duration >= self.min && duration <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: DelayRange,
    /// Attempts allowed per slot; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub const fn unbounded(backoff: DelayRange) -> Self {
        Self {
            backoff,
            max_attempts: None,
        }
    }

    pub const fn no_retry() -> Self {
        Self {
            backoff: DelayRange::from_secs(8, 15),
            max_attempts: Some(1),
        }
    }

    pub fn allows_another(&self, attempts_made: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts_made < max)
    }
}

#[derive(Debug, Clone)]
pub struct SwapPolicy {
    pub quota: u32,
    pub deadline: Duration,
    /// No slippage protection by default.
    pub min_amount_out: U256,
    pub sqrt_price_limit_x96: U160,
    pub amount_precision: u32,
    pub inter_swap_delay: DelayRange,
    pub retry: RetryPolicy,
    pub confirmation_timeout: Option<Duration>,
    pub await_approval_receipt: bool,
}

impl Default for SwapPolicy {
    fn default() -> Self {
        Self {
            quota: DEFAULT_SWAPS_PER_WALLET,
            deadline: Duration::from_secs(60),
            min_amount_out: U256::ZERO,
            sqrt_price_limit_x96: U160::ZERO,
            amount_precision: 6,
            inter_swap_delay: DelayRange::from_secs(35, 120),
            retry: RetryPolicy::unbounded(DelayRange::from_secs(8, 15)),
            confirmation_timeout: Some(Duration::from_secs(300)),
            await_approval_receipt: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeployPolicy {
    pub retry: RetryPolicy,
    pub inter_wallet_delay: DelayRange,
    pub name_length: usize,
    pub symbol_length: usize,
    pub confirmation_timeout: Option<Duration>,
}

impl Default for DeployPolicy {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::no_retry(),
            inter_wallet_delay: DelayRange::from_secs(62, 125),
            name_length: 12,
            symbol_length: 4,
            confirmation_timeout: Some(Duration::from_secs(300)),
        }
    }
}
