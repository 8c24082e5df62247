use std::{fmt, str::FromStr};

use dialoguer::{theme::ColorfulTheme, Input};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Swap,
    Deploy,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Swap => write!(f, "auto swap"),
            Mode::Deploy => write!(f, "auto deploy"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        parse_mode(input)
    }
}

/// Operator-supplied extra seconds between wallets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WalletDelay(u64);

impl FromStr for WalletDelay {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        parse_delay(input).map(WalletDelay)
    }
}

impl fmt::Display for WalletDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn parse_mode(input: &str) -> Result<Mode, String> {
    match input.trim() {
        "1" => Ok(Mode::Swap),
        "2" => Ok(Mode::Deploy),
        other => Err(format!("expected 1 or 2, got {other:?}")),
    }
}

/// Whole, non-negative seconds only.
pub fn parse_delay(input: &str) -> Result<u64, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("expected a whole number of seconds, got {trimmed:?}"));
    }
    trimmed.parse().map_err(|e| format!("{e}"))
}

/// Re-prompts until the answer parses.
pub fn prompt_mode() -> Result<Mode, dialoguer::Error> {
    Input::<Mode>::with_theme(&ColorfulTheme::default())
        .with_prompt("Select mode: 1 = Auto Swap, 2 = Auto Deploy")
        .interact_text()
}

pub fn prompt_delay() -> Result<u64, dialoguer::Error> {
    let delay = Input::<WalletDelay>::with_theme(&ColorfulTheme::default())
        .with_prompt("Delay between wallets (seconds)")
        .interact_text()?;
    Ok(delay.0)
}
