//! Bounded random parameters for amounts, pauses and synthetic token names.
//!
//! Every helper takes the RNG explicitly. Callers in async code pass a
//! temporary `rand::thread_rng()` so the generator is never held across an
//! await point.

use std::time::Duration;

use alloy::primitives::U256;
use rand::Rng;
use rust_decimal::{
    prelude::{FromPrimitive, ToPrimitive},
    Decimal,
};

use crate::{
    config::{AmountRange, DelayRange},
    Error, Result,
};

/// Uniform value in `[min, max]` rounded to `precision` decimal digits.
/// Reversed bounds are swapped.
pub fn random_decimal<R: Rng + ?Sized>(
    rng: &mut R,
    min: Decimal,
    max: Decimal,
    precision: u32,
) -> Decimal {
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    let (Some(low_f), Some(high_f)) = (low.to_f64(), high.to_f64()) else {
        return low.round_dp(precision);
    };
    let sample = if low_f < high_f {
        rng.gen_range(low_f..=high_f)
    } else {
        low_f
    };

    Decimal::from_f64(sample)
        .unwrap_or(low)
        .round_dp(precision)
        .clamp(low, high)
}

pub fn random_amount<R: Rng + ?Sized>(rng: &mut R, range: &AmountRange, precision: u32) -> Decimal {
    random_decimal(rng, range.min, range.max, precision)
}

/// Uniform pause in `[range.min, range.max]` at millisecond resolution.
pub fn random_delay<R: Rng + ?Sized>(rng: &mut R, range: &DelayRange) -> Duration {
    let (low, high) = if range.min <= range.max {
        (range.min, range.max)
    } else {
        (range.max, range.min)
    };
    let low_ms = low.as_millis() as u64;
    let high_ms = high.as_millis() as u64;
    Duration::from_millis(rng.gen_range(low_ms..=high_ms))
}

/// Lowercase ASCII letters, used for throwaway token names and symbols.
pub fn random_name<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| char::from(b'a' + rng.gen_range(0..26u8)))
        .collect()
}

/// Converts a whole-token amount into base units: `amount * 10^decimals`.
pub fn scale_amount(amount: Decimal, decimals: u8) -> Result<U256> {
    let scale = amount.scale();
    let mantissa = amount.mantissa();
    if mantissa < 0 || scale > u32::from(decimals) {
        return Err(Error::AmountScale { amount, decimals });
    }

    let multiplier = U256::from(10u8).pow(U256::from(u32::from(decimals) - scale));
    U256::from(mantissa as u128)
        .checked_mul(multiplier)
        .ok_or(Error::AmountScale { amount, decimals })
}
