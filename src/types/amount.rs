//! Amount arithmetic and fixed-point fill fractions.
//!
//! ## Overview
//!
//! Order amounts are `u128`. Proration multiplies two of them before dividing,
//! so every product is taken in 256-bit space and narrowed back afterwards.
//!
//! ## Fractional Targets
//!
//! A quote target word with bit 255 set is not an absolute amount: its low
//! bits hold a fraction scaled by 10^18 ([`SCALE`]) of whatever capacity is
//! observed when the fill starts.
//!
//! ## Examples
//!
//! ```
//! use fill_engine::types::amount::{to_fixed, from_fixed, FillTarget};
//!
//! let half = to_fixed("0.5").unwrap();
//! assert_eq!(half, 500_000_000_000_000_000);
//! assert_eq!(from_fixed(half), "0.500000000000000000");
//!
//! let target = FillTarget::Fraction(half);
//! assert_eq!(FillTarget::decode(target.encode()).unwrap(), target);
//! assert_eq!(target.resolve(1_000), 500);
//! ```

use alloy_primitives::U256;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::error::CapacityError;

/// Scaling factor for fill fractions: 10^18
pub const SCALE: u64 = 1_000_000_000_000_000_000;

/// Flag bit marking a fractional target word
pub const FRACTION_FLAG_BIT: usize = 255;

// ============================================================================
// 256-bit helpers
// ============================================================================

/// Narrow a 256-bit word to `u128`, or `None` if the high limbs are set.
pub fn u256_to_u128(value: U256) -> Option<u128> {
    let limbs = value.as_limbs();
    if limbs[2] != 0 || limbs[3] != 0 {
        return None;
    }
    Some(limbs[0] as u128 | ((limbs[1] as u128) << 64))
}

/// `floor(a * b / c)`; `None` when `c == 0` or the quotient exceeds `u128`.
///
/// # Example
///
/// ```
/// use fill_engine::types::amount::mul_div_floor;
///
/// assert_eq!(mul_div_floor(30, 200, 100), Some(60));
/// assert_eq!(mul_div_floor(1, 2, 3), Some(0));
/// assert_eq!(mul_div_floor(u128::MAX, u128::MAX, u128::MAX), Some(u128::MAX));
/// ```
pub fn mul_div_floor(a: u128, b: u128, c: u128) -> Option<u128> {
    if c == 0 {
        return None;
    }
    u256_to_u128(U256::from(a) * U256::from(b) / U256::from(c))
}

/// `ceil(a * b / c)`; `None` when `c == 0` or the quotient exceeds `u128`.
pub fn mul_div_ceil(a: u128, b: u128, c: u128) -> Option<u128> {
    if c == 0 {
        return None;
    }
    let numerator = U256::from(a) * U256::from(b);
    let divisor = U256::from(c);
    let mut quotient = numerator / divisor;
    if numerator % divisor != U256::ZERO {
        quotient += U256::from(1u8);
    }
    u256_to_u128(quotient)
}

// ============================================================================
// Fixed-point conversion (10^18)
// ============================================================================

/// Convert a decimal string to an 18-decimal fixed-point fraction
///
/// # Returns
///
/// * `Some(u128)` - The fixed-point representation
/// * `None` - If parsing fails or the value is negative
pub fn to_fixed(s: &str) -> Option<u128> {
    let decimal = Decimal::from_str(s).ok()?;
    decimal_to_fixed(decimal)
}

/// Convert a Decimal to an 18-decimal fixed-point fraction
pub fn decimal_to_fixed(d: Decimal) -> Option<u128> {
    if d.is_sign_negative() {
        return None;
    }
    let scaled = d.checked_mul(Decimal::from(SCALE))?;
    scaled.round_dp(0).to_u128()
}

/// Convert a fixed-point fraction back to a Decimal
pub fn fixed_to_decimal(value: u128) -> Option<Decimal> {
    Decimal::from_u128(value)?.checked_div(Decimal::from(SCALE))
}

/// Render a fixed-point fraction with 18 decimal places
pub fn from_fixed(value: u128) -> String {
    match fixed_to_decimal(value) {
        Some(decimal) => format!("{:.18}", decimal),
        None => value.to_string(),
    }
}

// ============================================================================
// Fill targets
// ============================================================================

/// A quote target: an absolute amount, or a fraction of observed capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillTarget {
    /// Exact amount, in the units of the quote side
    Absolute(u128),
    /// Fraction of total observed capacity, scaled by 10^18 (capped at 1.0)
    Fraction(u128),
}

impl FillTarget {
    /// Decode a raw 256-bit target word.
    pub fn decode(raw: U256) -> Result<Self, CapacityError> {
        if raw.bit(FRACTION_FLAG_BIT) {
            let mut fraction = raw;
            fraction.set_bit(FRACTION_FLAG_BIT, false);
            let fraction = u256_to_u128(fraction)
                .ok_or(CapacityError::TargetOutOfRange)?
                .min(SCALE as u128);
            return Ok(FillTarget::Fraction(fraction));
        }
        u256_to_u128(raw)
            .map(FillTarget::Absolute)
            .ok_or(CapacityError::TargetOutOfRange)
    }

    /// Encode back into the raw 256-bit word form.
    pub fn encode(&self) -> U256 {
        match *self {
            FillTarget::Absolute(amount) => U256::from(amount),
            FillTarget::Fraction(fraction) => {
                let mut word = U256::from(fraction);
                word.set_bit(FRACTION_FLAG_BIT, true);
                word
            }
        }
    }

    /// Resolve against the capacity observed at call time.
    pub fn resolve(&self, observed_capacity: u128) -> u128 {
        match *self {
            FillTarget::Absolute(amount) => amount,
            FillTarget::Fraction(fraction) => {
                mul_div_floor(observed_capacity, fraction, SCALE as u128).unwrap_or(observed_capacity)
            }
        }
    }

    pub fn is_fractional(&self) -> bool {
        matches!(self, FillTarget::Fraction(_))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
