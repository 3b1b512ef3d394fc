//! # 2^112 Fixed-Point Arithmetic
//!
//! Prices are unsigned binary fractions with 112 fractional bits: a rate
//! `r` means `r / 2^112` reference units per smallest asset unit. This is
//! the UQ112x112 layout AMM pairs use for their cumulative accumulators,
//! so oracle rates and time-weighted averages share one representation.
//!
//! Intermediate products are computed in 512 bits so that a 128-bit amount
//! times a 256-bit rate never overflows before the final shift. Only the
//! result has to fit back into the 128-bit amount domain; when it doesn't,
//! the helpers return `None` and the caller decides what that means.

use crate::config::Q112_BITS;

#[allow(clippy::assign_op_pattern, clippy::ptr_offset_with_cast)]
mod wide {
    uint::construct_uint! {
        /// 256-bit unsigned integer: fixed-point rates and price accumulators.
        pub struct U256(4);
    }

    uint::construct_uint! {
        /// 512-bit unsigned integer for overflow-free intermediate products.
        pub struct U512(8);
    }
}

pub use wide::{U256, U512};

/// The fixed-point denominator `2^112`.
pub fn q112() -> U256 {
    U256::from(1u128 << Q112_BITS)
}

/// Encodes a whole number as a fixed-point rate: `n * 2^112`.
pub fn encode(n: u128) -> U256 {
    U256::from(n) * q112()
}

/// Encodes `numerator / denominator` as a fixed-point rate, rounding down.
///
/// Returns `None` for a zero denominator.
pub fn fraction(numerator: u128, denominator: u128) -> Option<U256> {
    if denominator == 0 {
        return None;
    }
    Some(encode(numerator) / U256::from(denominator))
}

/// `floor(amount * rate / 2^112)`: converts an amount into value at `rate`.
pub fn mul_q112(amount: u128, rate: U256) -> Option<u128> {
    let product = U512::from(amount) * widen(rate);
    narrow(product / widen(q112()))
}

/// `floor(value * 2^112 / rate)`: the inverse of [`mul_q112`].
///
/// Returns `None` when `rate` is zero or the quotient does not fit.
pub fn div_q112(value: u128, rate: U256) -> Option<u128> {
    if rate.is_zero() {
        return None;
    }
    let scaled = U512::from(value) * widen(q112());
    narrow(scaled / widen(rate))
}

/// `floor(a * b / denominator)` on 128-bit amounts without intermediate
/// overflow. Used for proportional splits (share fractions, percentages).
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Option<u128> {
    if denominator == 0 {
        return None;
    }
    let product = U256::from(a) * U256::from(b);
    let quotient = product / U256::from(denominator);
    if quotient > U256::from(u128::MAX) {
        return None;
    }
    Some(quotient.low_u128())
}

fn widen(x: U256) -> U512 {
    let mut bytes = [0u8; 64];
    x.to_little_endian(&mut bytes[..32]);
    U512::from_little_endian(&bytes)
}

fn narrow(x: U512) -> Option<u128> {
    if x > U512::from(u128::MAX) {
        return None;
    }
    Some(x.low_u128())
}
