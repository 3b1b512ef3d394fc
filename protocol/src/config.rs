//! # Protocol Configuration & Constants
//!
//! Every magic number the contracts depend on lives here. The fixed-point
//! scale, the share supply a fresh vault mints and the default reward cap
//! divisor are all consensus-relevant: two deployments that disagree on
//! any of them will price the same vault differently.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Fixed-Point Parameters
// ---------------------------------------------------------------------------

/// Number of fractional bits in the price format. Prices are stored as
/// `numerator / 2^112`, the same UQ112x112 layout AMM pairs use for their
/// cumulative price accumulators.
pub const Q112_BITS: u32 = 112;

/// Decimal scale of the reference value unit. Values are expressed in
/// 18-decimal fixed point, like the assets they are derived from.
pub const VALUE_DECIMALS: u8 = 18;

/// One whole reference value unit in its smallest denomination.
pub const ONE_VALUE: u128 = 1_000_000_000_000_000_000;

// ---------------------------------------------------------------------------
// Vault Parameters
// ---------------------------------------------------------------------------

/// Total share supply credited to the creator of a fresh vault. Shares are
/// 18-decimal, so `0.4 * SHARE_SUPPLY` is a 40% claim.
pub const SHARE_SUPPLY: u128 = 1_000_000_000_000_000_000;

/// Denominator of a lock tier's reward percentage.
pub const PERCENT_DENOMINATOR: u128 = 100;

/// Upper bound on a lock tier's reward percentage.
pub const MAX_REWARD_PERCENT: u8 = 100;

/// Longest lock interval a tier may carry: 100 years of 365 days.
pub const MAX_LOCK_INTERVAL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// The default per-lock value cap is `reward_total / MAX_LOCKED_VALUE_DIVISOR`
/// unless the administrator pins it explicitly.
pub const MAX_LOCKED_VALUE_DIVISOR: u128 = 100;

// ---------------------------------------------------------------------------
// Ledger Parameters
// ---------------------------------------------------------------------------

/// Number of address bytes kept from the BLAKE3 digest. 20 bytes renders as
/// the familiar `0x` + 40 hex characters.
pub const ADDRESS_LENGTH: usize = 20;

/// Default block interval of the simulated host ledger. Only used when a
/// caller asks the ledger to "mine" a block without an explicit duration.
pub const BLOCK_TIME: Duration = Duration::from_secs(15);
