//! # Constant-Product AMM Pairs (price source)
//!
//! The pool-derived value oracle reads prices from constant-product pairs.
//! It never trades against them; it only samples their cumulative price
//! accumulators. This module models exactly that read surface.
//!
//! ## Accumulators
//!
//! Each pair tracks `price0_cumulative` (token0 priced in token1) and
//! `price1_cumulative` (the mirror). On every reserve update, the price
//! that held since the previous update is added, weighted by the elapsed
//! seconds:
//!
//! ```text
//! price0_cumulative += (reserve1 / reserve0) * 2^112 * elapsed
//! price1_cumulative += (reserve0 / reserve1) * 2^112 * elapsed
//! ```
//!
//! Accumulators wrap on overflow; consumers subtract two samples with
//! wrapping arithmetic, so only the difference is meaningful. Dividing that
//! difference by the seconds between the samples yields the time-weighted
//! average price over the window.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::address::Address;
use crate::asset::Amount;
use crate::fixed_point::{fraction, U256};
use crate::ledger::Ledger;

/// Errors from the pair factory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmmError {
    /// A pair needs two distinct assets.
    #[error("identical assets: {0}")]
    IdenticalAssets(Address),

    /// The factory already holds a pair for these assets.
    #[error("pair already exists for {0} / {1}")]
    PairExists(Address, Address),
}

/// Snapshot of a pair's accumulators as of some block time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CumulativePrices {
    /// Accumulated price of token0 in token1.
    pub price0: U256,
    /// Accumulated price of token1 in token0.
    pub price1: U256,
    /// Block time the snapshot corresponds to.
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// AmmPair
// ---------------------------------------------------------------------------

/// A constant-product pair's price state.
#[derive(Clone, Debug)]
pub struct AmmPair {
    address: Address,
    token0: Address,
    token1: Address,
    reserve0: Amount,
    reserve1: Amount,
    price0_cumulative_last: U256,
    price1_cumulative_last: U256,
    block_timestamp_last: DateTime<Utc>,
}

impl AmmPair {
    /// Creates an empty pair. Assets are sorted so `token0 < token1`.
    pub fn new(address: Address, a: Address, b: Address, now: DateTime<Utc>) -> Self {
        let (token0, token1) = if a < b { (a, b) } else { (b, a) };
        Self {
            address,
            token0,
            token1,
            reserve0: 0,
            reserve1: 0,
            price0_cumulative_last: U256::zero(),
            price1_cumulative_last: U256::zero(),
            block_timestamp_last: now,
        }
    }

    /// The pair's own address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The sorted asset addresses.
    pub fn tokens(&self) -> (&Address, &Address) {
        (&self.token0, &self.token1)
    }

    /// Current reserves and the time they were last updated.
    pub fn reserves(&self) -> (Amount, Amount, DateTime<Utc>) {
        (self.reserve0, self.reserve1, self.block_timestamp_last)
    }

    /// Replaces the reserves, first folding the outgoing price into the
    /// accumulators. An update at an earlier time than the last one is
    /// treated as zero elapsed time.
    pub fn sync(&mut self, reserve0: Amount, reserve1: Amount, now: DateTime<Utc>) {
        let accumulated = self.cumulative_prices_at(now);
        self.price0_cumulative_last = accumulated.price0;
        self.price1_cumulative_last = accumulated.price1;
        self.reserve0 = reserve0;
        self.reserve1 = reserve1;
        if now > self.block_timestamp_last {
            self.block_timestamp_last = now;
        }
        debug!(pair = %self.address, reserve0, reserve1, "pair synced");
    }

    /// Accumulators as they would read at `now`, without mutating state.
    pub fn cumulative_prices_at(&self, now: DateTime<Utc>) -> CumulativePrices {
        let mut price0 = self.price0_cumulative_last;
        let mut price1 = self.price1_cumulative_last;
        let elapsed = (now - self.block_timestamp_last).num_seconds();

        if elapsed > 0 && self.reserve0 != 0 && self.reserve1 != 0 {
            let elapsed = U256::from(elapsed as u64);
            if let (Some(p0), Some(p1)) = (
                fraction(self.reserve1, self.reserve0),
                fraction(self.reserve0, self.reserve1),
            ) {
                price0 = price0.overflowing_add(p0.overflowing_mul(elapsed).0).0;
                price1 = price1.overflowing_add(p1.overflowing_mul(elapsed).0).0;
            }
        }

        CumulativePrices {
            price0,
            price1,
            timestamp: now.max(self.block_timestamp_last),
        }
    }
}

/// A pair shared between the factory and its readers.
pub type SharedPair = Arc<RwLock<AmmPair>>;

// ---------------------------------------------------------------------------
// PairFactory
// ---------------------------------------------------------------------------

/// Directory of pairs, one per unordered asset couple.
#[derive(Debug, Default)]
pub struct PairFactory {
    pairs: HashMap<(Address, Address), SharedPair>,
}

impl PairFactory {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the pair for `a` and `b`.
    ///
    /// # Errors
    ///
    /// [`AmmError::IdenticalAssets`] if `a == b`, [`AmmError::PairExists`] if
    /// the couple already has a pair.
    pub fn create_pair(
        &mut self,
        ledger: &mut Ledger,
        a: &Address,
        b: &Address,
    ) -> Result<SharedPair, AmmError> {
        if a == b {
            return Err(AmmError::IdenticalAssets(a.clone()));
        }
        let key = Self::key(a, b);
        if self.pairs.contains_key(&key) {
            return Err(AmmError::PairExists(key.0, key.1));
        }
        let address = ledger.fresh_address("pair");
        let pair = Arc::new(RwLock::new(AmmPair::new(
            address.clone(),
            a.clone(),
            b.clone(),
            ledger.now(),
        )));
        info!(pair = %address, token0 = %key.0, token1 = %key.1, "pair created");
        self.pairs.insert(key, Arc::clone(&pair));
        Ok(pair)
    }

    /// The pair for `a` and `b`, in either order.
    pub fn pair(&self, a: &Address, b: &Address) -> Option<SharedPair> {
        self.pairs.get(&Self::key(a, b)).cloned()
    }

    /// Every pair that includes `asset`, keyed by the other asset.
    pub fn pairs_with(&self, asset: &Address) -> Vec<(Address, SharedPair)> {
        self.pairs
            .iter()
            .filter_map(|((t0, t1), pair)| {
                if t0 == asset {
                    Some((t1.clone(), Arc::clone(pair)))
                } else if t1 == asset {
                    Some((t0.clone(), Arc::clone(pair)))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if no pair has been created.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn key(a: &Address, b: &Address) -> (Address, Address) {
        if a < b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed_point::encode;
    use chrono::{Duration, TimeZone};

    const WEI: u128 = 1_000_000_000_000_000_000;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn tokens_are_sorted() {
        let a = Address::named("zz");
        let b = Address::named("aa");
        let pair = AmmPair::new(Address::named("pair"), a.clone(), b.clone(), t0());
        let (x, y) = pair.tokens();
        assert!(x < y);
    }

    #[test]
    fn accumulator_grows_with_elapsed_time() {
        let mut pair = AmmPair::new(Address::named("pair"), Address::named("a"), Address::named("b"), t0());
        pair.sync(WEI, 2_000 * WEI, t0());

        let later = t0() + Duration::seconds(10);
        let snapshot = pair.cumulative_prices_at(later);
        assert_eq!(snapshot.price0, encode(2_000) * U256::from(10u64));
        assert_eq!(snapshot.timestamp, later);
    }

    #[test]
    fn empty_reserves_do_not_accumulate() {
        let pair = AmmPair::new(Address::named("pair"), Address::named("a"), Address::named("b"), t0());
        let snapshot = pair.cumulative_prices_at(t0() + Duration::seconds(100));
        assert!(snapshot.price0.is_zero());
        assert!(snapshot.price1.is_zero());
    }

    #[test]
    fn sync_folds_previous_price() {
        let mut pair = AmmPair::new(Address::named("pair"), Address::named("a"), Address::named("b"), t0());
        pair.sync(WEI, WEI, t0());
        pair.sync(WEI, 3 * WEI, t0() + Duration::seconds(5));
        let snapshot = pair.cumulative_prices_at(t0() + Duration::seconds(10));
        // 5s at 1.0 then 5s at 3.0.
        assert_eq!(snapshot.price0, encode(5) + encode(15));
    }

    #[test]
    fn factory_rejects_duplicates_and_identical_assets() {
        let mut ledger = Ledger::new(t0());
        let mut factory = PairFactory::new();
        let a = Address::named("a");
        let b = Address::named("b");
        factory.create_pair(&mut ledger, &a, &b).unwrap();
        assert!(matches!(
            factory.create_pair(&mut ledger, &b, &a),
            Err(AmmError::PairExists(..))
        ));
        assert!(matches!(
            factory.create_pair(&mut ledger, &a, &a),
            Err(AmmError::IdenticalAssets(_))
        ));
        assert!(factory.pair(&b, &a).is_some());
        assert_eq!(factory.pairs_with(&a).len(), 1);
        assert_eq!(factory.len(), 1);
    }
}
