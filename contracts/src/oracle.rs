//! # Value Oracles
//!
//! A value oracle converts an amount of some asset into the reference value
//! unit and back. Two strategies exist, chosen once when the asset registry
//! is built:
//!
//! - [`FixedRateOracle`] -- the administrator sets a 2^112 fixed-point rate
//!   per asset.
//! - [`PoolTwapOracle`] -- rates are time-weighted averages read from the
//!   cumulative price accumulators of constant-product pairs against a
//!   reference asset.
//!
//! Both return **zero** for an asset they cannot price. Aggregate valuations
//! rely on that: one unpriced holding never blocks the others.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

use lockvault_protocol::fixed_point::{div_q112, mul_q112};
use lockvault_protocol::{Address, Amount, PairFactory, SharedPair, U256};

use crate::error::{reason, ContractError, ContractResult};
use crate::ownership::Ownable;

// ---------------------------------------------------------------------------
// ValueOracle
// ---------------------------------------------------------------------------

/// The pricing strategy behind an asset registry.
#[derive(Debug)]
pub enum ValueOracle {
    /// Administrator-set rates.
    FixedRate(FixedRateOracle),
    /// Pool-derived time-weighted average rates.
    PoolTwap(PoolTwapOracle),
}

impl ValueOracle {
    /// Value of `amount` of `asset` in the reference unit at block time `now`.
    ///
    /// # Errors
    ///
    /// [`ContractError::ArithmeticGuard`] when the pool variant's sample
    /// window has zero length or the result overflows.
    pub fn get_value(&self, asset: &Address, amount: Amount, now: DateTime<Utc>) -> ContractResult<Amount> {
        match self {
            ValueOracle::FixedRate(oracle) => oracle.get_value(asset, amount),
            ValueOracle::PoolTwap(oracle) => oracle.get_value(asset, amount, now),
        }
    }

    /// Amount of `asset` worth `value` reference units at block time `now`.
    pub fn value_to_asset(&self, asset: &Address, value: Amount, now: DateTime<Utc>) -> ContractResult<Amount> {
        match self {
            ValueOracle::FixedRate(oracle) => oracle.value_to_asset(asset, value),
            ValueOracle::PoolTwap(oracle) => oracle.value_to_asset(asset, value, now),
        }
    }

    /// The fixed-rate oracle, if that is the configured strategy.
    pub fn as_fixed_rate_mut(&mut self) -> Option<&mut FixedRateOracle> {
        match self {
            ValueOracle::FixedRate(oracle) => Some(oracle),
            ValueOracle::PoolTwap(_) => None,
        }
    }
}

impl From<FixedRateOracle> for ValueOracle {
    fn from(oracle: FixedRateOracle) -> Self {
        ValueOracle::FixedRate(oracle)
    }
}

impl From<PoolTwapOracle> for ValueOracle {
    fn from(oracle: PoolTwapOracle) -> Self {
        ValueOracle::PoolTwap(oracle)
    }
}

// ---------------------------------------------------------------------------
// FixedRateOracle
// ---------------------------------------------------------------------------

/// Rates set by the administrator, one per asset.
#[derive(Debug, Clone)]
pub struct FixedRateOracle {
    admin: Ownable,
    rates: HashMap<Address, U256>,
}

impl FixedRateOracle {
    /// Creates an oracle with no rates, administered by `admin`.
    pub fn new(admin: Address) -> Self {
        Self {
            admin: Ownable::new(admin),
            rates: HashMap::new(),
        }
    }

    /// Sets the rate for `asset`: reference units per smallest asset unit,
    /// scaled by 2^112. Admin only. A zero rate unprices the asset.
    pub fn set_value(&mut self, caller: &Address, asset: &Address, rate: U256) -> ContractResult<()> {
        self.admin.require_owner(caller)?;
        info!(asset = %asset, rate = %rate, "fixed rate set");
        self.rates.insert(asset.clone(), rate);
        Ok(())
    }

    /// The configured rate for `asset`.
    pub fn rate(&self, asset: &Address) -> Option<U256> {
        self.rates.get(asset).copied().filter(|r| !r.is_zero())
    }

    /// The administrator capability.
    pub fn admin(&self) -> &Ownable {
        &self.admin
    }

    /// Hands the admin role to `new_owner`.
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> ContractResult<()> {
        self.admin.transfer_ownership(caller, new_owner)
    }

    fn get_value(&self, asset: &Address, amount: Amount) -> ContractResult<Amount> {
        match self.rate(asset) {
            Some(rate) => mul_q112(amount, rate).ok_or(ContractError::ArithmeticGuard(reason::VALUE_OVERFLOW)),
            None => Ok(0),
        }
    }

    fn value_to_asset(&self, asset: &Address, value: Amount) -> ContractResult<Amount> {
        match self.rate(asset) {
            Some(rate) => div_q112(value, rate).ok_or(ContractError::ArithmeticGuard(reason::VALUE_OVERFLOW)),
            None => Ok(0),
        }
    }
}

// ---------------------------------------------------------------------------
// PoolTwapOracle
// ---------------------------------------------------------------------------

/// Accumulator sample recorded for one priceable asset.
#[derive(Debug, Clone)]
struct Observation {
    pair: SharedPair,
    /// Whether the priced asset is the pair's token0.
    is_token0: bool,
    cumulative: U256,
    timestamp: DateTime<Utc>,
}

/// Time-weighted average prices against a reference asset.
///
/// At construction the oracle records the accumulator of every pair that
/// includes the reference asset. A query averages the accumulator growth
/// between that record and the pair's state at the query time. Assets not
/// paired directly with the reference asset are unpriced.
///
/// The reference asset itself has no pair against itself and is unpriced
/// unless [`with_reference_at_par`](Self::with_reference_at_par) is set.
#[derive(Debug, Clone)]
pub struct PoolTwapOracle {
    reference: Address,
    reference_at_par: bool,
    observations: HashMap<Address, Observation>,
}

impl PoolTwapOracle {
    /// Samples every pair of `factory` that includes `reference` at `now`.
    pub fn new(factory: &PairFactory, reference: Address, now: DateTime<Utc>) -> Self {
        let mut observations = HashMap::new();
        for (asset, pair) in factory.pairs_with(&reference) {
            let (is_token0, snapshot) = {
                let guard = pair.read();
                let is_token0 = guard.tokens().0 == &asset;
                (is_token0, guard.cumulative_prices_at(now))
            };
            let cumulative = if is_token0 { snapshot.price0 } else { snapshot.price1 };
            debug!(asset = %asset, reference = %reference, "pair observed");
            observations.insert(
                asset,
                Observation {
                    pair,
                    is_token0,
                    cumulative,
                    timestamp: snapshot.timestamp,
                },
            );
        }
        info!(reference = %reference, pairs = observations.len(), "pool oracle initialised");
        Self {
            reference,
            reference_at_par: false,
            observations,
        }
    }

    /// Prices the reference asset at exactly one reference unit per unit.
    pub fn with_reference_at_par(mut self) -> Self {
        self.reference_at_par = true;
        self
    }

    fn is_par(&self, asset: &Address) -> bool {
        self.reference_at_par && asset == &self.reference
    }

    /// The asset all values are expressed in.
    pub fn reference(&self) -> &Address {
        &self.reference
    }

    /// Returns `true` if `asset` has an observed pair or is priced at par.
    pub fn prices(&self, asset: &Address) -> bool {
        self.is_par(asset) || self.observations.contains_key(asset)
    }

    /// Average rate of `asset` since its observation, `None` if unpriced.
    pub fn average_rate(&self, asset: &Address, now: DateTime<Utc>) -> ContractResult<Option<U256>> {
        let Some(observation) = self.observations.get(asset) else {
            return Ok(None);
        };
        let snapshot = observation.pair.read().cumulative_prices_at(now);
        let current = if observation.is_token0 { snapshot.price0 } else { snapshot.price1 };
        let elapsed = (snapshot.timestamp - observation.timestamp).num_seconds();
        if elapsed <= 0 {
            return Err(ContractError::ArithmeticGuard(reason::ZERO_ELAPSED));
        }
        let growth = current.overflowing_sub(observation.cumulative).0;
        Ok(Some(growth / U256::from(elapsed as u64)))
    }

    fn get_value(&self, asset: &Address, amount: Amount, now: DateTime<Utc>) -> ContractResult<Amount> {
        if self.is_par(asset) {
            return Ok(amount);
        }
        match self.average_rate(asset, now)? {
            Some(rate) => mul_q112(amount, rate).ok_or(ContractError::ArithmeticGuard(reason::VALUE_OVERFLOW)),
            None => Ok(0),
        }
    }

    fn value_to_asset(&self, asset: &Address, value: Amount, now: DateTime<Utc>) -> ContractResult<Amount> {
        if self.is_par(asset) {
            return Ok(value);
        }
        match self.average_rate(asset, now)? {
            Some(rate) if !rate.is_zero() => {
                div_q112(value, rate).ok_or(ContractError::ArithmeticGuard(reason::VALUE_OVERFLOW))
            }
            _ => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use lockvault_protocol::fixed_point::{encode, fraction};
    use lockvault_protocol::Ledger;

    const WEI: u128 = 1_000_000_000_000_000_000;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn fixed_rate_values_and_inverts() {
        let admin = Address::named("admin");
        let weth = Address::named("weth");
        let mut oracle = FixedRateOracle::new(admin.clone());
        oracle.set_value(&admin, &weth, encode(7)).unwrap();

        assert_eq!(oracle.get_value(&weth, 5 * WEI).unwrap(), 35 * WEI);
        assert_eq!(oracle.value_to_asset(&weth, 35 * WEI).unwrap(), 5 * WEI);
    }

    #[test]
    fn fixed_rate_unknown_asset_is_zero() {
        let oracle = FixedRateOracle::new(Address::named("admin"));
        let ghost = Address::named("ghost");
        assert_eq!(oracle.get_value(&ghost, 123 * WEI).unwrap(), 0);
        assert_eq!(oracle.value_to_asset(&ghost, 123 * WEI).unwrap(), 0);
    }

    #[test]
    fn fixed_rate_zero_rate_unprices() {
        let admin = Address::named("admin");
        let weth = Address::named("weth");
        let mut oracle = FixedRateOracle::new(admin.clone());
        oracle.set_value(&admin, &weth, U256::zero()).unwrap();
        assert_eq!(oracle.value_to_asset(&weth, WEI).unwrap(), 0);
    }

    #[test]
    fn set_value_is_admin_only() {
        let mut oracle = FixedRateOracle::new(Address::named("admin"));
        let err = oracle
            .set_value(&Address::named("mallory"), &Address::named("weth"), encode(1))
            .unwrap_err();
        assert!(matches!(err, ContractError::AdminOnly { .. }));
    }

    #[test]
    fn overflowing_value_is_guarded() {
        let admin = Address::named("admin");
        let weth = Address::named("weth");
        let mut oracle = FixedRateOracle::new(admin.clone());
        oracle.set_value(&admin, &weth, encode(2)).unwrap();
        assert_eq!(
            oracle.get_value(&weth, u128::MAX).unwrap_err(),
            ContractError::ArithmeticGuard(reason::VALUE_OVERFLOW)
        );
    }

    fn pool(ledger: &mut Ledger) -> (PairFactory, Address, Address) {
        let usdt = Address::named("usdt");
        let weth = Address::named("weth");
        let mut factory = PairFactory::new();
        let pair = factory.create_pair(ledger, &usdt, &weth).unwrap();
        {
            let mut guard = pair.write();
            let (r_usdt, r_weth) = (2_000 * WEI, WEI);
            if guard.tokens().0 == &usdt {
                guard.sync(r_usdt, r_weth, ledger.now());
            } else {
                guard.sync(r_weth, r_usdt, ledger.now());
            }
        }
        (factory, usdt, weth)
    }

    #[test]
    fn pool_twap_prices_paired_asset() {
        let mut ledger = Ledger::new(t0());
        let (factory, usdt, weth) = pool(&mut ledger);
        ledger.advance(Duration::seconds(5)).unwrap();
        let oracle = PoolTwapOracle::new(&factory, usdt.clone(), ledger.now());
        ledger.advance(Duration::seconds(5)).unwrap();

        let now = ledger.now();
        assert_eq!(oracle.get_value(&weth, 100 * WEI, now).unwrap(), 200_000 * WEI);
        assert_eq!(oracle.value_to_asset(&weth, 100 * WEI, now).unwrap(), WEI / 20);
        assert_eq!(oracle.average_rate(&weth, now).unwrap(), fraction(2_000, 1));
    }

    #[test]
    fn pool_twap_reference_asset_is_unpriced() {
        let mut ledger = Ledger::new(t0());
        let (factory, usdt, _) = pool(&mut ledger);
        let oracle = PoolTwapOracle::new(&factory, usdt.clone(), ledger.now());
        ledger.advance(Duration::seconds(5)).unwrap();
        assert_eq!(oracle.get_value(&usdt, 123 * WEI, ledger.now()).unwrap(), 0);
        assert!(!oracle.prices(&usdt));
    }

    #[test]
    fn pool_twap_reference_asset_at_par() {
        let mut ledger = Ledger::new(t0());
        let (factory, usdt, weth) = pool(&mut ledger);
        let oracle = PoolTwapOracle::new(&factory, usdt.clone(), ledger.now()).with_reference_at_par();
        ledger.advance(Duration::seconds(5)).unwrap();
        let now = ledger.now();
        assert!(oracle.prices(&usdt));
        assert_eq!(oracle.get_value(&usdt, 123 * WEI, now).unwrap(), 123 * WEI);
        assert_eq!(oracle.value_to_asset(&usdt, 7 * WEI, now).unwrap(), 7 * WEI);
        // Other assets still go through their pair.
        assert_eq!(oracle.get_value(&weth, WEI, now).unwrap(), 2_000 * WEI);
        assert_eq!(oracle.get_value(&Address::named("dai"), WEI, now).unwrap(), 0);
    }

    #[test]
    fn pool_twap_zero_elapsed_is_guarded() {
        let mut ledger = Ledger::new(t0());
        let (factory, usdt, weth) = pool(&mut ledger);
        let oracle = PoolTwapOracle::new(&factory, usdt, ledger.now());
        let err = oracle.get_value(&weth, WEI, ledger.now()).unwrap_err();
        assert_eq!(err, ContractError::ArithmeticGuard(reason::ZERO_ELAPSED));
        assert_eq!(err.reason(), "zero elapsed time");
    }

    #[test]
    fn variant_dispatch() {
        let admin = Address::named("admin");
        let weth = Address::named("weth");
        let mut oracle: ValueOracle = FixedRateOracle::new(admin.clone()).into();
        oracle
            .as_fixed_rate_mut()
            .unwrap()
            .set_value(&admin, &weth, encode(7))
            .unwrap();
        assert_eq!(oracle.get_value(&weth, WEI, t0()).unwrap(), 7 * WEI);
    }
}
