//! # Asset Registry
//!
//! The catalog of assets a vault's value is aggregated over, plus value
//! query dispatch to the configured [`ValueOracle`].
//!
//! The registry is built with a stable asset and the wrapped form of the
//! native base asset. The wrapped base asset is registered first (index 0,
//! not stable) and the stable asset second. Display metadata is read from
//! the asset account itself when an asset is added.
//!
//! Valuation is delegated to the oracle as is. An asset the oracle cannot
//! price values at zero, stable or not.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use lockvault_protocol::{Address, Amount, Ledger, LedgerError};

use crate::error::{reason, ContractError, ContractResult};
use crate::oracle::ValueOracle;
use crate::ownership::Ownable;

/// An asset registry shared between its administrator and the vault registry.
pub type SharedAssets = Arc<RwLock<AssetRegistry>>;

/// A catalogued asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    /// The asset account's address.
    pub address: Address,
    /// Display name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Decimal scale of the smallest unit.
    pub decimals: u8,
    /// Whether the asset is pegged to the reference unit.
    pub is_stable: bool,
}

/// Registered assets and the oracle that prices them.
#[derive(Debug)]
pub struct AssetRegistry {
    admin: Ownable,
    oracle: ValueOracle,
    stable: Address,
    wrapped_base: Address,
    entries: Vec<AssetEntry>,
}

impl AssetRegistry {
    /// Builds a registry holding `wrapped_base` and `stable`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnknownAsset`] if either asset is not deployed.
    pub fn new(
        admin: Address,
        oracle: impl Into<ValueOracle>,
        stable: Address,
        wrapped_base: Address,
        ledger: &Ledger,
    ) -> ContractResult<Self> {
        let mut registry = Self {
            admin: Ownable::new(admin),
            oracle: oracle.into(),
            stable: stable.clone(),
            wrapped_base: wrapped_base.clone(),
            entries: Vec::new(),
        };
        registry.insert(ledger, wrapped_base, false)?;
        registry.insert(ledger, stable, true)?;
        info!(
            stable = %registry.stable,
            wrapped_base = %registry.wrapped_base,
            "asset registry created"
        );
        Ok(registry)
    }

    /// Wraps the registry for sharing with a vault registry.
    pub fn into_shared(self) -> SharedAssets {
        Arc::new(RwLock::new(self))
    }

    // -- administration -------------------------------------------------------

    /// Registers `asset`. Admin only.
    ///
    /// # Errors
    ///
    /// `Precondition("!duplicate")` if the asset is already registered.
    pub fn add_token(
        &mut self,
        caller: &Address,
        ledger: &Ledger,
        asset: &Address,
        is_stable: bool,
    ) -> ContractResult<()> {
        self.admin.require_owner(caller)?;
        self.insert(ledger, asset.clone(), is_stable)
    }

    /// Deregisters `asset` by swapping the last entry into its slot. Admin
    /// only. Removing an asset that is not registered does nothing.
    pub fn remove_token(&mut self, caller: &Address, asset: &Address) -> ContractResult<()> {
        self.admin.require_owner(caller)?;
        if let Some(index) = self.position(asset) {
            let removed = self.entries.swap_remove(index);
            info!(asset = %asset, symbol = %removed.symbol, "asset removed");
        } else {
            debug!(asset = %asset, "remove of unregistered asset ignored");
        }
        Ok(())
    }

    /// The oracle, for strategy-specific administration such as setting
    /// fixed rates.
    pub fn oracle_mut(&mut self) -> &mut ValueOracle {
        &mut self.oracle
    }

    /// The configured oracle.
    pub fn oracle(&self) -> &ValueOracle {
        &self.oracle
    }

    /// The administrator capability.
    pub fn admin(&self) -> &Ownable {
        &self.admin
    }

    /// Hands the admin role to `new_owner`.
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> ContractResult<()> {
        self.admin.transfer_ownership(caller, new_owner)
    }

    fn insert(&mut self, ledger: &Ledger, asset: Address, is_stable: bool) -> ContractResult<()> {
        if self.contains(&asset) {
            return Err(ContractError::Precondition(reason::DUPLICATE_ASSET));
        }
        let meta = ledger
            .asset_metadata(&asset)
            .ok_or_else(|| LedgerError::UnknownAsset(asset.clone()))?;
        info!(asset = %asset, symbol = %meta.symbol, is_stable, "asset registered");
        self.entries.push(AssetEntry {
            address: asset,
            name: meta.name,
            symbol: meta.symbol,
            decimals: meta.decimals,
            is_stable,
        });
        Ok(())
    }

    fn position(&self, asset: &Address) -> Option<usize> {
        self.entries.iter().position(|e| &e.address == asset)
    }

    // -- valuation ------------------------------------------------------------

    /// Value of `amount` of `asset` in the reference unit.
    pub fn token_value(&self, asset: &Address, amount: Amount, now: DateTime<Utc>) -> ContractResult<Amount> {
        self.oracle.get_value(asset, amount, now)
    }

    /// Amount of `asset` worth `value` reference units.
    pub fn value_to_tokens(&self, asset: &Address, value: Amount, now: DateTime<Utc>) -> ContractResult<Amount> {
        self.oracle.value_to_asset(asset, value, now)
    }

    // -- catalog ----------------------------------------------------------------

    /// Number of registered assets.
    pub fn token_count(&self) -> usize {
        self.entries.len()
    }

    /// The entry at `index`.
    ///
    /// Indices are reassigned by [`remove_token`](Self::remove_token).
    pub fn token(&self, index: usize) -> ContractResult<&AssetEntry> {
        self.entries
            .get(index)
            .ok_or(ContractError::Precondition(reason::UNKNOWN_ASSET))
    }

    /// The address at `index`.
    pub fn token_address(&self, index: usize) -> ContractResult<&Address> {
        self.token(index).map(|e| &e.address)
    }

    /// All entries in index order.
    pub fn tokens(&self) -> &[AssetEntry] {
        &self.entries
    }

    /// Returns `true` if `asset` is registered.
    pub fn contains(&self, asset: &Address) -> bool {
        self.position(asset).is_some()
    }

    /// Returns `true` if `asset` is registered as stable.
    pub fn is_stable(&self, asset: &Address) -> bool {
        self.entries
            .iter()
            .any(|e| &e.address == asset && e.is_stable)
    }

    /// The stable asset the registry was built with.
    pub fn stable(&self) -> &Address {
        &self.stable
    }

    /// The wrapped base asset. Native balances are valued at its price.
    pub fn wrapped_base(&self) -> &Address {
        &self.wrapped_base
    }
}
