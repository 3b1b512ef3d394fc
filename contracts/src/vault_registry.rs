//! # Vault Registry
//!
//! Manufactures vaults and administers everything they share:
//!
//! - the **lock-tier menu** of `(interval, reward percent)` pairs,
//! - the **reward ledger** (see [`crate::reward`]),
//! - the **active window** in which vaults may be created and locked,
//! - the **vault indices**, per holder and global.
//!
//! The registry owns its vaults. Vault operations go through a
//! [`VaultHandle`], which borrows one vault together with the registry
//! state it needs, so a vault can reserve reward or update the holder
//! index within the same call. Reservations change only through a vault's
//! `lock` and `unlock`; nothing outside the crate can move them.
//!
//! The registry's own address holds the reward asset. Every vault is
//! approved to pull reward payouts from it: at creation, and again for all
//! existing vaults whenever the reward asset changes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, info};

use lockvault_protocol::config::{MAX_LOCK_INTERVAL_SECS, MAX_REWARD_PERCENT};
use lockvault_protocol::{Address, Amount, Ledger, LedgerError};

use crate::asset_registry::SharedAssets;
use crate::config::RegistryConfig;
use crate::error::{reason, ContractError, ContractResult};
use crate::events::VaultEvent;
use crate::ownership::Ownable;
use crate::reward::RewardLedger;
use crate::vault::{Vault, VaultHandle};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A selectable lock duration and the reward it earns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockTier {
    /// Lock interval in seconds.
    pub interval_secs: u64,
    /// Reward as a percentage of the capped locked value, 0 to 100.
    pub reward_percent: u8,
}

impl LockTier {
    /// Builds a tier, rejecting percentages above 100 and intervals above
    /// [`MAX_LOCK_INTERVAL_SECS`].
    pub fn new(interval_secs: u64, reward_percent: u8) -> ContractResult<Self> {
        if reward_percent > MAX_REWARD_PERCENT {
            return Err(ContractError::Precondition(reason::INVALID_PERCENT));
        }
        if interval_secs > MAX_LOCK_INTERVAL_SECS {
            return Err(ContractError::Precondition(reason::INVALID_INTERVAL));
        }
        Ok(Self {
            interval_secs,
            reward_percent,
        })
    }

    /// The interval as a duration, `None` if it does not fit one.
    pub fn interval(&self) -> Option<Duration> {
        i64::try_from(self.interval_secs).ok().and_then(Duration::try_seconds)
    }
}

impl fmt::Display for LockTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s @ {}%", self.interval_secs, self.reward_percent)
    }
}

/// The half-open interval `[from, until)` in which vaults may be created
/// and locked. `until = None` leaves it open-ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWindow {
    /// First instant of the window.
    pub from: DateTime<Utc>,
    /// First instant after the window.
    pub until: Option<DateTime<Utc>>,
}

impl ActiveWindow {
    /// A window that opens at `from` and never closes.
    pub fn open_from(from: DateTime<Utc>) -> Self {
        Self { from, until: None }
    }

    /// Returns `true` if `now` lies in the window.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        now >= self.from && self.until.map_or(true, |until| now < until)
    }
}

// ---------------------------------------------------------------------------
// RegistryState
// ---------------------------------------------------------------------------

/// Registry state shared with vault operations.
#[derive(Debug)]
pub(crate) struct RegistryState {
    admin: Ownable,
    address: Address,
    assets: SharedAssets,
    locks: Vec<LockTier>,
    reward: RewardLedger,
    window: ActiveWindow,
    holders: HashMap<Address, Vec<Address>>,
    all_vaults: Vec<Address>,
    nonce: u64,
}

impl RegistryState {
    pub(crate) fn address(&self) -> &Address {
        &self.address
    }

    pub(crate) fn assets(&self) -> &SharedAssets {
        &self.assets
    }

    pub(crate) fn reward(&self) -> &RewardLedger {
        &self.reward
    }

    pub(crate) fn reward_mut(&mut self) -> &mut RewardLedger {
        &mut self.reward
    }

    pub(crate) fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.window.contains(now)
    }

    pub(crate) fn lock_tier(&self, index: usize) -> ContractResult<LockTier> {
        self.locks
            .get(index)
            .copied()
            .ok_or(ContractError::Precondition(reason::UNKNOWN_TIER))
    }

    /// Lists `vault` under `holder`, once.
    pub(crate) fn register_holder(&mut self, holder: &Address, vault: &Address) {
        let list = self.holders.entry(holder.clone()).or_default();
        if !list.contains(vault) {
            list.push(vault.clone());
            debug!(holder = %holder, vault = %vault, "holder registered");
        }
    }

    pub(crate) fn deregister_holder(&mut self, holder: &Address, vault: &Address) {
        if let Some(list) = self.holders.get_mut(holder) {
            if let Some(index) = list.iter().position(|v| v == vault) {
                list.remove(index);
                debug!(holder = %holder, vault = %vault, "holder deregistered");
            }
            if list.is_empty() {
                self.holders.remove(holder);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// VaultRegistry
// ---------------------------------------------------------------------------

/// Vault factory, lock-tier menu and reward ledger.
#[derive(Debug)]
pub struct VaultRegistry {
    state: RegistryState,
    vaults: BTreeMap<Address, Vault>,
}

impl VaultRegistry {
    /// Deploys a registry administered by `admin`, valuing vaults through
    /// `assets`, open for creation and locking during `window`.
    pub fn new(admin: Address, assets: SharedAssets, window: ActiveWindow, ledger: &mut Ledger) -> Self {
        let address = ledger.fresh_address("registry");
        info!(registry = %address, admin = %admin, from = %window.from, "vault registry deployed");
        Self {
            state: RegistryState {
                admin: Ownable::new(admin),
                address,
                assets,
                locks: Vec::new(),
                reward: RewardLedger::default(),
                window,
                holders: HashMap::new(),
                all_vaults: Vec::new(),
                nonce: 0,
            },
            vaults: BTreeMap::new(),
        }
    }

    /// Deploys a registry with the window and lock tiers of `config`.
    pub fn from_config(
        admin: Address,
        assets: SharedAssets,
        config: &RegistryConfig,
        ledger: &mut Ledger,
    ) -> ContractResult<Self> {
        let mut registry = Self::new(admin, assets, config.window(), ledger);
        for tier in &config.locks {
            registry.state.locks.push(LockTier::new(tier.interval_secs, tier.reward_percent)?);
        }
        Ok(registry)
    }

    /// The registry's own address; holds the reward asset.
    pub fn address(&self) -> &Address {
        &self.state.address
    }

    /// The administrator capability.
    pub fn admin(&self) -> &Ownable {
        &self.state.admin
    }

    /// Hands the admin role to `new_owner`.
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> ContractResult<()> {
        self.state.admin.transfer_ownership(caller, new_owner)
    }

    /// The asset registry vaults are valued through.
    pub fn assets(&self) -> &SharedAssets {
        &self.state.assets
    }

    /// The creation and lock window.
    pub fn window(&self) -> ActiveWindow {
        self.state.window
    }

    // -- vaults ---------------------------------------------------------------

    /// Creates a vault whose every share is held by `caller`.
    ///
    /// # Errors
    ///
    /// `Precondition("!active")` outside the active window.
    pub fn create_vault(&mut self, ledger: &mut Ledger, caller: &Address) -> ContractResult<Address> {
        let now = ledger.now();
        if !self.state.is_active(now) {
            return Err(ContractError::Precondition(reason::NOT_ACTIVE));
        }

        let nonce = self.state.nonce + 1;
        let address = Address::derive("vault", format!("{}/{}", self.state.address, nonce).as_bytes());
        if let Some(asset) = self.state.reward.asset() {
            ledger.approve(asset, &self.state.address, &address, Amount::MAX)?;
        }

        self.state.nonce = nonce;
        self.vaults
            .insert(address.clone(), Vault::new(address.clone(), caller.clone(), now));
        self.state.register_holder(caller, &address);
        self.state.all_vaults.push(address.clone());

        info!(vault = %address, owner = %caller, "vault created");
        ledger.emit(
            &self.state.address,
            &VaultEvent::VaultCreated {
                vault: address.clone(),
                owner: caller.clone(),
            },
        )?;
        Ok(address)
    }

    /// A vault created by this registry.
    pub fn vault_at(&self, address: &Address) -> Option<&Vault> {
        self.vaults.get(address)
    }

    /// Borrows a vault for a state-changing operation.
    pub fn vault_mut(&mut self, address: &Address) -> ContractResult<VaultHandle<'_>> {
        let vault = self
            .vaults
            .get_mut(address)
            .ok_or_else(|| ContractError::UnknownVault(address.clone()))?;
        Ok(VaultHandle::new(vault, &mut self.state))
    }

    /// Current aggregate value of a vault's holdings.
    pub fn total_value(&self, ledger: &Ledger, vault: &Address) -> ContractResult<Amount> {
        let vault = self
            .vaults
            .get(vault)
            .ok_or_else(|| ContractError::UnknownVault(vault.clone()))?;
        let assets = self.state.assets.read();
        vault.total_value(ledger, &assets)
    }

    /// Number of vaults `holder` holds shares in.
    pub fn vault_count(&self, holder: &Address) -> usize {
        self.state.holders.get(holder).map_or(0, Vec::len)
    }

    /// The `index`-th vault `holder` holds shares in.
    pub fn vault(&self, holder: &Address, index: usize) -> Option<&Address> {
        self.state.holders.get(holder).and_then(|list| list.get(index))
    }

    /// Number of vaults ever created.
    pub fn global_vault_count(&self) -> usize {
        self.state.all_vaults.len()
    }

    /// The `index`-th vault ever created.
    pub fn global_vault(&self, index: usize) -> Option<&Address> {
        self.state.all_vaults.get(index)
    }

    // -- lock tiers -------------------------------------------------------------

    /// Appends a lock tier. Admin only.
    pub fn add_lock(&mut self, caller: &Address, interval_secs: u64, reward_percent: u8) -> ContractResult<usize> {
        self.state.admin.require_owner(caller)?;
        let tier = LockTier::new(interval_secs, reward_percent)?;
        self.state.locks.push(tier);
        info!(index = self.state.locks.len() - 1, tier = %tier, "lock tier added");
        Ok(self.state.locks.len() - 1)
    }

    /// Replaces the tier at `index`. Admin only.
    pub fn update_lock(
        &mut self,
        caller: &Address,
        index: usize,
        interval_secs: u64,
        reward_percent: u8,
    ) -> ContractResult<()> {
        self.state.admin.require_owner(caller)?;
        let tier = LockTier::new(interval_secs, reward_percent)?;
        let slot = self
            .state
            .locks
            .get_mut(index)
            .ok_or(ContractError::Precondition(reason::UNKNOWN_TIER))?;
        *slot = tier;
        info!(index, tier = %tier, "lock tier updated");
        Ok(())
    }

    /// Removes the tier at `index`, moving the last tier into its slot.
    /// Admin only.
    pub fn delete_lock(&mut self, caller: &Address, index: usize) -> ContractResult<()> {
        self.state.admin.require_owner(caller)?;
        if index >= self.state.locks.len() {
            return Err(ContractError::Precondition(reason::UNKNOWN_TIER));
        }
        let removed = self.state.locks.swap_remove(index);
        info!(index, tier = %removed, "lock tier deleted");
        Ok(())
    }

    /// Number of lock tiers.
    pub fn lock_count(&self) -> usize {
        self.state.locks.len()
    }

    /// The tier at `index`.
    pub fn lock_info(&self, index: usize) -> ContractResult<LockTier> {
        self.state.lock_tier(index)
    }

    // -- reward ledger ------------------------------------------------------------

    /// Sets the asset rewards are paid in and approves every existing vault
    /// to draw it from the registry. Admin only.
    pub fn set_reward(&mut self, caller: &Address, ledger: &mut Ledger, asset: &Address) -> ContractResult<()> {
        self.state.admin.require_owner(caller)?;
        if !ledger.has_asset(asset) {
            return Err(LedgerError::UnknownAsset(asset.clone()).into());
        }
        for vault in &self.state.all_vaults {
            ledger.approve(asset, &self.state.address, vault, Amount::MAX)?;
        }
        self.state.reward.set_asset(asset.clone());
        info!(asset = %asset, vaults = self.state.all_vaults.len(), "reward asset set");
        Ok(())
    }

    /// Sets the total reward budget. Admin only.
    ///
    /// Unless the cap has been overridden, the per-lock value cap becomes
    /// `total / 100`.
    ///
    /// # Errors
    ///
    /// `Budget("Negative reward")` if `total` is below the reserved amount.
    pub fn set_reward_value(&mut self, caller: &Address, total: Amount) -> ContractResult<()> {
        self.state.admin.require_owner(caller)?;
        self.state.reward.set_total(total)?;
        info!(
            total,
            max_locked_value = self.state.reward.max_locked_value(),
            "reward total set"
        );
        Ok(())
    }

    /// Overrides the per-lock value cap. Admin only. The override persists
    /// across later [`set_reward_value`](Self::set_reward_value) calls.
    pub fn set_max_locked_value(&mut self, caller: &Address, value: Amount) -> ContractResult<()> {
        self.state.admin.require_owner(caller)?;
        self.state.reward.override_max_locked_value(value);
        info!(max_locked_value = value, "max locked value overridden");
        Ok(())
    }

    /// Drops a cap override, returning the cap to `total / 100`. Admin only.
    pub fn reset_max_locked_value(&mut self, caller: &Address) -> ContractResult<()> {
        self.state.admin.require_owner(caller)?;
        self.state.reward.reset_max_locked_value();
        info!(max_locked_value = self.state.reward.max_locked_value(), "max locked value reset");
        Ok(())
    }

    /// The reward ledger.
    pub fn reward(&self) -> &RewardLedger {
        self.state.reward()
    }

    /// The reward asset, once set.
    pub fn reward_asset(&self) -> Option<&Address> {
        self.state.reward.asset()
    }

    /// Total reward budget.
    pub fn reward_total(&self) -> Amount {
        self.state.reward.total()
    }

    /// Reward budget not yet reserved.
    pub fn reward_available(&self) -> Amount {
        self.state.reward.available()
    }

    /// Per-lock value cap.
    pub fn max_locked_value(&self) -> Amount {
        self.state.reward.max_locked_value()
    }
}
