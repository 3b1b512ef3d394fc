//! # Vault
//!
//! A per-creation custody unit. Anyone may deposit into a vault by sending
//! native funds or registered assets to its address; deposits never touch
//! the share ledger. The creator starts with every share.
//!
//! ## Lifecycle
//!
//! ```text
//!             lock(tier)                 withdraw (last holder)
//!   Unlocked ------------> Locked ------------------------------> Withdrawn
//!      ^                     |
//!      +----- unlock --------+
//! ```
//!
//! - `lock` freezes the vault's value and reserves reward from the
//!   registry. Sole holder only, inside the registry's active window. No
//!   reward is reserved while the registry has no reward asset.
//! - `unlock` releases the reservation and forfeits the reward. Sole holder
//!   only, at any time while locked.
//! - `transfer` moves shares, only while locked.
//! - `withdraw` pays the caller their fraction of every holding plus their
//!   fraction of the reward. Allowed once the lock has matured, or at any
//!   time after an early unlock (with no reward left to pay).
//!
//! Every operation finishes its checks before the first write, and every
//! state write happens before the first outbound asset transfer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use lockvault_protocol::config::{PERCENT_DENOMINATOR, SHARE_SUPPLY};
use lockvault_protocol::fixed_point::mul_div;
use lockvault_protocol::{Address, Amount, Ledger};

use crate::asset_registry::AssetRegistry;
use crate::error::{reason, ContractError, ContractResult};
use crate::events::VaultEvent;
use crate::vault_registry::RegistryState;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where a vault is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultState {
    /// Accepting deposits; may be locked.
    Unlocked,
    /// Value frozen until `locked_until`; shares are transferable.
    Locked,
    /// Every share has been withdrawn.
    Withdrawn,
}

impl fmt::Display for VaultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultState::Unlocked => write!(f, "Unlocked"),
            VaultState::Locked => write!(f, "Locked"),
            VaultState::Withdrawn => write!(f, "Withdrawn"),
        }
    }
}

/// A custody unit and its share ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vault {
    address: Address,
    shares: BTreeMap<Address, Amount>,
    total_shares: Amount,
    state: VaultState,
    created_at: DateTime<Utc>,
    locked_since: Option<DateTime<Utc>>,
    locked_until: Option<DateTime<Utc>>,
    locked_value: Amount,
    reward_value: Amount,
}

impl Vault {
    pub(crate) fn new(address: Address, owner: Address, now: DateTime<Utc>) -> Self {
        let mut shares = BTreeMap::new();
        shares.insert(owner, SHARE_SUPPLY);
        Self {
            address,
            shares,
            total_shares: SHARE_SUPPLY,
            state: VaultState::Unlocked,
            created_at: now,
            locked_since: None,
            locked_until: None,
            locked_value: 0,
            reward_value: 0,
        }
    }

    /// The vault's address. Deposits are sent here.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Shares held by `holder`.
    pub fn balance_of(&self, holder: &Address) -> Amount {
        self.shares.get(holder).copied().unwrap_or(0)
    }

    /// Shares outstanding.
    pub fn total_shares(&self) -> Amount {
        self.total_shares
    }

    /// Current holders and their shares.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, Amount)> {
        self.shares.iter().map(|(h, s)| (h, *s))
    }

    pub fn state(&self) -> VaultState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the current or last lock started.
    pub fn locked_since(&self) -> Option<DateTime<Utc>> {
        self.locked_since
    }

    /// When the current lock matures. After an early unlock, the unlock time.
    pub fn locked_until(&self) -> Option<DateTime<Utc>> {
        self.locked_until
    }

    /// Value frozen at lock time, less what has been withdrawn.
    pub fn locked_value(&self) -> Amount {
        self.locked_value
    }

    /// Reward still owed to the remaining holders, in reference value.
    pub fn reward_value(&self) -> Amount {
        self.reward_value
    }

    /// Aggregate value of the vault's holdings: its native balance at the
    /// wrapped base asset's price, plus every registered asset it holds.
    pub fn total_value(&self, ledger: &Ledger, assets: &AssetRegistry) -> ContractResult<Amount> {
        let now = ledger.now();
        let mut total: Amount = 0;

        let native = ledger.native_balance(&self.address);
        if native > 0 {
            total = assets.token_value(assets.wrapped_base(), native, now)?;
        }
        for entry in assets.tokens() {
            let balance = ledger.balance_of(&entry.address, &self.address);
            if balance == 0 {
                continue;
            }
            let value = assets.token_value(&entry.address, balance, now)?;
            total = total
                .checked_add(value)
                .ok_or(ContractError::ArithmeticGuard(reason::VALUE_OVERFLOW))?;
        }
        Ok(total)
    }

    fn require_sole_holder(&self, caller: &Address) -> ContractResult<()> {
        if self.total_shares == 0 || self.balance_of(caller) != self.total_shares {
            return Err(ContractError::Precondition(reason::NOT_SHARE_OWNER));
        }
        Ok(())
    }

    // -- operations -------------------------------------------------------------

    pub(crate) fn lock(
        &mut self,
        registry: &mut RegistryState,
        ledger: &mut Ledger,
        caller: &Address,
        tier_index: usize,
    ) -> ContractResult<()> {
        self.require_sole_holder(caller)?;
        if self.state != VaultState::Unlocked {
            return Err(ContractError::Precondition(reason::ALREADY_LOCKED));
        }
        let now = ledger.now();
        if !registry.is_active(now) {
            return Err(ContractError::Precondition(reason::NOT_ACTIVE));
        }
        let tier = registry.lock_tier(tier_index)?;
        let locked_until = tier
            .interval()
            .and_then(|interval| now.checked_add_signed(interval))
            .ok_or(ContractError::ArithmeticGuard(reason::TIME_OVERFLOW))?;

        let locked_value = {
            let assets = Arc::clone(registry.assets());
            let assets = assets.read();
            self.total_value(ledger, &assets)?
        };
        // Nothing can be paid out before a reward asset is set.
        let reward_value = if registry.reward().asset().is_some() {
            let capped = locked_value.min(registry.reward().max_locked_value());
            mul_div(capped, Amount::from(tier.reward_percent), PERCENT_DENOMINATOR)
                .ok_or(ContractError::ArithmeticGuard(reason::VALUE_OVERFLOW))?
        } else {
            0
        };
        registry.reward_mut().reserve(reward_value)?;

        self.state = VaultState::Locked;
        self.locked_since = Some(now);
        self.locked_until = Some(locked_until);
        self.locked_value = locked_value;
        self.reward_value = reward_value;

        info!(
            vault = %self.address,
            account = %caller,
            tier = %tier,
            locked_value,
            reward_value,
            "vault locked"
        );
        ledger.emit(
            &self.address,
            &VaultEvent::Locked {
                account: caller.clone(),
                interval: tier.interval_secs,
                locked_value,
                reward_value,
            },
        )?;
        Ok(())
    }

    pub(crate) fn unlock(
        &mut self,
        registry: &mut RegistryState,
        ledger: &mut Ledger,
        caller: &Address,
    ) -> ContractResult<()> {
        self.require_sole_holder(caller)?;
        if self.state != VaultState::Locked {
            return Err(ContractError::Precondition(reason::NOT_LOCKED));
        }

        registry.reward_mut().release(self.reward_value);
        let forfeited = self.reward_value;
        self.state = VaultState::Unlocked;
        self.locked_until = Some(ledger.now());
        self.locked_value = 0;
        self.reward_value = 0;

        info!(vault = %self.address, account = %caller, forfeited, "vault unlocked");
        ledger.emit(
            &self.address,
            &VaultEvent::Unlocked {
                account: caller.clone(),
            },
        )?;
        Ok(())
    }

    pub(crate) fn transfer(
        &mut self,
        registry: &mut RegistryState,
        ledger: &mut Ledger,
        caller: &Address,
        to: &Address,
        amount: Amount,
    ) -> ContractResult<()> {
        if self.state != VaultState::Locked {
            return Err(ContractError::Precondition(reason::NOT_LOCKED));
        }
        let from_balance = self.balance_of(caller);
        if amount > from_balance {
            return Err(ContractError::Precondition(reason::INSUFFICIENT_SHARES));
        }
        if amount == 0 || caller == to {
            return Ok(());
        }

        let to_balance = self.balance_of(to);
        if from_balance == amount {
            self.shares.remove(caller);
            registry.deregister_holder(caller, &self.address);
        } else {
            self.shares.insert(caller.clone(), from_balance - amount);
        }
        self.shares.insert(to.clone(), to_balance + amount);
        if to_balance == 0 {
            registry.register_holder(to, &self.address);
        }

        debug!(vault = %self.address, from = %caller, to = %to, amount, "shares transferred");
        ledger.emit(
            &self.address,
            &VaultEvent::SharesTransferred {
                from: caller.clone(),
                to: to.clone(),
                amount,
            },
        )?;
        Ok(())
    }

    pub(crate) fn withdraw(
        &mut self,
        registry: &mut RegistryState,
        ledger: &mut Ledger,
        caller: &Address,
    ) -> ContractResult<()> {
        let now = ledger.now();
        match (self.state, self.locked_until) {
            (VaultState::Locked, Some(until)) if now < until => {
                return Err(ContractError::Precondition(reason::STILL_LOCKED));
            }
            (VaultState::Locked, Some(_)) | (VaultState::Unlocked, Some(_)) => {}
            _ => return Err(ContractError::Precondition(reason::NOT_LOCKED)),
        }
        let shares = self.balance_of(caller);
        if shares == 0 {
            return Err(ContractError::Precondition(reason::NOT_SHARE_OWNER));
        }

        // Checks: work out every payout before touching state.
        let total_shares = self.total_shares;
        let part = |amount: Amount| {
            mul_div(amount, shares, total_shares).ok_or(ContractError::ArithmeticGuard(reason::VALUE_OVERFLOW))
        };
        let native_out = part(ledger.native_balance(&self.address))?;
        let reward_part = part(self.reward_value)?;
        let locked_part = part(self.locked_value)?;

        let assets = Arc::clone(registry.assets());
        let (asset_out, reward_out) = {
            let assets = assets.read();
            let mut asset_out = Vec::new();
            for entry in assets.tokens() {
                let out = part(ledger.balance_of(&entry.address, &self.address))?;
                if out > 0 {
                    asset_out.push((entry.address.clone(), out));
                }
            }
            let reward_out = match registry.reward().asset() {
                Some(asset) if reward_part > 0 => {
                    Some((asset.clone(), assets.value_to_tokens(asset, reward_part, now)?))
                }
                _ => None,
            };
            (asset_out, reward_out)
        };
        if let Some((asset, amount)) = &reward_out {
            let funder = registry.address();
            if ledger.balance_of(asset, funder) < *amount
                || ledger.allowance(asset, funder, &self.address) < *amount
            {
                return Err(ContractError::Budget(reason::REWARD_UNFUNDED));
            }
        }

        // Effects.
        self.shares.remove(caller);
        self.total_shares -= shares;
        self.reward_value -= reward_part;
        self.locked_value -= locked_part;
        if self.total_shares == 0 {
            self.state = VaultState::Withdrawn;
        }
        registry.deregister_holder(caller, &self.address);

        // Interactions.
        if native_out > 0 {
            ledger.send_native(&self.address, caller, native_out)?;
        }
        for (asset, amount) in &asset_out {
            ledger.transfer(asset, &self.address, caller, *amount)?;
        }
        if let Some((asset, amount)) = &reward_out {
            if *amount > 0 {
                ledger.transfer_from(asset, &self.address, registry.address(), caller, *amount)?;
            }
        }

        info!(
            vault = %self.address,
            account = %caller,
            shares,
            reward = reward_out.as_ref().map_or(0, |(_, amount)| *amount),
            state = %self.state,
            "vault withdrawn"
        );
        ledger.emit(
            &self.address,
            &VaultEvent::Withdrawn {
                account: caller.clone(),
                share_fraction: shares,
            },
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// VaultHandle
// ---------------------------------------------------------------------------

/// One vault borrowed together with its registry's shared state.
///
/// Obtained from [`VaultRegistry::vault_mut`](crate::VaultRegistry::vault_mut).
pub struct VaultHandle<'a> {
    vault: &'a mut Vault,
    registry: &'a mut RegistryState,
}

impl<'a> VaultHandle<'a> {
    pub(crate) fn new(vault: &'a mut Vault, registry: &'a mut RegistryState) -> Self {
        Self { vault, registry }
    }

    /// Read access to the vault.
    pub fn vault(&self) -> &Vault {
        self.vault
    }

    /// Aggregate value of the vault's holdings.
    pub fn total_value(&self, ledger: &Ledger) -> ContractResult<Amount> {
        let assets = self.registry.assets().read();
        self.vault.total_value(ledger, &assets)
    }

    /// Freezes the vault's value for tier `tier_index` and reserves its
    /// reward.
    ///
    /// # Errors
    ///
    /// - `Precondition("!share owner")` unless `caller` holds every share.
    /// - `Precondition("!neverlocked")` if the vault is not unlocked.
    /// - `Precondition("!active")` outside the registry's window.
    /// - `Precondition("!tier")` for an unknown tier.
    /// - `Budget` if the reward exceeds what is available.
    /// - `ArithmeticGuard("time overflow")` if the maturity is not
    ///   representable.
    pub fn lock(&mut self, ledger: &mut Ledger, caller: &Address, tier_index: usize) -> ContractResult<()> {
        self.vault.lock(self.registry, ledger, caller, tier_index)
    }

    /// Ends a lock early, forfeiting its reward.
    ///
    /// # Errors
    ///
    /// `Precondition("!share owner")` unless `caller` holds every share,
    /// `Precondition("!locked")` if the vault is not locked.
    pub fn unlock(&mut self, ledger: &mut Ledger, caller: &Address) -> ContractResult<()> {
        self.vault.unlock(self.registry, ledger, caller)
    }

    /// Moves `amount` shares from `caller` to `to`.
    ///
    /// # Errors
    ///
    /// `Precondition("!locked")` unless the vault is locked,
    /// `Precondition("!shares")` if `caller` holds fewer than `amount`.
    pub fn transfer(&mut self, ledger: &mut Ledger, caller: &Address, to: &Address, amount: Amount) -> ContractResult<()> {
        self.vault.transfer(self.registry, ledger, caller, to, amount)
    }

    /// Redeems all of `caller`'s shares for their fraction of the vault.
    ///
    /// # Errors
    ///
    /// - `Precondition("locked")` before the lock matures.
    /// - `Precondition("!locked")` if the vault was never locked.
    /// - `Precondition("!share owner")` if `caller` holds no shares.
    /// - `Budget("Reward unfunded")` if the registry cannot pay the reward.
    pub fn withdraw(&mut self, ledger: &mut Ledger, caller: &Address) -> ContractResult<()> {
        self.vault.withdraw(self.registry, ledger, caller)
    }
}
