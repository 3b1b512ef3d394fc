//! # Asset Accounts
//!
//! A registered asset is an opaque, capability-bearing account on the host
//! ledger. The contracts never look inside one -- they only ask it for
//! balances, move amounts through it, and read its display metadata. The
//! [`AssetAccount`] trait is that capability surface.
//!
//! [`StandardAsset`] is the plain fungible implementation used by fixtures
//! and tests: balances, allowances, and an initial supply minted to one
//! holder at construction. There is no mint entry point after that -- the
//! contracts do not issue assets.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::address::Address;

/// An amount in an asset's smallest denomination.
pub type Amount = u128;

/// Serde adapter writing an [`Amount`] as a decimal string.
///
/// 18-decimal amounts routinely exceed `u64::MAX`, which `serde_json::Value`
/// cannot hold as a number. Use with `#[serde(with = "amount_string")]`.
pub mod amount_string {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    use super::Amount;

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(amount)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors an asset account can return from a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    /// The sender does not hold enough of the asset.
    #[error("insufficient balance: {holder} has {available}, tried to move {requested}")]
    InsufficientBalance {
        /// Account being debited.
        holder: Address,
        /// Its current balance.
        available: Amount,
        /// Amount the caller tried to move.
        requested: Amount,
    },

    /// The spender has not been approved for enough of the owner's balance.
    #[error("insufficient allowance: {spender} may move {allowed}, tried {requested}")]
    InsufficientAllowance {
        /// Account spending on the owner's behalf.
        spender: Address,
        /// Remaining approved amount.
        allowed: Amount,
        /// Amount the spender tried to move.
        requested: Amount,
    },

    /// A credit would overflow the recipient's balance.
    #[error("balance overflow crediting {amount} to {holder}")]
    Overflow {
        /// Account being credited.
        holder: Address,
        /// Amount that caused the overflow.
        amount: Amount,
    },
}

// ---------------------------------------------------------------------------
// Capability surface
// ---------------------------------------------------------------------------

/// The operations a registered asset exposes to the contracts.
pub trait AssetAccount: fmt::Debug + Send + Sync {
    /// Human-readable name, e.g. "Wrapped Ethereum".
    fn name(&self) -> &str;

    /// Ticker symbol, e.g. "WETH".
    fn symbol(&self) -> &str;

    /// Decimal scale of the smallest denomination.
    fn decimals(&self) -> u8;

    /// Balance held by `holder`.
    fn balance_of(&self, holder: &Address) -> Amount;

    /// Moves `amount` from `from` to `to`.
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount)
        -> Result<(), AssetError>;

    /// Sets the amount `spender` may move out of `owner`'s balance.
    fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount);

    /// Remaining amount `spender` may move out of `owner`'s balance.
    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    /// Moves `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance. An allowance of `Amount::MAX` is treated as unlimited.
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), AssetError>;
}

// ---------------------------------------------------------------------------
// StandardAsset
// ---------------------------------------------------------------------------

/// A plain fungible asset with balances and allowances.
#[derive(Clone, Debug)]
pub struct StandardAsset {
    name: String,
    symbol: String,
    decimals: u8,
    total_supply: Amount,
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
}

impl StandardAsset {
    /// Creates an asset whose entire `supply` is held by `holder`.
    pub fn with_supply(
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
        holder: &Address,
        supply: Amount,
    ) -> Self {
        let mut balances = HashMap::new();
        if supply > 0 {
            balances.insert(holder.clone(), supply);
        }
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
            total_supply: supply,
            balances,
            allowances: HashMap::new(),
        }
    }

    /// Total supply minted at construction.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn debit(&mut self, holder: &Address, amount: Amount) -> Result<(), AssetError> {
        let available = self.balance_of(holder);
        if available < amount {
            return Err(AssetError::InsufficientBalance {
                holder: holder.clone(),
                available,
                requested: amount,
            });
        }
        self.balances.insert(holder.clone(), available - amount);
        Ok(())
    }

    fn check_credit(&self, holder: &Address, amount: Amount) -> Result<(), AssetError> {
        self.balance_of(holder)
            .checked_add(amount)
            .map(|_| ())
            .ok_or(AssetError::Overflow {
                holder: holder.clone(),
                amount,
            })
    }

    fn credit(&mut self, holder: &Address, amount: Amount) {
        *self.balances.entry(holder.clone()).or_insert(0) += amount;
    }
}

impl AssetAccount for StandardAsset {
    fn name(&self) -> &str {
        &self.name
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn balance_of(&self, holder: &Address) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), AssetError> {
        if from == to {
            // Self-transfer only has to prove the balance exists.
            let available = self.balance_of(from);
            if available < amount {
                return Err(AssetError::InsufficientBalance {
                    holder: from.clone(),
                    available,
                    requested: amount,
                });
            }
            return Ok(());
        }
        self.check_credit(to, amount)?;
        self.debit(from, amount)?;
        self.credit(to, amount);
        Ok(())
    }

    fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) {
        self.allowances
            .insert((owner.clone(), spender.clone()), amount);
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), AssetError> {
        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(AssetError::InsufficientAllowance {
                spender: spender.clone(),
                allowed,
                requested: amount,
            });
        }
        self.transfer(from, to, amount)?;
        if allowed != Amount::MAX {
            self.allowances
                .insert((from.clone(), spender.clone()), allowed - amount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usdt(holder: &Address) -> StandardAsset {
        StandardAsset::with_supply("Tether USD", "USDT", 18, holder, 1_000)
    }

    #[test]
    fn supply_starts_with_holder() {
        let alice = Address::named("alice");
        let asset = usdt(&alice);
        assert_eq!(asset.balance_of(&alice), 1_000);
        assert_eq!(asset.total_supply(), 1_000);
        assert_eq!(asset.symbol(), "USDT");
    }

    #[test]
    fn transfer_moves_balance() {
        let alice = Address::named("alice");
        let bob = Address::named("bob");
        let mut asset = usdt(&alice);
        asset.transfer(&alice, &bob, 400).unwrap();
        assert_eq!(asset.balance_of(&alice), 600);
        assert_eq!(asset.balance_of(&bob), 400);
    }

    #[test]
    fn overdraft_rejected_without_side_effects() {
        let alice = Address::named("alice");
        let bob = Address::named("bob");
        let mut asset = usdt(&alice);
        let err = asset.transfer(&alice, &bob, 1_001).unwrap_err();
        assert!(matches!(err, AssetError::InsufficientBalance { available: 1_000, .. }));
        assert_eq!(asset.balance_of(&alice), 1_000);
        assert_eq!(asset.balance_of(&bob), 0);
    }

    #[test]
    fn self_transfer_keeps_balance() {
        let alice = Address::named("alice");
        let mut asset = usdt(&alice);
        asset.transfer(&alice, &alice, 500).unwrap();
        assert_eq!(asset.balance_of(&alice), 1_000);
    }

    #[test]
    fn transfer_from_consumes_allowance() {
        let alice = Address::named("alice");
        let bob = Address::named("bob");
        let spender = Address::named("spender");
        let mut asset = usdt(&alice);
        asset.approve(&alice, &spender, 300);
        asset.transfer_from(&spender, &alice, &bob, 200).unwrap();
        assert_eq!(asset.allowance(&alice, &spender), 100);
        assert_eq!(asset.balance_of(&bob), 200);

        let err = asset.transfer_from(&spender, &alice, &bob, 101).unwrap_err();
        assert!(matches!(err, AssetError::InsufficientAllowance { allowed: 100, .. }));
    }

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Payout {
        #[serde(with = "amount_string")]
        amount: Amount,
    }

    #[test]
    fn large_amounts_serialise_as_strings() {
        let payout = Payout {
            amount: 62_000_000_000_000_000_000,
        };
        let json = serde_json::to_value(&payout).unwrap();
        assert_eq!(json["amount"], "62000000000000000000");
        assert_eq!(serde_json::from_value::<Payout>(json).unwrap(), payout);
    }

    #[test]
    fn unlimited_allowance_is_not_consumed() {
        let alice = Address::named("alice");
        let bob = Address::named("bob");
        let spender = Address::named("spender");
        let mut asset = usdt(&alice);
        asset.approve(&alice, &spender, Amount::MAX);
        asset.transfer_from(&spender, &alice, &bob, 10).unwrap();
        assert_eq!(asset.allowance(&alice, &spender), Amount::MAX);
    }
}
