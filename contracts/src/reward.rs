//! # Reward Ledger
//!
//! The global reward budget a vault registry hands out to locked vaults.
//!
//! ```text
//! available = total - reserved,   0 <= reserved <= total
//! ```
//!
//! A lock reserves its reward; an early unlock releases it. A withdrawal
//! pays reward out of the registry's balance but does not release the
//! reservation, so paid rewards stay counted against the budget.
//!
//! `max_locked_value` caps how much of a vault's value earns reward. It
//! follows `total / 100` until the administrator overrides it, and an
//! override sticks across later changes of the total until it is reset.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use lockvault_protocol::asset::amount_string;
use lockvault_protocol::config::MAX_LOCKED_VALUE_DIVISOR;
use lockvault_protocol::{Address, Amount};

use crate::error::{reason, ContractError, ContractResult};

/// Reward budget bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardLedger {
    asset: Option<Address>,
    #[serde(with = "amount_string")]
    total: Amount,
    #[serde(with = "amount_string")]
    reserved: Amount,
    #[serde(with = "amount_string")]
    max_locked_value: Amount,
    max_locked_value_overridden: bool,
}

impl RewardLedger {
    /// The asset rewards are paid in, once set.
    pub fn asset(&self) -> Option<&Address> {
        self.asset.as_ref()
    }

    /// Total reward budget, in reference value.
    pub fn total(&self) -> Amount {
        self.total
    }

    /// Budget currently reserved by locks.
    pub fn reserved(&self) -> Amount {
        self.reserved
    }

    /// Budget still available to new locks.
    pub fn available(&self) -> Amount {
        self.total - self.reserved
    }

    /// Per-lock value cap.
    pub fn max_locked_value(&self) -> Amount {
        self.max_locked_value
    }

    /// Whether the cap was set explicitly.
    pub fn is_max_locked_value_overridden(&self) -> bool {
        self.max_locked_value_overridden
    }

    pub(crate) fn set_asset(&mut self, asset: Address) {
        self.asset = Some(asset);
    }

    /// Replaces the total. Fails with `Budget("Negative reward")` if the new
    /// total would not cover what is already reserved.
    pub(crate) fn set_total(&mut self, total: Amount) -> ContractResult<()> {
        if total < self.reserved {
            warn!(total, reserved = self.reserved, "reward total below reservations");
            return Err(ContractError::Budget(reason::NEGATIVE_REWARD));
        }
        self.total = total;
        if !self.max_locked_value_overridden {
            self.max_locked_value = total / MAX_LOCKED_VALUE_DIVISOR;
        }
        Ok(())
    }

    pub(crate) fn override_max_locked_value(&mut self, value: Amount) {
        self.max_locked_value = value;
        self.max_locked_value_overridden = true;
    }

    /// Drops the override and returns the cap to `total / 100`.
    pub(crate) fn reset_max_locked_value(&mut self) {
        self.max_locked_value = self.total / MAX_LOCKED_VALUE_DIVISOR;
        self.max_locked_value_overridden = false;
    }

    pub(crate) fn reserve(&mut self, amount: Amount) -> ContractResult<()> {
        if amount > self.available() {
            warn!(amount, available = self.available(), "reward reservation rejected");
            return Err(ContractError::Budget(reason::INSUFFICIENT_REWARD));
        }
        self.reserved += amount;
        debug!(amount, reserved = self.reserved, "reward reserved");
        Ok(())
    }

    /// Releases up to `amount`; never drives `reserved` below zero.
    pub(crate) fn release(&mut self, amount: Amount) {
        self.reserved = self.reserved.saturating_sub(amount);
        debug!(amount, reserved = self.reserved, "reward released");
    }
}
