//! Typed events emitted to the host ledger's event log.

use serde::{Deserialize, Serialize};

use lockvault_protocol::asset::amount_string;
use lockvault_protocol::{Address, Amount};

/// Events emitted by the vault registry and its vaults.
///
/// Serialised with an `event` tag, e.g.
/// `{"event":"Unlocked","account":"0x..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum VaultEvent {
    /// A registry created a vault.
    VaultCreated {
        /// Address of the new vault.
        vault: Address,
        /// The creator, holding every share.
        owner: Address,
    },
    /// A vault's value was frozen for a lock interval.
    Locked {
        /// The sole holder who locked.
        account: Address,
        /// Lock interval in seconds.
        interval: u64,
        /// Aggregate value at lock time.
        #[serde(with = "amount_string")]
        locked_value: Amount,
        /// Reward reserved for the vault.
        #[serde(with = "amount_string")]
        reward_value: Amount,
    },
    /// A lock was released early and its reward forfeited.
    Unlocked {
        /// The sole holder who unlocked.
        account: Address,
    },
    /// Shares moved between holders of a locked vault.
    SharesTransferred {
        /// Sender.
        from: Address,
        /// Recipient.
        to: Address,
        /// Shares moved.
        #[serde(with = "amount_string")]
        amount: Amount,
    },
    /// A holder withdrew their proportional part of the vault.
    Withdrawn {
        /// The withdrawing holder.
        account: Address,
        /// Shares redeemed, out of the vault's initial share supply.
        #[serde(with = "amount_string")]
        share_fraction: Amount,
    },
}
