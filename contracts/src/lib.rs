// Copyright (c) 2026 Lockvault Contributors. MIT License.
// See LICENSE for details.

//! # Lockvault Contracts
//!
//! Time-locked, multi-asset custody with a shared reward budget:
//!
//! - **Value Oracle** -- prices assets in a reference unit, either from
//!   administrator-set fixed rates or from pool time-weighted averages.
//! - **Asset Registry** -- the catalog of assets a vault's value is summed
//!   over, and value query dispatch to the oracle.
//! - **Vault Registry** -- creates vaults and administers the lock-tier
//!   menu, the reward ledger, the active window and the vault indices.
//! - **Vault** -- a custody unit with a share ledger and a
//!   lock / transfer / withdraw state machine.
//!
//! ## Design Principles
//!
//! 1. Money never touches floating point. Amounts are `u128` and prices
//!    are 2^112 fixed-point `U256`.
//! 2. State transitions are explicit: enum variants, not boolean flags.
//! 3. One administrator per component, checked on every privileged entry
//!    point.
//! 4. A failed call changes nothing. Checks run first, then state writes,
//!    then outbound asset transfers.
//! 5. An unpriced asset values at zero instead of failing the valuation.

pub mod asset_registry;
pub mod config;
pub mod error;
pub mod events;
pub mod oracle;
pub mod ownership;
pub mod reward;
pub mod vault;
pub mod vault_registry;

pub use asset_registry::{AssetEntry, AssetRegistry, SharedAssets};
pub use config::RegistryConfig;
pub use error::{ContractError, ContractResult};
pub use events::VaultEvent;
pub use oracle::{FixedRateOracle, PoolTwapOracle, ValueOracle};
pub use ownership::Ownable;
pub use reward::RewardLedger;
pub use vault::{Vault, VaultHandle, VaultState};
pub use vault_registry::{ActiveWindow, LockTier, VaultRegistry};
