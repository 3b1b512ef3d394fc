// Copyright (c) 2026 Lockvault Contributors. MIT License.
// See LICENSE for details.

//! # Lockvault Protocol -- Host Ledger Substrate
//!
//! The lockvault contracts (vaults, registries, value oracles) run on top
//! of a host ledger. This crate is that ledger, reduced to what the
//! contracts actually touch:
//!
//! - **address** -- Deterministic BLAKE3-derived account identifiers.
//! - **fixed_point** -- 2^112 fixed-point rates over 256/512-bit integers.
//! - **asset** -- The capability surface of a registered asset account.
//! - **ledger** -- Block clock, native balances, asset accounts, event log.
//! - **amm** -- Constant-product pairs and their cumulative price
//!   accumulators, read by the pool-derived oracle.
//! - **config** -- Protocol constants.
//! - **logging** -- `tracing` subscriber setup.
//!
//! ## Design Philosophy
//!
//! 1. No floating point. Every amount is a `u128` in smallest units and
//!    every price is a `U256` over `2^112`.
//! 2. The ledger is the only source of time. Contracts never read the wall
//!    clock.
//! 3. External accounts are opaque. The contracts see the [`AssetAccount`]
//!    trait, not an implementation.

pub mod address;
pub mod amm;
pub mod asset;
pub mod config;
pub mod fixed_point;
pub mod ledger;
pub mod logging;

pub use address::Address;
pub use amm::{AmmError, AmmPair, CumulativePrices, PairFactory, SharedPair};
pub use asset::{Amount, AssetAccount, AssetError, StandardAsset};
pub use fixed_point::{U256, U512};
pub use ledger::{AssetMetadata, Ledger, LedgerError, LedgerEvent};
