//! # Host Ledger
//!
//! The contracts execute against a host ledger that provides four things:
//!
//! 1. **A block clock.** Monotonic, second-granular, advanced explicitly.
//!    Contracts read it through [`Ledger::now`]; nothing in the system reads
//!    wall-clock time.
//! 2. **Native balances.** The base asset every account can hold without a
//!    registered asset account (what a vault receives when someone sends
//!    it funds directly).
//! 3. **Asset accounts.** Deployed [`AssetAccount`] implementations, keyed
//!    by the address they were deployed at.
//! 4. **An event log.** Contracts emit serde-serialisable events which are
//!    stored as JSON payloads tagged with the emitter and block time.
//!
//! Every public contract operation takes `&mut Ledger` for its whole
//! duration, so operations are totally ordered and no partial state is
//! observable between them.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, trace};

use crate::address::Address;
use crate::asset::{Amount, AssetAccount, AssetError};
use crate::config::BLOCK_TIME;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by the host ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No asset account is deployed at this address.
    #[error("no asset deployed at {0}")]
    UnknownAsset(Address),

    /// The asset account rejected the operation.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),

    /// The sender's native balance does not cover the amount.
    #[error("insufficient native balance: {holder} has {available}, tried to send {requested}")]
    InsufficientNative {
        /// Account being debited.
        holder: Address,
        /// Its native balance.
        available: Amount,
        /// Amount requested.
        requested: Amount,
    },

    /// A native credit would overflow the recipient's balance.
    #[error("native balance overflow crediting {0}")]
    NativeOverflow(Address),

    /// The block clock only moves forward.
    #[error("clock cannot move backwards: now {now}, requested {requested}")]
    ClockRewind {
        /// Current block time.
        now: DateTime<Utc>,
        /// Rejected target time.
        requested: DateTime<Utc>,
    },

    /// An event payload could not be encoded.
    #[error("event encoding failed: {0}")]
    Encoding(String),
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A contract event as recorded by the ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// The contract that emitted the event.
    pub emitter: Address,
    /// Block time at emission.
    pub timestamp: DateTime<Utc>,
    /// The event body, as serialised by the emitting contract.
    pub payload: serde_json::Value,
}

/// Display metadata read from a deployed asset account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    /// Human-readable name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Decimal scale.
    pub decimals: u8,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The simulated host ledger.
#[derive(Debug)]
pub struct Ledger {
    now: DateTime<Utc>,
    nonce: u64,
    native: HashMap<Address, Amount>,
    assets: HashMap<Address, Box<dyn AssetAccount>>,
    events: Vec<LedgerEvent>,
}

impl Ledger {
    /// Creates an empty ledger whose clock starts at `genesis`.
    pub fn new(genesis: DateTime<Utc>) -> Self {
        Self {
            now: genesis,
            nonce: 0,
            native: HashMap::new(),
            assets: HashMap::new(),
            events: Vec::new(),
        }
    }

    // -- clock ---------------------------------------------------------------

    /// Current block time.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Moves the clock forward by `by`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ClockRewind`] for a negative duration.
    pub fn advance(&mut self, by: Duration) -> Result<DateTime<Utc>, LedgerError> {
        self.set_time(self.now + by)
    }

    /// Produces one block: advances the clock by the default block time.
    pub fn mine(&mut self) -> DateTime<Utc> {
        let step = Duration::from_std(BLOCK_TIME).unwrap_or_else(|_| Duration::seconds(1));
        self.now += step;
        self.now
    }

    /// Sets the clock to `t`, which must not precede the current time.
    pub fn set_time(&mut self, t: DateTime<Utc>) -> Result<DateTime<Utc>, LedgerError> {
        if t < self.now {
            return Err(LedgerError::ClockRewind {
                now: self.now,
                requested: t,
            });
        }
        trace!(from = %self.now, to = %t, "clock advanced");
        self.now = t;
        Ok(t)
    }

    /// Allocates a fresh, deterministic address in `domain`.
    pub fn fresh_address(&mut self, domain: &str) -> Address {
        self.nonce += 1;
        Address::derive(domain, &self.nonce.to_be_bytes())
    }

    // -- asset accounts -------------------------------------------------------

    /// Deploys an asset account and returns its address.
    pub fn deploy_asset<A>(&mut self, asset: A) -> Address
    where
        A: AssetAccount + 'static,
    {
        let address = self.fresh_address("asset");
        debug!(asset = %address, symbol = asset.symbol(), "asset deployed");
        self.assets.insert(address.clone(), Box::new(asset));
        address
    }

    /// Returns `true` if an asset account is deployed at `asset`.
    pub fn has_asset(&self, asset: &Address) -> bool {
        self.assets.contains_key(asset)
    }

    /// Name, symbol and decimals of a deployed asset.
    pub fn asset_metadata(&self, asset: &Address) -> Option<AssetMetadata> {
        self.assets.get(asset).map(|a| AssetMetadata {
            name: a.name().to_string(),
            symbol: a.symbol().to_string(),
            decimals: a.decimals(),
        })
    }

    /// Balance of `holder` in `asset`; zero when the asset is unknown.
    pub fn balance_of(&self, asset: &Address, holder: &Address) -> Amount {
        self.assets
            .get(asset)
            .map(|a| a.balance_of(holder))
            .unwrap_or(0)
    }

    /// Moves `amount` of `asset` from `from` to `to`.
    pub fn transfer(
        &mut self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let account = self.asset_mut(asset)?;
        account.transfer(from, to, amount)?;
        debug!(asset = %asset, from = %from, to = %to, amount, "asset transfer");
        Ok(())
    }

    /// Approves `spender` to move up to `amount` of `owner`'s `asset`.
    pub fn approve(
        &mut self,
        asset: &Address,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.asset_mut(asset)?.approve(owner, spender, amount);
        Ok(())
    }

    /// Remaining allowance; zero when the asset is unknown.
    pub fn allowance(&self, asset: &Address, owner: &Address, spender: &Address) -> Amount {
        self.assets
            .get(asset)
            .map(|a| a.allowance(owner, spender))
            .unwrap_or(0)
    }

    /// Moves `amount` of `asset` from `from` to `to` on behalf of `spender`.
    pub fn transfer_from(
        &mut self,
        asset: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.asset_mut(asset)?
            .transfer_from(spender, from, to, amount)?;
        debug!(asset = %asset, spender = %spender, from = %from, to = %to, amount, "delegated transfer");
        Ok(())
    }

    fn asset_mut(&mut self, asset: &Address) -> Result<&mut Box<dyn AssetAccount>, LedgerError> {
        self.assets
            .get_mut(asset)
            .ok_or_else(|| LedgerError::UnknownAsset(asset.clone()))
    }

    // -- native balances ------------------------------------------------------

    /// Native balance of `holder`.
    pub fn native_balance(&self, holder: &Address) -> Amount {
        self.native.get(holder).copied().unwrap_or(0)
    }

    /// Credits native funds out of thin air. Genesis allocation only.
    pub fn credit_native(&mut self, to: &Address, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.native_balance(to);
        let updated = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::NativeOverflow(to.clone()))?;
        self.native.insert(to.clone(), updated);
        Ok(())
    }

    /// Sends native funds from `from` to `to`.
    pub fn send_native(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let available = self.native_balance(from);
        if available < amount {
            return Err(LedgerError::InsufficientNative {
                holder: from.clone(),
                available,
                requested: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .native_balance(to)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::NativeOverflow(to.clone()))?;
        self.native.insert(from.clone(), available - amount);
        self.native.insert(to.clone(), credited);
        debug!(from = %from, to = %to, amount, "native transfer");
        Ok(())
    }

    // -- events ---------------------------------------------------------------

    /// Records an event emitted by `emitter`.
    pub fn emit<E: Serialize>(&mut self, emitter: &Address, event: &E) -> Result<(), LedgerError> {
        let payload =
            serde_json::to_value(event).map_err(|e| LedgerError::Encoding(e.to_string()))?;
        self.events.push(LedgerEvent {
            emitter: emitter.clone(),
            timestamp: self.now,
            payload,
        });
        Ok(())
    }

    /// All events, in emission order.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Events from `emitter` that decode as `E`, in emission order.
    pub fn decode_events<E: DeserializeOwned>(&self, emitter: &Address) -> Vec<E> {
        self.events
            .iter()
            .filter(|e| &e.emitter == emitter)
            .filter_map(|e| serde_json::from_value(e.payload.clone()).ok())
            .collect()
    }
}
