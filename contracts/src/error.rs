//! # Contract Errors
//!
//! Every contract entry point returns [`ContractError`] on failure. A
//! failed call has no effect: all preconditions are checked before the
//! first write, so the caller can treat any error as a clean abort.
//!
//! The variants follow the four failure classes callers care about:
//!
//! | Variant            | Raised when                                          |
//! |--------------------|------------------------------------------------------|
//! | `Precondition`     | wrong caller share, lifecycle state or time window   |
//! | `Budget`           | the reward ledger cannot cover a reservation         |
//! | `AdminOnly`        | a privileged call from a non-administrator           |
//! | `ArithmeticGuard`  | zero-length price window or value overflow           |
//!
//! An unpriced asset is deliberately **not** an error. It values at zero.

use thiserror::Error;

use lockvault_protocol::{Address, LedgerError};

/// Short reason strings surfaced with precondition and budget failures.
pub mod reason {
    /// The operation needs a locked vault.
    pub const NOT_LOCKED: &str = "!locked";
    /// The vault's lock has not matured yet.
    pub const STILL_LOCKED: &str = "locked";
    /// The caller does not hold the share the operation requires.
    pub const NOT_SHARE_OWNER: &str = "!share owner";
    /// The registry's creation window is closed.
    pub const NOT_ACTIVE: &str = "!active";
    /// The vault is already locked.
    pub const ALREADY_LOCKED: &str = "!neverlocked";
    /// The lock-tier index does not exist.
    pub const UNKNOWN_TIER: &str = "!tier";
    /// A tier's reward percentage is out of range.
    pub const INVALID_PERCENT: &str = "!percent";
    /// A tier's interval is longer than the supported maximum.
    pub const INVALID_INTERVAL: &str = "!interval";
    /// The caller tried to move more shares than they hold.
    pub const INSUFFICIENT_SHARES: &str = "!shares";
    /// The asset is already registered.
    pub const DUPLICATE_ASSET: &str = "!duplicate";
    /// The asset index does not exist.
    pub const UNKNOWN_ASSET: &str = "!asset";
    /// A new reward total would not cover what is already reserved.
    pub const NEGATIVE_REWARD: &str = "Negative reward";
    /// A reservation exceeds the available reward budget.
    pub const INSUFFICIENT_REWARD: &str = "Insufficient reward";
    /// The registry's reward balance or allowance cannot fund a payout.
    pub const REWARD_UNFUNDED: &str = "Reward unfunded";
    /// The time-weighted price window has zero length.
    pub const ZERO_ELAPSED: &str = "zero elapsed time";
    /// A value computation left the 128-bit amount domain.
    pub const VALUE_OVERFLOW: &str = "value overflow";
    /// A lock's maturity falls outside the representable time range.
    pub const TIME_OVERFLOW: &str = "time overflow";
}

/// Errors returned by the lockvault contracts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// Caller, lifecycle state or time window does not allow the call.
    #[error("precondition violated: {0}")]
    Precondition(&'static str),

    /// The reward ledger cannot honour the request.
    #[error("budget violated: {0}")]
    Budget(&'static str),

    /// A privileged operation was invoked by someone other than the admin.
    #[error("unauthorized: {caller} is not the administrator")]
    AdminOnly {
        /// The rejected caller.
        caller: Address,
    },

    /// Fixed-point arithmetic could not produce a meaningful result.
    #[error("arithmetic guard: {0}")]
    ArithmeticGuard(&'static str),

    /// No vault was created at this address by the registry.
    #[error("unknown vault: {0}")]
    UnknownVault(Address),

    /// The host ledger rejected an asset movement or event.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl ContractError {
    /// The short reason string, e.g. `"!share owner"`.
    pub fn reason(&self) -> String {
        match self {
            ContractError::Precondition(r)
            | ContractError::Budget(r)
            | ContractError::ArithmeticGuard(r) => (*r).to_string(),
            ContractError::AdminOnly { .. } => "!admin".to_string(),
            ContractError::UnknownVault(_) => "!vault".to_string(),
            ContractError::Ledger(e) => e.to_string(),
        }
    }
}

/// Convenience alias used throughout the contracts.
pub type ContractResult<T> = Result<T, ContractError>;
