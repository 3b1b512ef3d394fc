//! Single-administrator capability shared by every admin-gated contract.

use serde::{Deserialize, Serialize};
use tracing::info;

use lockvault_protocol::Address;

use crate::error::{ContractError, ContractResult};

/// Holds the current administrator and gates privileged entry points.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownable {
    owner: Address,
}

impl Ownable {
    /// Makes `owner` the administrator.
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    /// The current administrator.
    pub fn owner(&self) -> &Address {
        &self.owner
    }

    /// Fails with [`ContractError::AdminOnly`] unless `caller` is the admin.
    pub fn require_owner(&self, caller: &Address) -> ContractResult<()> {
        if caller != &self.owner {
            return Err(ContractError::AdminOnly {
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    /// Hands the admin role to `new_owner`. Admin only.
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> ContractResult<()> {
        self.require_owner(caller)?;
        info!(from = %self.owner, to = %new_owner, "ownership transferred");
        self.owner = new_owner;
        Ok(())
    }
}
