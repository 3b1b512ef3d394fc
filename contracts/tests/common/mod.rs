//! Shared fixture for the contract integration tests.
//!
//! Mirrors a typical deployment: USDT at $1, WETH at $7 and the reward
//! token at $0.50 on a fixed-rate oracle; lock tiers of 1, 5 and 10 minutes
//! paying 0%, 10% and 20%; a 100 000 reward budget pre-funded to the
//! registry; and one vault created by `user1`.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};

use lockvault_contracts::{
    ActiveWindow, AssetRegistry, ContractResult, FixedRateOracle, Vault, VaultRegistry,
};
use lockvault_protocol::fixed_point::{encode, fraction};
use lockvault_protocol::logging::{try_init_logging, LogFormat};
use lockvault_protocol::{Address, Amount, Ledger, StandardAsset};

pub const WEI: u128 = 1_000_000_000_000_000_000;

/// Converts a decimal string into 18-decimal base units, like `toWei`.
pub fn wei(amount: &str) -> Amount {
    let (whole, frac) = amount.split_once('.').unwrap_or((amount, ""));
    assert!(frac.len() <= 18, "too many decimals in {amount}");
    let frac = format!("{frac:0<18}");
    whole.parse::<u128>().unwrap() * WEI + frac.parse::<u128>().unwrap()
}

pub fn genesis() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

/// Deploys a plain 18-decimal asset whose supply is held by `holder`.
pub fn deploy(ledger: &mut Ledger, holder: &Address, name: &str, symbol: &str) -> Address {
    ledger.deploy_asset(StandardAsset::with_supply(name, symbol, 18, holder, 10_000_000 * WEI))
}

pub struct Fixture {
    pub ledger: Ledger,
    pub admin: Address,
    pub user1: Address,
    pub user2: Address,
    pub usdt: Address,
    pub weth: Address,
    pub reward: Address,
    pub registry: VaultRegistry,
    pub vault: Address,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(ActiveWindow::open_from(genesis()), true)
    }

    /// Same as [`Fixture::new`] but the registry holds no reward tokens.
    pub fn unfunded() -> Self {
        Self::build(ActiveWindow::open_from(genesis()), false)
    }

    pub fn with_window(window: ActiveWindow) -> Self {
        Self::build(window, true)
    }

    fn build(window: ActiveWindow, funded: bool) -> Self {
        // Another test may have installed the subscriber already.
        let _ = try_init_logging("warn", LogFormat::Pretty);

        let admin = Address::named("deployer");
        let user1 = Address::named("user1");
        let user2 = Address::named("user2");
        let mut ledger = Ledger::new(genesis());

        let usdt = deploy(&mut ledger, &admin, "Tether USD", "USDT");
        let weth = deploy(&mut ledger, &admin, "Wrapped Ethereum", "WETH");
        let reward = deploy(&mut ledger, &admin, "Reward Token", "APYS");
        for account in [&admin, &user1, &user2] {
            ledger.credit_native(account, 1_000 * WEI).unwrap();
        }

        let mut oracle = FixedRateOracle::new(admin.clone());
        oracle.set_value(&admin, &usdt, encode(1)).unwrap();
        oracle.set_value(&admin, &weth, encode(7)).unwrap();
        oracle.set_value(&admin, &reward, fraction(1, 2).unwrap()).unwrap();

        let mut assets = AssetRegistry::new(admin.clone(), oracle, usdt.clone(), weth.clone(), &ledger).unwrap();
        assets.add_token(&admin, &ledger, &reward, false).unwrap();

        let mut registry = VaultRegistry::new(admin.clone(), assets.into_shared(), window, &mut ledger);
        registry.add_lock(&admin, 60, 0).unwrap();
        registry.add_lock(&admin, 5 * 60, 10).unwrap();
        registry.add_lock(&admin, 10 * 60, 20).unwrap();
        registry.set_reward(&admin, &mut ledger, &reward).unwrap();
        registry.set_reward_value(&admin, 100_000 * WEI).unwrap();
        if funded {
            let funder = registry.address().clone();
            ledger.transfer(&reward, &admin, &funder, 100_000 * WEI).unwrap();
        }

        let vault = registry.create_vault(&mut ledger, &user1).unwrap();

        Self {
            ledger,
            admin,
            user1,
            user2,
            usdt,
            weth,
            reward,
            registry,
            vault,
        }
    }

    pub fn vault(&self) -> &Vault {
        self.registry.vault_at(&self.vault).unwrap()
    }

    pub fn total_value(&self) -> Amount {
        self.registry.total_value(&self.ledger, &self.vault).unwrap()
    }

    pub fn advance(&mut self, secs: i64) {
        self.ledger.advance(Duration::seconds(secs)).unwrap();
    }

    /// Sends native funds from the deployer to the vault.
    pub fn send_native(&mut self, amount: Amount) {
        self.ledger.send_native(&self.admin, &self.vault, amount).unwrap();
    }

    /// Transfers `amount` of `asset` from the deployer to the vault.
    pub fn deposit(&mut self, asset: &Address, amount: Amount) {
        self.ledger.transfer(asset, &self.admin, &self.vault, amount).unwrap();
    }

    pub fn lock(&mut self, caller: &Address, tier: usize) -> ContractResult<()> {
        self.registry
            .vault_mut(&self.vault)?
            .lock(&mut self.ledger, caller, tier)
    }

    pub fn unlock(&mut self, caller: &Address) -> ContractResult<()> {
        self.registry.vault_mut(&self.vault)?.unlock(&mut self.ledger, caller)
    }

    pub fn transfer(&mut self, caller: &Address, to: &Address, amount: Amount) -> ContractResult<()> {
        self.registry
            .vault_mut(&self.vault)?
            .transfer(&mut self.ledger, caller, to, amount)
    }

    pub fn withdraw(&mut self, caller: &Address) -> ContractResult<()> {
        self.registry.vault_mut(&self.vault)?.withdraw(&mut self.ledger, caller)
    }

    pub fn balance(&self, asset: &Address, holder: &Address) -> Amount {
        self.ledger.balance_of(asset, holder)
    }
}
