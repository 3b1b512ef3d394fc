//! # Ledger Addresses
//!
//! Every participant on the host ledger -- externally owned accounts, asset
//! accounts, AMM pairs and the contracts themselves -- is named by an
//! [`Address`]. Addresses are content-derived: the BLAKE3 digest of a domain
//! tag and a seed, truncated to [`ADDRESS_LENGTH`] bytes. The same inputs
//! always produce the same address, which keeps tests and replays
//! deterministic without a central allocator.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ADDRESS_LENGTH;

/// An account identifier on the host ledger, rendered as `0x` + hex.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Derives an address from a domain tag and a seed.
    ///
    /// The preimage is `domain || 0x00 || seed`. The separator keeps a
    /// domain suffix from colliding with a seed prefix.
    pub fn derive(domain: &str, seed: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain.as_bytes());
        hasher.update(&[0x00]);
        hasher.update(seed);
        let digest = hasher.finalize();
        Self(format!("0x{}", hex::encode(&digest.as_bytes()[..ADDRESS_LENGTH])))
    }

    /// Well-known address of an externally owned account, e.g. `named("alice")`.
    pub fn named(label: &str) -> Self {
        Self::derive("account", label.as_bytes())
    }

    /// Returns the `0x`-prefixed hex rendering.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses a `0x`-prefixed hex address of the expected length.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let body = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(body)?;
        if bytes.len() != ADDRESS_LENGTH {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        Ok(Self(format!("0x{}", hex::encode(bytes))))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}...)", &self.0[..10])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        assert_eq!(Address::derive("vault", b"1"), Address::derive("vault", b"1"));
        assert_ne!(Address::derive("vault", b"1"), Address::derive("vault", b"2"));
    }

    #[test]
    fn domain_separates_addresses() {
        assert_ne!(Address::derive("asset", b"x"), Address::derive("pair", b"x"));
    }

    #[test]
    fn rendering_has_expected_length() {
        let addr = Address::named("alice");
        assert!(addr.as_str().starts_with("0x"));
        assert_eq!(addr.as_str().len(), 2 + ADDRESS_LENGTH * 2);
    }

    #[test]
    fn hex_roundtrip() {
        let addr = Address::named("bob");
        let parsed: Address = addr.as_str().parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn short_hex_rejected() {
        assert!(Address::from_hex("0xdeadbeef").is_err());
    }
}
