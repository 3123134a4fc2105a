//! BIP-32 derivation paths used by the wallet
//!
//! Keys follow the BIP-44 layout with coin type 0:
//! m/44'/0'/account'/is_change/address_index
//!
//! - Purpose: 44' (BIP-44)
//! - Coin type: 0'
//! - Account: hardened
//! - Change flag: unhardened (0 = receiving, 1 = change)
//! - Address index: unhardened

use serde::{Deserialize, Serialize};
use std::fmt;

/// Path of the device (messaging) key
pub const DEVICE_KEY_PATH: &str = "m/1'";

/// Path of the account whose extended public key identifies the wallet
pub const WALLET_ACCOUNT_PATH: &str = "m/44'/0'/0'";

/// BIP-32 path of a wallet address key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletPath {
    /// Account index (hardened)
    pub account: u32,
    /// 0 for receiving addresses, 1 for change addresses
    pub is_change: u32,
    /// Address index (unhardened)
    pub address_index: u32,
}

impl WalletPath {
    /// BIP-44 purpose constant
    pub const BIP44_PURPOSE: u32 = 44;

    /// Coin type used by the ledger
    pub const COIN_TYPE: u32 = 0;

    pub fn new(account: u32, is_change: u32, address_index: u32) -> Self {
        Self {
            account,
            is_change,
            address_index,
        }
    }

    /// The single key every command signs with: m/44'/0'/0'/0/0
    pub fn signing_key() -> Self {
        Self::new(0, 0, 0)
    }

    /// Format: m/44'/0'/account'/is_change/address_index
    pub fn to_string_path(&self) -> String {
        format!(
            "m/{}'/{}'/{}'/{}/{}",
            Self::BIP44_PURPOSE,
            Self::COIN_TYPE,
            self.account,
            self.is_change,
            self.address_index
        )
    }
}

impl Default for WalletPath {
    fn default() -> Self {
        Self::signing_key()
    }
}

impl fmt::Display for WalletPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_path())
    }
}
