//! BIP-32 hierarchical deterministic keys
//!
//! The master key is derived from a BIP-39 mnemonic and the user's
//! passphrase, so the same phrase with a different passphrase yields an
//! unrelated wallet. All ledger keys are secp256k1.

use super::ecdsa::Ecdsa;
use super::mnemonic::parse_mnemonic;
use super::object_hash::{definition_address, device_address};
use crate::domain::{
    Definition, DomainError, DomainResult, WalletPath, DEVICE_KEY_PATH, WALLET_ACCOUNT_PATH,
};
use bip32::{DerivationPath, Prefix, XPrv};
use secp256k1::SecretKey;

/// Master extended private key of a wallet
#[derive(Clone)]
pub struct HdWallet {
    master: XPrv,
}

impl HdWallet {
    /// Derive the master key from a mnemonic and passphrase (BIP-39 seed)
    pub fn from_mnemonic(mnemonic: &str, passphrase: &str) -> DomainResult<Self> {
        let mnemonic = parse_mnemonic(mnemonic)?;
        let seed = mnemonic.to_seed(passphrase);

        let master = XPrv::new(seed)
            .map_err(|e| DomainError::CryptoError(format!("Master key derivation failed: {}", e)))?;

        Ok(Self { master })
    }

    /// Derive the extended private key at an absolute path such as m/44'/0'/0'
    pub fn derive(&self, path: &str) -> DomainResult<XPrv> {
        let path: DerivationPath = path
            .parse()
            .map_err(|e| DomainError::CryptoError(format!("Invalid derivation path {}: {}", path, e)))?;

        let mut key = self.master.clone();
        for child in path.iter() {
            key = key
                .derive_child(child)
                .map_err(|e| DomainError::CryptoError(format!("Derivation failed: {}", e)))?;
        }
        Ok(key)
    }

    /// Derive the raw secp256k1 key at an absolute path
    pub fn derive_key(&self, path: &str) -> DomainResult<DerivedKey> {
        let xprv = self.derive(path)?;
        let private_key_bytes = xprv.private_key().to_bytes();
        let secret = Ecdsa::secret_from_bytes(&private_key_bytes)?;

        Ok(DerivedKey {
            secret,
            path: path.to_string(),
        })
    }

    /// Key of a wallet address
    pub fn address_key(&self, path: &WalletPath) -> DomainResult<DerivedKey> {
        self.derive_key(&path.to_string_path())
    }

    /// The key every command signs with (m/44'/0'/0'/0/0)
    pub fn signing_key(&self) -> DomainResult<DerivedKey> {
        self.address_key(&WalletPath::signing_key())
    }

    /// Device messaging key (m/1')
    pub fn device_key(&self) -> DomainResult<DerivedKey> {
        self.derive_key(DEVICE_KEY_PATH)
    }

    /// Serialized extended public key of account 0, identifying the wallet
    pub fn wallet_xpub(&self) -> DomainResult<String> {
        let account = self.derive(WALLET_ACCOUNT_PATH)?;
        Ok(account.public_key().to_string(Prefix::XPUB))
    }
}

/// A single derived secp256k1 key
#[derive(Clone)]
pub struct DerivedKey {
    secret: SecretKey,
    path: String,
}

impl DerivedKey {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    /// Base64 compressed public key
    pub fn public_key(&self) -> String {
        Ecdsa::public_key_base64(&self.secret)
    }

    /// Single-signature definition controlled by this key
    pub fn definition(&self) -> Definition {
        Definition::sig(self.public_key())
    }

    /// Address of the single-signature definition
    pub fn address(&self) -> DomainResult<String> {
        definition_address(&self.definition())
    }

    /// Device address when this is the device key
    pub fn device_address(&self) -> DomainResult<String> {
        device_address(&self.public_key())
    }

    /// Sign a 32-byte digest, base64 result
    pub fn sign(&self, digest: &[u8]) -> DomainResult<String> {
        Ecdsa::sign(digest, &self.secret)
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("path", &self.path)
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}
