//! Signing capability handed to the composer

use crate::crypto::object_hash::unit_hash_to_sign;
use crate::crypto::{DerivedKey, HdWallet};
use crate::domain::{
    single_sig_paths, Definition, DomainError, DomainResult, SigningPaths, Unit, SINGLE_SIG_PATH,
};
use crate::storage::{DbPool, WalletRepo};
use async_trait::async_trait;
use tracing::debug;

/// What the composer needs from whoever holds the keys
#[async_trait]
pub trait Signer: Send + Sync {
    /// Signature length expected on each signing path of `address`
    async fn signing_paths(&self, address: &str) -> DomainResult<SigningPaths>;

    /// Definition that `address` is the hash of
    async fn definition(&self, address: &str) -> DomainResult<Definition>;

    /// Base64 signature of the unit's hash-to-sign
    async fn sign(&self, unit: &Unit, address: &str, signing_path: &str) -> DomainResult<String>;
}

/// Signs with the one key derived at m/44'/0'/0'/0/0
#[derive(Debug)]
pub struct KeySigner {
    key: DerivedKey,
    address: String,
}

impl KeySigner {
    pub fn new(key: DerivedKey) -> DomainResult<Self> {
        let address = key.address()?;
        Ok(Self { key, address })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn check_address(&self, address: &str) -> DomainResult<()> {
        if address != self.address {
            return Err(DomainError::AddressMismatch {
                address: address.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Signer for KeySigner {
    async fn signing_paths(&self, address: &str) -> DomainResult<SigningPaths> {
        self.check_address(address)?;
        Ok(single_sig_paths())
    }

    async fn definition(&self, address: &str) -> DomainResult<Definition> {
        self.check_address(address)?;
        Ok(self.key.definition())
    }

    async fn sign(&self, unit: &Unit, address: &str, signing_path: &str) -> DomainResult<String> {
        self.check_address(address)?;
        if signing_path != SINGLE_SIG_PATH {
            return Err(DomainError::KeyRecordNotFound {
                address: address.to_string(),
                signing_path: signing_path.to_string(),
                count: 0,
            });
        }

        let digest = unit_hash_to_sign(unit)?;
        self.key.sign(&digest)
    }
}

/// Signs for any address registered in the store, deriving its key on demand
pub struct WalletSigner {
    pool: DbPool,
    wallet: HdWallet,
}

impl WalletSigner {
    pub fn new(pool: DbPool, wallet: HdWallet) -> Self {
        Self { pool, wallet }
    }
}

#[async_trait]
impl Signer for WalletSigner {
    async fn signing_paths(&self, address: &str) -> DomainResult<SigningPaths> {
        // unknown addresses have no definition either
        WalletRepo::read_definition(&self.pool, address).await?;
        Ok(single_sig_paths())
    }

    async fn definition(&self, address: &str) -> DomainResult<Definition> {
        let definition = WalletRepo::read_definition(&self.pool, address).await?;
        Definition::from_value(&definition)
    }

    async fn sign(&self, unit: &Unit, address: &str, signing_path: &str) -> DomainResult<String> {
        let record = WalletRepo::read_signing_record(&self.pool, address, signing_path).await?;
        let path = record.path();
        debug!(address, path = %path, "Signing with stored key record");

        let key = self.wallet.address_key(&path)?;
        let digest = unit_hash_to_sign(unit)?;
        key.sign(&digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::object_hash::definition_address;
    use crate::crypto::Ecdsa;
    use crate::domain::unit::{Author, Message, APP_DATA};
    use crate::domain::WalletPath;
    use crate::storage::ledger_db::setup_test_db;
    use crate::storage::{AddressRecord, WalletRecord};
    use serde_json::json;

    const TEST_MNEMONIC: &str =
        "bottom drive obey lake curtain smoke basket hold race lonely fit walk";

    fn wallet() -> HdWallet {
        HdWallet::from_mnemonic(TEST_MNEMONIC, "").unwrap()
    }

    fn unit_for(address: &str) -> Unit {
        let mut message = Message::inline(APP_DATA, json!({"tag": "x"}));
        message.payload_hash = "HASH".to_string();
        let mut unit = Unit::new(vec![Author::new(address)], vec![message]);
        unit.parent_units = vec!["PARENT".to_string()];
        unit
    }

    #[tokio::test]
    async fn test_key_signer_rejects_foreign_address() {
        let signer = KeySigner::new(wallet().signing_key().unwrap()).unwrap();
        let other = "2FF7PSL7FYXVU5UIQHCVDTTPUOOG75GX";

        let sig = signer.sign(&unit_for(other), other, "r").await;
        assert!(matches!(sig, Err(DomainError::AddressMismatch { ref address }) if address == other));
        assert!(signer.definition(other).await.is_err());
        assert!(signer.signing_paths(other).await.is_err());
    }

    #[tokio::test]
    async fn test_key_signer_definition_matches_signature() {
        let signer = KeySigner::new(wallet().signing_key().unwrap()).unwrap();
        let address = signer.address().to_string();

        let paths = signer.signing_paths(&address).await.unwrap();
        assert_eq!(paths.get("r"), Some(&88));

        let definition = signer.definition(&address).await.unwrap();
        assert_eq!(definition_address(&definition).unwrap(), address);

        let unit = unit_for(&address);
        let signature = signer.sign(&unit, &address, "r").await.unwrap();
        assert_eq!(signature.len(), 88);

        let digest = unit_hash_to_sign(&unit).unwrap();
        assert!(Ecdsa::verify(&digest, &signature, &definition.pubkey));

        assert!(matches!(
            signer.sign(&unit, &address, "r.0").await,
            Err(DomainError::KeyRecordNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_wallet_signer_uses_store_records() {
        let pool = setup_test_db().await;
        let wallet = wallet();
        let key = wallet.signing_key().unwrap();
        let address = key.address().unwrap();

        let record = WalletRecord {
            wallet: wallet.wallet_xpub().unwrap(),
            xpub: wallet.wallet_xpub().unwrap(),
            device_address: wallet.device_key().unwrap().device_address().unwrap(),
        };
        let address_record = AddressRecord {
            address: address.clone(),
            path: WalletPath::signing_key(),
            definition: key.definition().to_value(),
        };
        WalletRepo::register(&pool, &record, &address_record, "r").await.unwrap();

        let signer = WalletSigner::new(pool, wallet);
        assert_eq!(signer.definition(&address).await.unwrap(), key.definition());

        let unit = unit_for(&address);
        let signature = signer.sign(&unit, &address, "r").await.unwrap();
        let digest = unit_hash_to_sign(&unit).unwrap();
        assert!(Ecdsa::verify(&digest, &signature, &key.public_key()));

        assert!(matches!(
            signer.sign(&unit, "UNKNOWN", "r").await,
            Err(DomainError::KeyRecordNotFound { count: 0, .. })
        ));
        assert!(matches!(
            signer.definition("UNKNOWN").await,
            Err(DomainError::DefinitionNotFound(_))
        ));
    }
}
