use crate::config::AppConfig;
use crate::crypto::object_hash::base64_hash;
use crate::crypto::{DerivedKey, HdWallet};
use crate::domain::{DomainError, DomainResult, WalletPath, SINGLE_SIG_PATH};
use crate::storage::{
    AddressRecord, DbPool, KeyReader, KeysFile, PassphraseSource, WalletRecord, WalletRepo,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

/// Keys unlocked from a key file with its passphrase
pub struct UnlockedWallet {
    wallet: HdWallet,
    signing_key: DerivedKey,
    device_key: DerivedKey,
    address: String,
}

impl UnlockedWallet {
    pub fn wallet(&self) -> &HdWallet {
        &self.wallet
    }

    pub fn signing_key(&self) -> &DerivedKey {
        &self.signing_key
    }

    /// Address of the m/44'/0'/0'/0/0 key
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn device_address(&self) -> DomainResult<String> {
        self.device_key.device_address()
    }
}

/// Result of `keys init`
#[derive(Debug, Serialize)]
pub struct KeysInitOutcome {
    pub keys_file: PathBuf,
    pub device_name: String,
    pub address: String,
    pub device_address: String,
}

/// Key file and wallet lifecycle
pub struct WalletManager;

impl WalletManager {
    /// Create a new key file; the device name is asked once and kept in conf.json
    pub fn init_keys_file(path: &Path, config: &mut AppConfig) -> anyhow::Result<KeysInitOutcome> {
        if path.exists() {
            return Err(DomainError::Wallet(format!("{} already exists", path.display())).into());
        }

        let device_name = match config.device_name.clone() {
            Some(name) => name,
            None => {
                let name = KeyReader::prompt_device_name()?;
                config.save_device_name(&name)?;
                info!("Device name saved to {}", config.conf_path().display());
                name
            }
        };

        let passphrase = match KeyReader::passphrase_from_env(&config.passphrase_env) {
            Some(passphrase) => passphrase,
            None => KeyReader::prompt_new_passphrase()?,
        };

        let keys = KeysFile::generate()?;
        let unlocked = Self::unlock_with(&keys, &passphrase)?;
        keys.write_to_file(path)?;
        info!("Keys written to {}", path.display());

        Ok(KeysInitOutcome {
            keys_file: path.to_path_buf(),
            device_name,
            address: unlocked.address().to_string(),
            device_address: unlocked.device_address()?,
        })
    }

    /// Read the key file and derive keys with the resolved passphrase
    pub fn unlock(keys_path: &Path, passphrase_env: &str) -> DomainResult<UnlockedWallet> {
        let keys = KeyReader::read_keys_file(keys_path)?;
        let (passphrase, source) = KeyReader::resolve_passphrase(passphrase_env)?;
        if source == PassphraseSource::Prompt {
            info!("Unlocking {} with entered passphrase", keys_path.display());
        }
        Self::unlock_with(&keys, &passphrase)
    }

    pub fn unlock_with(keys: &KeysFile, passphrase: &SecretString) -> DomainResult<UnlockedWallet> {
        let wallet = HdWallet::from_mnemonic(keys.mnemonic().expose_secret(), passphrase.expose_secret())?;
        let signing_key = wallet.signing_key()?;
        let device_key = wallet.device_key()?;
        let address = signing_key.address()?;
        info!(address = %address, "Derived signing key");

        Ok(UnlockedWallet {
            wallet,
            signing_key,
            device_key,
            address,
        })
    }

    /// Register the wallet on first use; afterwards the stored device
    /// address proves the passphrase is the same one
    pub async fn ensure_registered(pool: &DbPool, unlocked: &UnlockedWallet) -> DomainResult<WalletRecord> {
        let device_address = unlocked.device_address()?;

        if let Some(existing) = WalletRepo::single_wallet(pool).await? {
            if existing.device_address != device_address {
                return Err(DomainError::IncorrectPassphrase);
            }
            return Ok(existing);
        }

        let xpub = unlocked.wallet.wallet_xpub()?;
        let record = WalletRecord {
            wallet: base64_hash(&Value::String(xpub.clone()))?,
            xpub,
            device_address,
        };
        let address = AddressRecord {
            address: unlocked.address.clone(),
            path: WalletPath::signing_key(),
            definition: unlocked.signing_key.definition().to_value(),
        };
        WalletRepo::register(pool, &record, &address, SINGLE_SIG_PATH).await?;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ledger_db::setup_test_db;
    use tempfile::TempDir;

    const TEST_MNEMONIC: &str =
        "bottom drive obey lake curtain smoke basket hold race lonely fit walk";

    fn keys() -> KeysFile {
        KeysFile::new(SecretString::new(TEST_MNEMONIC.to_string()), None)
    }

    #[test]
    fn test_unlock_is_deterministic() {
        let passphrase = SecretString::new(String::new());
        let first = WalletManager::unlock_with(&keys(), &passphrase).unwrap();
        let second = WalletManager::unlock_with(&keys(), &passphrase).unwrap();

        assert_eq!(first.address(), second.address());
        assert_eq!(first.signing_key().path(), "m/44'/0'/0'/0/0");
        assert_eq!(
            first.signing_key().address().unwrap(),
            first.address()
        );
    }

    #[test]
    fn test_unlock_from_file_with_env_passphrase() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys.json");
        keys().write_to_file(&path).unwrap();

        let var = "JOINT_CLI_TEST_UNLOCK_PASSPHRASE";
        std::env::set_var(var, "");
        let unlocked = WalletManager::unlock(&path, var).unwrap();
        std::env::remove_var(var);

        let expected = WalletManager::unlock_with(&keys(), &SecretString::new(String::new())).unwrap();
        assert_eq!(unlocked.address(), expected.address());
    }

    #[tokio::test]
    async fn test_register_then_detect_wrong_passphrase() {
        let pool = setup_test_db().await;
        let unlocked = WalletManager::unlock_with(&keys(), &SecretString::new("right".into())).unwrap();

        let record = WalletManager::ensure_registered(&pool, &unlocked).await.unwrap();
        assert_eq!(record.device_address, unlocked.device_address().unwrap());
        assert_eq!(WalletRepo::addresses(&pool).await.unwrap(), vec![unlocked.address()]);

        // second run with the same passphrase reuses the wallet
        let again = WalletManager::ensure_registered(&pool, &unlocked).await.unwrap();
        assert_eq!(again, record);

        let wrong = WalletManager::unlock_with(&keys(), &SecretString::new("wrong".into())).unwrap();
        assert!(matches!(
            WalletManager::ensure_registered(&pool, &wrong).await,
            Err(DomainError::IncorrectPassphrase)
        ));
    }

    #[test]
    fn test_init_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys.json");
        keys().write_to_file(&path).unwrap();

        let mut config = AppConfig::load_from(dir.path()).unwrap();
        assert!(WalletManager::init_keys_file(&path, &mut config).is_err());
    }

    #[test]
    fn test_init_with_configured_device_and_env_passphrase() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys.json");

        let mut config = AppConfig::load_from(dir.path()).unwrap();
        config.device_name = Some("test-device".to_string());
        config.passphrase_env = "JOINT_CLI_TEST_INIT_PASSPHRASE".to_string();
        std::env::set_var(&config.passphrase_env, "init");

        let outcome = WalletManager::init_keys_file(&path, &mut config).unwrap();
        std::env::remove_var(&config.passphrase_env);

        assert_eq!(outcome.device_name, "test-device");
        assert!(outcome.device_address.starts_with('0'));

        let written = KeysFile::read_from_file(&path).unwrap();
        assert!(written.temp_keys().unwrap().is_some());
        let unlocked = WalletManager::unlock_with(&written, &SecretString::new("init".into())).unwrap();
        assert_eq!(unlocked.address(), outcome.address);
    }
}
