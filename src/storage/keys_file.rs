use crate::crypto::{generate_mnemonic, normalize_mnemonic, validate_mnemonic};
use crate::domain::{DomainError, DomainResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

/// Length of a device temporary private key
pub const TEMP_KEY_LENGTH: usize = 32;

/// JSON key file holding the wallet mnemonic and the device temp keys
///
/// ```json
/// {
///     "mnemonic_phrase": "...",
///     "temp_priv_key": "<base64>",
///     "prev_temp_priv_key": "<base64>"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct KeysFile {
    mnemonic_phrase: SecretString,
    #[serde(default)]
    temp_priv_key: Option<String>,
    #[serde(default)]
    prev_temp_priv_key: Option<String>,
}

/// Current and previous device temporary keys
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct TempKeys {
    pub current: [u8; TEMP_KEY_LENGTH],
    pub previous: [u8; TEMP_KEY_LENGTH],
}

impl TempKeys {
    pub fn random() -> Self {
        let mut current = [0u8; TEMP_KEY_LENGTH];
        let mut previous = [0u8; TEMP_KEY_LENGTH];
        OsRng.fill_bytes(&mut current);
        OsRng.fill_bytes(&mut previous);
        Self { current, previous }
    }
}

impl std::fmt::Debug for TempKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TempKeys([REDACTED])")
    }
}

impl KeysFile {
    pub fn new(mnemonic_phrase: SecretString, temp_keys: Option<&TempKeys>) -> Self {
        Self {
            mnemonic_phrase,
            temp_priv_key: temp_keys.map(|k| BASE64.encode(k.current)),
            prev_temp_priv_key: temp_keys.map(|k| BASE64.encode(k.previous)),
        }
    }

    /// A fresh key file: new random mnemonic and random temp keys
    pub fn generate() -> DomainResult<Self> {
        let mnemonic = generate_mnemonic()?;
        Ok(Self::new(mnemonic, Some(&TempKeys::random())))
    }

    pub fn mnemonic(&self) -> &SecretString {
        &self.mnemonic_phrase
    }

    /// Decode the temp keys; `None` when the file carries only a mnemonic
    pub fn temp_keys(&self) -> DomainResult<Option<TempKeys>> {
        match (&self.temp_priv_key, &self.prev_temp_priv_key) {
            (Some(current), Some(previous)) => Ok(Some(TempKeys {
                current: decode_temp_key(current, "temp_priv_key")?,
                previous: decode_temp_key(previous, "prev_temp_priv_key")?,
            })),
            (None, None) => Ok(None),
            _ => Err(DomainError::InvalidKeyFile {
                reason: "temp_priv_key and prev_temp_priv_key must be present together".to_string(),
            }),
        }
    }

    /// Read and validate a key file
    pub fn read_from_file(path: &Path) -> DomainResult<Self> {
        if !path.exists() {
            return Err(DomainError::KeyFileNotFound {
                path: path.to_path_buf(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let mut keys: Self = serde_json::from_str(&contents).map_err(|e| DomainError::InvalidKeyFile {
            reason: format!("{}: {}", path.display(), e),
        })?;

        let normalized = normalize_mnemonic(keys.mnemonic_phrase.expose_secret());
        validate_mnemonic(&normalized)?;
        keys.mnemonic_phrase = SecretString::new(normalized);

        keys.temp_keys()?;
        Ok(keys)
    }

    /// Write as tab-indented JSON, owner read/write only on Unix
    pub fn write_to_file(&self, path: &Path) -> DomainResult<()> {
        let mut doc = json!({ "mnemonic_phrase": self.mnemonic_phrase.expose_secret() });
        if let (Some(current), Some(previous)) = (&self.temp_priv_key, &self.prev_temp_priv_key) {
            doc["temp_priv_key"] = json!(current);
            doc["prev_temp_priv_key"] = json!(previous);
        }

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        doc.serialize(&mut serializer)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, buf)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600); // rw-------
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }
}

fn decode_temp_key(encoded: &str, field: &str) -> DomainResult<[u8; TEMP_KEY_LENGTH]> {
    let bytes = BASE64.decode(encoded)?;
    bytes.try_into().map_err(|bytes: Vec<u8>| DomainError::InvalidKeyFile {
        reason: format!(
            "{} has {} bytes (expected {})",
            field,
            bytes.len(),
            TEMP_KEY_LENGTH
        ),
    })
}
