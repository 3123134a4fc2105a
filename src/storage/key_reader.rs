use crate::domain::{DomainError, DomainResult};
use crate::storage::keys_file::KeysFile;
use secrecy::SecretString;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::info;

/// Default name of the environment variable carrying the passphrase
pub const PASSPHRASE_ENV: &str = "ENV_PASSPHRASE";

const DEFAULT_DEVICE_NAME: &str = "Headless";

/// Where the passphrase came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassphraseSource {
    Environment,
    Prompt,
}

/// Read keys and secrets from files, the environment and the terminal
pub struct KeyReader;

impl KeyReader {
    /// Read a key file and return it with its validated mnemonic
    pub fn read_keys_file(path: &Path) -> DomainResult<KeysFile> {
        KeysFile::read_from_file(path)
    }

    /// Passphrase from `env_var` when it is set (an empty value counts),
    /// otherwise prompted on the terminal without echo
    pub fn resolve_passphrase(env_var: &str) -> DomainResult<(SecretString, PassphraseSource)> {
        if let Some(passphrase) = Self::passphrase_from_env(env_var) {
            info!("Passphrase taken from {}", env_var);
            return Ok((passphrase, PassphraseSource::Environment));
        }

        let passphrase = rpassword::prompt_password("Enter passphrase: ")
            .map_err(|e| DomainError::Wallet(format!("Failed to read passphrase: {}", e)))?;
        info!("Passphrase entered interactively");
        Ok((SecretString::new(passphrase), PassphraseSource::Prompt))
    }

    pub fn passphrase_from_env(env_var: &str) -> Option<SecretString> {
        std::env::var(env_var).ok().map(SecretString::new)
    }

    /// Prompt for a new passphrase twice; both entries must match
    pub fn prompt_new_passphrase() -> DomainResult<SecretString> {
        let first = rpassword::prompt_password("Passphrase for your private keys: ")?;
        let second = rpassword::prompt_password("Repeat passphrase: ")?;
        if first != second {
            return Err(DomainError::Wallet("Passphrases do not match".to_string()));
        }
        Ok(SecretString::new(first))
    }

    /// Ask for the device name, falling back to the suggestion on empty input
    pub fn prompt_device_name() -> DomainResult<String> {
        let suggested = Self::suggested_device_name();
        eprint!("Please name this device [{}]: ", suggested);
        io::stderr().flush()?;

        let stdin = io::stdin();
        Self::read_device_name(&mut stdin.lock(), &suggested)
    }

    fn read_device_name(input: &mut impl BufRead, suggested: &str) -> DomainResult<String> {
        let mut line = String::new();
        input.read_line(&mut line)?;

        let name = line.trim();
        Ok(if name.is_empty() {
            suggested.to_string()
        } else {
            name.to_string()
        })
    }

    fn suggested_device_name() -> String {
        std::env::var("HOSTNAME")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Cursor;
        
    #[test]
    fn test_empty_env_passphrase_is_used() {
        let var = "JOINT_CLI_TEST_EMPTY_PASSPHRASE";
        std::env::set_var(var, "");

        let (passphrase, source) = KeyReader::resolve_passphrase(var).unwrap();
        assert_eq!(passphrase.expose_secret(), "");
        assert_eq!(source, PassphraseSource::Environment);

        std::env::remove_var(var);
    }

    #[test]
    fn test_env_passphrase_value() {
        let var = "JOINT_CLI_TEST_SET_PASSPHRASE";
        std::env::set_var(var, "correct horse");
        assert_eq!(
            KeyReader::passphrase_from_env(var).unwrap().expose_secret(),
            "correct horse"
        );

        std::env::remove_var(var);
        assert!(KeyReader::passphrase_from_env(var).is_none());
    }

    #[test]
    fn test_device_name_input() {
        let mut typed = Cursor::new("my-node\n");
        assert_eq!(KeyReader::read_device_name(&mut typed, "Headless").unwrap(), "my-node");

        let mut empty = Cursor::new("\n");
        assert_eq!(KeyReader::read_device_name(&mut empty, "Headless").unwrap(), "Headless");
    }
}
