use crate::application::WalletManager;
use crate::cli::output::{print_address, AddressOutput};
use crate::config::AppConfig;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct AddressArgs {
    /// Key file holding the mnemonic
    pub keys_file: PathBuf,
}

/// Show the signing address of a key file; works offline
pub fn handle_address_command(args: AddressArgs, config: &AppConfig) -> Result<()> {
    let unlocked = WalletManager::unlock(&args.keys_file, &config.passphrase_env)?;
    let key = unlocked.signing_key();

    print_address(&AddressOutput {
        address: unlocked.address().to_string(),
        derivation_path: key.path().to_string(),
        public_key: key.public_key(),
        definition: key.definition().to_value(),
        device_address: unlocked.device_address()?,
    })
}
