use crate::application::WalletManager;
use crate::cli::output::print_keys_init;
use crate::config::AppConfig;
use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum KeysCommands {
    /// Create a new key file with a random mnemonic
    Init(KeysInitArgs),
}

#[derive(Args)]
pub struct KeysInitArgs {
    /// Key file to create
    pub keys_file: PathBuf,
}

pub fn handle_keys_command(cmd: KeysCommands, config: &mut AppConfig) -> Result<()> {
    match cmd {
        KeysCommands::Init(args) => {
            let outcome = WalletManager::init_keys_file(&args.keys_file, config)?;
            print_keys_init(&outcome);
            Ok(())
        }
    }
}
