use super::session::WalletSession;
use crate::application::{Composer, WalletSigner};
use crate::cli::output::print_done;
use crate::config::AppConfig;
use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Args)]
pub struct DataArgs {
    /// Key file holding the mnemonic
    pub keys_file: PathBuf,

    /// JSON file whose object becomes the data payload
    pub data_file: PathBuf,
}

pub async fn handle_data_command(args: DataArgs, config: &AppConfig) -> Result<()> {
    let contents = std::fs::read_to_string(&args.data_file)
        .with_context(|| format!("Failed to read data file {}", args.data_file.display()))?;
    let payload: Value = serde_json::from_str(&contents)
        .with_context(|| format!("Data file {} is not valid JSON", args.data_file.display()))?;

    let session = WalletSession::open(&args.keys_file, config).await?;
    let address = session.unlocked.address().to_string();

    let signer = WalletSigner::new(session.pool.clone(), session.unlocked.wallet().clone());
    let composer = Composer::new(&session.pool, &session.hub, &signer, session.witnesses.clone());
    let joint = composer.compose_data_joint(&address, payload).await?;

    session.submit(&joint, config).await?;
    print_done();
    Ok(())
}
