use super::session::WalletSession;
use crate::application::{Composer, KeySigner};
use crate::cli::output::print_done;
use crate::config::AppConfig;
use crate::domain::Output;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct PayArgs {
    /// Key file holding the mnemonic
    pub keys_file: PathBuf,

    /// Address receiving the payment
    pub payee: String,

    /// Amount in bytes
    pub amount: u64,
}

pub async fn handle_pay_command(args: PayArgs, config: &AppConfig) -> Result<()> {
    let session = WalletSession::open(&args.keys_file, config).await?;

    let signer = KeySigner::new(session.unlocked.signing_key().clone())?;
    let address = signer.address().to_string();
    let composer = Composer::new(&session.pool, &session.hub, &signer, session.witnesses.clone());
    let joint = composer
        .compose_payment_joint(&address, vec![Output::new(args.payee, args.amount)])
        .await?;

    session.submit(&joint, config).await?;
    print_done();
    Ok(())
}
