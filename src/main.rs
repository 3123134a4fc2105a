use anyhow::Result;
use clap::{Parser, Subcommand};

use joint_cli::cli::{
    handle_address_command, handle_data_command, handle_keys_command, handle_list_data_command,
    handle_pay_command, AddressArgs, DataArgs, KeysCommands, PayArgs,
};
use joint_cli::{logging, AppConfig};

#[derive(Parser)]
#[command(name = "joint-cli")]
#[command(about = "Sign and submit data and payment joints through a hub", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Key file management
    #[command(subcommand)]
    Keys(KeysCommands),

    /// Print the address controlled by a key file
    Address(AddressArgs),

    /// Post the contents of a JSON file as a data joint
    Data(DataArgs),

    /// Pay an amount to an address
    Pay(PayArgs),

    /// Print every stored data record
    ListData,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    logging::init(&config.log_path())?;
    tracing::info!("Starting joint-cli v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Keys(keys_cmd) => handle_keys_command(keys_cmd, &mut config),
        Commands::Address(args) => handle_address_command(args, &config),
        Commands::Data(args) => handle_data_command(args, &config).await,
        Commands::Pay(args) => handle_pay_command(args, &config).await,
        Commands::ListData => handle_list_data_command(&config).await,
    };

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }
    result
}
