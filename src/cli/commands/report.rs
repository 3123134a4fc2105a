use crate::application::{DataReport, LedgerSync};
use crate::cli::output::print_lines;
use crate::config::AppConfig;
use crate::network::HubClient;
use crate::storage::ledger_db;
use anyhow::{Context, Result};

/// Sync with the hub, disconnect, then print every stored data record
pub async fn handle_list_data_command(config: &AppConfig) -> Result<()> {
    let pool = ledger_db::connect(&config.database_path())
        .await
        .with_context(|| format!("Failed to open {}", config.database_path().display()))?;

    let mut hub = HubClient::connect(&config.hub_url(), config.request_timeout())
        .await
        .with_context(|| format!("Failed to connect to {}", config.hub_url()))?;
    LedgerSync::synchronize(&pool, &mut hub, &config.witnesses, config.sync_window()).await?;
    hub.close().await;

    let lines = DataReport::lines(&pool).await?;
    print_lines(&lines);
    Ok(())
}
