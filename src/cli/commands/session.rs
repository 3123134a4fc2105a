use crate::application::{LedgerSync, Submission, UnlockedWallet, WalletManager};
use crate::config::AppConfig;
use crate::domain::Joint;
use crate::network::HubClient;
use crate::storage::{ledger_db, DbPool};
use anyhow::{Context, Result};
use std::path::Path;

/// Everything a composing command needs: keys, store, hub and witnesses
pub struct WalletSession {
    pub unlocked: UnlockedWallet,
    pub pool: DbPool,
    pub hub: HubClient,
    pub witnesses: Vec<String>,
}

impl WalletSession {
    pub async fn open(keys_file: &Path, config: &AppConfig) -> Result<Self> {
        let unlocked = WalletManager::unlock(keys_file, &config.passphrase_env)?;

        let pool = ledger_db::connect(&config.database_path())
            .await
            .with_context(|| format!("Failed to open {}", config.database_path().display()))?;
        WalletManager::ensure_registered(&pool, &unlocked).await?;

        let hub = HubClient::connect(&config.hub_url(), config.request_timeout())
            .await
            .with_context(|| format!("Failed to connect to {}", config.hub_url()))?;
        let witnesses = LedgerSync::refresh_history(&pool, &hub, &config.witnesses).await?;

        Ok(Self {
            unlocked,
            pool,
            hub,
            witnesses,
        })
    }

    /// Save, broadcast, linger and disconnect
    pub async fn submit(self, joint: &Joint, config: &AppConfig) -> Result<()> {
        Submission::submit(&self.pool, &self.hub, joint, config.broadcast_linger()).await?;
        self.hub.close().await;
        self.pool.close().await;
        Ok(())
    }
}
