//! Bringing the local store up to date with the hub

use super::composer::resolve_witnesses;
use crate::domain::{DomainResult, Joint};
use crate::network::HubClient;
use crate::storage::{DbPool, JointRepo, WalletRepo};
use std::time::Duration;
use tracing::info;

pub struct LedgerSync;

impl LedgerSync {
    /// Store joints not seen before, returning how many were new
    pub async fn save_joints(pool: &DbPool, joints: &[Joint]) -> DomainResult<usize> {
        let mut saved = 0;
        for joint in joints {
            if JointRepo::save(pool, joint).await? {
                saved += 1;
            }
        }
        Ok(saved)
    }

    /// Fetch the history of our addresses; skipped when no wallet is registered
    pub async fn refresh_history(
        pool: &DbPool,
        hub: &HubClient,
        configured_witnesses: &[String],
    ) -> DomainResult<Vec<String>> {
        let witnesses = resolve_witnesses(pool, configured_witnesses, hub).await?;
        let addresses = WalletRepo::addresses(pool).await?;
        if addresses.is_empty() {
            return Ok(witnesses);
        }

        let joints = hub.get_history(&addresses, &witnesses).await?;
        let saved = Self::save_joints(pool, &joints).await?;
        info!(received = joints.len(), saved, "History refreshed");
        Ok(witnesses)
    }

    /// Full catch-up: history of our addresses plus whatever the hub pushes within `window`
    pub async fn synchronize(
        pool: &DbPool,
        hub: &mut HubClient,
        configured_witnesses: &[String],
        window: Duration,
    ) -> DomainResult<usize> {
        Self::refresh_history(pool, hub, configured_witnesses).await?;

        let pushed = hub.drain_joints(window).await;
        let saved = Self::save_joints(pool, &pushed).await?;
        info!(pushed = pushed.len(), saved, "Database is synced");
        Ok(saved)
    }
}
