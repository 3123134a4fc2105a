use crate::domain::{DomainResult, Joint};
use crate::network::HubClient;
use crate::storage::{DbPool, JointRepo};
use std::time::Duration;
use tracing::info;

/// Where a signed joint is sent
pub trait JointBroadcaster: Send + Sync {
    fn broadcast_joint(&self, joint: &Joint) -> DomainResult<()>;
}

impl JointBroadcaster for HubClient {
    fn broadcast_joint(&self, joint: &Joint) -> DomainResult<()> {
        HubClient::broadcast_joint(self, joint)
    }
}

/// Hand a signed joint to the network
pub struct Submission;

impl Submission {
    /// Broadcast, save locally once the frame is queued, then wait `linger`
    /// so it leaves before exit. There is no acknowledgement and no retry.
    pub async fn submit(
        pool: &DbPool,
        hub: &dyn JointBroadcaster,
        joint: &Joint,
        linger: Duration,
    ) -> DomainResult<()> {
        // a failed send must not leave our inputs marked as spent
        hub.broadcast_joint(joint)?;
        JointRepo::save(pool, joint).await?;

        info!(linger_ms = linger.as_millis() as u64, "Joint broadcast, lingering");
        tokio::time::sleep(linger).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::unit::{Author, Input, Message, PaymentPayload, Unit, APP_PAYMENT};
    use crate::domain::{DomainError, Output};
    use crate::storage::ledger_db::setup_test_db;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHub {
        fail: bool,
        sent: Mutex<Vec<String>>,
    }

    impl JointBroadcaster for RecordingHub {
        fn broadcast_joint(&self, joint: &Joint) -> DomainResult<()> {
            if self.fail {
                return Err(DomainError::network("connection to hub is closed"));
            }
            self.sent.lock().unwrap().push(joint.unit_hash()?.to_string());
            Ok(())
        }
    }

    async fn funded_spend(pool: &DbPool) -> Joint {
        let fund = PaymentPayload {
            asset: None,
            inputs: vec![],
            outputs: vec![Output::new("ME", 1_000)],
        };
        let mut unit = Unit::new(
            vec![Author::new("FAUCET")],
            vec![Message::inline(APP_PAYMENT, fund.to_value().unwrap())],
        );
        unit.unit = Some("FUND".to_string());
        JointRepo::save(pool, &Joint::new(unit)).await.unwrap();

        let spend = PaymentPayload {
            asset: None,
            inputs: vec![Input::transfer("FUND", 0, 0)],
            outputs: vec![Output::new("ME", 900)],
        };
        let mut unit = Unit::new(
            vec![Author::new("ME")],
            vec![Message::inline(APP_PAYMENT, spend.to_value().unwrap())],
        );
        unit.unit = Some("SPEND".to_string());
        Joint::new(unit)
    }

    #[tokio::test]
    async fn test_submit_saves_after_broadcast() {
        let pool = setup_test_db().await;
        let joint = funded_spend(&pool).await;
        let hub = RecordingHub::default();

        Submission::submit(&pool, &hub, &joint, Duration::ZERO).await.unwrap();

        assert_eq!(*hub.sent.lock().unwrap(), vec!["SPEND".to_string()]);
        let outputs = JointRepo::spendable_outputs(&pool, "ME").await.unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].unit, "SPEND");
    }

    #[tokio::test]
    async fn test_failed_broadcast_keeps_outputs_spendable() {
        let pool = setup_test_db().await;
        let joint = funded_spend(&pool).await;
        let hub = RecordingHub {
            fail: true,
            ..Default::default()
        };

        assert!(Submission::submit(&pool, &hub, &joint, Duration::ZERO).await.is_err());

        let outputs = JointRepo::spendable_outputs(&pool, "ME").await.unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].unit, "FUND");
        assert!(!JointRepo::has_authored(&pool, "ME").await.unwrap());
    }
}
