//! Composition of data and payment joints
//!
//! A unit always carries a payment message: it pays the headers and payload
//! commissions out of the author's unspent outputs and returns the change to
//! the author. Sizes are measured with placeholder hashes and signatures of
//! the final length, so the fee computed before signing is exact.

use super::signer::Signer;
use crate::crypto::is_chash_valid;
use crate::crypto::object_hash::{base64_hash, unit_hash};
use crate::crypto::object_length::{headers_size, total_payload_size};
use crate::domain::unit::{APP_DATA, APP_PAYMENT, TOTAL_SUPPLY};
use crate::domain::{
    Author, DomainError, DomainResult, Input, Joint, Message, Output, PaymentPayload, Unit,
};
use crate::network::{HubClient, ParentsInfo};
use crate::storage::{DbPool, JointRepo, WitnessRepo};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

const HASH_LENGTH: usize = 44;

/// Where parents, last ball and the witness list come from
#[async_trait]
pub trait ParentsSource: Send + Sync {
    async fn witnesses(&self) -> DomainResult<Vec<String>>;

    async fn parents(&self, witnesses: &[String]) -> DomainResult<ParentsInfo>;
}

#[async_trait]
impl ParentsSource for HubClient {
    async fn witnesses(&self) -> DomainResult<Vec<String>> {
        self.get_witnesses().await
    }

    async fn parents(&self, witnesses: &[String]) -> DomainResult<ParentsInfo> {
        self.get_parents(witnesses).await
    }
}

/// Configured witnesses, else the stored list, else the hub's (which is then stored)
pub async fn resolve_witnesses(
    pool: &DbPool,
    configured: &[String],
    source: &dyn ParentsSource,
) -> DomainResult<Vec<String>> {
    if !configured.is_empty() {
        return Ok(configured.to_vec());
    }

    let stored = WitnessRepo::get(pool).await?;
    if !stored.is_empty() {
        return Ok(stored);
    }

    let fetched = source.witnesses().await?;
    if fetched.is_empty() {
        return Err(DomainError::network("hub returned an empty witness list"));
    }
    WitnessRepo::set(pool, &fetched).await?;
    info!(count = fetched.len(), "Stored witness list from hub");
    Ok(fetched)
}

pub struct Composer<'a> {
    pool: &'a DbPool,
    parents: &'a dyn ParentsSource,
    signer: &'a dyn Signer,
    witnesses: Vec<String>,
}

impl<'a> Composer<'a> {
    pub fn new(
        pool: &'a DbPool,
        parents: &'a dyn ParentsSource,
        signer: &'a dyn Signer,
        witnesses: Vec<String>,
    ) -> Self {
        Self {
            pool,
            parents,
            signer,
            witnesses,
        }
    }

    /// A unit attaching `payload` as a data message, fees paid by `from_address`
    pub async fn compose_data_joint(&self, from_address: &str, payload: Value) -> DomainResult<Joint> {
        match &payload {
            Value::Object(map) if !map.is_empty() => {}
            _ => return Err(DomainError::payload("data payload must be a non-empty JSON object")),
        }
        // fails early on nulls and empty containers
        base64_hash(&payload)?;

        let message = Message::inline(APP_DATA, payload);
        self.compose_joint(from_address, Vec::new(), vec![message]).await
    }

    /// A unit paying `outputs` from `from_address`
    pub async fn compose_payment_joint(&self, from_address: &str, outputs: Vec<Output>) -> DomainResult<Joint> {
        if outputs.is_empty() {
            return Err(DomainError::payload("no outputs to pay"));
        }
        for output in &outputs {
            if !is_chash_valid(&output.address) {
                return Err(DomainError::InvalidAddress(output.address.clone()));
            }
            if output.amount == 0 || output.amount > TOTAL_SUPPLY {
                return Err(DomainError::payload(format!(
                    "amount {} paid to {} must be between 1 and {}",
                    output.amount, output.address, TOTAL_SUPPLY
                )));
            }
        }
        let total = outputs
            .iter()
            .try_fold(0u64, |sum, o| sum.checked_add(o.amount))
            .filter(|total| *total <= TOTAL_SUPPLY);
        if total.is_none() {
            return Err(DomainError::payload(format!(
                "total paid exceeds the supply of {}",
                TOTAL_SUPPLY
            )));
        }

        self.compose_joint(from_address, outputs, Vec::new()).await
    }

    async fn compose_joint(
        &self,
        from_address: &str,
        payee_outputs: Vec<Output>,
        extra_messages: Vec<Message>,
    ) -> DomainResult<Joint> {
        let signing_paths = self.signer.signing_paths(from_address).await?;

        let mut author = Author::new(from_address);
        if !JointRepo::has_authored(self.pool, from_address).await? {
            let definition = self.signer.definition(from_address).await?;
            author.definition = Some(definition.to_value());
        }
        for (path, length) in &signing_paths {
            author.authentifiers.insert(path.clone(), "-".repeat(*length));
        }

        let parents = self.parents.parents(&self.witnesses).await?;
        let mut unit = Unit::new(vec![author], Vec::new());
        unit.parent_units = parents.parent_units;
        unit.last_ball = Some(parents.last_ball);
        unit.last_ball_unit = Some(parents.last_ball_unit);
        match parents.witness_list_unit {
            Some(witness_list_unit) => unit.witness_list_unit = Some(witness_list_unit),
            None => unit.witnesses = self.witnesses.clone(),
        }

        let spendable = JointRepo::spendable_outputs(self.pool, from_address).await?;
        let available = spendable
            .iter()
            .try_fold(0u64, |sum, o| sum.checked_add(o.amount()))
            .ok_or_else(|| DomainError::payload("stored outputs overflow"))?;
        let target = payee_outputs
            .iter()
            .try_fold(0u64, |sum, o| sum.checked_add(o.amount))
            .ok_or_else(|| DomainError::payload("payment amounts overflow"))?;

        let mut outputs = payee_outputs;
        outputs.push(Output::new(from_address, 0));

        let mut inputs = Vec::new();
        let mut total_input = 0u64;
        let mut candidates = spendable.iter();

        // inputs are added oldest first until they cover amounts, fees and a non-zero change
        let (headers_commission, payload_commission) = loop {
            unit.messages = build_messages(&inputs, &outputs, &extra_messages, false)?;
            let headers = headers_size(&unit)?;
            let payload = total_payload_size(&unit)?;
            let required = target
                .checked_add(headers)
                .and_then(|r| r.checked_add(payload))
                .ok_or_else(|| DomainError::payload("required amount overflows"))?;

            if total_input > required {
                break (headers, payload);
            }
            match candidates.next() {
                Some(output) => {
                    inputs.push(Input::transfer(
                        output.unit.clone(),
                        output.message_index as u32,
                        output.output_index as u32,
                    ));
                    total_input = total_input
                        .checked_add(output.amount())
                        .ok_or_else(|| DomainError::payload("input total overflows"))?;
                }
                None => {
                    return Err(DomainError::NotEnoughFunds {
                        address: from_address.to_string(),
                        required: required.saturating_add(1),
                        available,
                    })
                }
            }
        };

        // loop exit guarantees total_input > target + commissions
        let change = total_input - target - headers_commission - payload_commission;
        if let Some(change_output) = outputs.last_mut() {
            change_output.amount = change;
        }
        outputs.sort_by(|a, b| a.address.cmp(&b.address).then(a.amount.cmp(&b.amount)));
        debug!(inputs = inputs.len(), total_input, change, "Selected inputs");

        unit.messages = build_messages(&inputs, &outputs, &extra_messages, true)?;
        unit.headers_commission = Some(headers_commission);
        unit.payload_commission = Some(payload_commission);

        let mut authentifiers = BTreeMap::new();
        for path in signing_paths.keys() {
            let signature = self.signer.sign(&unit, from_address, path).await?;
            authentifiers.insert(path.clone(), signature);
        }
        for author in unit.authors.iter_mut() {
            author.authentifiers = authentifiers.clone();
        }

        let hash = unit_hash(&unit)?;
        info!(
            unit = %hash,
            headers_commission,
            payload_commission,
            "Composed unit"
        );
        unit.unit = Some(hash);
        Ok(Joint::new(unit))
    }
}

/// Payment message first, then any other messages; real payload hashes only when `final_hashes`
fn build_messages(
    inputs: &[Input],
    outputs: &[Output],
    extra: &[Message],
    final_hashes: bool,
) -> DomainResult<Vec<Message>> {
    let payment = PaymentPayload {
        asset: None,
        inputs: inputs.to_vec(),
        outputs: outputs.to_vec(),
    };

    let mut messages = Vec::with_capacity(extra.len() + 1);
    messages.push(Message::inline(APP_PAYMENT, payment.to_value()?));
    messages.extend(extra.iter().cloned());

    for message in messages.iter_mut() {
        message.payload_hash = match (&message.payload, final_hashes) {
            (Some(payload), true) => base64_hash(payload)?,
            _ => "-".repeat(HASH_LENGTH),
        };
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::signer::KeySigner;
    use crate::crypto::object_hash::unit_hash_to_sign;
    use crate::crypto::{Ecdsa, HdWallet};
    use crate::domain::WalletPath;
    use crate::storage::ledger_db::setup_test_db;
    use serde_json::json;

    const TEST_MNEMONIC: &str =
        "bottom drive obey lake curtain smoke basket hold race lonely fit walk";

    struct StubParents {
        witness_list_unit: Option<String>,
    }

    #[async_trait]
    impl ParentsSource for StubParents {
        async fn witnesses(&self) -> DomainResult<Vec<String>> {
            Ok(vec!["WITNESS1".to_string(), "WITNESS2".to_string()])
        }

        async fn parents(&self, _witnesses: &[String]) -> DomainResult<ParentsInfo> {
            Ok(ParentsInfo {
                parent_units: vec!["PARENT1".to_string(), "PARENT2".to_string()],
                last_ball: "LASTBALL".to_string(),
                last_ball_unit: "LASTBALLUNIT".to_string(),
                witness_list_unit: self.witness_list_unit.clone(),
            })
        }
    }

    fn stub() -> StubParents {
        StubParents {
            witness_list_unit: Some("WLU".to_string()),
        }
    }

    fn wallet() -> HdWallet {
        HdWallet::from_mnemonic(TEST_MNEMONIC, "").unwrap()
    }

    async fn fund(pool: &DbPool, hash: &str, address: &str, amounts: &[u64]) {
        let payload = PaymentPayload {
            asset: None,
            inputs: vec![Input::transfer("GENESIS", 0, 0)],
            outputs: amounts.iter().map(|a| Output::new(address, *a)).collect(),
        };
        let mut unit = Unit::new(
            vec![Author::new("FAUCET")],
            vec![Message::inline(APP_PAYMENT, payload.to_value().unwrap())],
        );
        unit.unit = Some(hash.to_string());
        JointRepo::save(pool, &Joint::new(unit)).await.unwrap();
    }

    fn payment_of(unit: &Unit) -> PaymentPayload {
        unit.messages
            .iter()
            .find(|m| m.is_payment())
            .unwrap()
            .payment_payload()
            .unwrap()
    }

    async fn input_total(pool: &DbPool, address: &str, payment: &PaymentPayload) -> u64 {
        let outputs = JointRepo::spendable_outputs(pool, address).await.unwrap();
        payment
            .inputs
            .iter()
            .map(|i| {
                outputs
                    .iter()
                    .find(|o| Some(&o.unit) == i.unit.as_ref() && Some(o.output_index as u32) == i.output_index)
                    .unwrap()
                    .amount()
            })
            .sum()
    }

    #[tokio::test]
    async fn test_compose_data_joint() {
        let pool = setup_test_db().await;
        let signer = KeySigner::new(wallet().signing_key().unwrap()).unwrap();
        let address = signer.address().to_string();
        fund(&pool, "FUND", &address, &[100_000]).await;

        let parents = stub();
        let composer = Composer::new(&pool, &parents, &signer, vec!["WITNESS1".to_string()]);
        let joint = composer
            .compose_data_joint(&address, json!({"age": 78, "name": "Tom"}))
            .await
            .unwrap();
        let unit = &joint.unit;

        assert_eq!(unit.messages.len(), 2);
        assert!(unit.messages[0].is_payment());
        let data = &unit.messages[1];
        assert!(data.is_data());
        assert_eq!(data.payload_hash, base64_hash(&json!({"age": 78, "name": "Tom"})).unwrap());

        assert_eq!(unit.parent_units, vec!["PARENT1", "PARENT2"]);
        assert_eq!(unit.witness_list_unit.as_deref(), Some("WLU"));
        assert!(unit.witnesses.is_empty());

        // first unit of the address reveals its definition
        let author = &unit.authors[0];
        assert_eq!(author.definition, Some(wallet().signing_key().unwrap().definition().to_value()));

        let signature = &author.authentifiers["r"];
        let digest = unit_hash_to_sign(unit).unwrap();
        let pubkey = wallet().signing_key().unwrap().public_key();
        assert!(Ecdsa::verify(&digest, signature, &pubkey));
        assert_eq!(joint.unit_hash().unwrap(), unit_hash(unit).unwrap());

        // inputs cover change and fees exactly
        let payment = payment_of(unit);
        assert_eq!(payment.outputs, vec![Output::new(&address, 100_000 - unit.commissions())]);
        assert_eq!(input_total(&pool, &address, &payment).await, 100_000);
        assert_eq!(unit.headers_commission, Some(headers_size(unit).unwrap()));
        assert_eq!(unit.payload_commission, Some(total_payload_size(unit).unwrap()));
    }

    #[tokio::test]
    async fn test_compose_payment_joint() {
        let pool = setup_test_db().await;
        let wallet = wallet();
        let signer = KeySigner::new(wallet.signing_key().unwrap()).unwrap();
        let address = signer.address().to_string();
        let payee = wallet.address_key(&WalletPath::new(0, 0, 1)).unwrap().address().unwrap();

        fund(&pool, "FUND1", &address, &[3_000]).await;
        fund(&pool, "FUND2", &address, &[10_000]).await;

        let parents = StubParents {
            witness_list_unit: None,
        };
        let witnesses = vec!["WITNESS1".to_string(), "WITNESS2".to_string()];
        let composer = Composer::new(&pool, &parents, &signer, witnesses.clone());

        let joint = composer
            .compose_payment_joint(&address, vec![Output::new(&payee, 5_000)])
            .await
            .unwrap();
        let unit = &joint.unit;
        assert_eq!(unit.witnesses, witnesses);
        assert_eq!(unit.messages.len(), 1);

        let payment = payment_of(unit);
        // oldest output first, the second one is needed to cover the amount
        assert_eq!(payment.inputs.len(), 2);
        assert_eq!(payment.inputs[0].unit.as_deref(), Some("FUND1"));

        let total_out: u64 = payment.outputs.iter().map(|o| o.amount).sum();
        assert_eq!(input_total(&pool, &address, &payment).await, total_out + unit.commissions());
        assert!(payment.outputs.contains(&Output::new(&payee, 5_000)));

        let mut sorted = payment.outputs.clone();
        sorted.sort_by(|a, b| a.address.cmp(&b.address));
        assert_eq!(payment.outputs, sorted);
    }

    #[tokio::test]
    async fn test_definition_omitted_after_first_unit() {
        let pool = setup_test_db().await;
        let signer = KeySigner::new(wallet().signing_key().unwrap()).unwrap();
        let address = signer.address().to_string();
        fund(&pool, "FUND", &address, &[50_000]).await;

        let parents = stub();
        let composer = Composer::new(&pool, &parents, &signer, Vec::new());
        let first = composer.compose_data_joint(&address, json!({"n": 1})).await.unwrap();
        JointRepo::save(&pool, &first).await.unwrap();

        let second = composer.compose_data_joint(&address, json!({"n": 2})).await.unwrap();
        assert!(second.unit.authors[0].definition.is_none());
        // the change of the first unit funds the second
        assert_eq!(payment_of(&second.unit).inputs[0].unit.as_deref(), first.unit.unit.as_deref());
    }

    #[tokio::test]
    async fn test_not_enough_funds() {
        let pool = setup_test_db().await;
        let wallet = wallet();
        let signer = KeySigner::new(wallet.signing_key().unwrap()).unwrap();
        let address = signer.address().to_string();
        let payee = wallet.address_key(&WalletPath::new(0, 0, 1)).unwrap().address().unwrap();
        fund(&pool, "FUND", &address, &[1_000]).await;

        let parents = stub();
        let composer = Composer::new(&pool, &parents, &signer, Vec::new());
        let result = composer
            .compose_payment_joint(&address, vec![Output::new(&payee, 900)])
            .await;

        match result {
            Err(DomainError::NotEnoughFunds { available, required, .. }) => {
                assert_eq!(available, 1_000);
                assert!(required > 1_000);
            }
            other => panic!("expected NotEnoughFunds, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejects_amounts_beyond_supply() {
        let pool = setup_test_db().await;
        let wallet = wallet();
        let signer = KeySigner::new(wallet.signing_key().unwrap()).unwrap();
        let address = signer.address().to_string();
        let payee = wallet.address_key(&WalletPath::new(0, 0, 1)).unwrap().address().unwrap();
        fund(&pool, "FUND", &address, &[100_000]).await;

        let parents = stub();
        let composer = Composer::new(&pool, &parents, &signer, Vec::new());

        assert!(matches!(
            composer.compose_payment_joint(&address, vec![Output::new(&payee, u64::MAX)]).await,
            Err(DomainError::InvalidPayload(_))
        ));
        let split = vec![
            Output::new(&payee, TOTAL_SUPPLY),
            Output::new(&address, TOTAL_SUPPLY),
        ];
        assert!(matches!(
            composer.compose_payment_joint(&address, split).await,
            Err(DomainError::InvalidPayload(_))
        ));

        // the whole supply is a valid amount, just not one this address holds
        assert!(matches!(
            composer.compose_payment_joint(&address, vec![Output::new(&payee, TOTAL_SUPPLY)]).await,
            Err(DomainError::NotEnoughFunds { available: 100_000, .. })
        ));
    }

    #[tokio::test]
    async fn test_rejects_bad_requests() {
        let pool = setup_test_db().await;
        let signer = KeySigner::new(wallet().signing_key().unwrap()).unwrap();
        let address = signer.address().to_string();
        let parents = stub();
        let composer = Composer::new(&pool, &parents, &signer, Vec::new());

        assert!(matches!(
            composer.compose_payment_joint(&address, vec![Output::new("NOT-AN-ADDRESS", 10)]).await,
            Err(DomainError::InvalidAddress(_))
        ));
        assert!(composer.compose_data_joint(&address, json!([1, 2])).await.is_err());
        assert!(composer.compose_data_joint(&address, json!({"a": null})).await.is_err());

        let foreign = wallet().address_key(&WalletPath::new(0, 0, 1)).unwrap().address().unwrap();
        assert!(matches!(
            composer.compose_data_joint(&foreign, json!({"a": 1})).await,
            Err(DomainError::AddressMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_witnesses_order() {
        let pool = setup_test_db().await;
        let source = stub();

        let configured = vec!["CONF".to_string()];
        assert_eq!(resolve_witnesses(&pool, &configured, &source).await.unwrap(), configured);

        let fetched = resolve_witnesses(&pool, &[], &source).await.unwrap();
        assert_eq!(fetched, vec!["WITNESS1", "WITNESS2"]);
        assert_eq!(WitnessRepo::get(&pool).await.unwrap(), fetched);
    }
}
