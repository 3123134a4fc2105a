//! Ledger units and joints as they travel over the wire
//!
//! Field names match the ledger's JSON representation so a `Unit` can be
//! hashed, signed and broadcast without any translation layer.

use super::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const UNIT_VERSION: &str = "1.0";
pub const UNIT_ALT: &str = "1";

/// Bytes in existence; no amount can exceed it
pub const TOTAL_SUPPLY: u64 = 1_000_000_000_000_000;

pub const APP_DATA: &str = "data";
pub const APP_PAYMENT: &str = "payment";
pub const PAYLOAD_INLINE: &str = "inline";

/// A (possibly unsigned) ledger unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub version: String,
    pub alt: String,
    pub messages: Vec<Message>,
    pub authors: Vec<Author>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_units: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ball: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ball_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness_list_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub witnesses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers_commission: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_commission: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Unit {
    /// An empty unit of the current version, ready to be filled by the composer
    pub fn new(authors: Vec<Author>, messages: Vec<Message>) -> Self {
        Self {
            version: UNIT_VERSION.to_string(),
            alt: UNIT_ALT.to_string(),
            messages,
            authors,
            parent_units: Vec::new(),
            last_ball: None,
            last_ball_unit: None,
            witness_list_unit: None,
            witnesses: Vec::new(),
            headers_commission: None,
            payload_commission: None,
            unit: None,
        }
    }

    pub fn to_value(&self) -> DomainResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Total fee paid by the author(s)
    pub fn commissions(&self) -> u64 {
        self.headers_commission
            .unwrap_or(0)
            .saturating_add(self.payload_commission.unwrap_or(0))
    }
}

/// One author of a unit with its signatures keyed by signing path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub address: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub authentifiers: BTreeMap<String, String>,
    /// Any definition shape may arrive from peers; only `sig` ones are produced here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Value>,
}

impl Author {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            authentifiers: BTreeMap::new(),
            definition: None,
        }
    }
}

/// A message carried by a unit; `payload` is absent once stripped for hashing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub app: String,
    pub payload_location: String,
    pub payload_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Message {
    /// An inline message; the payload hash is filled in by the composer
    pub fn inline(app: &str, payload: Value) -> Self {
        Self {
            app: app.to_string(),
            payload_location: PAYLOAD_INLINE.to_string(),
            payload_hash: String::new(),
            payload: Some(payload),
        }
    }

    pub fn is_data(&self) -> bool {
        self.app == APP_DATA
    }

    pub fn is_payment(&self) -> bool {
        self.app == APP_PAYMENT
    }

    /// Decode the payload of a payment message
    pub fn payment_payload(&self) -> DomainResult<PaymentPayload> {
        if !self.is_payment() {
            return Err(DomainError::payload(format!(
                "message app '{}' is not a payment",
                self.app
            )));
        }
        let payload = self
            .payload
            .clone()
            .ok_or_else(|| DomainError::payload("payment message without inline payload"))?;
        Ok(serde_json::from_value(payload)?)
    }
}

/// Payload of a payment message in the base asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
}

impl PaymentPayload {
    pub fn to_value(&self) -> DomainResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Reference to a previously created output being spent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_index: Option<u32>,
}

impl Input {
    pub fn transfer(unit: impl Into<String>, message_index: u32, output_index: u32) -> Self {
        Self {
            kind: None,
            unit: Some(unit.into()),
            message_index: Some(message_index),
            output_index: Some(output_index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub address: String,
    pub amount: u64,
}

impl Output {
    pub fn new(address: impl Into<String>, amount: u64) -> Self {
        Self {
            address: address.into(),
            amount,
        }
    }
}

/// A unit wrapped for transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub unit: Unit,
}

impl Joint {
    pub fn new(unit: Unit) -> Self {
        Self { unit }
    }

    /// Hash of the wrapped unit, present once the unit is complete
    pub fn unit_hash(&self) -> DomainResult<&str> {
        self.unit
            .unit
            .as_deref()
            .ok_or_else(|| DomainError::payload("joint carries a unit without hash"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unit_serialization_skips_empty_fields() {
        let unit = Unit::new(
            vec![Author::new("ADDRESS")],
            vec![Message::inline(APP_DATA, json!({"age": 78}))],
        );

        let value = unit.to_value().unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["alt"], "1");
        assert!(value.get("parent_units").is_none());
        assert!(value.get("unit").is_none());
        assert!(value["authors"][0].get("authentifiers").is_none());
        assert!(value["authors"][0].get("definition").is_none());
    }

    #[test]
    fn test_payment_payload_from_message() {
        let payload = PaymentPayload {
            asset: None,
            inputs: vec![Input::transfer("UNIT", 0, 1)],
            outputs: vec![Output::new("PAYEE", 1000)],
        };
        let message = Message::inline(APP_PAYMENT, payload.to_value().unwrap());

        assert!(message.is_payment());
        assert_eq!(message.payment_payload().unwrap(), payload);

        let data = Message::inline(APP_DATA, json!({"x": 1}));
        assert!(data.payment_payload().is_err());
    }

    #[test]
    fn test_joint_accepts_unknown_fields() {
        let raw = json!({
            "unit": {
                "version": "1.0",
                "alt": "1",
                "unit": "HASH",
                "timestamp": 1500000000,
                "main_chain_index": 42,
                "authors": [{"address": "A", "authentifiers": {"r": "sig"}}],
                "messages": [{
                    "app": "data",
                    "payload_location": "inline",
                    "payload_hash": "PH",
                    "payload": {"tag": "x"}
                }]
            },
            "ball": "BALL"
        });

        let joint: Joint = serde_json::from_value(raw).unwrap();
        assert_eq!(joint.unit_hash().unwrap(), "HASH");
        assert_eq!(joint.unit.authors[0].address, "A");
        assert!(joint.unit.messages[0].is_data());
    }

    #[test]
    fn test_issue_input_has_no_source() {
        let input: Input = serde_json::from_value(json!({"type": "issue", "serial_number": 1, "amount": 10})).unwrap();
        assert_eq!(input.kind.as_deref(), Some("issue"));
        assert!(input.unit.is_none());
    }
}
