use super::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Length of a base64-encoded 64-byte signature
pub const SIG_LENGTH: usize = 88;

/// Length of a base64-encoded 33-byte compressed public key
pub const PUBKEY_LENGTH: usize = 44;

/// Signing path of a single-key definition
pub const SINGLE_SIG_PATH: &str = "r";

/// Expected signature length keyed by signing path
pub type SigningPaths = BTreeMap<String, usize>;

/// Signing paths of a single-key address: `{ "r": 88 }`
pub fn single_sig_paths() -> SigningPaths {
    let mut paths = SigningPaths::new();
    paths.insert(SINGLE_SIG_PATH.to_string(), SIG_LENGTH);
    paths
}

/// Spending definition of a single-key address
///
/// Serialized as `["sig", {"pubkey": "<base64>"}]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Value", try_from = "Value")]
pub struct Definition {
    pub pubkey: String,
}

impl Definition {
    pub fn sig(pubkey: impl Into<String>) -> Self {
        Self {
            pubkey: pubkey.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        json!(["sig", { "pubkey": self.pubkey }])
    }

    pub fn from_value(value: &Value) -> DomainResult<Self> {
        let invalid = || DomainError::payload(format!("unsupported definition: {}", value));

        let arr = value.as_array().ok_or_else(invalid)?;
        if arr.len() != 2 || arr[0].as_str() != Some("sig") {
            return Err(invalid());
        }

        let params = arr[1].as_object().ok_or_else(invalid)?;
        if params.len() != 1 {
            return Err(invalid());
        }
        let pubkey = params
            .get("pubkey")
            .and_then(Value::as_str)
            .ok_or_else(invalid)?;

        if pubkey.len() != PUBKEY_LENGTH {
            return Err(DomainError::payload(format!(
                "wrong pubkey length {} (expected {})",
                pubkey.len(),
                PUBKEY_LENGTH
            )));
        }

        Ok(Self::sig(pubkey))
    }
}

impl From<Definition> for Value {
    fn from(definition: Definition) -> Self {
        definition.to_value()
    }
}

impl TryFrom<Value> for Definition {
    type Error = DomainError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}
