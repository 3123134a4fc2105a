//! Size metric the ledger charges fees on
//!
//! Strings count their length, numbers 8 bytes, booleans 1 byte. Object keys
//! add their own length only for unit versions after the key-less ones.

use crate::domain::{DomainError, DomainResult, Unit};
use serde_json::Value;

/// Fixed size charged for the parent list regardless of its actual content
pub const PARENT_UNITS_SIZE: u64 = 2 * 44;

/// Unit versions whose size metric ignores object keys
const VERSIONS_WITHOUT_KEY_SIZES: [&str; 2] = ["1.0", "2.0"];

/// Whether object keys count towards the size of a unit of `version`
pub fn counts_keys(version: &str) -> bool {
    !VERSIONS_WITHOUT_KEY_SIZES.contains(&version)
}

pub fn length(value: &Value, with_keys: bool) -> u64 {
    match value {
        Value::Null => 0,
        Value::String(s) => s.encode_utf16().count() as u64,
        Value::Number(_) => 8,
        Value::Bool(_) => 1,
        Value::Array(items) => items.iter().map(|v| length(v, with_keys)).sum(),
        Value::Object(map) => map
            .iter()
            .map(|(key, v)| {
                let key_len = if with_keys { key.encode_utf16().count() as u64 } else { 0 };
                key_len + length(v, with_keys)
            })
            .sum(),
    }
}

/// Size of everything except the messages, paid as headers commission
pub fn headers_size(unit: &Unit) -> DomainResult<u64> {
    let mut header = unit.to_value()?;
    let obj = header
        .as_object_mut()
        .ok_or_else(|| DomainError::payload("unit is not a JSON object"))?;

    for field in [
        "unit",
        "headers_commission",
        "payload_commission",
        "main_chain_index",
        "timestamp",
        "messages",
        "parent_units",
    ] {
        obj.remove(field);
    }

    Ok(length(&header, counts_keys(&unit.version)) + PARENT_UNITS_SIZE)
}

/// Size of the messages, paid as payload commission
pub fn total_payload_size(unit: &Unit) -> DomainResult<u64> {
    Ok(length(
        &serde_json::to_value(&unit.messages)?,
        counts_keys(&unit.version),
    ))
}
