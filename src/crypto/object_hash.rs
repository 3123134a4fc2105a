//! Canonical hashing of JSON values and units
//!
//! Every hash in the ledger is computed over a "source string": a flat,
//! NUL-separated rendering of a JSON value where strings are tagged `s`,
//! numbers `n`, booleans `b`, arrays are bracketed and object keys are
//! sorted. Null values, empty arrays and empty objects cannot be hashed.

use super::chash::chash160;
use crate::domain::{Definition, DomainError, DomainResult, Unit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Map, Number, Value};
use sha2::{Digest, Sha256};

const SEPARATOR: &str = "\0";

/// Render a JSON value as its canonical source string
pub fn source_string(value: &Value) -> DomainResult<String> {
    let mut components = Vec::new();
    extract_components(value, &mut components)?;
    Ok(components.join(SEPARATOR))
}

fn extract_components(value: &Value, components: &mut Vec<String>) -> DomainResult<()> {
    match value {
        Value::String(s) => {
            components.push("s".to_string());
            components.push(s.clone());
        }
        Value::Number(n) => {
            components.push("n".to_string());
            components.push(format_number(n));
        }
        Value::Bool(b) => {
            components.push("b".to_string());
            components.push(b.to_string());
        }
        Value::Array(items) => {
            if items.is_empty() {
                return Err(DomainError::payload("empty array in hashed object"));
            }
            components.push("[".to_string());
            for item in items {
                extract_components(item, components)?;
            }
            components.push("]".to_string());
        }
        Value::Object(map) => {
            if map.is_empty() {
                return Err(DomainError::payload("empty object in hashed object"));
            }
            // keys are ordered by UTF-16 code units, as the ledger's peers sort them
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));
            for key in keys {
                components.push(key.clone());
                extract_components(&map[key], components)?;
            }
        }
        Value::Null => {
            return Err(DomainError::payload("null value in hashed object"));
        }
    }
    Ok(())
}

/// Largest integer a peer's double-precision number holds exactly
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

fn format_number(n: &Number) -> String {
    match (n.as_u64(), n.as_i64()) {
        (Some(u), _) if u <= MAX_SAFE_INTEGER => u.to_string(),
        (_, Some(i)) if i.unsigned_abs() <= MAX_SAFE_INTEGER => i.to_string(),
        _ => n.as_f64().map(format_double).unwrap_or_else(|| n.to_string()),
    }
}

/// Shortest round-trip rendering of a double in the peers' notation:
/// plain digits for exponents in [-7, 21), `d.ddde+x` outside
fn format_double(f: f64) -> String {
    if f == 0.0 {
        return "0".to_string();
    }
    if !f.is_finite() {
        return f.to_string();
    }

    let sign = if f < 0.0 { "-" } else { "" };
    // `{:e}` yields the shortest digits that round-trip, e.g. "1.2345e-7"
    let sci = format!("{:e}", f.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);

    let k = digits.len() as i32;
    let n = exponent + 1;

    let body = if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        format!("{}.{}", &digits[..n as usize], &digits[n as usize..])
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let exp_sign = if n - 1 < 0 { "-" } else { "+" };
        let exp = (n - 1).abs();
        if k == 1 {
            format!("{}e{}{}", digits, exp_sign, exp)
        } else {
            format!("{}.{}e{}{}", &digits[..1], &digits[1..], exp_sign, exp)
        }
    };
    format!("{}{}", sign, body)
}

/// SHA-256 of the source string
pub fn sha256(value: &Value) -> DomainResult<[u8; 32]> {
    let source = source_string(value)?;
    Ok(Sha256::digest(source.as_bytes()).into())
}

/// Base64 SHA-256 of the source string (44 chars)
pub fn base64_hash(value: &Value) -> DomainResult<String> {
    Ok(BASE64.encode(sha256(value)?))
}

/// chash160 of the source string
pub fn chash160_of(value: &Value) -> DomainResult<String> {
    Ok(chash160(&source_string(value)?))
}

/// Address controlled by a definition
pub fn definition_address(definition: &Definition) -> DomainResult<String> {
    chash160_of(&definition.to_value())
}

/// Device address derived from a base64 device public key
pub fn device_address(pubkey: &str) -> DomainResult<String> {
    Ok(format!("0{}", chash160_of(&Value::String(pubkey.to_string()))?))
}

/// The unit without its hash, commissions and message payloads
pub fn naked_unit(unit: &Unit) -> DomainResult<Value> {
    let mut value = unit.to_value()?;
    let obj = as_object_mut(&mut value)?;

    for field in [
        "unit",
        "headers_commission",
        "payload_commission",
        "main_chain_index",
        "timestamp",
    ] {
        obj.remove(field);
    }

    if let Some(Value::Array(messages)) = obj.get_mut("messages") {
        for message in messages.iter_mut() {
            if let Value::Object(m) = message {
                m.remove("payload");
                m.remove("payload_uri");
            }
        }
    }

    Ok(value)
}

/// Digest every author signs: the naked unit without authentifiers
pub fn unit_hash_to_sign(unit: &Unit) -> DomainResult<[u8; 32]> {
    let mut value = naked_unit(unit)?;

    if let Some(Value::Array(authors)) = as_object_mut(&mut value)?.get_mut("authors") {
        for author in authors.iter_mut() {
            if let Value::Object(a) = author {
                a.remove("authentifiers");
            }
        }
    }

    sha256(&value)
}

/// Base64 hash of the naked unit, signatures included
pub fn unit_content_hash(unit: &Unit) -> DomainResult<String> {
    base64_hash(&naked_unit(unit)?)
}

/// Hash identifying the unit on the ledger
pub fn unit_hash(unit: &Unit) -> DomainResult<String> {
    let authors: Vec<Value> = unit
        .authors
        .iter()
        .map(|a| json!({ "address": a.address }))
        .collect();

    let mut stripped = Map::new();
    stripped.insert("content_hash".into(), Value::String(unit_content_hash(unit)?));
    stripped.insert("version".into(), Value::String(unit.version.clone()));
    stripped.insert("alt".into(), Value::String(unit.alt.clone()));
    stripped.insert("authors".into(), Value::Array(authors));

    if let Some(witness_list_unit) = &unit.witness_list_unit {
        stripped.insert("witness_list_unit".into(), Value::String(witness_list_unit.clone()));
    } else if !unit.witnesses.is_empty() {
        stripped.insert("witnesses".into(), json!(unit.witnesses));
    }

    if !unit.parent_units.is_empty() {
        stripped.insert("parent_units".into(), json!(unit.parent_units));
        if let Some(last_ball) = &unit.last_ball {
            stripped.insert("last_ball".into(), Value::String(last_ball.clone()));
        }
        if let Some(last_ball_unit) = &unit.last_ball_unit {
            stripped.insert("last_ball_unit".into(), Value::String(last_ball_unit.clone()));
        }
    }

    base64_hash(&Value::Object(stripped))
}

fn as_object_mut(value: &mut Value) -> DomainResult<&mut Map<String, Value>> {
    value
        .as_object_mut()
        .ok_or_else(|| DomainError::payload("unit is not a JSON object"))
}
