//! Peer wire format
//!
//! Every WebSocket text frame is a two-element JSON array: the message type
//! followed by its content.
//!
//! ```text
//! ["justsaying", {"subject": "joint", "body": {...}}]
//! ["request", {"command": "get_witnesses", "tag": "..."}]
//! ["response", {"tag": "...", "response": [...]}]
//! ```

use crate::domain::{DomainError, DomainResult, Joint};
use serde::Deserialize;
use serde_json::{json, Map, Value};

pub const JUSTSAYING: &str = "justsaying";
pub const REQUEST: &str = "request";
pub const RESPONSE: &str = "response";

pub const SUBJECT_VERSION: &str = "version";
pub const SUBJECT_JOINT: &str = "joint";

pub const CMD_HEARTBEAT: &str = "heartbeat";
pub const CMD_GET_WITNESSES: &str = "get_witnesses";
pub const CMD_GET_PARENTS: &str = "light/get_parents_and_last_ball_and_witness_list_unit";
pub const CMD_GET_HISTORY: &str = "light/get_history";

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    JustSaying {
        subject: String,
        body: Option<Value>,
    },
    Request {
        command: String,
        params: Option<Value>,
        tag: String,
    },
    Response {
        tag: String,
        response: Option<Value>,
    },
}

impl WireMessage {
    pub fn justsaying(subject: &str, body: Option<Value>) -> Self {
        Self::JustSaying {
            subject: subject.to_string(),
            body,
        }
    }

    pub fn request(command: &str, params: Option<Value>, tag: impl Into<String>) -> Self {
        Self::Request {
            command: command.to_string(),
            params,
            tag: tag.into(),
        }
    }

    pub fn response(tag: impl Into<String>, response: Option<Value>) -> Self {
        Self::Response {
            tag: tag.into(),
            response,
        }
    }

    /// Announcement sent right after connecting
    pub fn version() -> Self {
        Self::justsaying(
            SUBJECT_VERSION,
            Some(json!({
                "protocol_version": PROTOCOL_VERSION,
                "alt": crate::domain::unit::UNIT_ALT,
                "library": env!("CARGO_PKG_NAME"),
                "library_version": env!("CARGO_PKG_VERSION"),
                "program": env!("CARGO_PKG_NAME"),
                "program_version": env!("CARGO_PKG_VERSION"),
            })),
        )
    }

    pub fn joint(joint: &Joint) -> DomainResult<Self> {
        Ok(Self::justsaying(SUBJECT_JOINT, Some(serde_json::to_value(joint)?)))
    }

    pub fn to_value(&self) -> Value {
        let mut content = Map::new();
        let kind = match self {
            Self::JustSaying { subject, body } => {
                content.insert("subject".into(), Value::String(subject.clone()));
                if let Some(body) = body {
                    content.insert("body".into(), body.clone());
                }
                JUSTSAYING
            }
            Self::Request { command, params, tag } => {
                content.insert("command".into(), Value::String(command.clone()));
                if let Some(params) = params {
                    content.insert("params".into(), params.clone());
                }
                content.insert("tag".into(), Value::String(tag.clone()));
                REQUEST
            }
            Self::Response { tag, response } => {
                content.insert("tag".into(), Value::String(tag.clone()));
                if let Some(response) = response {
                    content.insert("response".into(), response.clone());
                }
                RESPONSE
            }
        };
        json!([kind, content])
    }

    pub fn to_text(&self) -> String {
        self.to_value().to_string()
    }

    pub fn from_text(text: &str) -> DomainResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Array(mut parts) = value else {
            return Err(DomainError::network("message is not an array"));
        };
        if parts.len() != 2 {
            return Err(DomainError::network(format!(
                "message has {} elements, expected 2",
                parts.len()
            )));
        }

        let content = parts.pop().unwrap_or(Value::Null);
        let kind = parts.pop().unwrap_or(Value::Null);
        let Value::Object(mut content) = content else {
            return Err(DomainError::network("message content is not an object"));
        };

        match kind.as_str() {
            Some(JUSTSAYING) => Ok(Self::JustSaying {
                subject: take_string(&mut content, "subject")?,
                body: content.remove("body"),
            }),
            Some(REQUEST) => Ok(Self::Request {
                command: take_string(&mut content, "command")?,
                params: content.remove("params"),
                tag: take_string(&mut content, "tag")?,
            }),
            Some(RESPONSE) => Ok(Self::Response {
                tag: take_string(&mut content, "tag")?,
                response: content.remove("response"),
            }),
            _ => Err(DomainError::network(format!("unknown message type {}", kind))),
        }
    }
}

fn take_string(content: &mut Map<String, Value>, field: &str) -> DomainResult<String> {
    match content.remove(field) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(DomainError::network(format!("message without {}", field))),
    }
}

/// Parents, last ball and witness list for a new unit
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParentsInfo {
    pub parent_units: Vec<String>,
    #[serde(rename = "last_stable_mc_ball")]
    pub last_ball: String,
    #[serde(rename = "last_stable_mc_ball_unit")]
    pub last_ball_unit: String,
    #[serde(default)]
    pub witness_list_unit: Option<String>,
}

/// Joints returned by a light history request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub joints: Vec<Joint>,
    #[serde(default)]
    pub unstable_mc_joints: Vec<Joint>,
}
