//! WebSocket client for the hub peer

use super::message::{
    HistoryResponse, ParentsInfo, WireMessage, CMD_GET_HISTORY, CMD_GET_PARENTS,
    CMD_GET_WITNESSES, CMD_HEARTBEAT, SUBJECT_JOINT,
};
use crate::domain::{DomainError, DomainResult, Joint};
use futures::{SinkExt, Stream, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

type PendingRequests = Arc<Mutex<HashMap<String, oneshot::Sender<Option<Value>>>>>;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// A single outbound connection to the hub
pub struct HubClient {
    url: String,
    outgoing: mpsc::UnboundedSender<Message>,
    pending: PendingRequests,
    joints: mpsc::UnboundedReceiver<Joint>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
    request_timeout: Duration,
    next_tag: AtomicU64,
}

impl HubClient {
    /// Connect and announce our protocol version
    pub async fn connect(url: &str, request_timeout: Duration) -> DomainResult<Self> {
        info!(url, "Connecting to hub");
        let (ws_stream, _response) = connect_async(url).await?;
        info!(url, "Connected to hub");

        let (mut write, read) = ws_stream.split();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let (joints_tx, joints) = mpsc::unbounded_channel();
        let pending: PendingRequests = Arc::new(Mutex::new(HashMap::new()));

        // queued first so it precedes any reply to the hub
        outgoing
            .send(Message::Text(WireMessage::version().to_text()))
            .map_err(|_| DomainError::network("connection to hub is closed"))?;

        let writer = tokio::spawn(async move {
            while let Some(msg) = outgoing_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = write.send(msg).await {
                    warn!(error = %e, "Failed to send to hub");
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let reader = tokio::spawn(read_loop(read, outgoing.clone(), pending.clone(), joints_tx));

        Ok(Self {
            url: url.to_string(),
            outgoing,
            pending,
            joints,
            reader,
            writer,
            request_timeout,
            next_tag: AtomicU64::new(1),
        })
    }

    fn send(&self, message: &WireMessage) -> DomainResult<()> {
        self.outgoing
            .send(Message::Text(message.to_text()))
            .map_err(|_| DomainError::network("connection to hub is closed"))
    }

    /// Send a request and wait for the response carrying the same tag
    pub async fn request(&self, command: &str, params: Option<Value>) -> DomainResult<Value> {
        let tag = format!("{}:{}", command, self.next_tag.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(tag.clone(), tx);

        debug!(command, tag = %tag, "Sending request");
        if let Err(e) = self.send(&WireMessage::request(command, params, tag.clone())) {
            self.pending.lock().await.remove(&tag);
            return Err(e);
        }

        let response = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(DomainError::network("connection closed before response")),
            Err(_) => {
                self.pending.lock().await.remove(&tag);
                return Err(DomainError::Timeout(command.to_string()));
            }
        };

        let response = response.unwrap_or(Value::Null);
        if let Some(error) = response.get("error") {
            let message = error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(DomainError::PeerRejected {
                command: command.to_string(),
                message,
            });
        }
        Ok(response)
    }

    /// Hand a joint to the hub; no acknowledgement is awaited
    pub fn broadcast_joint(&self, joint: &Joint) -> DomainResult<()> {
        let unit = joint.unit_hash()?;
        info!(unit, "Broadcasting joint");
        self.send(&WireMessage::joint(joint)?)
    }

    pub async fn get_witnesses(&self) -> DomainResult<Vec<String>> {
        let response = self.request(CMD_GET_WITNESSES, None).await?;
        Ok(serde_json::from_value(response)?)
    }

    pub async fn get_parents(&self, witnesses: &[String]) -> DomainResult<ParentsInfo> {
        let response = self
            .request(CMD_GET_PARENTS, Some(json!({ "witnesses": witnesses })))
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Joints touching the given addresses, stable ones first
    pub async fn get_history(&self, addresses: &[String], witnesses: &[String]) -> DomainResult<Vec<Joint>> {
        let response = self
            .request(
                CMD_GET_HISTORY,
                Some(json!({ "addresses": addresses, "witnesses": witnesses })),
            )
            .await?;

        let history: HistoryResponse = serde_json::from_value(response)?;
        let mut joints = history.joints;
        joints.extend(history.unstable_mc_joints);
        debug!(count = joints.len(), "Received history");
        Ok(joints)
    }

    /// Collect joints pushed by the hub until `window` elapses
    pub async fn drain_joints(&mut self, window: Duration) -> Vec<Joint> {
        let deadline = Instant::now() + window;
        let mut joints = Vec::new();

        while let Ok(Some(joint)) = tokio::time::timeout_at(deadline, self.joints.recv()).await {
            joints.push(joint);
        }
        joints
    }

    /// Close the connection, letting queued frames go out first
    pub async fn close(self) {
        let _ = self.outgoing.send(Message::Close(None));
        drop(self.outgoing);

        if tokio::time::timeout(CLOSE_TIMEOUT, self.writer).await.is_err() {
            warn!("Timed out flushing messages to hub");
        }
        self.reader.abort();
        info!(url = %self.url, "Disconnected from hub");
    }
}

async fn read_loop<S>(
    mut read: S,
    outgoing: mpsc::UnboundedSender<Message>,
    pending: PendingRequests,
    joints: mpsc::UnboundedSender<Joint>,
) where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => match WireMessage::from_text(&text) {
                Ok(message) => handle_message(message, &outgoing, &pending, &joints).await,
                Err(e) => warn!(error = %e, "Failed to parse message from hub"),
            },
            Ok(Message::Close(_)) => {
                info!("Hub closed the connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "WebSocket read error");
                break;
            }
            _ => {}
        }
    }

    // Wakes every waiting request with a closed-channel error
    pending.lock().await.clear();
}

async fn handle_message(
    message: WireMessage,
    outgoing: &mpsc::UnboundedSender<Message>,
    pending: &PendingRequests,
    joints: &mpsc::UnboundedSender<Joint>,
) {
    match message {
        WireMessage::Response { tag, response } => match pending.lock().await.remove(&tag) {
            Some(waiter) => {
                let _ = waiter.send(response);
            }
            None => debug!(tag = %tag, "Response to unknown request"),
        },
        WireMessage::Request { command, tag, .. } => {
            let reply = if command == CMD_HEARTBEAT {
                WireMessage::response(tag, None)
            } else {
                debug!(command = %command, "Refusing request from hub");
                WireMessage::response(tag, Some(json!({ "error": format!("unsupported command: {}", command) })))
            };
            let _ = outgoing.send(Message::Text(reply.to_text()));
        }
        WireMessage::JustSaying { subject, body } if subject == SUBJECT_JOINT => {
            match body.map(serde_json::from_value::<Joint>) {
                Some(Ok(joint)) => {
                    let _ = joints.send(joint);
                }
                Some(Err(e)) => warn!(error = %e, "Invalid joint pushed by hub"),
                None => warn!("Joint message without body"),
            }
        }
        WireMessage::JustSaying { subject, body } => {
            debug!(subject = %subject, body = ?body, "Hub says");
        }
    }
}
