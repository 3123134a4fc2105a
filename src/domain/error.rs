use std::path::PathBuf;
use thiserror::Error;

/// Domain-level errors for joint-cli operations
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid mnemonic phrase: {0}")]
    InvalidMnemonic(String),

    #[error("Key file not found: {}", .path.display())]
    KeyFileNotFound {
        path: PathBuf,
    },

    #[error("Invalid key file format: {reason}")]
    InvalidKeyFile {
        reason: String,
    },

    #[error("Cryptographic operation failed: {0}")]
    CryptoError(String),

    #[error("address '{address}' is wrong")]
    AddressMismatch {
        address: String,
    },

    #[error("{count} indexes for address {address} and signing path {signing_path}")]
    KeyRecordNotFound {
        address: String,
        signing_path: String,
        count: usize,
    },

    #[error("definition not found for address {0}")]
    DefinitionNotFound(String),

    #[error("not enough spendable funds from {address} for {required} bytes, available {available}")]
    NotEnoughFunds {
        address: String,
        required: u64,
        available: u64,
    },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("passphrase is incorrect")]
    IncorrectPassphrase,

    #[error("Peer error: {0}")]
    Network(String),

    #[error("Peer returned an error for {command}: {message}")]
    PeerRejected {
        command: String,
        message: String,
    },

    #[error("Request {0} timed out")]
    Timeout(String),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

impl DomainError {
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    pub fn payload<S: Into<String>>(msg: S) -> Self {
        Self::InvalidPayload(msg.into())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
