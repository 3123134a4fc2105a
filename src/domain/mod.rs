pub mod definition;
pub mod derivation;
pub mod error;
pub mod unit;

// Re-export commonly used types
pub use definition::{single_sig_paths, Definition, SigningPaths, SIG_LENGTH, SINGLE_SIG_PATH};
pub use derivation::{WalletPath, DEVICE_KEY_PATH, WALLET_ACCOUNT_PATH};
pub use error::{DomainError, DomainResult};
pub use unit::{Author, Input, Joint, Message, Output, PaymentPayload, Unit};
