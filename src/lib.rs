// Library exports for testing and external integration

pub mod application;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod domain;
pub mod logging;
pub mod network;
pub mod storage;

// Re-export commonly used items
pub use application::{Composer, KeySigner, ParentsSource, Signer, WalletManager, WalletSigner};
pub use config::AppConfig;
pub use domain::{Definition, DomainError, DomainResult, Joint, Unit, WalletPath};
pub use network::HubClient;
pub use storage::{KeyReader, KeysFile};
