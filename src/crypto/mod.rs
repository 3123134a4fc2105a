pub mod chash;
pub mod ecdsa;
pub mod hd_key;
pub mod mnemonic;
pub mod object_hash;
pub mod object_length;

// Re-export commonly used items
pub use chash::{chash160, is_chash_valid};
pub use ecdsa::Ecdsa;
pub use hd_key::{DerivedKey, HdWallet};
pub use mnemonic::{generate_mnemonic, normalize_mnemonic, validate_mnemonic};
