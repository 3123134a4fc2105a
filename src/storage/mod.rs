pub mod key_reader;
pub mod keys_file;
pub mod ledger_db;

// Re-export commonly used items
pub use key_reader::{KeyReader, PassphraseSource, PASSPHRASE_ENV};
pub use keys_file::{KeysFile, TempKeys};
pub use ledger_db::{
    AddressRecord, DataRecord, DbPool, JointRepo, SigningRecord, SpendableOutput, WalletRecord,
    WalletRepo, WitnessRepo,
};
