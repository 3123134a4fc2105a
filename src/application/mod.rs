pub mod composer;
pub mod report;
pub mod signer;
pub mod submission;
pub mod sync;
pub mod wallet;

// Re-export commonly used items
pub use composer::{resolve_witnesses, Composer, ParentsSource};
pub use report::DataReport;
pub use signer::{KeySigner, Signer, WalletSigner};
pub use submission::{JointBroadcaster, Submission};
pub use sync::LedgerSync;
pub use wallet::{KeysInitOutcome, UnlockedWallet, WalletManager};
