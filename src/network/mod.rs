pub mod hub;
pub mod message;

pub use hub::HubClient;
pub use message::{HistoryResponse, ParentsInfo, WireMessage};
