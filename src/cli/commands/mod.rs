pub mod address;
pub mod data;
pub mod keys;
pub mod pay;
pub mod report;
pub mod session;

pub use address::{handle_address_command, AddressArgs};
pub use data::{handle_data_command, DataArgs};
pub use keys::{handle_keys_command, KeysCommands};
pub use pay::{handle_pay_command, PayArgs};
pub use report::handle_list_data_command;
