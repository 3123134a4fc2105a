pub mod commands;
pub mod output;

pub use commands::{
    handle_address_command, handle_data_command, handle_keys_command, handle_list_data_command,
    handle_pay_command, AddressArgs, DataArgs, KeysCommands, PayArgs,
};
