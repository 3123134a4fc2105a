use crate::application::KeysInitOutcome;
use serde::Serialize;

/// Addresses derived from a key file
#[derive(Debug, Serialize)]
pub struct AddressOutput {
    pub address: String,
    pub derivation_path: String,
    pub public_key: String,
    pub definition: serde_json::Value,
    pub device_address: String,
}

pub fn print_keys_init(outcome: &KeysInitOutcome) {
    println!("✓ Keys written to {}", outcome.keys_file.display());
    println!("  Device name: {}", outcome.device_name);
    println!("  Device address: {}", outcome.device_address);
    println!("  Address: {}", outcome.address);
    eprintln!();
    eprintln!("⚠️  SECURITY WARNING:");
    eprintln!("   - The key file holds your mnemonic in plain text");
    eprintln!("   - Without the passphrase the mnemonic alone does not restore these addresses");
}

pub fn print_address(output: &AddressOutput) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}

pub fn print_done() {
    println!("done");
}

pub fn print_lines(lines: &[String]) {
    println!();
    for line in lines {
        println!("{}", line);
    }
}
