//! Outil CLI pour chiffrer/déchiffrer les secrets de configuration
//!
//! Usage:
//!   cargo run -p psconfig --example encrypt_secret -- encrypt "ma_cle_api"
//!   cargo run -p psconfig --example encrypt_secret -- decrypt "encrypted:ABC123..."

use anyhow::Result;
use psconfig::secrets::{decrypt_secret, encrypt_secret, is_encrypted};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    match (args.get(1).map(String::as_str), args.get(2)) {
        (Some("encrypt"), Some(secret)) => {
            let encrypted = encrypt_secret(secret)?;
            println!("Encrypted: {}", encrypted);
            println!("\nAdd this to your config.yaml, e.g.:");
            println!("youtube:\n  api_key: \"{}\"", encrypted);
        }
        (Some("decrypt"), Some(encrypted)) => {
            if !is_encrypted(encrypted) {
                eprintln!("Error: Value does not start with 'encrypted:'");
                return Ok(());
            }
            match decrypt_secret(encrypted) {
                Ok(secret) => println!("Decrypted: {}", secret),
                Err(e) => {
                    eprintln!("Error: Failed to decrypt secret");
                    eprintln!("This value was probably encrypted on a different machine.");
                    eprintln!("Details: {}", e);
                }
            }
        }
        _ => print_usage(),
    }

    Ok(())
}

fn print_usage() {
    println!("Usage:");
    println!("  encrypt_secret encrypt <secret>");
    println!("  encrypt_secret decrypt <encrypted:...>");
}
