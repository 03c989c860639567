//! Chiffrement des secrets de configuration (clé API, jeton d'origine, cookies)
//!
//! Les secrets peuvent être stockés en clair ou au format `encrypted:BASE64`.
//! La clé AES-256-GCM est dérivée de l'identifiant matériel de la machine :
//! un fichier de configuration chiffré n'est donc lisible que sur la machine
//! qui l'a produit.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Result, anyhow};
use base64::Engine;
use sha2::{Digest, Sha256};

/// Préfixe des secrets chiffrés
pub const ENCRYPTED_PREFIX: &str = "encrypted:";

const KEY_SALT: &[u8] = b"powersmart-secret-key-v1";
const NONCE_SALT: &[u8] = b"powersmart-secret-nonce-v1";
const NONCE_LEN: usize = 12;

/// Identifiant matériel de la machine
///
/// - macOS : `IOPlatformUUID` via `ioreg`
/// - Linux : `/etc/machine-id` ou `/var/lib/dbus/machine-id`
/// - Windows : `wmic csproduct get UUID`
fn machine_id() -> Result<String> {
    #[cfg(target_os = "macos")]
    {
        let output = std::process::Command::new("ioreg")
            .args(["-d2", "-c", "IOPlatformExpertDevice"])
            .output()?;
        let output_str = String::from_utf8_lossy(&output.stdout);
        output_str
            .lines()
            .find(|line| line.contains("IOPlatformUUID"))
            .and_then(|line| line.split('"').nth(3))
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Failed to extract IOPlatformUUID from ioreg"))
    }

    #[cfg(target_os = "linux")]
    {
        ["/etc/machine-id", "/var/lib/dbus/machine-id"]
            .iter()
            .find_map(|p| std::fs::read_to_string(p).ok())
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| anyhow!("Failed to read machine-id"))
    }

    #[cfg(target_os = "windows")]
    {
        let output = std::process::Command::new("wmic")
            .args(["csproduct", "get", "UUID"])
            .output()?;
        let output_str = String::from_utf8_lossy(&output.stdout);
        output_str
            .lines()
            .nth(1)
            .map(|uuid| uuid.trim().to_string())
            .ok_or_else(|| anyhow!("Failed to extract UUID from wmic"))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        Err(anyhow!("Unsupported platform for machine id extraction"))
    }
}

fn cipher() -> Result<Aes256Gcm> {
    let mut hasher = Sha256::new();
    hasher.update(machine_id()?.as_bytes());
    hasher.update(KEY_SALT);
    let key = hasher.finalize();
    Aes256Gcm::new_from_slice(&key).map_err(|e| anyhow!("Failed to create cipher: {}", e))
}

/// Chiffre un secret au format `encrypted:BASE64(nonce || ciphertext)`
///
/// Le nonce est dérivé du secret : le même secret produit toujours la même
/// valeur, ce qui évite de réécrire le fichier de configuration inutilement.
pub fn encrypt_secret(secret: &str) -> Result<String> {
    let cipher = cipher()?;

    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(NONCE_SALT);
    let digest = hasher.finalize();
    let nonce_bytes = &digest[..NONCE_LEN];

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(nonce_bytes), secret.as_bytes())
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    combined.extend_from_slice(nonce_bytes);
    combined.extend_from_slice(&ciphertext);

    Ok(format!(
        "{}{}",
        ENCRYPTED_PREFIX,
        base64::engine::general_purpose::STANDARD.encode(&combined)
    ))
}

/// Déchiffre un secret produit par [`encrypt_secret`] sur cette machine
pub fn decrypt_secret(encrypted: &str) -> Result<String> {
    let payload = encrypted
        .strip_prefix(ENCRYPTED_PREFIX)
        .ok_or_else(|| anyhow!("Invalid encrypted secret (missing prefix)"))?;

    let combined = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| anyhow!("Invalid base64: {}", e))?;

    if combined.len() < NONCE_LEN {
        return Err(anyhow!("Invalid ciphertext (too short)"));
    }
    let (nonce, ciphertext) = combined.split_at(NONCE_LEN);

    let plaintext = cipher()?
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| anyhow!("Decryption failed (wrong machine or corrupted data): {}", e))?;

    String::from_utf8(plaintext).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
}

/// Vrai si la valeur est au format chiffré
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}

/// Retourne le secret en clair, qu'il soit stocké chiffré ou non
pub fn reveal_secret(value: &str) -> Result<String> {
    if is_encrypted(value) {
        decrypt_secret(value)
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_encrypted() {
        assert!(is_encrypted("encrypted:SGVsbG8="));
        assert!(!is_encrypted("plaintext"));
        assert!(!is_encrypted(""));
    }

    #[test]
    fn test_reveal_plaintext() {
        assert_eq!(reveal_secret("token").unwrap(), "token");
    }

    #[test]
    fn test_decrypt_rejects_garbage() {
        assert!(decrypt_secret("plaintext").is_err());
        assert!(decrypt_secret("encrypted:!!!").is_err());
        assert!(decrypt_secret("encrypted:AAAA").is_err());
    }

    #[test]
    #[ignore = "Requires a readable machine id"]
    fn test_encrypt_decrypt_roundtrip() {
        let encrypted = encrypt_secret("MlNU2dufnNaLA1Tl").unwrap();
        assert!(is_encrypted(&encrypted));
        assert_eq!(encrypted, encrypt_secret("MlNU2dufnNaLA1Tl").unwrap());
        assert_eq!(reveal_secret(&encrypted).unwrap(), "MlNU2dufnNaLA1Tl");
    }
}
