//! Private key loading.

use crate::error::{SshError, SshResult};
use russh_keys::key::KeyPair;
use std::fmt;
use tracing::debug;

/// Key types accepted for tunnel authentication, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// RSA
    Rsa,
    /// Ed25519
    Ed25519,
    /// ECDSA over the NIST curves
    Ecdsa,
}

impl KeyType {
    /// All supported types, in detection order.
    pub const ALL: [KeyType; 3] = [KeyType::Rsa, KeyType::Ed25519, KeyType::Ecdsa];

    /// Display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            KeyType::Rsa => "RSA",
            KeyType::Ed25519 => "Ed25519",
            KeyType::Ecdsa => "ECDSA",
        }
    }

    fn matches_algorithm(self, algorithm: &str) -> bool {
        match self {
            KeyType::Rsa => algorithm == "ssh-rsa" || algorithm.starts_with("rsa-sha2-"),
            KeyType::Ed25519 => algorithm == "ssh-ed25519",
            KeyType::Ecdsa => algorithm.starts_with("ecdsa-sha2-"),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed private key and its detected type.
pub struct LoadedKey {
    /// Detected key type.
    pub key_type: KeyType,
    /// Key pair usable for authentication.
    pub key_pair: KeyPair,
}

impl fmt::Debug for LoadedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedKey")
            .field("key_type", &self.key_type)
            .finish_non_exhaustive()
    }
}

/// Parses a PEM/OpenSSH private key, trying RSA, then Ed25519, then ECDSA.
///
/// `passphrase` is used for every attempt. When nothing matches, the error
/// names every type that was tried.
pub fn load_private_key(pem: &str, passphrase: Option<&str>) -> SshResult<LoadedKey> {
    let attempted: Vec<String> = KeyType::ALL.iter().map(|t| t.to_string()).collect();
    let passphrase = passphrase.filter(|p| !p.is_empty());

    let reasons = match russh_keys::decode_secret_key(pem.trim(), passphrase) {
        Ok(key_pair) => {
            let algorithm = key_pair.name();
            let mut reasons = Vec::with_capacity(KeyType::ALL.len());
            for key_type in KeyType::ALL {
                if key_type.matches_algorithm(algorithm) {
                    debug!(key_type = %key_type, "Loaded private key");
                    return Ok(LoadedKey { key_type, key_pair });
                }
                reasons.push(format!("{}: key algorithm is {}", key_type, algorithm));
            }
            reasons
        }
        Err(e) => KeyType::ALL
            .iter()
            .map(|key_type| format!("{}: {}", key_type, e))
            .collect(),
    };

    Err(SshError::KeyLoadFailed { attempted, reasons })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_matching() {
        assert!(KeyType::Rsa.matches_algorithm("rsa-sha2-256"));
        assert!(KeyType::Rsa.matches_algorithm("ssh-rsa"));
        assert!(KeyType::Ed25519.matches_algorithm("ssh-ed25519"));
        assert!(KeyType::Ecdsa.matches_algorithm("ecdsa-sha2-nistp384"));
        assert!(!KeyType::Ecdsa.matches_algorithm("ssh-ed25519"));
    }

    #[test]
    fn test_garbage_lists_every_type() {
        let err = load_private_key("this is not a key", None).unwrap_err();
        let message = err.to_string();
        for name in ["RSA", "Ed25519", "ECDSA"] {
            assert!(message.contains(name), "{} missing from {}", name, message);
        }
        match err {
            SshError::KeyLoadFailed { attempted, reasons } => {
                assert_eq!(attempted, vec!["RSA", "Ed25519", "ECDSA"]);
                assert_eq!(reasons.len(), 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
