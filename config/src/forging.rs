//! Forging configuration: whether this node forges at all, and the
//! encrypted delegate secrets it may forge with.

use arkona_crypto::PublicKey;
use serde::{Deserialize, Serialize};

/// One encrypted delegate secret, as written by the key-management tooling.
///
/// `encrypted_secret`, `iv`, `salt` and `tag` are hex strings; `version`
/// selects the encryption scheme used to seal the entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEntry {
    /// Public key the decrypted secret must derive to.
    pub public_key: PublicKey,
    /// Hex-encoded ciphertext, tag detached.
    pub encrypted_secret: String,
    /// Hex-encoded AEAD nonce.
    pub iv: String,
    /// Hex-encoded key-derivation salt.
    pub salt: String,
    /// Hex-encoded authentication tag.
    pub tag: String,
    /// Encryption scheme version.
    pub version: u32,
}

/// Forging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE", default)]
pub struct Configuration {
    /// Whether forging secrets are loaded at startup at all.
    pub force: bool,
    /// Node passphrase used to open the encrypted entries.
    pub passphrase: String,
    /// Encrypted delegate secrets. Absent means this node never forges.
    pub secrets: Option<Vec<EncryptedEntry>>,
}

impl Configuration {
    /// Environment variable that overrides the stored passphrase.
    pub const PASSPHRASE_ENV: &'static str = "ARKONA_FORGING_PASSPHRASE";

    /// Apply environment overrides on top of the file-loaded values.
    pub fn load_environment(&mut self) {
        if let Ok(passphrase) = std::env::var(Self::PASSPHRASE_ENV) {
            self.passphrase = passphrase;
        }
    }
}
