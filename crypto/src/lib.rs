//! Cryptographic primitives of the Arkona ledger: SHA-256 digests,
//! ed25519 key pairs and signatures, and the authenticated encryption
//! scheme protecting forging secrets at rest.

pub mod encryption;
mod hash;
mod signature;

use core::str::FromStr;

use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use getset::Getters;
use parity_scale_codec::{Decode, Encode};
use serde_with::{DeserializeFromStr, SerializeDisplay};

pub use self::{hash::Hash, signature::Signature};

/// Failure to parse a hex-encoded entity.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ParseError(
    /// What went wrong.
    pub String,
);

/// Signature or key material rejected during verification.
#[derive(Debug, Clone, Copy, displaydoc::Display, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Public key is not a valid curve point
    MalformedPublicKey,
    /// Signature does not match the payload
    BadSignature,
}

/// Ed25519 public key, hex-encoded in serde forms.
///
/// Stored as raw bytes; point validity is checked when the key is used
/// to verify, so malformed keys received from the network surface as
/// verification failures rather than deserialization failures.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Encode,
    Decode,
    SerializeDisplay,
    DeserializeFromStr,
)]
pub struct PublicKey([u8; Self::LENGTH]);

impl PublicKey {
    /// Public key length in bytes.
    pub const LENGTH: usize = 32;

    /// Wrap raw key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; Self::LENGTH] {
        self.0
    }

    /// Verify `signature` over `message` with this key.
    ///
    /// # Errors
    /// If the key is not a valid curve point or the signature does not match.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), VerifyError> {
        let key = VerifyingKey::from_bytes(&self.0).map_err(|_| VerifyError::MalformedPublicKey)?;
        key.verify(message, &(*signature).into())
            .map_err(|_| VerifyError::BadSignature)
    }
}

impl core::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl core::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for PublicKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; Self::LENGTH] = hex::decode(s)
            .map_err(|err| ParseError(format!("Invalid hex: {err}")))?
            .try_into()
            .map_err(|bytes: Vec<u8>| {
                ParseError(format!("Expected {} bytes, got {}", Self::LENGTH, bytes.len()))
            })?;
        Ok(Self(bytes))
    }
}

/// Ed25519 signing key. Zeroized on drop.
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    /// Sign `message` with this key.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.0.sign(message).into()
    }

    /// The public half of this key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key().to_bytes())
    }
}

impl core::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Pair of public and private keys.
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct KeyPair {
    /// Public key.
    public_key: PublicKey,
    /// Private key.
    private_key: PrivateKey,
}

impl KeyPair {
    /// Generate a random key pair.
    #[must_use]
    pub fn random() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// Derive a key pair from a 32-byte seed.
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(&seed))
    }

    /// Derive a key pair from a secret passphrase.
    ///
    /// The seed is the SHA-256 digest of the passphrase bytes, so the same
    /// passphrase always derives the same pair.
    #[must_use]
    pub fn from_passphrase(passphrase: &str) -> Self {
        Self::from_seed(Hash::new(passphrase.as_bytes()).into())
    }

    /// Sign `message` with the private half.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.private_key.sign(message)
    }

    fn from_signing_key(key: SigningKey) -> Self {
        let public_key = PublicKey(key.verifying_key().to_bytes());
        Self {
            public_key,
            private_key: PrivateKey(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let pair = KeyPair::random();
        let signature = pair.sign(b"payload");
        pair.public_key().verify(b"payload", &signature).expect("Valid");
        assert_eq!(
            pair.public_key().verify(b"other payload", &signature),
            Err(VerifyError::BadSignature)
        );
    }

    #[test]
    fn passphrase_derivation_is_deterministic() {
        let a = KeyPair::from_passphrase("robust swift ostrich");
        let b = KeyPair::from_passphrase("robust swift ostrich");
        assert_eq!(a.public_key(), b.public_key());

        let c = KeyPair::from_passphrase("robust swift emu");
        assert_ne!(a.public_key(), c.public_key());
    }

    #[test]
    fn public_key_serde_is_hex() {
        let pair = KeyPair::from_passphrase("serde fixture");
        let json = serde_json::to_string(pair.public_key()).expect("Valid");
        assert_eq!(json, format!("\"{}\"", pair.public_key()));
        let back: PublicKey = serde_json::from_str(&json).expect("Valid");
        assert_eq!(back, *pair.public_key());
    }
}
