//! SHA-256 digests of consensus entities.

use core::str::FromStr;

use derive_more::{AsRef, Deref};
use parity_scale_codec::{Decode, Encode};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use sha2::{Digest as _, Sha256};

use crate::ParseError;

/// SHA-256 digest of a canonical byte string.
///
/// Displayed and parsed as lowercase hex, the form it takes in operator
/// configuration and gossip payloads.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    AsRef,
    Deref,
    Encode,
    Decode,
    SerializeDisplay,
    DeserializeFromStr,
)]
pub struct Hash([u8; Self::LENGTH]);

impl Hash {
    /// Digest length in bytes.
    pub const LENGTH: usize = 32;

    /// Hash the given bytes.
    #[must_use]
    pub fn new(bytes: impl AsRef<[u8]>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes.as_ref());
        Self(hasher.finalize().into())
    }

    /// Digest over a sequence of chunks, hashed in order.
    ///
    /// Equivalent to hashing the concatenation of all chunks.
    #[must_use]
    pub fn chained<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut hasher = Sha256::new();
        for chunk in chunks {
            hasher.update(chunk.as_ref());
        }
        Self(hasher.finalize().into())
    }

    /// Wrap bytes that are already a digest.
    #[must_use]
    pub const fn prehashed(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }
}

impl From<Hash> for [u8; Hash::LENGTH] {
    fn from(Hash(bytes): Hash) -> Self {
        bytes
    }
}

impl core::fmt::Display for Hash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl core::fmt::Debug for Hash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Hash {
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
