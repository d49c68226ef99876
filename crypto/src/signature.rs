//! Ed25519 signatures over canonical bytes.

use core::str::FromStr;

use parity_scale_codec::{Decode, Encode};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::ParseError;

/// Detached ed25519 signature, hex-encoded in serde forms.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Encode, Decode, SerializeDisplay, DeserializeFromStr)]
pub struct Signature([u8; Self::LENGTH]);

impl Signature {
    /// Signature length in bytes.
    pub const LENGTH: usize = 64;

    /// Wrap raw signature bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw signature bytes.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; Self::LENGTH] {
        self.0
    }
}

impl From<ed25519_dalek::Signature> for Signature {
    fn from(signature: ed25519_dalek::Signature) -> Self {
        Self(signature.to_bytes())
    }
}

impl From<Signature> for ed25519_dalek::Signature {
    fn from(Signature(bytes): Signature) -> Self {
        ed25519_dalek::Signature::from_bytes(&bytes)
    }
}

impl core::fmt::Display for Signature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl core::fmt::Debug for Signature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Signature {
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
