//! Authenticated encryption of forging secrets at rest.
//!
//! Scheme version 1: ChaCha20-Poly1305 with a key derived from the node
//! passphrase via HKDF-SHA256 over a per-entry salt. The Poly1305 tag is
//! carried detached so that tampering with any of the stored fields is
//! detected on open.

use chacha20poly1305::{
    aead::{Aead as _, KeyInit as _},
    ChaCha20Poly1305, Key, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore as _;
use sha2::Sha256;
use zeroize::{Zeroize as _, Zeroizing};

/// Current scheme version written by [`seal`].
pub const SCHEME_VERSION: u32 = 1;
/// Salt length in bytes.
pub const SALT_LENGTH: usize = 16;
/// Nonce length in bytes.
pub const NONCE_LENGTH: usize = 12;
/// Authentication tag length in bytes.
pub const TAG_LENGTH: usize = 16;

const HKDF_INFO: &[u8] = b"arkona.forging.secret";

/// Encrypted secret together with the parameters needed to open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedSecret {
    /// Scheme version the secret was sealed with.
    pub version: u32,
    /// HKDF salt.
    pub salt: Vec<u8>,
    /// AEAD nonce.
    pub nonce: Vec<u8>,
    /// Detached Poly1305 tag.
    pub tag: Vec<u8>,
    /// Ciphertext without the tag.
    pub ciphertext: Vec<u8>,
}

/// Failure to open a [`SealedSecret`].
#[derive(Debug, Clone, Copy, displaydoc::Display, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Unsupported scheme version: {0}
    UnsupportedVersion(u32),
    /// Malformed encryption parameters
    MalformedParameters,
    /// Authentication failed
    AuthenticationFailed,
}

fn derive_key(passphrase: &str, salt: &[u8]) -> Zeroizing<[u8; 32]> {
    let mut key = Zeroizing::new([0_u8; 32]);
    Hkdf::<Sha256>::new(Some(salt), passphrase.as_bytes())
        .expand(HKDF_INFO, key.as_mut_slice())
        .expect("INTERNAL BUG: 32 bytes is a valid HKDF-SHA256 output length");
    key
}

/// Seal `plaintext` under `passphrase` with a fresh salt and nonce.
#[must_use]
pub fn seal(passphrase: &str, plaintext: &[u8]) -> SealedSecret {
    let mut salt = vec![0_u8; SALT_LENGTH];
    let mut nonce = vec![0_u8; NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let key = derive_key(passphrase, &salt);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_slice()));
    let mut sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .expect("INTERNAL BUG: ChaCha20-Poly1305 encryption cannot fail");

    let tag = sealed.split_off(sealed.len() - TAG_LENGTH);
    SealedSecret {
        version: SCHEME_VERSION,
        salt,
        nonce,
        tag,
        ciphertext: sealed,
    }
}

/// Open a [`SealedSecret`] with `passphrase`.
///
/// The plaintext is zeroized when the returned guard drops.
///
/// # Errors
/// If the scheme version is unknown, the stored parameters have the wrong
/// shape, or authentication fails (wrong passphrase or tampered fields).
pub fn open(passphrase: &str, sealed: &SealedSecret) -> Result<Zeroizing<Vec<u8>>, Error> {
    if sealed.version != SCHEME_VERSION {
        return Err(Error::UnsupportedVersion(sealed.version));
    }
    if sealed.nonce.len() != NONCE_LENGTH || sealed.tag.len() != TAG_LENGTH {
        return Err(Error::MalformedParameters);
    }

    let key = derive_key(passphrase, &sealed.salt);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_slice()));

    let mut joined = Vec::with_capacity(sealed.ciphertext.len() + TAG_LENGTH);
    joined.extend_from_slice(&sealed.ciphertext);
    joined.extend_from_slice(&sealed.tag);

    let plaintext = cipher
        .decrypt(Nonce::from_slice(&sealed.nonce), joined.as_slice())
        .map_err(|_| Error::AuthenticationFailed);
    joined.zeroize();

    plaintext.map(Zeroizing::new)
}
