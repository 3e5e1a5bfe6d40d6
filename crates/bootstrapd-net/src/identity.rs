//! Identity keys of the daemon.

use std::fmt;

use rand::rngs::OsRng;
use thiserror::Error;
use x25519_dalek::StaticSecret;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Length of a public key in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of a secret key in bytes.
pub const SECRET_KEY_LEN: usize = 32;

/// Length of the persisted keys file: public key followed by secret key.
pub const KEYS_FILE_LEN: usize = PUBLIC_KEY_LEN + SECRET_KEY_LEN;

/// Errors raised while decoding key material.
#[derive(Debug, Error, PartialEq)]
pub enum KeyPairError {
    /// A hex public key had the wrong length.
    #[error("public key must be {expected} hex characters, got {actual}")]
    HexLength {
        /// Required length in characters.
        expected: usize,
        /// Supplied length in characters.
        actual: usize,
    },
    /// A hex public key contained a non-hex character.
    #[error("public key is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Public half of an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    /// Wraps raw key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Decodes a key from exactly `2 * PUBLIC_KEY_LEN` hex characters.
    pub fn from_hex(text: &str) -> Result<Self, KeyPairError> {
        let expected = PUBLIC_KEY_LEN * 2;
        if text.len() != expected {
            return Err(KeyPairError::HexLength {
                expected,
                actual: text.len(),
            });
        }
        let mut bytes = [0_u8; PUBLIC_KEY_LEN];
        hex::decode_to_slice(text, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

/// Public and secret key of the daemon. The secret is wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    public: [u8; PUBLIC_KEY_LEN],
    secret: [u8; SECRET_KEY_LEN],
}

impl KeyPair {
    /// Generates a fresh Curve25519 keypair from the operating system RNG.
    #[must_use]
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = x25519_dalek::PublicKey::from(&secret);
        Self {
            public: public.to_bytes(),
            secret: secret.to_bytes(),
        }
    }

    /// Splits a keys file image into its public and secret halves.
    #[must_use]
    pub fn from_file_bytes(bytes: &[u8; KEYS_FILE_LEN]) -> Self {
        let mut public = [0_u8; PUBLIC_KEY_LEN];
        let mut secret = [0_u8; SECRET_KEY_LEN];
        let (head, tail) = bytes.split_at(PUBLIC_KEY_LEN);
        public.copy_from_slice(head);
        secret.copy_from_slice(tail);
        Self { public, secret }
    }

    /// Serialises the pair as public key followed by secret key.
    #[must_use]
    pub fn to_file_bytes(&self) -> Zeroizing<[u8; KEYS_FILE_LEN]> {
        let mut bytes = Zeroizing::new([0_u8; KEYS_FILE_LEN]);
        let (head, tail) = bytes.split_at_mut(PUBLIC_KEY_LEN);
        head.copy_from_slice(&self.public);
        tail.copy_from_slice(&self.secret);
        bytes
    }

    /// Public half of the pair.
    #[must_use]
    pub const fn public_key(&self) -> PublicKey {
        PublicKey(self.public)
    }

    /// Secret key bytes.
    #[must_use]
    pub const fn secret_bytes(&self) -> &[u8; SECRET_KEY_LEN] {
        &self.secret
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public && self.secret == other.secret
    }
}

impl Eq for KeyPair {}

/// Active key slot of an identity engine.
pub trait IdentitySlots {
    /// Keypair currently in use.
    fn keypair(&self) -> &KeyPair;

    /// Replaces the keypair in use.
    fn install_keypair(&mut self, keypair: KeyPair);
}
