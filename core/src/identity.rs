//! Ledger identities of the parties and of the escrow holding account.

use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use hex::serde as hex_serde;
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};

use crate::error::IdentityError;

/// Domain separator for deriving holding-account addresses.
const ESCROW_ADDRESS_TAG: &[u8] = b"attest-escrow/app";

/// A 32-byte account address (an Ed25519 public key).
///
/// The all-zero address is the "none" sentinel used when an escrow is
/// created without an admin delegate.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode)]
pub struct Address(#[cfg_attr(feature = "json", serde(with = "hex_serde"))] [u8; 32]);

impl Address {
    /// The sentinel "no account" address.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Wraps raw address bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns `true` for the sentinel address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Maps the sentinel to `None`.
    pub fn non_zero(self) -> Option<Self> {
        if self.is_zero() {
            None
        } else {
            Some(self)
        }
    }

    /// Derives the holding-account address of an escrow application.
    ///
    /// `SHA-512/256(tag || nonce_be || creator)`; distinct nonces of one
    /// creator never collide, and the result is never a valid signing key
    /// anyone holds.
    pub fn derive_escrow(creator: &Address, nonce: u64) -> Self {
        let mut hasher = Sha512_256::new();
        hasher.update(ESCROW_ADDRESS_TAG);
        hasher.update(nonce.to_be_bytes());
        hasher.update(creator.0);
        Self(hasher.finalize().into())
    }

    fn from_slice(bytes: &[u8]) -> Result<Self, IdentityError> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| IdentityError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<&ed25519_dalek::VerifyingKey> for Address {
    fn from(key: &ed25519_dalek::VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = IdentityError;

    /// Parses a `0x`-prefixed or bare 64-char hex string, then falls back
    /// to base58 and finally standard base64.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IdentityError::EmptyIdentity);
        }

        if let Some(stripped) = s.strip_prefix("0x") {
            return Self::from_slice(&hex::decode(stripped)?);
        }
        if s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Self::from_slice(&hex::decode(s)?);
        }
        if let Ok(bytes) = bs58::decode(s).into_vec() {
            return Self::from_slice(&bytes);
        }
        if let Ok(bytes) = BASE64.decode(s) {
            return Self::from_slice(&bytes);
        }

        Err(IdentityError::UnsupportedFormat)
    }
}
