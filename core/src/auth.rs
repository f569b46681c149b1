//! Sender identity for guarded escrow calls.
//!
//! Every guarded operation receives a [`CallContext`]. A host ledger that has
//! already authenticated the transaction sender builds one with
//! [`CallContext::trusted`]; otherwise a [`SignedCall`] proves the sender by an
//! Ed25519 signature over the call.

use bincode::{Decode, Encode};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
#[cfg(feature = "json")]
use hex::serde as hex_serde;
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{EscrowError, IdentityError};
use crate::identity::Address;
use crate::ledger::Payment;
use crate::permission::Operation;
use crate::Result;

const CALL_DIGEST_TAG: &[u8] = b"attest-escrow/call";

/// The authenticated sender of an escrow call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    sender: Address,
}

impl CallContext {
    /// Context for a sender the host ledger has already authenticated.
    pub fn trusted(sender: Address) -> Self {
        Self { sender }
    }

    pub fn sender(&self) -> Address {
        self.sender
    }
}

/// An escrow operation together with its arguments.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(tag = "call", rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum Call {
    RegisterAssetHolding { fee: Payment },
    ConfirmDeposit { payment: Payment },
    SetConditionMet { worker_address: Address },
    ReleaseFunds,
    ReleaseAsset,
    Cancel,
}

impl Call {
    pub fn operation(&self) -> Operation {
        match self {
            Self::RegisterAssetHolding { .. } => Operation::RegisterAssetHolding,
            Self::ConfirmDeposit { .. } => Operation::ConfirmDeposit,
            Self::SetConditionMet { .. } => Operation::SetConditionMet,
            Self::ReleaseFunds => Operation::ReleaseFunds,
            Self::ReleaseAsset => Operation::ReleaseAsset,
            Self::Cancel => Operation::Cancel,
        }
    }
}

/// A [`Call`] addressed to one escrow and signed by its sender.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct SignedCall {
    /// Holding-account address of the target escrow.
    pub escrow: Address,
    /// Sender address, i.e. the Ed25519 verifying key.
    pub sender: Address,
    /// Must equal the escrow's call nonce when dispatched.
    pub nonce: u64,
    pub call: Call,
    /// Ed25519 signature over [`SignedCall::digest`].
    #[cfg_attr(feature = "json", serde(with = "hex_serde"))]
    pub signature: Vec<u8>,
}

impl SignedCall {
    /// Signs `call` for the escrow at `escrow` with `key`.
    ///
    /// `nonce` is the escrow's current [`call_nonce`](crate::EscrowAccount::call_nonce).
    pub fn sign(key: &SigningKey, escrow: Address, nonce: u64, call: Call) -> Result<Self> {
        let sender = Address::from(&key.verifying_key());
        let digest = Self::digest(&escrow, &sender, nonce, &call)?;
        let signature = key.sign(&digest).to_bytes().to_vec();
        Ok(Self {
            escrow,
            sender,
            nonce,
            call,
            signature,
        })
    }

    /// `SHA-256(tag || escrow || sender || nonce_be || bincode(call))`.
    pub fn digest(
        escrow: &Address,
        sender: &Address,
        nonce: u64,
        call: &Call,
    ) -> Result<[u8; 32]> {
        let encoded = bincode::encode_to_vec(call, bincode::config::standard())
            .map_err(|e| EscrowError::Snapshot(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(CALL_DIGEST_TAG);
        hasher.update(escrow.as_bytes());
        hasher.update(sender.as_bytes());
        hasher.update(nonce.to_be_bytes());
        hasher.update(&encoded);
        Ok(hasher.finalize().into())
    }

    /// Checks the signature and yields the authenticated context.
    pub fn verify(&self) -> Result<CallContext> {
        let key = VerifyingKey::from_bytes(self.sender.as_bytes())
            .map_err(|e| IdentityError::InvalidPublicKey(e.to_string()))?;
        let signature = Signature::from_slice(&self.signature)
            .map_err(|_| IdentityError::SignatureVerification)?;
        let digest = Self::digest(&self.escrow, &self.sender, self.nonce, &self.call)?;
        key.verify(&digest, &signature)
            .map_err(|_| IdentityError::SignatureVerification)?;
        Ok(CallContext::trusted(self.sender))
    }
}
