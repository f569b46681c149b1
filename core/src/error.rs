use thiserror::Error;

use crate::asset::AssetId;
use crate::identity::Address;
use crate::permission::Operation;

/// Escrow-related errors.
#[derive(Debug, Error, PartialEq)]
pub enum EscrowError {
    /// Caller failed the identity guard of an operation.
    #[error("{sender} is not authorized to call {operation}")]
    Unauthorized {
        operation: Operation,
        sender: Address,
    },

    /// Holding account already opted in to the asset.
    #[error("escrow already registered to hold asset {0}")]
    AlreadyRegistered(AssetId),

    /// Registration payment below the ledger minimum.
    #[error("insufficient registration fee: required {required}, provided {provided}")]
    InsufficientFee { required: u64, provided: u64 },

    /// Payment does not target this escrow (or is not from the caller).
    #[error("invalid payment: {0}")]
    InvalidPayment(String),

    /// Release attempted before the condition was attested.
    #[error("condition not met")]
    ConditionNotMet,

    /// Signed call addressed to a different escrow.
    #[error("call addressed to escrow {0}")]
    MisdirectedCall(Address),

    /// Signed call carries a nonce other than the escrow's next one.
    #[error("stale call nonce: expected {expected}, got {provided}")]
    StaleNonce { expected: u64, provided: u64 },

    /// Deposit attempted after the reserve was paid out.
    #[error("funds already released")]
    AlreadyReleased,

    /// Any call after the escrow was cancelled.
    #[error("escrow account destroyed")]
    AccountDestroyed,

    #[error("ledger error: {0}")]
    Ledger(LedgerError),

    #[error("identity error: {0}")]
    Identity(IdentityError),

    #[error("asset error: {0}")]
    Asset(AssetError),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

/// Errors raised by a [`Ledger`](crate::ledger::Ledger) while applying a group.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum LedgerError {
    #[error("insufficient balance on {account}: needed {needed}, available {available}")]
    InsufficientBalance {
        account: Address,
        needed: u64,
        available: u64,
    },

    #[error("{account} is not registered to hold asset {asset_id}")]
    NotRegistered { account: Address, asset_id: AssetId },

    #[error("{account} is already registered to hold asset {asset_id}")]
    AlreadyRegistered { account: Address, asset_id: AssetId },

    #[error("unknown asset {0}")]
    UnknownAsset(AssetId),

    #[error("balance overflow")]
    Overflow,
}

/// Errors that might occur while parsing into an `Address`.
#[derive(Debug, Error, PartialEq)]
pub enum IdentityError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("invalid base58: {0}")]
    Base58(#[from] bs58::decode::Error),

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("cannot parse identity from empty string")]
    EmptyIdentity,

    #[error("expected 32 address bytes, got {0}")]
    InvalidLength(usize),

    #[error("unsupported identity format")]
    UnsupportedFormat,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("signature verification failed")]
    SignatureVerification,
}

/// Errors when parsing or working with assets and amounts.
#[derive(Debug, Error, PartialEq)]
pub enum AssetError {
    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("asset id must be non-zero")]
    ZeroAssetId,

    #[error("invalid decimals: {0}")]
    InvalidDecimals(u8),

    #[error("human formatting overflow: amount={0}, decimals={1}")]
    FormatOverflow(u64, u8),

    #[error("invalid display amount: {0}")]
    InvalidDisplayAmount(f64),

    #[error("parse int error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),
}

impl From<LedgerError> for EscrowError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}

impl From<IdentityError> for EscrowError {
    fn from(value: IdentityError) -> Self {
        Self::Identity(value)
    }
}

impl From<AssetError> for EscrowError {
    fn from(value: AssetError) -> Self {
        Self::Asset(value)
    }
}
