//! The host ledger an escrow settles against.
//!
//! Value moves only through [`Ledger::submit`], which applies a group of
//! [`Transfer`]s atomically: every transfer in the group commits, or none do.

use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::asset::{Asset, AssetId};
use crate::error::LedgerError;
use crate::identity::Address;

mod memory;

pub use memory::MemoryLedger;

/// Default minimum fee for opting an account in to an asset, in base units.
pub const DEFAULT_REGISTRATION_FEE: u64 = 100_000;

/// Default decimals of the native currency.
pub const DEFAULT_NATIVE_DECIMALS: u8 = 6;

/// Ledger parameters an escrow depends on.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Minimum payment accompanying a holding registration.
    pub registration_fee: u64,
    /// Decimals used to convert display amounts into base units.
    pub native_decimals: u8,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            registration_fee: DEFAULT_REGISTRATION_FEE,
            native_decimals: DEFAULT_NATIVE_DECIMALS,
        }
    }
}

/// A single value movement or holding registration.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum Transfer {
    /// Opt `account` in to holding `asset_id`. Balance starts at zero.
    Register { account: Address, asset_id: AssetId },
    /// Move native currency. With `close_remainder_to`, whatever is left in
    /// `from` afterwards moves to that account as well.
    Native {
        from: Address,
        to: Address,
        amount: u64,
        close_remainder_to: Option<Address>,
    },
    /// Move a fungible asset. With `close_to`, the rest of `from`'s holding
    /// moves there and the holding is removed.
    Asset {
        asset_id: AssetId,
        from: Address,
        to: Address,
        amount: u64,
        close_to: Option<Address>,
    },
}

/// A payment the caller attaches to an escrow call.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct Payment {
    pub sender: Address,
    pub receiver: Address,
    /// Amount in native base units.
    pub amount: u64,
}

impl Payment {
    pub fn new(sender: Address, receiver: Address, amount: u64) -> Self {
        Self {
            sender,
            receiver,
            amount,
        }
    }

    pub fn to_transfer(self) -> Transfer {
        Transfer::Native {
            from: self.sender,
            to: self.receiver,
            amount: self.amount,
            close_remainder_to: None,
        }
    }
}

/// Capabilities the escrow consumes from the underlying ledger.
pub trait Ledger {
    /// Minimum payment that must accompany a holding registration.
    fn registration_fee(&self) -> u64;

    /// Decimals of the native currency.
    fn native_decimals(&self) -> u8;

    /// Whether `account` is opted in to `asset_id`.
    fn is_registered(&self, account: &Address, asset_id: AssetId) -> bool;

    /// Balance of `account` in `asset`; zero for unknown accounts or holdings.
    fn balance(&self, account: &Address, asset: Asset) -> u64;

    /// Applies `group` atomically.
    fn submit(&mut self, group: &[Transfer]) -> Result<(), LedgerError>;

    fn register_holding(
        &mut self,
        account: Address,
        asset_id: AssetId,
    ) -> Result<(), LedgerError> {
        self.submit(&[Transfer::Register { account, asset_id }])
    }

    fn transfer_native(
        &mut self,
        from: Address,
        to: Address,
        amount: u64,
        close_remainder_to: Option<Address>,
    ) -> Result<(), LedgerError> {
        self.submit(&[Transfer::Native {
            from,
            to,
            amount,
            close_remainder_to,
        }])
    }

    fn transfer_asset(
        &mut self,
        asset_id: AssetId,
        from: Address,
        to: Address,
        amount: u64,
    ) -> Result<(), LedgerError> {
        self.submit(&[Transfer::Asset {
            asset_id,
            from,
            to,
            amount,
            close_to: None,
        }])
    }
}
