//! Asset identifiers and amount conversions.

use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::error::AssetError;
use crate::Result;

/// Largest number of decimals an amount can carry in a `u64`.
const MAX_DECIMALS: u8 = 19;

/// Ledger-wide identifier of a fungible asset.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode)]
pub struct AssetId(pub u64);

impl AssetId {
    /// Rejects the reserved id `0`.
    pub fn validate(&self) -> Result<()> {
        if self.0 == 0 {
            return Err(AssetError::ZeroAssetId.into());
        }
        Ok(())
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AssetId {
    type Err = AssetError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// What a balance is denominated in.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(tag = "asset_type", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum Asset {
    /// The ledger's native payment currency.
    Native,
    /// A registered fungible asset.
    Fungible { id: AssetId },
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Fungible { id } => write!(f, "asset#{}", id),
        }
    }
}

/// Converts a display amount (e.g. `2.0`) into integer base units.
///
/// Rounds to the nearest base unit. Negative, non-finite, or out-of-range
/// inputs are rejected.
pub fn to_base_units(display: f64, decimals: u8) -> Result<u64> {
    if decimals > MAX_DECIMALS {
        return Err(AssetError::InvalidDecimals(decimals).into());
    }
    if !display.is_finite() || display < 0.0 {
        return Err(AssetError::InvalidDisplayAmount(display).into());
    }
    let scaled = (display * 10f64.powi(decimals as i32)).round();
    if scaled >= u64::MAX as f64 {
        return Err(AssetError::InvalidDisplayAmount(display).into());
    }
    Ok(scaled as u64)
}

/// Formats base units as a fixed-width decimal string, e.g. `2.000000`.
pub fn format_amount(amount: u64, decimals: u8) -> Result<String> {
    if decimals > MAX_DECIMALS {
        return Err(AssetError::InvalidDecimals(decimals).into());
    }
    if decimals == 0 {
        return Ok(amount.to_string());
    }
    let ten_pow = 10u64
        .checked_pow(decimals as u32)
        .ok_or(AssetError::FormatOverflow(amount, decimals))?;
    let whole = amount / ten_pow;
    let rem = amount % ten_pow;
    Ok(format!("{}.{:0>width$}", whole, rem, width = decimals as usize))
}
