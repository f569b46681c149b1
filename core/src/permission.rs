//! Per-operation authority table.
//!
//! Each guarded operation lists the roles allowed to invoke it. The admin
//! delegate shares the boss's authority over attestation and release. Only the
//! boss may deposit or cancel.

use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

/// A party's relation to an escrow.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum Role {
    Boss,
    Admin,
    Worker,
    /// Any sender, including ones with no relation to the escrow.
    Anyone,
}

/// State-changing operations of an escrow account.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum Operation {
    RegisterAssetHolding,
    ConfirmDeposit,
    SetConditionMet,
    ReleaseFunds,
    ReleaseAsset,
    Cancel,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Self::RegisterAssetHolding,
        Self::ConfirmDeposit,
        Self::SetConditionMet,
        Self::ReleaseFunds,
        Self::ReleaseAsset,
        Self::Cancel,
    ];

    /// Roles permitted to invoke this operation.
    pub const fn permitted(self) -> &'static [Role] {
        match self {
            Self::RegisterAssetHolding => &[Role::Anyone],
            Self::ConfirmDeposit => &[Role::Boss],
            Self::SetConditionMet => &[Role::Boss, Role::Admin],
            Self::ReleaseFunds => &[Role::Boss, Role::Admin],
            Self::ReleaseAsset => &[Role::Boss, Role::Admin],
            Self::Cancel => &[Role::Boss],
        }
    }

    /// Whether a sender holding `roles` may invoke this operation.
    pub fn allows(self, roles: &[Role]) -> bool {
        self.permitted()
            .iter()
            .any(|p| *p == Role::Anyone || roles.contains(p))
    }
}

impl AsRef<str> for Operation {
    fn as_ref(&self) -> &str {
        match self {
            Self::RegisterAssetHolding => "register_asset_holding",
            Self::ConfirmDeposit => "confirm_deposit",
            Self::SetConditionMet => "set_condition_met",
            Self::ReleaseFunds => "release_funds",
            Self::ReleaseAsset => "release_asset",
            Self::Cancel => "cancel",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}
