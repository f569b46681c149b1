/// Per-operation authority table
pub mod permission;
/// Escrow state machine and transition guards
pub mod escrow;
/// Ledger addresses of the parties and holding account
pub mod identity;
/// Asset identifiers and amount conversions
pub mod asset;
/// Host ledger abstraction and in-memory implementation
pub mod ledger;
/// Authenticated callers and signed calls
pub mod auth;
/// JSON escrow parameters, configuration and metadata
#[cfg(feature = "json")]
pub mod interface;

pub mod error;

pub use asset::{Asset, AssetId};
pub use auth::{Call, CallContext, SignedCall};
pub use error::{AssetError, EscrowError, IdentityError, LedgerError};
pub use escrow::{ConditionStatus, EscrowAccount, EscrowEvent, EscrowParams, EscrowState, Phase};
pub use identity::Address;
pub use ledger::{Ledger, LedgerConfig, MemoryLedger, Payment, Transfer};
pub use permission::{Operation, Role};

pub type Result<T> = std::result::Result<T, EscrowError>;
