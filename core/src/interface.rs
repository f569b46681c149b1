//! JSON (de)serialization of escrow parameters, ledger configuration and
//! escrow metadata.

use std::fs::File;
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::asset::{self, AssetId};
use crate::escrow::{ConditionStatus, EscrowAccount, EscrowState};
use crate::identity::Address;
use crate::ledger::Ledger;
use crate::Result;

/// Default path to escrow params template.
pub const ESCROW_PARAMS_PATH: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../templates/escrow_params.json"
);

/// Default path to ledger configuration template.
pub const LEDGER_CONFIG_PATH: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../templates/ledger_config.json"
);

/// Reads a JSON-encoded file from the given `path` and deserializes into type `T`.
///
/// # Errors
///
/// Returns an `anyhow::Error` if the file cannot be opened, read, or parsed.
///
/// # Examples
///
/// ```ignore
/// # use attest_escrow_core::interface::{load_escrow_data, ESCROW_PARAMS_PATH};
/// # use attest_escrow_core::EscrowParams;
///
/// let params: EscrowParams = load_escrow_data(ESCROW_PARAMS_PATH).unwrap();
/// ```
pub fn load_escrow_data<P, T>(path: P) -> anyhow::Result<T>
where
    P: AsRef<Path>,
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("loading escrow data: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("parsing JSON from {:?}", path))
}

/// Writes `data` (serializable) as pretty-printed JSON to the given `path`,
/// creating parent directories as needed.
///
/// # Errors
///
/// Returns an `anyhow::Error` if the file cannot be created or data cannot be serialized.
pub fn save_escrow_data<P, T>(path: P, data: &T) -> anyhow::Result<()>
where
    P: AsRef<Path>,
    T: Serialize,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {:?}", parent))?;
    }
    let file = File::create(path).with_context(|| format!("creating file {:?}", path))?;
    serde_json::to_writer_pretty(file, data)
        .with_context(|| format!("serializing to JSON to {:?}", path))
}

/// Read-only snapshot of an escrow, with amounts rendered for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EscrowMetadata {
    /// Holding-account address.
    pub escrow_address: Address,
    pub boss: Address,
    /// Absent when the escrow has no admin delegate.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub admin: Option<Address>,
    pub worker: Address,
    pub asset_id: AssetId,
    pub quantity: u64,
    /// Confirmed payment reserve in base units.
    pub payment_amount: u64,
    /// Confirmed payment reserve as a decimal string.
    pub payment_display: String,
    pub condition: ConditionStatus,
    /// Where in the lifecycle the escrow currently is.
    pub state: EscrowState,
}

impl EscrowMetadata {
    /// Captures `escrow`, formatting amounts with the ledger's decimals.
    pub fn capture<L: Ledger>(escrow: &EscrowAccount, ledger: &L) -> Result<Self> {
        Ok(Self {
            escrow_address: escrow.address(),
            boss: escrow.boss(),
            admin: escrow.admin(),
            worker: escrow.worker(),
            asset_id: escrow.asset_id(),
            quantity: escrow.quantity(),
            payment_amount: escrow.payment_amount(),
            payment_display: asset::format_amount(
                escrow.payment_amount(),
                ledger.native_decimals(),
            )?,
            condition: escrow.condition(),
            state: escrow.state(),
        })
    }
}

impl std::fmt::Display for EscrowMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", json)
    }
}
