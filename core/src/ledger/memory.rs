use std::collections::{BTreeMap, HashMap};

use super::{Ledger, LedgerConfig, Transfer};
use crate::asset::{Asset, AssetId};
use crate::error::LedgerError;
use crate::identity::Address;

#[derive(Debug, Clone, Default)]
struct AccountState {
    native: u64,
    holdings: BTreeMap<AssetId, u64>,
}

#[derive(Debug, Clone)]
struct AssetInfo {
    creator: Address,
    total: u64,
}

/// In-memory ledger for tests and local simulation.
///
/// `submit` stages the whole group on a copy of the account table and swaps
/// it in only if every transfer applied.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    accounts: HashMap<Address, AccountState>,
    assets: BTreeMap<AssetId, AssetInfo>,
    next_asset_id: u64,
    config: LedgerConfig,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl MemoryLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            accounts: HashMap::new(),
            assets: BTreeMap::new(),
            next_asset_id: 1,
            config,
        }
    }

    /// Mints native currency into `account` (genesis/faucet).
    pub fn fund(&mut self, account: Address, amount: u64) -> Result<(), LedgerError> {
        let state = self.accounts.entry(account).or_default();
        state.native = state
            .native
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Creates a fungible asset with `total` units held by `creator`, who is
    /// registered for it implicitly.
    pub fn create_asset(&mut self, creator: Address, total: u64) -> AssetId {
        let id = AssetId(self.next_asset_id);
        self.next_asset_id += 1;
        self.assets.insert(id, AssetInfo { creator, total });
        self.accounts
            .entry(creator)
            .or_default()
            .holdings
            .insert(id, total);
        tracing::debug!(asset_id = %id, %creator, total, "asset created");
        id
    }

    /// Creator and total supply of `asset_id`.
    pub fn asset_info(&self, asset_id: AssetId) -> Option<(Address, u64)> {
        self.assets.get(&asset_id).map(|a| (a.creator, a.total))
    }

    fn apply(
        &self,
        accounts: &mut HashMap<Address, AccountState>,
        transfer: &Transfer,
    ) -> Result<(), LedgerError> {
        match *transfer {
            Transfer::Register { account, asset_id } => {
                if !self.assets.contains_key(&asset_id) {
                    return Err(LedgerError::UnknownAsset(asset_id));
                }
                let state = accounts.entry(account).or_default();
                if state.holdings.contains_key(&asset_id) {
                    return Err(LedgerError::AlreadyRegistered { account, asset_id });
                }
                state.holdings.insert(asset_id, 0);
                Ok(())
            }

            Transfer::Native {
                from,
                to,
                amount,
                close_remainder_to,
            } => {
                debit_native(accounts, from, amount)?;
                credit_native(accounts, to, amount)?;
                if let Some(target) = close_remainder_to {
                    let rest = accounts.get(&from).map_or(0, |s| s.native);
                    debit_native(accounts, from, rest)?;
                    credit_native(accounts, target, rest)?;
                }
                Ok(())
            }

            Transfer::Asset {
                asset_id,
                from,
                to,
                amount,
                close_to,
            } => {
                if !self.assets.contains_key(&asset_id) {
                    return Err(LedgerError::UnknownAsset(asset_id));
                }
                debit_asset(accounts, asset_id, from, amount)?;
                credit_asset(accounts, asset_id, to, amount)?;
                if let Some(target) = close_to {
                    let rest = holding(accounts, asset_id, &from)?;
                    debit_asset(accounts, asset_id, from, rest)?;
                    credit_asset(accounts, asset_id, target, rest)?;
                    if let Some(state) = accounts.get_mut(&from) {
                        state.holdings.remove(&asset_id);
                    }
                }
                Ok(())
            }
        }
    }
}

fn debit_native(
    accounts: &mut HashMap<Address, AccountState>,
    account: Address,
    amount: u64,
) -> Result<(), LedgerError> {
    let available = accounts.get(&account).map_or(0, |s| s.native);
    if available < amount {
        return Err(LedgerError::InsufficientBalance {
            account,
            needed: amount,
            available,
        });
    }
    if amount > 0 {
        accounts.entry(account).or_default().native = available - amount;
    }
    Ok(())
}

fn credit_native(
    accounts: &mut HashMap<Address, AccountState>,
    account: Address,
    amount: u64,
) -> Result<(), LedgerError> {
    let state = accounts.entry(account).or_default();
    state.native = state
        .native
        .checked_add(amount)
        .ok_or(LedgerError::Overflow)?;
    Ok(())
}

fn holding(
    accounts: &HashMap<Address, AccountState>,
    asset_id: AssetId,
    account: &Address,
) -> Result<u64, LedgerError> {
    accounts
        .get(account)
        .and_then(|s| s.holdings.get(&asset_id))
        .copied()
        .ok_or(LedgerError::NotRegistered {
            account: *account,
            asset_id,
        })
}

fn debit_asset(
    accounts: &mut HashMap<Address, AccountState>,
    asset_id: AssetId,
    account: Address,
    amount: u64,
) -> Result<(), LedgerError> {
    let available = holding(accounts, asset_id, &account)?;
    if available < amount {
        return Err(LedgerError::InsufficientBalance {
            account,
            needed: amount,
            available,
        });
    }
    if let Some(balance) = accounts
        .get_mut(&account)
        .and_then(|s| s.holdings.get_mut(&asset_id))
    {
        *balance = available - amount;
    }
    Ok(())
}

fn credit_asset(
    accounts: &mut HashMap<Address, AccountState>,
    asset_id: AssetId,
    account: Address,
    amount: u64,
) -> Result<(), LedgerError> {
    let balance = accounts
        .get_mut(&account)
        .and_then(|s| s.holdings.get_mut(&asset_id))
        .ok_or(LedgerError::NotRegistered { account, asset_id })?;
    *balance = balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
    Ok(())
}

impl Ledger for MemoryLedger {
    fn registration_fee(&self) -> u64 {
        self.config.registration_fee
    }

    fn native_decimals(&self) -> u8 {
        self.config.native_decimals
    }

    fn is_registered(&self, account: &Address, asset_id: AssetId) -> bool {
        self.accounts
            .get(account)
            .is_some_and(|s| s.holdings.contains_key(&asset_id))
    }

    fn balance(&self, account: &Address, asset: Asset) -> u64 {
        let Some(state) = self.accounts.get(account) else {
            return 0;
        };
        match asset {
            Asset::Native => state.native,
            Asset::Fungible { id } => state.holdings.get(&id).copied().unwrap_or(0),
        }
    }

    fn submit(&mut self, group: &[Transfer]) -> Result<(), LedgerError> {
        let mut staged = self.accounts.clone();
        for transfer in group {
            if let Err(e) = self.apply(&mut staged, transfer) {
                tracing::debug!(error = %e, ?transfer, "ledger group rejected");
                return Err(e);
            }
        }
        self.accounts = staged;
        tracing::debug!(transfers = group.len(), "ledger group committed");
        Ok(())
    }
}
