//! Escrow state machine and its transition guards.

use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::asset::{self, Asset, AssetId};
use crate::auth::{Call, CallContext, SignedCall};
use crate::error::{AssetError, EscrowError, LedgerError};
use crate::identity::Address;
use crate::ledger::{Ledger, Payment, Transfer};
use crate::permission::{Operation, Role};
use crate::Result;

/// Attestation latch. Moves from `Pending` to `Met` once and stays there.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum ConditionStatus {
    #[default]
    Pending,
    Met,
}

impl ConditionStatus {
    pub fn is_met(self) -> bool {
        self == Self::Met
    }

    /// Sets the latch; returns `true` if this call flipped it.
    fn latch(&mut self) -> bool {
        let flipped = *self == Self::Pending;
        *self = Self::Met;
        flipped
    }
}

/// Lifecycle progress. Only ever advances.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Encode, Decode)]
pub enum Phase {
    Created,
    AssetRegistered,
    Funded,
    Released,
    Destroyed,
}

/// Observable lifecycle state of an escrow.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowState {
    /// Initialized; holding not yet registered.
    Created,
    /// Holding registered; no deposit confirmed yet.
    AssetRegistered,
    /// Deposit confirmed; awaiting attestation.
    ConditionPending,
    /// Condition attested; release allowed.
    ConditionMet,
    /// Payment reserve released to the worker.
    Released,
    /// Cancelled; no further calls succeed.
    Destroyed,
}

/// Audit record of a successful transition.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct EscrowEvent {
    pub operation: Operation,
    pub sender: Address,
    /// Value moved or recorded by the transition, in base units.
    pub amount: u64,
    /// Counterparty named by the call, if any.
    pub subject: Option<Address>,
}

/// Parameters supplied by the boss when creating an escrow.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EscrowParams {
    /// Who receives the asset and the payment on release.
    pub worker: Address,
    /// Optional delegate; [`Address::ZERO`] for none.
    #[cfg_attr(feature = "json", serde(default = "zero_address"))]
    pub admin: Address,
    /// The escrowed asset.
    pub asset_id: AssetId,
    /// Intended asset amount (informational).
    pub quantity: u64,
    /// Advertised payment as a display amount, e.g. `2.0`.
    pub payment_amount: f64,
}

#[cfg(feature = "json")]
fn zero_address() -> Address {
    Address::ZERO
}

/// One escrow agreement and its holding account.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct EscrowAccount {
    address: Address,
    boss: Address,
    admin: Option<Address>,
    worker: Address,
    asset_id: AssetId,
    quantity: u64,
    advertised_payment: u64,
    payment_amount: u64,
    condition: ConditionStatus,
    phase: Phase,
    call_nonce: u64,
    events: Vec<EscrowEvent>,
}

impl EscrowAccount {
    /// Creates an escrow owned by the caller.
    ///
    /// `nonce` distinguishes escrows of the same boss and determines the
    /// holding-account address. No value moves.
    pub fn initialize<L: Ledger>(
        ctx: &CallContext,
        nonce: u64,
        params: &EscrowParams,
        ledger: &L,
    ) -> Result<Self> {
        params.asset_id.validate()?;
        if params.quantity == 0 {
            return Err(AssetError::ZeroAmount.into());
        }
        let advertised_payment =
            asset::to_base_units(params.payment_amount, ledger.native_decimals())?;

        let boss = ctx.sender();
        let address = Address::derive_escrow(&boss, nonce);
        tracing::info!(
            escrow = %address,
            %boss,
            worker = %params.worker,
            asset_id = %params.asset_id,
            quantity = params.quantity,
            "escrow initialized"
        );

        Ok(Self {
            address,
            boss,
            admin: params.admin.non_zero(),
            worker: params.worker,
            asset_id: params.asset_id,
            quantity: params.quantity,
            advertised_payment,
            payment_amount: 0,
            condition: ConditionStatus::Pending,
            phase: Phase::Created,
            call_nonce: 0,
            events: Vec::new(),
        })
    }

    /// Opts the holding account in to the escrowed asset, paying the
    /// registration fee in the same atomic group. Anyone may call.
    pub fn register_asset_holding<L: Ledger>(
        &mut self,
        ctx: &CallContext,
        fee: Payment,
        ledger: &mut L,
    ) -> Result<()> {
        let op = Operation::RegisterAssetHolding;
        self.guard(op, ctx)?;
        self.check_payment(ctx, &fee)?;

        if ledger.is_registered(&self.address, self.asset_id) {
            return Err(EscrowError::AlreadyRegistered(self.asset_id));
        }
        let required = ledger.registration_fee();
        if fee.amount < required {
            return Err(EscrowError::InsufficientFee {
                required,
                provided: fee.amount,
            });
        }

        ledger.submit(&[
            fee.to_transfer(),
            Transfer::Register {
                account: self.address,
                asset_id: self.asset_id,
            },
        ])?;

        self.advance(Phase::AssetRegistered);
        self.record(op, ctx, fee.amount, None);
        tracing::info!(
            escrow = %self.address,
            asset_id = %self.asset_id,
            "asset holding registered"
        );
        Ok(())
    }

    /// Records the boss's payment reserve. The last confirmed deposit wins.
    ///
    /// Rejected once the reserve has been released.
    pub fn confirm_deposit<L: Ledger>(
        &mut self,
        ctx: &CallContext,
        payment: Payment,
        ledger: &mut L,
    ) -> Result<()> {
        let op = Operation::ConfirmDeposit;
        self.guard(op, ctx)?;
        if self.phase >= Phase::Released {
            return Err(EscrowError::AlreadyReleased);
        }
        self.check_payment(ctx, &payment)?;

        ledger.submit(&[payment.to_transfer()])?;

        if self.payment_amount != 0 {
            tracing::debug!(
                escrow = %self.address,
                previous = self.payment_amount,
                "overwriting confirmed deposit"
            );
        }
        self.payment_amount = payment.amount;
        self.advance(Phase::Funded);
        self.record(op, ctx, payment.amount, None);
        tracing::info!(escrow = %self.address, amount = payment.amount, "deposit confirmed");
        Ok(())
    }

    /// Attests that the agreed condition holds. Idempotent.
    ///
    /// `worker_address` is kept for the audit trail only.
    pub fn set_condition_met(
        &mut self,
        ctx: &CallContext,
        worker_address: Address,
    ) -> Result<bool> {
        let op = Operation::SetConditionMet;
        self.guard(op, ctx)?;

        if worker_address != self.worker {
            tracing::warn!(
                escrow = %self.address,
                named = %worker_address,
                worker = %self.worker,
                "attestation names a different worker"
            );
        }

        if self.condition.latch() {
            tracing::info!(escrow = %self.address, sender = %ctx.sender(), "condition met");
        }
        self.record(op, ctx, 0, Some(worker_address));
        Ok(true)
    }

    /// Pays the reserve to the worker and closes the rest of the holding
    /// account's native balance back to the boss.
    pub fn release_funds<L: Ledger>(&mut self, ctx: &CallContext, ledger: &mut L) -> Result<()> {
        let op = Operation::ReleaseFunds;
        self.guard(op, ctx)?;
        self.require_condition()?;

        let amount = self.payment_amount;
        ledger.submit(&[Transfer::Native {
            from: self.address,
            to: self.worker,
            amount,
            close_remainder_to: Some(self.boss),
        }])?;

        self.payment_amount = 0;
        self.advance(Phase::Released);
        self.record(op, ctx, amount, Some(self.worker));
        tracing::info!(escrow = %self.address, worker = %self.worker, amount, "funds released");
        Ok(())
    }

    /// Transfers the full held balance of the escrowed asset to the worker.
    ///
    /// Returns the amount moved. The holding stays registered.
    pub fn release_asset<L: Ledger>(&mut self, ctx: &CallContext, ledger: &mut L) -> Result<u64> {
        let op = Operation::ReleaseAsset;
        self.guard(op, ctx)?;
        self.require_condition()?;

        if !ledger.is_registered(&self.address, self.asset_id) {
            return Err(LedgerError::NotRegistered {
                account: self.address,
                asset_id: self.asset_id,
            }
            .into());
        }
        let held = ledger.balance(&self.address, Asset::Fungible { id: self.asset_id });
        if held != self.quantity {
            tracing::warn!(
                escrow = %self.address,
                held,
                quantity = self.quantity,
                "held asset differs from agreed quantity"
            );
        }

        ledger.submit(&[Transfer::Asset {
            asset_id: self.asset_id,
            from: self.address,
            to: self.worker,
            amount: held,
            close_to: None,
        }])?;

        self.record(op, ctx, held, Some(self.worker));
        tracing::info!(escrow = %self.address, worker = %self.worker, held, "asset released");
        Ok(held)
    }

    /// Returns everything still held to the boss and destroys the escrow.
    ///
    /// While the holding is registered the boss must hold `asset_id` too;
    /// otherwise the ledger rejects the close-out and nothing is cancelled.
    pub fn cancel<L: Ledger>(&mut self, ctx: &CallContext, ledger: &mut L) -> Result<()> {
        let op = Operation::Cancel;
        self.guard(op, ctx)?;

        let mut group = Vec::with_capacity(2);
        if ledger.is_registered(&self.address, self.asset_id) {
            if !ledger.is_registered(&self.boss, self.asset_id) {
                tracing::warn!(
                    escrow = %self.address,
                    boss = %self.boss,
                    asset_id = %self.asset_id,
                    "boss does not hold the escrowed asset; close-out will fail"
                );
            }
            group.push(Transfer::Asset {
                asset_id: self.asset_id,
                from: self.address,
                to: self.boss,
                amount: 0,
                close_to: Some(self.boss),
            });
        }
        group.push(Transfer::Native {
            from: self.address,
            to: self.boss,
            amount: self.payment_amount,
            close_remainder_to: Some(self.boss),
        });
        ledger.submit(&group)?;

        let returned = self.payment_amount;
        self.payment_amount = 0;
        self.advance(Phase::Destroyed);
        self.record(op, ctx, returned, Some(self.boss));
        tracing::info!(escrow = %self.address, returned, "escrow cancelled");
        Ok(())
    }

    /// Verifies a signed call and routes it to the matching operation.
    ///
    /// The call must carry the current [`call_nonce`](Self::call_nonce), which
    /// advances only when the routed operation succeeds.
    pub fn dispatch<L: Ledger>(&mut self, signed: &SignedCall, ledger: &mut L) -> Result<()> {
        if signed.escrow != self.address {
            return Err(EscrowError::MisdirectedCall(signed.escrow));
        }
        let ctx = signed.verify()?;
        if signed.nonce != self.call_nonce {
            tracing::warn!(
                escrow = %self.address,
                sender = %ctx.sender(),
                expected = self.call_nonce,
                provided = signed.nonce,
                "stale signed call"
            );
            return Err(EscrowError::StaleNonce {
                expected: self.call_nonce,
                provided: signed.nonce,
            });
        }
        self.route(&ctx, &signed.call, ledger)?;
        self.call_nonce += 1;
        Ok(())
    }

    fn route<L: Ledger>(&mut self, ctx: &CallContext, call: &Call, ledger: &mut L) -> Result<()> {
        match *call {
            Call::RegisterAssetHolding { fee } => self.register_asset_holding(ctx, fee, ledger),
            Call::ConfirmDeposit { payment } => self.confirm_deposit(ctx, payment, ledger),
            Call::SetConditionMet { worker_address } => {
                self.set_condition_met(ctx, worker_address).map(|_| ())
            }
            Call::ReleaseFunds => self.release_funds(ctx, ledger),
            Call::ReleaseAsset => self.release_asset(ctx, ledger).map(|_| ()),
            Call::Cancel => self.cancel(ctx, ledger),
        }
    }

    /// Roles `who` holds in this escrow.
    pub fn roles_of(&self, who: &Address) -> Vec<Role> {
        let mut roles = Vec::with_capacity(3);
        if *who == self.boss {
            roles.push(Role::Boss);
        }
        if self.admin.as_ref() == Some(who) {
            roles.push(Role::Admin);
        }
        if *who == self.worker {
            roles.push(Role::Worker);
        }
        roles
    }

    pub fn state(&self) -> EscrowState {
        match (self.phase, self.condition) {
            (Phase::Destroyed, _) => EscrowState::Destroyed,
            (Phase::Released, _) => EscrowState::Released,
            (_, ConditionStatus::Met) => EscrowState::ConditionMet,
            (Phase::Funded, ConditionStatus::Pending) => EscrowState::ConditionPending,
            (Phase::AssetRegistered, ConditionStatus::Pending) => EscrowState::AssetRegistered,
            (Phase::Created, ConditionStatus::Pending) => EscrowState::Created,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn boss(&self) -> Address {
        self.boss
    }

    pub fn admin(&self) -> Option<Address> {
        self.admin
    }

    pub fn worker(&self) -> Address {
        self.worker
    }

    pub fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    /// Payment amount advertised at creation, in base units.
    pub fn advertised_payment(&self) -> u64 {
        self.advertised_payment
    }

    /// Confirmed payment reserve, in base units.
    pub fn payment_amount(&self) -> u64 {
        self.payment_amount
    }

    pub fn condition(&self) -> ConditionStatus {
        self.condition
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Nonce the next [`SignedCall`] must carry.
    pub fn call_nonce(&self) -> u64 {
        self.call_nonce
    }

    pub fn is_destroyed(&self) -> bool {
        self.phase == Phase::Destroyed
    }

    /// Audit trail of successful transitions, oldest first.
    pub fn events(&self) -> &[EscrowEvent] {
        &self.events
    }

    /// Encodes the account state for storage on a host ledger.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| EscrowError::Snapshot(e.to_string()))
    }

    /// Decodes account state produced by [`EscrowAccount::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (account, _) = bincode::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| EscrowError::Snapshot(e.to_string()))?;
        Ok(account)
    }

    fn guard(&self, op: Operation, ctx: &CallContext) -> Result<()> {
        if self.is_destroyed() {
            return Err(EscrowError::AccountDestroyed);
        }
        let sender = ctx.sender();
        if !op.allows(&self.roles_of(&sender)) {
            tracing::warn!(escrow = %self.address, %sender, operation = %op, "unauthorized call");
            return Err(EscrowError::Unauthorized {
                operation: op,
                sender,
            });
        }
        Ok(())
    }

    fn require_condition(&self) -> Result<()> {
        if !self.condition.is_met() {
            return Err(EscrowError::ConditionNotMet);
        }
        Ok(())
    }

    /// Attached payments must come from the caller and target this escrow.
    fn check_payment(&self, ctx: &CallContext, payment: &Payment) -> Result<()> {
        if payment.receiver != self.address {
            return Err(EscrowError::InvalidPayment(format!(
                "receiver {} is not the escrow {}",
                payment.receiver, self.address
            )));
        }
        if payment.sender != ctx.sender() {
            return Err(EscrowError::InvalidPayment(format!(
                "sender {} is not the caller {}",
                payment.sender,
                ctx.sender()
            )));
        }
        Ok(())
    }

    fn advance(&mut self, to: Phase) {
        if to > self.phase {
            self.phase = to;
        }
    }

    fn record(
        &mut self,
        operation: Operation,
        ctx: &CallContext,
        amount: u64,
        subject: Option<Address>,
    ) {
        self.events.push(EscrowEvent {
            operation,
            sender: ctx.sender(),
            amount,
            subject,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;

    const BOSS: Address = Address::new([1u8; 32]);
    const WORKER: Address = Address::new([2u8; 32]);
    const ADMIN: Address = Address::new([3u8; 32]);
    const STRANGER: Address = Address::new([4u8; 32]);

    fn ctx(who: Address) -> CallContext {
        CallContext::trusted(who)
    }

    fn setup(admin: Address) -> (EscrowAccount, MemoryLedger) {
        let mut ledger = MemoryLedger::default();
        ledger.fund(BOSS, 10_000_000).unwrap();
        ledger.fund(STRANGER, 1_000_000).unwrap();
        let asset_id = ledger.create_asset(BOSS, 10);
        let params = EscrowParams {
            worker: WORKER,
            admin,
            asset_id,
            quantity: 3,
            payment_amount: 2.0,
        };
        let escrow = EscrowAccount::initialize(&ctx(BOSS), 1, &params, &ledger).unwrap();
        (escrow, ledger)
    }

    fn register(escrow: &mut EscrowAccount, ledger: &mut MemoryLedger) {
        let fee = Payment::new(BOSS, escrow.address(), 200_000);
        escrow
            .register_asset_holding(&ctx(BOSS), fee, ledger)
            .unwrap();
    }

    #[test]
    fn initialize_defaults() {
        let (escrow, _) = setup(Address::ZERO);
        assert_eq!(escrow.boss(), BOSS);
        assert_eq!(escrow.worker(), WORKER);
        assert_eq!(escrow.admin(), None);
        assert_eq!(escrow.payment_amount(), 0);
        assert_eq!(escrow.advertised_payment(), 2_000_000);
        assert_eq!(escrow.condition(), ConditionStatus::Pending);
        assert_eq!(escrow.state(), EscrowState::Created);
        assert_eq!(escrow.address(), Address::derive_escrow(&BOSS, 1));
    }

    #[test]
    fn initialize_rejects_zero_inputs() {
        let ledger = MemoryLedger::default();
        let mut params = EscrowParams {
            worker: WORKER,
            admin: Address::ZERO,
            asset_id: AssetId(0),
            quantity: 3,
            payment_amount: 1.0,
        };
        assert_eq!(
            EscrowAccount::initialize(&ctx(BOSS), 1, &params, &ledger),
            Err(EscrowError::Asset(AssetError::ZeroAssetId))
        );

        params.asset_id = AssetId(5);
        params.quantity = 0;
        assert_eq!(
            EscrowAccount::initialize(&ctx(BOSS), 1, &params, &ledger),
            Err(EscrowError::Asset(AssetError::ZeroAmount))
        );

        params.quantity = 3;
        params.payment_amount = -2.0;
        assert!(EscrowAccount::initialize(&ctx(BOSS), 1, &params, &ledger).is_err());
    }

    #[test]
    fn register_holding_by_anyone() {
        let (mut escrow, mut ledger) = setup(Address::ZERO);
        let fee = Payment::new(STRANGER, escrow.address(), 100_000);
        escrow
            .register_asset_holding(&ctx(STRANGER), fee, &mut ledger)
            .unwrap();

        let id = escrow.asset_id();
        assert!(ledger.is_registered(&escrow.address(), id));
        assert_eq!(ledger.balance(&escrow.address(), Asset::Fungible { id }), 0);
        assert_eq!(ledger.balance(&escrow.address(), Asset::Native), 100_000);
        assert_eq!(escrow.state(), EscrowState::AssetRegistered);
    }

    #[test]
    fn register_holding_guards() {
        let (mut escrow, mut ledger) = setup(Address::ZERO);
        let addr = escrow.address();

        let short = Payment::new(BOSS, addr, 99_999);
        assert_eq!(
            escrow.register_asset_holding(&ctx(BOSS), short, &mut ledger),
            Err(EscrowError::InsufficientFee {
                required: 100_000,
                provided: 99_999
            })
        );

        let elsewhere = Payment::new(BOSS, WORKER, 200_000);
        assert!(matches!(
            escrow.register_asset_holding(&ctx(BOSS), elsewhere, &mut ledger),
            Err(EscrowError::InvalidPayment(_))
        ));

        register(&mut escrow, &mut ledger);
        let again = Payment::new(BOSS, addr, 200_000);
        assert_eq!(
            escrow.register_asset_holding(&ctx(BOSS), again, &mut ledger),
            Err(EscrowError::AlreadyRegistered(escrow.asset_id()))
        );
        // only the successful fee moved
        assert_eq!(ledger.balance(&addr, Asset::Native), 200_000);
    }

    #[test]
    fn confirm_deposit_overwrites() {
        let (mut escrow, mut ledger) = setup(Address::ZERO);
        let addr = escrow.address();

        escrow
            .confirm_deposit(&ctx(BOSS), Payment::new(BOSS, addr, 1_000_000), &mut ledger)
            .unwrap();
        escrow
            .confirm_deposit(&ctx(BOSS), Payment::new(BOSS, addr, 2_000_000), &mut ledger)
            .unwrap();

        assert_eq!(escrow.payment_amount(), 2_000_000);
        assert_eq!(ledger.balance(&addr, Asset::Native), 3_000_000);
        assert_eq!(escrow.state(), EscrowState::ConditionPending);
        assert_eq!(escrow.phase(), Phase::Funded);
    }

    #[test]
    fn confirm_deposit_guards() {
        let (mut escrow, mut ledger) = setup(ADMIN);
        let addr = escrow.address();

        for who in [ADMIN, WORKER, STRANGER] {
            assert_eq!(
                escrow.confirm_deposit(&ctx(who), Payment::new(who, addr, 1), &mut ledger),
                Err(EscrowError::Unauthorized {
                    operation: Operation::ConfirmDeposit,
                    sender: who
                })
            );
        }
        assert!(matches!(
            escrow.confirm_deposit(&ctx(BOSS), Payment::new(BOSS, WORKER, 1), &mut ledger),
            Err(EscrowError::InvalidPayment(_))
        ));
        assert!(matches!(
            escrow.confirm_deposit(&ctx(BOSS), Payment::new(STRANGER, addr, 1), &mut ledger),
            Err(EscrowError::InvalidPayment(_))
        ));
        assert_eq!(escrow.payment_amount(), 0);
        assert_eq!(ledger.balance(&addr, Asset::Native), 0);
    }

    #[test]
    fn condition_is_a_latch() {
        let (mut escrow, _) = setup(ADMIN);
        assert_eq!(escrow.set_condition_met(&ctx(ADMIN), WORKER), Ok(true));
        assert_eq!(escrow.set_condition_met(&ctx(BOSS), WORKER), Ok(true));
        assert_eq!(escrow.condition(), ConditionStatus::Met);
        assert_eq!(escrow.state(), EscrowState::ConditionMet);
        assert_eq!(escrow.events().len(), 2);
    }

    #[test]
    fn condition_guards() {
        let (mut escrow, _) = setup(Address::ZERO);
        for who in [WORKER, STRANGER, ADMIN] {
            assert_eq!(
                escrow.set_condition_met(&ctx(who), WORKER),
                Err(EscrowError::Unauthorized {
                    operation: Operation::SetConditionMet,
                    sender: who
                })
            );
        }
        assert_eq!(escrow.condition(), ConditionStatus::Pending);
    }

    #[test]
    fn attestation_records_named_worker() {
        let (mut escrow, _) = setup(Address::ZERO);
        escrow.set_condition_met(&ctx(BOSS), STRANGER).unwrap();
        assert_eq!(escrow.condition(), ConditionStatus::Met);
        assert_eq!(escrow.events()[0].subject, Some(STRANGER));
    }

    #[test]
    fn release_requires_condition() {
        let (mut escrow, mut ledger) = setup(Address::ZERO);
        assert_eq!(
            escrow.release_funds(&ctx(BOSS), &mut ledger),
            Err(EscrowError::ConditionNotMet)
        );
        assert_eq!(
            escrow.release_asset(&ctx(BOSS), &mut ledger),
            Err(EscrowError::ConditionNotMet)
        );
    }

    #[test]
    fn release_funds_by_admin() {
        let (mut escrow, mut ledger) = setup(ADMIN);
        let addr = escrow.address();
        register(&mut escrow, &mut ledger);
        escrow
            .confirm_deposit(&ctx(BOSS), Payment::new(BOSS, addr, 2_000_000), &mut ledger)
            .unwrap();
        escrow.set_condition_met(&ctx(ADMIN), WORKER).unwrap();

        let boss_before = ledger.balance(&BOSS, Asset::Native);
        escrow.release_funds(&ctx(ADMIN), &mut ledger).unwrap();

        assert_eq!(escrow.payment_amount(), 0);
        assert_eq!(ledger.balance(&WORKER, Asset::Native), 2_000_000);
        // registration fee closes back to the boss
        assert_eq!(ledger.balance(&BOSS, Asset::Native), boss_before + 200_000);
        assert_eq!(ledger.balance(&addr, Asset::Native), 0);
        assert_eq!(escrow.state(), EscrowState::Released);
    }

    #[test]
    fn deposit_rejected_after_release() {
        let (mut escrow, mut ledger) = setup(Address::ZERO);
        let addr = escrow.address();
        escrow
            .confirm_deposit(&ctx(BOSS), Payment::new(BOSS, addr, 1_000_000), &mut ledger)
            .unwrap();
        escrow.set_condition_met(&ctx(BOSS), WORKER).unwrap();
        escrow.release_funds(&ctx(BOSS), &mut ledger).unwrap();

        let boss_before = ledger.balance(&BOSS, Asset::Native);
        assert_eq!(
            escrow.confirm_deposit(&ctx(BOSS), Payment::new(BOSS, addr, 500_000), &mut ledger),
            Err(EscrowError::AlreadyReleased)
        );
        assert_eq!(ledger.balance(&BOSS, Asset::Native), boss_before);
        assert_eq!(escrow.payment_amount(), 0);
        assert_eq!(escrow.state(), EscrowState::Released);
    }

    #[test]
    fn release_asset_to_worker() {
        let (mut escrow, mut ledger) = setup(Address::ZERO);
        let addr = escrow.address();
        let id = escrow.asset_id();
        escrow.set_condition_met(&ctx(BOSS), WORKER).unwrap();

        assert_eq!(
            escrow.release_asset(&ctx(BOSS), &mut ledger),
            Err(EscrowError::Ledger(LedgerError::NotRegistered {
                account: addr,
                asset_id: id
            }))
        );

        register(&mut escrow, &mut ledger);
        ledger.transfer_asset(id, BOSS, addr, 3).unwrap();

        // worker not opted in yet
        assert!(escrow.release_asset(&ctx(BOSS), &mut ledger).is_err());
        assert_eq!(ledger.balance(&addr, Asset::Fungible { id }), 3);

        ledger.register_holding(WORKER, id).unwrap();
        assert_eq!(escrow.release_asset(&ctx(BOSS), &mut ledger), Ok(3));
        assert_eq!(ledger.balance(&WORKER, Asset::Fungible { id }), 3);
        assert_eq!(ledger.balance(&addr, Asset::Fungible { id }), 0);
    }

    #[test]
    fn cancel_is_boss_only() {
        let (mut escrow, mut ledger) = setup(ADMIN);
        let before = escrow.clone();
        for who in [ADMIN, WORKER, STRANGER] {
            assert_eq!(
                escrow.cancel(&ctx(who), &mut ledger),
                Err(EscrowError::Unauthorized {
                    operation: Operation::Cancel,
                    sender: who
                })
            );
        }
        assert_eq!(escrow, before);
    }

    #[test]
    fn cancel_returns_everything() {
        let (mut escrow, mut ledger) = setup(Address::ZERO);
        let addr = escrow.address();
        let id = escrow.asset_id();
        register(&mut escrow, &mut ledger);
        ledger.transfer_asset(id, BOSS, addr, 3).unwrap();
        escrow
            .confirm_deposit(&ctx(BOSS), Payment::new(BOSS, addr, 2_000_000), &mut ledger)
            .unwrap();

        escrow.cancel(&ctx(BOSS), &mut ledger).unwrap();

        assert_eq!(ledger.balance(&BOSS, Asset::Native), 10_000_000);
        assert_eq!(ledger.balance(&BOSS, Asset::Fungible { id }), 10);
        assert!(!ledger.is_registered(&addr, id));
        assert_eq!(escrow.payment_amount(), 0);
        assert_eq!(escrow.state(), EscrowState::Destroyed);
    }

    #[test]
    fn cancel_needs_boss_holding() {
        let (mut escrow, mut ledger) = setup(Address::ZERO);
        let addr = escrow.address();
        let id = escrow.asset_id();
        register(&mut escrow, &mut ledger);
        escrow
            .confirm_deposit(&ctx(BOSS), Payment::new(BOSS, addr, 1_000_000), &mut ledger)
            .unwrap();

        // boss closes their whole holding into the escrow
        ledger
            .submit(&[Transfer::Asset {
                asset_id: id,
                from: BOSS,
                to: addr,
                amount: 0,
                close_to: Some(addr),
            }])
            .unwrap();
        assert!(!ledger.is_registered(&BOSS, id));

        let before = escrow.clone();
        assert_eq!(
            escrow.cancel(&ctx(BOSS), &mut ledger),
            Err(EscrowError::Ledger(LedgerError::NotRegistered {
                account: BOSS,
                asset_id: id
            }))
        );
        assert_eq!(escrow, before);
        assert_eq!(ledger.balance(&addr, Asset::Native), 1_200_000);

        ledger.register_holding(BOSS, id).unwrap();
        escrow.cancel(&ctx(BOSS), &mut ledger).unwrap();
        assert_eq!(ledger.balance(&BOSS, Asset::Fungible { id }), 10);
        assert_eq!(ledger.balance(&BOSS, Asset::Native), 10_000_000);
        assert!(escrow.is_destroyed());
    }

    #[test]
    fn destroyed_rejects_everything() {
        let (mut escrow, mut ledger) = setup(ADMIN);
        let addr = escrow.address();
        escrow.cancel(&ctx(BOSS), &mut ledger).unwrap();

        let fee = Payment::new(BOSS, addr, 200_000);
        assert_eq!(
            escrow.register_asset_holding(&ctx(BOSS), fee, &mut ledger),
            Err(EscrowError::AccountDestroyed)
        );
        assert_eq!(
            escrow.confirm_deposit(&ctx(BOSS), fee, &mut ledger),
            Err(EscrowError::AccountDestroyed)
        );
        assert_eq!(
            escrow.set_condition_met(&ctx(ADMIN), WORKER),
            Err(EscrowError::AccountDestroyed)
        );
        assert_eq!(
            escrow.release_funds(&ctx(BOSS), &mut ledger),
            Err(EscrowError::AccountDestroyed)
        );
        assert_eq!(
            escrow.release_asset(&ctx(BOSS), &mut ledger),
            Err(EscrowError::AccountDestroyed)
        );
        assert_eq!(
            escrow.cancel(&ctx(BOSS), &mut ledger),
            Err(EscrowError::AccountDestroyed)
        );
    }

    #[test]
    fn roles() {
        let (escrow, _) = setup(ADMIN);
        assert_eq!(escrow.roles_of(&BOSS), vec![Role::Boss]);
        assert_eq!(escrow.roles_of(&ADMIN), vec![Role::Admin]);
        assert_eq!(escrow.roles_of(&WORKER), vec![Role::Worker]);
        assert!(escrow.roles_of(&STRANGER).is_empty());
    }

    #[test]
    fn snapshot_preserves_state() {
        let (mut escrow, mut ledger) = setup(ADMIN);
        register(&mut escrow, &mut ledger);
        escrow.set_condition_met(&ctx(ADMIN), WORKER).unwrap();

        let bytes = escrow.to_bytes().unwrap();
        let restored = EscrowAccount::from_bytes(&bytes).unwrap();
        assert_eq!(restored, escrow);
        assert!(EscrowAccount::from_bytes(&bytes[..bytes.len() / 2]).is_err());
    }
}
