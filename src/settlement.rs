//! Settlement - the atomic pair of transfers behind one exchange
//!
//! # State Machine
//!
//! ```text
//! INIT → SOURCE_PENDING → SOURCE_DONE → TARGET_PENDING → COMMITTED
//!              ↓                              ↓
//!           FAILED                     COMPENSATING → ROLLED_BACK
//! ```
//!
//! - SOURCE_PENDING pulls `quantity` of the source asset from the caller
//!   into custody.
//! - TARGET_PENDING pushes `payout` of the target asset from custody to
//!   the caller.
//! - COMPENSATING returns the pulled `quantity` to the caller when the push
//!   fails, so no pull is ever left committed without its push.
//!
//! Providers have no reversible holds, so compensation is a reverse
//! transfer. If that reverse transfer fails too, the settlement stays in
//! COMPENSATING and is reported for manual repair.

use std::fmt;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::core_types::{AccountId, AssetId, SettlementId};
use crate::error::ProviderError;
use crate::provider::AssetProvider;

/// Settlement FSM States
///
/// Terminal states: COMMITTED, FAILED, ROLLED_BACK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(i16)]
pub enum SettlementState {
    /// Request validated, nothing moved yet
    Init = 0,

    /// Source pull issued
    SourcePending = 10,

    /// Source pull confirmed - funds are IN CUSTODY
    SourceDone = 20,

    /// Target payout issued
    TargetPending = 30,

    /// Terminal: both legs settled
    Committed = 40,

    /// Terminal: source pull failed (no funds moved)
    Failed = -10,

    /// Refunding the source pull
    Compensating = -20,

    /// Terminal: source pull refunded
    RolledBack = -30,
}

impl SettlementState {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SettlementState::Committed | SettlementState::Failed | SettlementState::RolledBack
        )
    }

    /// Check if caller funds sit in custody without their paired payout
    #[inline]
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            SettlementState::SourceDone
                | SettlementState::TargetPending
                | SettlementState::Compensating
        )
    }

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementState::Init => "INIT",
            SettlementState::SourcePending => "SOURCE_PENDING",
            SettlementState::SourceDone => "SOURCE_DONE",
            SettlementState::TargetPending => "TARGET_PENDING",
            SettlementState::Committed => "COMMITTED",
            SettlementState::Failed => "FAILED",
            SettlementState::Compensating => "COMPENSATING",
            SettlementState::RolledBack => "ROLLED_BACK",
        }
    }
}

impl fmt::Display for SettlementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a settlement record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SettlementKind {
    Exchange,
    Withdrawal,
}

impl SettlementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementKind::Exchange => "exchange",
            SettlementKind::Withdrawal => "withdrawal",
        }
    }
}

/// Audit record of one settlement attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementRecord {
    #[serde(serialize_with = "serialize_id")]
    pub id: SettlementId,
    pub kind: SettlementKind,
    pub caller: AccountId,
    pub source: AssetId,
    pub target: AssetId,
    pub quantity: u64,
    pub commission: u64,
    pub payout: u64,
    pub state: SettlementState,
    pub error: Option<String>,
}

pub(crate) fn serialize_id<S: serde::Serializer>(id: &SettlementId, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(id)
}

impl SettlementRecord {
    pub fn exchange(
        caller: AccountId,
        source: AssetId,
        target: AssetId,
        quantity: u64,
        commission: u64,
        payout: u64,
    ) -> Self {
        Self {
            id: SettlementId::new(),
            kind: SettlementKind::Exchange,
            caller,
            source,
            target,
            quantity,
            commission,
            payout,
            state: SettlementState::Init,
            error: None,
        }
    }

    pub fn withdrawal(caller: AccountId, asset: AssetId, quantity: u64) -> Self {
        Self {
            id: SettlementId::new(),
            kind: SettlementKind::Withdrawal,
            caller,
            source: asset,
            target: asset,
            quantity,
            commission: 0,
            payout: quantity,
            state: SettlementState::Init,
            error: None,
        }
    }

    #[inline]
    pub fn is_committed(&self) -> bool {
        self.state == SettlementState::Committed
    }
}

/// Run one provider transfer; a declined transfer counts as a failure
pub(crate) async fn transfer_checked(
    provider: &dyn AssetProvider,
    quantity: u64,
    from: AccountId,
    to: AccountId,
) -> Result<(), String> {
    match provider.transfer(quantity, from, to).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(ProviderError::Rejected("transfer declined".into()).to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Drives one exchange settlement through the FSM
pub struct Settlement<'a> {
    record: SettlementRecord,
    source: &'a dyn AssetProvider,
    target: &'a dyn AssetProvider,
    custody: AccountId,
}

impl<'a> Settlement<'a> {
    pub fn new(
        record: SettlementRecord,
        source: &'a dyn AssetProvider,
        target: &'a dyn AssetProvider,
        custody: AccountId,
    ) -> Self {
        Self {
            record,
            source,
            target,
            custody,
        }
    }

    /// Run to a terminal state, or stop in COMPENSATING if the refund fails
    pub async fn run(mut self) -> SettlementRecord {
        while !self.record.state.is_terminal() {
            let next = self.step().await;
            if next == self.record.state {
                break;
            }
            debug!(
                settlement_id = %self.record.id,
                from = %self.record.state,
                to = %next,
                "Settlement transition"
            );
            self.record.state = next;
        }
        self.record
    }

    async fn step(&mut self) -> SettlementState {
        let caller = self.record.caller;
        match self.record.state {
            SettlementState::Init => SettlementState::SourcePending,
            SettlementState::SourcePending => {
                match transfer_checked(self.source, self.record.quantity, caller, self.custody)
                    .await
                {
                    Ok(()) => SettlementState::SourceDone,
                    Err(e) => {
                        warn!(settlement_id = %self.record.id, error = %e, "Source pull failed");
                        self.record.error = Some(e);
                        SettlementState::Failed
                    }
                }
            }
            SettlementState::SourceDone => SettlementState::TargetPending,
            SettlementState::TargetPending => {
                match transfer_checked(self.target, self.record.payout, self.custody, caller).await
                {
                    Ok(()) => {
                        info!(settlement_id = %self.record.id, "Settlement committed");
                        SettlementState::Committed
                    }
                    Err(e) => {
                        warn!(settlement_id = %self.record.id, error = %e, "Target payout failed, compensating");
                        self.record.error = Some(e);
                        SettlementState::Compensating
                    }
                }
            }
            SettlementState::Compensating => {
                match transfer_checked(self.source, self.record.quantity, self.custody, caller)
                    .await
                {
                    Ok(()) => {
                        info!(settlement_id = %self.record.id, "Settlement rolled back");
                        SettlementState::RolledBack
                    }
                    Err(e) => {
                        error!(
                            settlement_id = %self.record.id,
                            caller,
                            asset = self.record.source,
                            quantity = self.record.quantity,
                            error = %e,
                            "Refund failed, funds left in custody"
                        );
                        let first = self.record.error.take().unwrap_or_default();
                        self.record.error = Some(format!("{first}; refund failed: {e}"));
                        SettlementState::Compensating
                    }
                }
            }
            terminal => terminal,
        }
    }
}
