//! Ledger - commission accounting and settlement audit log
//!
//! [`CommissionLedger`] keeps the running totals. `total_commission` is a
//! single counter summed across every asset, and withdrawals are checked
//! against that counter only.
//!
//! The per-asset breakdown (keyed by the source asset the commission was
//! computed on) is informational: it records where the summed counter came
//! from but does not gate withdrawals.

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::Serialize;

use crate::core_types::AssetId;
use crate::error::SwapError;
use crate::settlement::SettlementRecord;

/// Snapshot of the process-wide exchange statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExchangeStats {
    pub total_volume: u64,
    pub total_commission: u64,
}

/// Commission Ledger
///
/// # Invariants:
/// - `total_volume` only grows
/// - `total_commission` grows on exchange, shrinks only on withdrawal
/// - No overflow/underflow (checked arithmetic)
#[derive(Debug, Clone, Default)]
pub struct CommissionLedger {
    total_volume: u64,
    total_commission: u64,
    by_asset: BTreeMap<AssetId, u64>,
}

impl CommissionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn total_exchange_volume(&self) -> u64 {
        self.total_volume
    }

    #[inline]
    pub fn total_commission_collected(&self) -> u64 {
        self.total_commission
    }

    pub fn stats(&self) -> ExchangeStats {
        ExchangeStats {
            total_volume: self.total_volume,
            total_commission: self.total_commission,
        }
    }

    /// Commission collected per source asset since start
    ///
    /// Withdrawals draw on the summed total and never reduce these entries,
    /// so after any withdrawal the breakdown no longer sums to
    /// [`Self::total_commission_collected`].
    pub fn commission_breakdown(&self) -> &BTreeMap<AssetId, u64> {
        &self.by_asset
    }

    /// Check that an exchange can be recorded without overflow
    pub fn can_record(&self, quantity: u64, commission: u64) -> bool {
        self.total_volume.checked_add(quantity).is_some()
            && self.total_commission.checked_add(commission).is_some()
    }

    /// Record a settled exchange
    ///
    /// # Errors
    /// `InvalidQuantity` on overflow; nothing is changed in that case.
    pub fn record_exchange(
        &mut self,
        source: AssetId,
        quantity: u64,
        commission: u64,
    ) -> Result<(), SwapError> {
        let volume = self
            .total_volume
            .checked_add(quantity)
            .ok_or(SwapError::InvalidQuantity)?;
        let total = self
            .total_commission
            .checked_add(commission)
            .ok_or(SwapError::InvalidQuantity)?;

        self.total_volume = volume;
        self.total_commission = total;
        let entry = self.by_asset.entry(source).or_insert(0);
        *entry = entry.saturating_add(commission);
        Ok(())
    }

    /// Check that `quantity` can be withdrawn
    pub fn ensure_withdrawable(&self, quantity: u64) -> Result<(), SwapError> {
        if quantity > self.total_commission {
            return Err(SwapError::InvalidQuantity);
        }
        Ok(())
    }

    /// Deduct a settled withdrawal from the commission counter
    pub fn withdraw(&mut self, quantity: u64) -> Result<(), SwapError> {
        self.ensure_withdrawable(quantity)?;
        self.total_commission -= quantity;
        Ok(())
    }
}

/// Writes settlement records as CSV rows
pub struct AuditWriter<W: Write> {
    out: W,
    entry_count: u64,
}

impl<W: Write> AuditWriter<W> {
    pub const HEADER: &'static str =
        "settlement_id,kind,caller,source,target,quantity,commission,payout,state";

    /// Create a writer and emit the header row
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "{}", Self::HEADER)?;
        Ok(Self {
            out,
            entry_count: 0,
        })
    }

    pub fn write_record(&mut self, record: &SettlementRecord) -> io::Result<()> {
        writeln!(
            self.out,
            "{},{},{},{},{},{},{},{},{}",
            record.id,
            record.kind.as_str(),
            record.caller,
            record.source,
            record.target,
            record.quantity,
            record.commission,
            record.payout,
            record.state
        )?;
        self.entry_count += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Get total number of rows written (header excluded)
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
