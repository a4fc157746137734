//! Admin Registry - asset whitelist, enablement and pair permissions
//!
//! # State Machine (per asset)
//!
//! ```text
//! (unknown) --verify--> VERIFIED --enable(fee)--> ENABLED
//!                           ^                        |
//!                           +------ disable ---------+
//! ```
//!
//! `verified` is sticky. `fee_bps` lives only while the asset is enabled and
//! is reset to 0 on disable. Re-enabling never requires re-verification.
//!
//! Permission edges are directional: `(A, B)` says nothing about `(B, A)`.
//! Both endpoints must be enabled when an edge is written; edges are not
//! re-checked when an endpoint is later disabled (the exchange path checks
//! enablement itself).

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core_types::{AccountId, AssetId};
use crate::error::SwapError;
use crate::fee::is_valid_fee_bps;

/// Per-asset registry state
///
/// # Invariants:
/// - `enabled` implies `verified`
/// - `fee_bps < MAX_FEE_BPS` while enabled, `0` while disabled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub verified: bool,
    pub enabled: bool,
    pub fee_bps: u64,
}

/// Directional exchange permission for an ordered `(source, target)` pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEdge {
    pub permitted: bool,
}

/// Admin Registry
///
/// All mutations are gated on the administrator fixed at construction.
/// Every mutation validates fully before writing, so a failed call leaves
/// the registry untouched.
#[derive(Debug, Clone)]
pub struct AdminRegistry {
    admin: AccountId,
    assets: FxHashMap<AssetId, AssetRecord>,
    permissions: FxHashMap<(AssetId, AssetId), PermissionEdge>,
}

impl AdminRegistry {
    pub fn new(admin: AccountId) -> Self {
        Self {
            admin,
            assets: FxHashMap::default(),
            permissions: FxHashMap::default(),
        }
    }

    /// The administrator identity (immutable)
    #[inline]
    pub fn admin(&self) -> AccountId {
        self.admin
    }

    /// Fail with `AdminOnly` unless `caller` is the administrator
    #[inline]
    pub fn ensure_admin(&self, caller: AccountId) -> Result<(), SwapError> {
        if caller != self.admin {
            debug!(caller, "Rejected non-admin caller");
            return Err(SwapError::AdminOnly);
        }
        Ok(())
    }

    // ============================================================
    // MUTATIONS (admin only)
    // ============================================================

    /// Mark an asset as verified. Idempotent.
    pub fn verify_asset(&mut self, caller: AccountId, asset: AssetId) -> Result<(), SwapError> {
        self.ensure_admin(caller)?;
        let record = self.assets.entry(asset).or_default();
        if !record.verified {
            record.verified = true;
            info!(asset, "Asset verified");
        }
        Ok(())
    }

    /// Enable a verified asset with the given fee rate
    ///
    /// # Errors
    /// - `InvalidAsset` if the asset was never verified
    /// - `InvalidQuantity` if `fee_bps >= MAX_FEE_BPS`
    pub fn add_enabled_asset(
        &mut self,
        caller: AccountId,
        asset: AssetId,
        fee_bps: u64,
    ) -> Result<(), SwapError> {
        self.ensure_admin(caller)?;
        if !self.is_asset_verified(asset) {
            return Err(SwapError::InvalidAsset(asset));
        }
        if !is_valid_fee_bps(fee_bps) {
            return Err(SwapError::InvalidQuantity);
        }

        let record = self.assets.entry(asset).or_default();
        record.enabled = true;
        record.fee_bps = fee_bps;
        info!(asset, fee_bps, "Asset enabled");
        Ok(())
    }

    /// Disable an enabled asset. The asset stays verified; its fee resets to 0.
    pub fn remove_enabled_asset(
        &mut self,
        caller: AccountId,
        asset: AssetId,
    ) -> Result<(), SwapError> {
        self.ensure_admin(caller)?;
        match self.assets.get_mut(&asset) {
            Some(record) if record.enabled => {
                record.enabled = false;
                record.fee_bps = 0;
                info!(asset, "Asset disabled");
                Ok(())
            }
            _ => Err(SwapError::InvalidAsset(asset)),
        }
    }

    /// Write the directional permission edge `source -> target`
    ///
    /// Both endpoints must be enabled at call time.
    pub fn set_exchange_permission(
        &mut self,
        caller: AccountId,
        source: AssetId,
        target: AssetId,
        permitted: bool,
    ) -> Result<(), SwapError> {
        self.ensure_admin(caller)?;
        if !self.is_asset_enabled(source) {
            return Err(SwapError::InvalidAsset(source));
        }
        if !self.is_asset_enabled(target) {
            return Err(SwapError::InvalidAsset(target));
        }

        self.permissions
            .insert((source, target), PermissionEdge { permitted });
        info!(source, target, permitted, "Exchange permission set");
        Ok(())
    }

    // ============================================================
    // QUERIES (never fail)
    // ============================================================

    pub fn is_asset_verified(&self, asset: AssetId) -> bool {
        self.assets.get(&asset).is_some_and(|r| r.verified)
    }

    pub fn is_asset_enabled(&self, asset: AssetId) -> bool {
        self.assets.get(&asset).is_some_and(|r| r.enabled)
    }

    pub fn asset_record(&self, asset: AssetId) -> Option<AssetRecord> {
        self.assets.get(&asset).copied()
    }

    /// Fee rate of an asset (0 for unknown or disabled assets)
    pub fn fee_bps(&self, asset: AssetId) -> u64 {
        self.assets.get(&asset).map_or(0, |r| r.fee_bps)
    }

    /// Raw edge lookup: `None` if the edge was never written
    pub fn permission(&self, source: AssetId, target: AssetId) -> Option<PermissionEdge> {
        self.permissions.get(&(source, target)).copied()
    }

    /// Enabled assets in ascending id order
    pub fn enabled_assets(&self) -> Vec<AssetId> {
        let mut ids: Vec<AssetId> = self
            .assets
            .iter()
            .filter(|(_, r)| r.enabled)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }
}
