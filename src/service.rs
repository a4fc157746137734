//! SwapService - serialized access to the engine
//!
//! Every operation holds the engine lock for its whole duration, including
//! the provider calls it awaits. Operations therefore execute one at a time
//! and no caller ever observes a half-applied exchange or withdrawal.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::core_types::{AccountId, AssetId};
use crate::engine::{ExchangeReceipt, SwapEngine};
use crate::error::SwapError;
use crate::fee::Quote;
use crate::ledger::ExchangeStats;
use crate::provider::AssetInfo;
use crate::registry::AssetRecord;

/// Cloneable handle to a shared [`SwapEngine`]
#[derive(Clone)]
pub struct SwapService {
    engine: Arc<Mutex<SwapEngine>>,
}

impl SwapService {
    pub fn new(engine: SwapEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    pub async fn verify_asset(&self, caller: AccountId, asset: AssetId) -> Result<(), SwapError> {
        self.engine.lock().await.verify_asset(caller, asset)
    }

    pub async fn add_enabled_asset(
        &self,
        caller: AccountId,
        asset: AssetId,
        fee_bps: u64,
    ) -> Result<(), SwapError> {
        self.engine
            .lock()
            .await
            .add_enabled_asset(caller, asset, fee_bps)
    }

    pub async fn remove_enabled_asset(
        &self,
        caller: AccountId,
        asset: AssetId,
    ) -> Result<(), SwapError> {
        self.engine.lock().await.remove_enabled_asset(caller, asset)
    }

    pub async fn set_exchange_permission(
        &self,
        caller: AccountId,
        source: AssetId,
        target: AssetId,
        permitted: bool,
    ) -> Result<(), SwapError> {
        self.engine
            .lock()
            .await
            .set_exchange_permission(caller, source, target, permitted)
    }

    pub async fn exchange(
        &self,
        caller: AccountId,
        source: AssetId,
        target: AssetId,
        quantity: u64,
    ) -> Result<ExchangeReceipt, SwapError> {
        let mut engine = self.engine.lock().await;
        engine.exchange(caller, source, target, quantity).await
    }

    pub async fn withdraw_commission(
        &self,
        caller: AccountId,
        asset: AssetId,
        quantity: u64,
    ) -> Result<(), SwapError> {
        let mut engine = self.engine.lock().await;
        engine.withdraw_commission(caller, asset, quantity).await
    }

    pub async fn quote_exchange(
        &self,
        source: AssetId,
        target: AssetId,
        quantity: u64,
    ) -> Result<Quote, SwapError> {
        self.engine
            .lock()
            .await
            .quote_exchange(source, target, quantity)
    }

    pub async fn is_asset_verified(&self, asset: AssetId) -> bool {
        self.engine.lock().await.is_asset_verified(asset)
    }

    pub async fn is_asset_enabled(&self, asset: AssetId) -> bool {
        self.engine.lock().await.is_asset_enabled(asset)
    }

    pub async fn asset_record(&self, asset: AssetId) -> Option<AssetRecord> {
        self.engine.lock().await.registry().asset_record(asset)
    }

    pub async fn is_exchange_permitted(&self, source: AssetId, target: AssetId) -> bool {
        self.engine
            .lock()
            .await
            .registry()
            .permission(source, target)
            .is_some_and(|edge| edge.permitted)
    }

    pub async fn asset_info(&self, asset: AssetId) -> Result<AssetInfo, SwapError> {
        self.engine.lock().await.asset_info(asset).await
    }

    pub async fn get_total_exchange_volume(&self) -> u64 {
        self.engine.lock().await.get_total_exchange_volume()
    }

    pub async fn get_total_commission_collected(&self) -> u64 {
        self.engine.lock().await.get_total_commission_collected()
    }

    pub async fn stats(&self) -> ExchangeStats {
        self.engine.lock().await.stats()
    }

    /// Commission collected per source asset (informational)
    pub async fn commission_breakdown(&self) -> BTreeMap<AssetId, u64> {
        self.engine.lock().await.ledger().commission_breakdown().clone()
    }
}
