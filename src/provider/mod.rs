//! Asset Provider Capability
//!
//! Interface every tradable asset type exposes to the engine. The engine
//! consumes it and never implements storage itself.
//!
//! Every call may fail. A failed call (or a `transfer` that returns
//! `Ok(false)`) aborts the enclosing engine operation.

pub mod memory;

pub use memory::MemoryAsset;

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::core_types::{AccountId, AssetId};
use crate::error::ProviderError;

/// Asset provider trait for balance and metadata operations
#[async_trait]
pub trait AssetProvider: Send + Sync {
    /// Move `quantity` units from `from` to `to`
    ///
    /// `Ok(false)` means the provider declined the transfer.
    async fn transfer(
        &self,
        quantity: u64,
        from: AccountId,
        to: AccountId,
    ) -> Result<bool, ProviderError>;

    async fn get_balance(&self, account: AccountId) -> Result<u64, ProviderError>;

    async fn get_decimals(&self) -> Result<u32, ProviderError>;

    async fn get_name(&self) -> Result<String, ProviderError>;

    async fn get_symbol(&self) -> Result<String, ProviderError>;
}

/// Binding of asset ids to their providers, fixed at engine construction
#[derive(Clone, Default)]
pub struct ProviderSet {
    providers: FxHashMap<AssetId, Arc<dyn AssetProvider>>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `asset` to `provider`, replacing any previous binding
    pub fn with_provider(mut self, asset: AssetId, provider: Arc<dyn AssetProvider>) -> Self {
        self.providers.insert(asset, provider);
        self
    }

    pub fn insert(&mut self, asset: AssetId, provider: Arc<dyn AssetProvider>) {
        self.providers.insert(asset, provider);
    }

    pub fn get(&self, asset: AssetId) -> Option<Arc<dyn AssetProvider>> {
        self.providers.get(&asset).cloned()
    }

    pub fn contains(&self, asset: AssetId) -> bool {
        self.providers.contains_key(&asset)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Asset metadata read through the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetInfo {
    pub asset_id: AssetId,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

impl AssetInfo {
    pub async fn fetch(
        asset_id: AssetId,
        provider: &dyn AssetProvider,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            asset_id,
            name: provider.get_name().await?,
            symbol: provider.get_symbol().await?,
            decimals: provider.get_decimals().await?,
        })
    }
}
