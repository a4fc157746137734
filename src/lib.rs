//! Swap Settlement - whitelisted asset exchange engine
//!
//! An administrator curates which assets may be exchanged, at what fee, and
//! in which direction. Any caller can then swap one enabled asset for
//! another; the engine settles both legs atomically and keeps running totals
//! of volume and commission.
//!
//! # Modules
//!
//! - [`core_types`] - Core type definitions (AssetId, AccountId, SettlementId)
//! - [`error`] - Engine and provider error kinds
//! - [`fee`] - Basis-point commission math
//! - [`registry`] - Admin Registry (verification, enablement, permissions)
//! - [`provider`] - Asset Provider Capability + in-memory provider
//! - [`settlement`] - Two-leg settlement FSM with compensation
//! - [`ledger`] - Commission Ledger and CSV audit trail
//! - [`engine`] - Exchange Engine
//! - [`service`] - Serialized, shareable engine handle
//! - [`config`] / [`logging`] / [`csv_io`] - Driver plumbing

// Core types - must be first!
pub mod core_types;
pub mod error;

// Settlement components
pub mod engine;
pub mod fee;
pub mod ledger;
pub mod provider;
pub mod registry;
pub mod service;
pub mod settlement;

// Driver plumbing
pub mod config;
pub mod csv_io;
pub mod logging;

// Convenient re-exports at crate root
pub use core_types::{AccountId, AssetId, SettlementId};
pub use engine::{EngineConfig, ExchangeReceipt, SwapEngine};
pub use error::{ProviderError, SwapError};
pub use fee::Quote;
pub use ledger::{AuditWriter, CommissionLedger, ExchangeStats};
pub use provider::{AssetInfo, AssetProvider, MemoryAsset, ProviderSet};
pub use registry::{AdminRegistry, AssetRecord, PermissionEdge};
pub use service::SwapService;
pub use settlement::{SettlementRecord, SettlementState};
