use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::core_types::{AccountId, AssetId};
use crate::engine::EngineConfig;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub engine: EngineConfig,
    /// Assets bound to in-memory providers and onboarded at startup
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
    /// Directional permission edges written at startup
    #[serde(default)]
    pub permissions: Vec<PermissionConfig>,
    /// CSV audit trail of every settlement attempt
    #[serde(default)]
    pub audit_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AssetConfig {
    pub asset_id: AssetId,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    #[serde(default)]
    pub fee_bps: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Initial custody balance, funds payouts
    #[serde(default)]
    pub custody_balance: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct PermissionConfig {
    pub source: AssetId,
    pub target: AssetId,
    #[serde(default = "default_true")]
    pub permitted: bool,
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", config_path))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn admin(&self) -> AccountId {
        self.engine.admin
    }
}
