//! Swap Settlement driver
//!
//! Replays a request file against an engine backed by in-memory providers.
//!
//! ```text
//! ┌──────────┐    ┌───────────┐    ┌──────────┐    ┌──────────┐
//! │  Config  │───▶│ Bootstrap │───▶│  Replay  │───▶│  Stats   │
//! │  (YAML)  │    │ (registry)│    │  (CSV)   │    │  (JSON)  │
//! └──────────┘    └───────────┘    └──────────┘    └──────────┘
//! ```
//!
//! Usage: `swap_settlement [--env dev] [--input fixtures]`

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use swap_settlement::config::AppConfig;
use swap_settlement::csv_io::{
    BALANCES_CSV, REQUESTS_CSV, RequestOp, load_balances, load_requests,
};
use swap_settlement::engine::AuditSink;
use swap_settlement::logging::init_logging;
use swap_settlement::{
    AssetId, AuditWriter, MemoryAsset, ProviderSet, SwapEngine, SwapService,
};

fn get_arg(names: &[&str], default: &str) -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if names.contains(&args[i].as_str()) && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    default.to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = get_arg(&["--env", "-e"], "dev");
    let input_dir = get_arg(&["--input"], "fixtures");

    let config = AppConfig::load(&env)?;
    let _guard = init_logging(&config);
    info!(env = %env, input = %input_dir, "Starting swap settlement driver");

    // ============================================================
    // PROVIDERS
    // ============================================================
    let custody = config.engine.custody;
    let mut assets: BTreeMap<AssetId, Arc<MemoryAsset>> = BTreeMap::new();
    let mut providers = ProviderSet::new();
    for asset in &config.assets {
        let memory = Arc::new(MemoryAsset::new(
            asset.name.clone(),
            asset.symbol.clone(),
            asset.decimals,
        ));
        memory
            .deposit(custody, asset.custody_balance)
            .with_context(|| format!("Failed to fund custody for asset {}", asset.asset_id))?;
        providers.insert(asset.asset_id, memory.clone());
        assets.insert(asset.asset_id, memory);
    }

    let balances_path = format!("{}/{}", input_dir, BALANCES_CSV);
    for balance in load_balances(&balances_path)? {
        let asset = assets
            .get(&balance.asset_id)
            .with_context(|| format!("Unknown asset {} in {}", balance.asset_id, balances_path))?;
        asset
            .deposit(balance.account_id, balance.amount)
            .with_context(|| format!("Failed to credit account {}", balance.account_id))?;
    }

    // ============================================================
    // ENGINE + BOOTSTRAP
    // ============================================================
    let mut engine = SwapEngine::new(config.engine, providers);
    if let Some(path) = &config.audit_path {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
        let sink: AuditSink = AuditWriter::new(Box::new(file) as Box<dyn Write + Send + Sync>)?;
        engine = engine.with_audit(sink);
    }
    let service = SwapService::new(engine);

    let admin = config.admin();
    for asset in &config.assets {
        service.verify_asset(admin, asset.asset_id).await?;
        if asset.enabled {
            service
                .add_enabled_asset(admin, asset.asset_id, asset.fee_bps)
                .await
                .with_context(|| format!("Failed to enable asset {}", asset.asset_id))?;
        }
    }
    for edge in &config.permissions {
        service
            .set_exchange_permission(admin, edge.source, edge.target, edge.permitted)
            .await
            .with_context(|| format!("Failed to set permission {} -> {}", edge.source, edge.target))?;
    }

    // ============================================================
    // REPLAY
    // ============================================================
    let requests = load_requests(&format!("{}/{}", input_dir, REQUESTS_CSV))?;
    let mut accepted = 0usize;
    let mut rejected: BTreeMap<&'static str, usize> = BTreeMap::new();

    for req in &requests {
        let result = match req.op {
            RequestOp::Exchange { source, target } => service
                .exchange(req.caller, source, target, req.quantity)
                .await
                .map(|_| ()),
            RequestOp::Withdraw { asset } => {
                service
                    .withdraw_commission(req.caller, asset, req.quantity)
                    .await
            }
        };
        match result {
            Ok(()) => accepted += 1,
            Err(e) => {
                warn!(caller = req.caller, op = ?req.op, quantity = req.quantity, error = %e, "Request rejected");
                *rejected.entry(e.code()).or_default() += 1;
            }
        }
    }

    // ============================================================
    // REPORT
    // ============================================================
    let mut infos = Vec::new();
    for asset_id in assets.keys() {
        infos.push(service.asset_info(*asset_id).await?);
    }
    let report = serde_json::json!({
        "requests": requests.len(),
        "accepted": accepted,
        "rejected": rejected,
        "stats": service.stats().await,
        "commission_by_asset": service.commission_breakdown().await,
        "assets": infos,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!(accepted, total = requests.len(), "Replay finished");
    Ok(())
}
