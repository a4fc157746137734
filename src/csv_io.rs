//! CSV I/O - Load driver input from CSV files
//!
//! Two inputs feed the driver binary:
//! - balances: `account_id,asset_id,amount`
//! - requests: `caller,op,asset_a,asset_b,quantity`
//!
//! For `exchange` rows `asset_a`/`asset_b` are source/target. For
//! `withdraw` rows `asset_a` is the asset and `asset_b` is ignored.

use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::core_types::{AccountId, AssetId};

// ============================================================
// Constants for file paths
// ============================================================

pub const BALANCES_CSV: &str = "balances.csv";
pub const REQUESTS_CSV: &str = "requests.csv";

pub const OP_EXCHANGE: &str = "exchange";
pub const OP_WITHDRAW: &str = "withdraw";

/// Initial balance credited before replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialBalance {
    pub account_id: AccountId,
    pub asset_id: AssetId,
    pub amount: u64,
}

/// One replayed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOp {
    Exchange { source: AssetId, target: AssetId },
    Withdraw { asset: AssetId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRequest {
    pub caller: AccountId,
    pub op: RequestOp,
    pub quantity: u64,
}

pub fn load_balances(path: &str) -> Result<Vec<InitialBalance>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path))?;
    parse_balances(BufReader::new(file))
}

pub fn load_requests(path: &str) -> Result<Vec<SwapRequest>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path))?;
    parse_requests(BufReader::new(file))
}

pub fn parse_balances<R: BufRead>(reader: R) -> Result<Vec<InitialBalance>> {
    let mut balances = Vec::new();

    for (line_num, line) in reader.lines().skip(1).enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() < 3 {
            bail!("Expected 3 columns at line {}", line_num + 2);
        }
        balances.push(InitialBalance {
            account_id: parts[0]
                .parse()
                .with_context(|| format!("Invalid account_id at line {}", line_num + 2))?,
            asset_id: parts[1]
                .parse()
                .with_context(|| format!("Invalid asset_id at line {}", line_num + 2))?,
            amount: parts[2]
                .parse()
                .with_context(|| format!("Invalid amount at line {}", line_num + 2))?,
        });
    }

    Ok(balances)
}

pub fn parse_requests<R: BufRead>(reader: R) -> Result<Vec<SwapRequest>> {
    let mut requests = Vec::new();

    for (line_num, line) in reader.lines().skip(1).enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() < 5 {
            bail!("Expected 5 columns at line {}", line_num + 2);
        }

        let caller: AccountId = parts[0]
            .parse()
            .with_context(|| format!("Invalid caller at line {}", line_num + 2))?;
        let asset_a: AssetId = parts[2]
            .parse()
            .with_context(|| format!("Invalid asset at line {}", line_num + 2))?;
        let quantity: u64 = parts[4]
            .parse()
            .with_context(|| format!("Invalid quantity at line {}", line_num + 2))?;

        let op = match parts[1].to_lowercase().as_str() {
            OP_EXCHANGE => RequestOp::Exchange {
                source: asset_a,
                target: parts[3]
                    .parse()
                    .with_context(|| format!("Invalid target at line {}", line_num + 2))?,
            },
            OP_WITHDRAW => RequestOp::Withdraw { asset: asset_a },
            other => bail!("Unknown op '{}' at line {}", other, line_num + 2),
        };

        requests.push(SwapRequest {
            caller,
            op,
            quantity,
        });
    }

    Ok(requests)
}
