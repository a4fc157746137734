//! Core types used throughout the system
//!
//! These are fundamental type aliases used by all modules.
//! They provide semantic meaning and enable future type evolution.

use std::fmt;
use std::str::FromStr;

/// Asset ID - globally unique identifier for a tradable asset type.
///
/// # Constraints:
/// - **Immutable**: Once assigned, NEVER changes
/// - **Opaque**: The engine never interprets the value, only compares it
///
/// Used as the key of the asset table and, as an ordered pair, of the
/// permission table.
pub type AssetId = u32;

/// Account ID - identity of a caller, the administrator, or the engine's
/// own custody account.
///
/// Callers are assumed pre-authenticated by the environment.
pub type AccountId = u64;

/// Settlement ID - ULID-based identifier for one exchange or withdrawal attempt
///
/// ULIDs are sortable by creation time, so audit rows replay in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SettlementId(ulid::Ulid);

impl SettlementId {
    /// Generate a new unique SettlementId
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Get the inner ULID value
    pub fn inner(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for SettlementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SettlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SettlementId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}
