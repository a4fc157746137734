//! Swap Error Types
//!
//! Every engine operation returns one of these kinds. Callers can tell
//! configuration problems (`ExchangeNotPermitted`, `InvalidAsset`) apart from
//! funds problems (`InsufficientFunds`) and transport problems (`TransferFailed`).

use thiserror::Error;

use crate::core_types::AssetId;

/// Engine error kinds
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwapError {
    #[error("Caller is not the administrator")]
    AdminOnly,

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("Quantity is zero or out of range")]
    InvalidQuantity,

    #[error("Exchange not permitted for this pair")]
    ExchangeNotPermitted,

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Asset not verified or not enabled: {0}")]
    InvalidAsset(AssetId),
}

impl SwapError {
    /// Get the stable error code for callers
    pub fn code(&self) -> &'static str {
        match self {
            SwapError::AdminOnly => "ADMIN_ONLY",
            SwapError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            SwapError::InvalidQuantity => "INVALID_QUANTITY",
            SwapError::ExchangeNotPermitted => "EXCHANGE_NOT_PERMITTED",
            SwapError::TransferFailed(_) => "TRANSFER_FAILED",
            SwapError::InvalidAsset(_) => "INVALID_ASSET",
        }
    }

    /// True for errors caused by registry configuration rather than funds or transport
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SwapError::ExchangeNotPermitted | SwapError::InvalidAsset(_)
        )
    }
}

/// Errors reported by an asset provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Operation rejected: {0}")]
    Rejected(String),

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

impl From<ProviderError> for SwapError {
    fn from(e: ProviderError) -> Self {
        SwapError::TransferFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SwapError::AdminOnly.code(), "ADMIN_ONLY");
        assert_eq!(SwapError::InvalidQuantity.code(), "INVALID_QUANTITY");
        assert_eq!(
            SwapError::ExchangeNotPermitted.code(),
            "EXCHANGE_NOT_PERMITTED"
        );
        assert_eq!(SwapError::InvalidAsset(7).code(), "INVALID_ASSET");
        assert_eq!(
            SwapError::InsufficientFunds {
                required: 10,
                available: 1
            }
            .code(),
            "INSUFFICIENT_FUNDS"
        );
    }

    #[test]
    fn test_configuration_errors() {
        assert!(SwapError::ExchangeNotPermitted.is_configuration());
        assert!(SwapError::InvalidAsset(1).is_configuration());
        assert!(!SwapError::TransferFailed("x".into()).is_configuration());
        assert!(!SwapError::AdminOnly.is_configuration());
    }

    #[test]
    fn test_provider_error_maps_to_transfer_failed() {
        let err: SwapError = ProviderError::InsufficientBalance.into();
        assert_eq!(err, SwapError::TransferFailed("Insufficient balance".into()));
        assert_eq!(err.code(), "TRANSFER_FAILED");
    }

    #[test]
    fn test_display() {
        let err = SwapError::InvalidAsset(42);
        assert_eq!(err.to_string(), "Asset not verified or not enabled: 42");
    }
}
