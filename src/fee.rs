//! Fee calculation utilities
//!
//! All fee rates use basis points: 1 bps = 1/10000, so 50 = 0.50%.
//! Enabled assets carry a rate strictly below [`MAX_FEE_BPS`] (1%).

use serde::{Deserialize, Serialize};

/// Fee rate precision (10^4 = 10,000)
pub const BPS_PRECISION: u64 = 10_000;

/// Exclusive upper bound for an asset fee rate (100 = 1.00%)
pub const MAX_FEE_BPS: u64 = 100;

/// Check whether a fee rate may be stored on an enabled asset
#[inline]
pub fn is_valid_fee_bps(fee_bps: u64) -> bool {
    fee_bps < MAX_FEE_BPS
}

/// Calculate commission from quantity and rate.
///
/// Uses u128 intermediate to prevent overflow. Division truncates, so the
/// commission never rounds up and there is no minimum fee.
///
/// # Example
/// ```
/// use swap_settlement::fee::calculate_commission;
/// // 1000 units at 0.50% = 5 units
/// assert_eq!(calculate_commission(1000, 50), 5);
/// // 199 units at 0.50% = 0.995 -> 0
/// assert_eq!(calculate_commission(199, 50), 0);
/// ```
#[inline]
pub fn calculate_commission(quantity: u64, fee_bps: u64) -> u64 {
    ((quantity as u128 * fee_bps as u128) / BPS_PRECISION as u128) as u64
}

/// Commission and payout for one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub quantity: u64,
    pub fee_bps: u64,
    pub commission: u64,
    pub payout: u64,
}

impl Quote {
    /// Split `quantity` into commission and payout at `fee_bps`
    pub fn compute(quantity: u64, fee_bps: u64) -> Self {
        let commission = calculate_commission(quantity, fee_bps);
        Self {
            quantity,
            fee_bps,
            commission,
            // commission <= quantity whenever fee_bps <= BPS_PRECISION
            payout: quantity.saturating_sub(commission),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_commission_basic() {
        assert_eq!(calculate_commission(1000, 50), 5);
        assert_eq!(calculate_commission(1000, 25), 2);
        assert_eq!(calculate_commission(10_000, 99), 99);
    }

    #[test]
    fn test_calculate_commission_truncates() {
        // 1999 * 50 / 10000 = 9.995 -> 9
        assert_eq!(calculate_commission(1999, 50), 9);
        assert_eq!(calculate_commission(1, 99), 0);
    }

    #[test]
    fn test_calculate_commission_zero() {
        assert_eq!(calculate_commission(0, 50), 0);
        assert_eq!(calculate_commission(100_000, 0), 0);
    }

    #[test]
    fn test_no_overflow() {
        let fee = calculate_commission(u64::MAX, 99);
        assert_eq!(fee, ((u64::MAX as u128 * 99) / 10_000) as u64);
    }

    #[test]
    fn test_quote_compute() {
        let quote = Quote::compute(1000, 50);
        assert_eq!(quote.commission, 5);
        assert_eq!(quote.payout, 995);
        assert_eq!(quote.commission + quote.payout, quote.quantity);
    }

    #[test]
    fn test_commission_below_quantity() {
        for q in [1u64, 7, 100, 12_345, 1_000_000] {
            for f in [0u64, 1, 50, 99] {
                let quote = Quote::compute(q, f);
                assert!(quote.commission < q);
                assert_eq!(quote.payout, q - quote.commission);
            }
        }
    }

    #[test]
    fn test_fee_bound() {
        assert!(is_valid_fee_bps(0));
        assert!(is_valid_fee_bps(99));
        assert!(!is_valid_fee_bps(100));
        assert!(!is_valid_fee_bps(150));
    }
}
