//! Exchange Engine - swap validation, fee computation and settlement
//!
//! # Exchange Flow
//!
//! ```text
//! exchange(caller, source, target, qty)
//!   1-3. registry: both assets known + enabled, edge source→target permitted
//!   4.   qty > 0
//!   5.   advisory balance check via source provider
//!   6.   commission = floor(qty * fee_bps / 10000), payout = qty - commission
//!   7-8. Settlement FSM: pull qty of source, push payout of target
//!   9.   ledger: volume += qty, commission += commission
//! ```
//!
//! Registry and ledger are only written after every check has passed and
//! both transfers have settled, so a failed call leaves no trace in engine
//! state. Transfer-level rollback is handled by [`Settlement`].
//!
//! The engine takes `&mut self` for every mutation; wrap it in
//! [`crate::service::SwapService`] to share it between tasks.

use std::io::Write;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core_types::{AccountId, AssetId, SettlementId};
use crate::error::SwapError;
use crate::fee::Quote;
use crate::ledger::{AuditWriter, CommissionLedger, ExchangeStats};
use crate::provider::{AssetInfo, AssetProvider, ProviderSet};
use crate::registry::{AdminRegistry, AssetRecord};
use crate::settlement::{Settlement, SettlementRecord, SettlementState, transfer_checked};

/// Identities fixed at engine construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The only identity allowed to mutate the registry or withdraw commission
    pub admin: AccountId,
    /// Account holding the engine's own custody balances
    pub custody: AccountId,
}

/// Result of a settled exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExchangeReceipt {
    #[serde(serialize_with = "crate::settlement::serialize_id")]
    pub settlement_id: SettlementId,
    pub source: AssetId,
    pub target: AssetId,
    pub quantity: u64,
    pub commission: u64,
    pub payout: u64,
}

pub type AuditSink = AuditWriter<Box<dyn Write + Send + Sync>>;

/// Exchange Engine
pub struct SwapEngine {
    registry: AdminRegistry,
    ledger: CommissionLedger,
    providers: ProviderSet,
    custody: AccountId,
    audit: Option<AuditSink>,
}

impl SwapEngine {
    pub fn new(config: EngineConfig, providers: ProviderSet) -> Self {
        info!(
            admin = config.admin,
            custody = config.custody,
            providers = providers.len(),
            "Swap engine initialized"
        );
        Self {
            registry: AdminRegistry::new(config.admin),
            ledger: CommissionLedger::new(),
            providers,
            custody: config.custody,
            audit: None,
        }
    }

    /// Attach a CSV audit trail for every settlement attempt
    pub fn with_audit(mut self, audit: AuditSink) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn admin(&self) -> AccountId {
        self.registry.admin()
    }

    pub fn custody(&self) -> AccountId {
        self.custody
    }

    pub fn registry(&self) -> &AdminRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &CommissionLedger {
        &self.ledger
    }

    // ============================================================
    // ADMIN REGISTRY
    // ============================================================

    pub fn verify_asset(&mut self, caller: AccountId, asset: AssetId) -> Result<(), SwapError> {
        self.registry.verify_asset(caller, asset)
    }

    pub fn add_enabled_asset(
        &mut self,
        caller: AccountId,
        asset: AssetId,
        fee_bps: u64,
    ) -> Result<(), SwapError> {
        self.registry.add_enabled_asset(caller, asset, fee_bps)
    }

    pub fn remove_enabled_asset(
        &mut self,
        caller: AccountId,
        asset: AssetId,
    ) -> Result<(), SwapError> {
        self.registry.remove_enabled_asset(caller, asset)
    }

    pub fn set_exchange_permission(
        &mut self,
        caller: AccountId,
        source: AssetId,
        target: AssetId,
        permitted: bool,
    ) -> Result<(), SwapError> {
        self.registry
            .set_exchange_permission(caller, source, target, permitted)
    }

    pub fn is_asset_verified(&self, asset: AssetId) -> bool {
        self.registry.is_asset_verified(asset)
    }

    pub fn is_asset_enabled(&self, asset: AssetId) -> bool {
        self.registry.is_asset_enabled(asset)
    }

    // ============================================================
    // EXCHANGE
    // ============================================================

    /// Steps 1-4: registry checks and quantity check, returns the source record
    fn validate_exchange(
        &self,
        source: AssetId,
        target: AssetId,
        quantity: u64,
    ) -> Result<AssetRecord, SwapError> {
        let (Some(src), Some(dst)) = (
            self.registry.asset_record(source),
            self.registry.asset_record(target),
        ) else {
            return Err(SwapError::ExchangeNotPermitted);
        };
        let edge = self
            .registry
            .permission(source, target)
            .ok_or(SwapError::ExchangeNotPermitted)?;

        if !(src.enabled && dst.enabled && edge.permitted) {
            return Err(SwapError::ExchangeNotPermitted);
        }
        if quantity == 0 {
            return Err(SwapError::InvalidQuantity);
        }
        Ok(src)
    }

    fn provider(&self, asset: AssetId) -> Result<Arc<dyn AssetProvider>, SwapError> {
        self.providers
            .get(asset)
            .ok_or_else(|| SwapError::TransferFailed(format!("no provider bound for asset {asset}")))
    }

    /// Preview an exchange without touching any provider
    ///
    /// Runs the same registry and quantity checks as [`Self::exchange`].
    pub fn quote_exchange(
        &self,
        source: AssetId,
        target: AssetId,
        quantity: u64,
    ) -> Result<Quote, SwapError> {
        let src = self.validate_exchange(source, target, quantity)?;
        Ok(Quote::compute(quantity, src.fee_bps))
    }

    /// Swap `quantity` of `source` for `target` on behalf of `caller`
    ///
    /// # Errors
    /// - `ExchangeNotPermitted` - asset unknown, disabled, or edge missing/false;
    ///   also when `caller` is the custody account
    /// - `InvalidQuantity` - zero quantity, or totals would overflow
    /// - `InsufficientFunds` - advisory balance check failed
    /// - `TransferFailed` - any provider call failed; transfers are rolled back
    pub async fn exchange(
        &mut self,
        caller: AccountId,
        source: AssetId,
        target: AssetId,
        quantity: u64,
    ) -> Result<ExchangeReceipt, SwapError> {
        let src = self
            .validate_exchange(source, target, quantity)
            .inspect_err(|e| debug!(caller, source, target, quantity, error = %e, "Exchange rejected"))?;

        // Both legs would be custody-to-custody: nothing moves, yet commission would be booked
        if caller == self.custody {
            debug!(caller, source, target, quantity, "Exchange rejected: caller is custody");
            return Err(SwapError::ExchangeNotPermitted);
        }

        let source_provider = self.provider(source)?;
        let target_provider = self.provider(target)?;

        // Advisory only: the pull transfer enforces the real balance
        let available = source_provider.get_balance(caller).await?;
        if available < quantity {
            debug!(caller, source, quantity, available, "Exchange rejected: insufficient funds");
            return Err(SwapError::InsufficientFunds {
                required: quantity,
                available,
            });
        }

        let quote = Quote::compute(quantity, src.fee_bps);
        if !self.ledger.can_record(quote.quantity, quote.commission) {
            return Err(SwapError::InvalidQuantity);
        }

        let record = SettlementRecord::exchange(
            caller,
            source,
            target,
            quote.quantity,
            quote.commission,
            quote.payout,
        );
        let record = Settlement::new(
            record,
            source_provider.as_ref(),
            target_provider.as_ref(),
            self.custody,
        )
        .run()
        .await;
        self.audit(&record);

        if !record.is_committed() {
            return Err(SwapError::TransferFailed(
                record.error.unwrap_or_else(|| record.state.to_string()),
            ));
        }

        self.ledger
            .record_exchange(source, quote.quantity, quote.commission)?;
        info!(
            settlement_id = %record.id,
            caller,
            source,
            target,
            quantity = quote.quantity,
            commission = quote.commission,
            payout = quote.payout,
            "Exchange settled"
        );

        Ok(ExchangeReceipt {
            settlement_id: record.id,
            source,
            target,
            quantity: quote.quantity,
            commission: quote.commission,
            payout: quote.payout,
        })
    }

    // ============================================================
    // COMMISSION LEDGER
    // ============================================================

    /// Pay `quantity` of `asset` out of custody to the administrator
    ///
    /// # Errors
    /// - `AdminOnly` - caller is not the administrator
    /// - `InvalidAsset` - asset not currently enabled
    /// - `InvalidQuantity` - `quantity` exceeds collected commission
    /// - `TransferFailed` - the payout transfer failed
    pub async fn withdraw_commission(
        &mut self,
        caller: AccountId,
        asset: AssetId,
        quantity: u64,
    ) -> Result<(), SwapError> {
        self.registry.ensure_admin(caller)?;
        if !self.registry.is_asset_enabled(asset) {
            return Err(SwapError::InvalidAsset(asset));
        }
        self.ledger.ensure_withdrawable(quantity)?;
        let provider = self.provider(asset)?;

        let mut record = SettlementRecord::withdrawal(caller, asset, quantity);
        let result =
            transfer_checked(provider.as_ref(), quantity, self.custody, self.registry.admin())
                .await;
        record.state = match &result {
            Ok(()) => SettlementState::Committed,
            Err(_) => SettlementState::Failed,
        };
        record.error = result.err();
        self.audit(&record);

        if let Some(e) = record.error {
            warn!(asset, quantity, error = %e, "Commission withdrawal failed");
            return Err(SwapError::TransferFailed(e));
        }

        self.ledger.withdraw(quantity)?;
        info!(
            settlement_id = %record.id,
            asset,
            quantity,
            remaining = self.ledger.total_commission_collected(),
            "Commission withdrawn"
        );
        Ok(())
    }

    pub fn get_total_exchange_volume(&self) -> u64 {
        self.ledger.total_exchange_volume()
    }

    pub fn get_total_commission_collected(&self) -> u64 {
        self.ledger.total_commission_collected()
    }

    pub fn stats(&self) -> ExchangeStats {
        self.ledger.stats()
    }

    /// Name, symbol and decimals of a bound asset, read through its provider
    pub async fn asset_info(&self, asset: AssetId) -> Result<AssetInfo, SwapError> {
        let provider = self
            .providers
            .get(asset)
            .ok_or(SwapError::InvalidAsset(asset))?;
        Ok(AssetInfo::fetch(asset, provider.as_ref()).await?)
    }

    fn audit(&mut self, record: &SettlementRecord) {
        if let Some(audit) = self.audit.as_mut()
            && let Err(e) = audit.write_record(record).and_then(|_| audit.flush())
        {
            warn!(settlement_id = %record.id, error = %e, "Failed to write audit row");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::{MockProvider, TransferBehavior};
    use std::sync::Mutex;

    /// Audit sink whose bytes stay readable after the engine takes it
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    const ADMIN: AccountId = 1;
    const CUSTODY: AccountId = 2;
    const USER: AccountId = 1001;
    const X: AssetId = 10;
    const Y: AssetId = 20;

    fn engine_with(x: Arc<MockProvider>, y: Arc<MockProvider>) -> SwapEngine {
        let providers = ProviderSet::new().with_provider(X, x).with_provider(Y, y);
        let mut engine = SwapEngine::new(
            EngineConfig {
                admin: ADMIN,
                custody: CUSTODY,
            },
            providers,
        );
        engine.verify_asset(ADMIN, X).unwrap();
        engine.verify_asset(ADMIN, Y).unwrap();
        engine.add_enabled_asset(ADMIN, X, 50).unwrap();
        engine.add_enabled_asset(ADMIN, Y, 25).unwrap();
        engine.set_exchange_permission(ADMIN, X, Y, true).unwrap();
        engine
    }

    #[tokio::test]
    async fn test_exchange_updates_stats() {
        let x = Arc::new(MockProvider::new(5000));
        let y = Arc::new(MockProvider::new(5000));
        let mut engine = engine_with(x.clone(), y.clone());

        let receipt = engine.exchange(USER, X, Y, 1000).await.unwrap();
        assert_eq!(receipt.commission, 5);
        assert_eq!(receipt.payout, 995);
        assert_eq!(engine.get_total_exchange_volume(), 1000);
        assert_eq!(engine.get_total_commission_collected(), 5);
        assert_eq!(x.calls(), vec![(1000, USER, CUSTODY)]);
        assert_eq!(y.calls(), vec![(995, CUSTODY, USER)]);
    }

    #[tokio::test]
    async fn test_unknown_asset_is_not_permitted() {
        let mut engine = engine_with(
            Arc::new(MockProvider::new(5000)),
            Arc::new(MockProvider::new(5000)),
        );
        assert_eq!(
            engine.exchange(USER, X, 99, 10).await,
            Err(SwapError::ExchangeNotPermitted)
        );
        assert_eq!(
            engine.exchange(USER, 99, Y, 10).await,
            Err(SwapError::ExchangeNotPermitted)
        );
    }

    #[tokio::test]
    async fn test_disabled_endpoint_blocks_existing_edge() {
        let mut engine = engine_with(
            Arc::new(MockProvider::new(5000)),
            Arc::new(MockProvider::new(5000)),
        );
        engine.remove_enabled_asset(ADMIN, Y).unwrap();
        assert_eq!(
            engine.exchange(USER, X, Y, 10).await,
            Err(SwapError::ExchangeNotPermitted)
        );
    }

    #[tokio::test]
    async fn test_permission_checked_before_quantity() {
        let mut engine = engine_with(
            Arc::new(MockProvider::new(5000)),
            Arc::new(MockProvider::new(5000)),
        );
        assert_eq!(
            engine.exchange(USER, Y, X, 0).await,
            Err(SwapError::ExchangeNotPermitted)
        );
        assert_eq!(
            engine.exchange(USER, X, Y, 0).await,
            Err(SwapError::InvalidQuantity)
        );
    }

    #[tokio::test]
    async fn test_insufficient_funds_skips_transfers() {
        let x = Arc::new(MockProvider::new(10));
        let y = Arc::new(MockProvider::new(5000));
        let mut engine = engine_with(x.clone(), y.clone());

        assert_eq!(
            engine.exchange(USER, X, Y, 11).await,
            Err(SwapError::InsufficientFunds {
                required: 11,
                available: 10
            })
        );
        assert_eq!(x.transfer_count(), 0);
        assert_eq!(y.transfer_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_payout_leaves_stats() {
        let x = Arc::new(MockProvider::new(5000));
        let y = Arc::new(MockProvider::failing(5000, TransferBehavior::Error));
        let mut engine = engine_with(x.clone(), y);

        let err = engine.exchange(USER, X, Y, 1000).await.unwrap_err();
        assert_eq!(err.code(), "TRANSFER_FAILED");
        assert_eq!(engine.stats(), ExchangeStats::default());
        // pull + refund
        assert_eq!(x.transfer_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_provider_fails_transfer() {
        let mut engine = SwapEngine::new(
            EngineConfig {
                admin: ADMIN,
                custody: CUSTODY,
            },
            ProviderSet::new(),
        );
        engine.verify_asset(ADMIN, X).unwrap();
        engine.add_enabled_asset(ADMIN, X, 0).unwrap();
        engine.set_exchange_permission(ADMIN, X, X, true).unwrap();

        assert!(matches!(
            engine.exchange(USER, X, X, 5).await,
            Err(SwapError::TransferFailed(_))
        ));
        assert_eq!(engine.asset_info(X).await, Err(SwapError::InvalidAsset(X)));
    }

    #[tokio::test]
    async fn test_quote_matches_exchange() {
        let mut engine = engine_with(
            Arc::new(MockProvider::new(5000)),
            Arc::new(MockProvider::new(5000)),
        );
        let quote = engine.quote_exchange(X, Y, 1999).unwrap();
        assert_eq!(quote.commission, 9);
        assert_eq!(quote.payout, 1990);

        let receipt = engine.exchange(USER, X, Y, 1999).await.unwrap();
        assert_eq!(receipt.commission, quote.commission);
        assert_eq!(receipt.payout, quote.payout);
    }

    #[tokio::test]
    async fn test_withdraw_commission_flow() {
        let x = Arc::new(MockProvider::new(5000));
        let y = Arc::new(MockProvider::new(5000));
        let mut engine = engine_with(x, y.clone());
        engine.exchange(USER, X, Y, 1000).await.unwrap();

        assert_eq!(
            engine.withdraw_commission(USER, Y, 5).await,
            Err(SwapError::AdminOnly)
        );
        assert_eq!(
            engine.withdraw_commission(ADMIN, 99, 5).await,
            Err(SwapError::InvalidAsset(99))
        );
        assert_eq!(
            engine.withdraw_commission(ADMIN, Y, 6).await,
            Err(SwapError::InvalidQuantity)
        );

        engine.withdraw_commission(ADMIN, Y, 5).await.unwrap();
        assert_eq!(engine.get_total_commission_collected(), 0);
        assert_eq!(y.calls().last(), Some(&(5, CUSTODY, ADMIN)));
    }

    #[tokio::test]
    async fn test_failed_withdrawal_keeps_commission() {
        let x = Arc::new(MockProvider::new(5000));
        let y = Arc::new(MockProvider::new(5000));
        let mut engine = engine_with(x, y.clone());
        engine.exchange(USER, X, Y, 1000).await.unwrap();

        y.script(&[TransferBehavior::Accept, TransferBehavior::Decline]);
        assert!(matches!(
            engine.withdraw_commission(ADMIN, Y, 5).await,
            Err(SwapError::TransferFailed(_))
        ));
        assert_eq!(engine.get_total_commission_collected(), 5);
    }

    #[tokio::test]
    async fn test_audit_rows_written() {
        let x = Arc::new(MockProvider::new(5000));
        let y = Arc::new(MockProvider::new(5000));
        let sink: Box<dyn Write + Send + Sync> = Box::new(std::io::sink());
        let mut engine = engine_with(x, y).with_audit(AuditWriter::new(sink).unwrap());

        engine.exchange(USER, X, Y, 1000).await.unwrap();
        engine.withdraw_commission(ADMIN, Y, 5).await.unwrap();
        assert_eq!(engine.audit.as_ref().map(|a| a.entry_count()), Some(2));
    }

    #[tokio::test]
    async fn test_custody_cannot_exchange() {
        let x = Arc::new(MockProvider::new(5000));
        let y = Arc::new(MockProvider::new(5000));
        let mut engine = engine_with(x.clone(), y.clone());

        assert_eq!(
            engine.exchange(CUSTODY, X, Y, 1000).await,
            Err(SwapError::ExchangeNotPermitted)
        );
        assert_eq!(engine.stats(), ExchangeStats::default());
        assert_eq!(x.transfer_count(), 0);
        assert_eq!(y.transfer_count(), 0);
        assert_eq!(
            engine.withdraw_commission(ADMIN, Y, 1).await,
            Err(SwapError::InvalidQuantity)
        );
    }

    #[tokio::test]
    async fn test_balance_query_failure_aborts() {
        let x = Arc::new(MockProvider::new(5000));
        let y = Arc::new(MockProvider::new(5000));
        x.set_fail_queries(true);
        let mut engine = engine_with(x.clone(), y.clone());

        assert!(matches!(
            engine.exchange(USER, X, Y, 1000).await,
            Err(SwapError::TransferFailed(_))
        ));
        assert_eq!(x.transfer_count(), 0);
        assert_eq!(y.transfer_count(), 0);
        assert_eq!(engine.stats(), ExchangeStats::default());
    }

    #[tokio::test]
    async fn test_metadata_failure_fails_asset_info() {
        let x = Arc::new(MockProvider::new(5000));
        let engine = engine_with(x.clone(), Arc::new(MockProvider::new(5000)));
        x.set_fail_queries(true);

        assert!(matches!(
            engine.asset_info(X).await,
            Err(SwapError::TransferFailed(_))
        ));
        assert_eq!(engine.asset_info(Y).await.unwrap().symbol, "MOCK");
    }

    #[tokio::test]
    async fn test_refund_failure_leaves_compensating_row() {
        let x = Arc::new(MockProvider::new(5000));
        let y = Arc::new(MockProvider::failing(5000, TransferBehavior::Error));
        // pull accepted, refund errors
        x.script(&[TransferBehavior::Accept, TransferBehavior::Error]);
        let buf = SharedBuf::default();
        let sink: Box<dyn Write + Send + Sync> = Box::new(buf.clone());
        let mut engine = engine_with(x.clone(), y).with_audit(AuditWriter::new(sink).unwrap());

        let err = engine.exchange(USER, X, Y, 1000).await.unwrap_err();
        assert!(matches!(err, SwapError::TransferFailed(_)));
        assert_eq!(engine.stats(), ExchangeStats::default());
        assert_eq!(x.calls(), vec![(1000, USER, CUSTODY), (1000, CUSTODY, USER)]);

        let lines = buf.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with(",COMPENSATING"), "{}", lines[1]);
    }

    #[tokio::test]
    async fn test_receipt_serializes_settlement_id() {
        let mut engine = engine_with(
            Arc::new(MockProvider::new(5000)),
            Arc::new(MockProvider::new(5000)),
        );
        let receipt = engine.exchange(USER, X, Y, 1000).await.unwrap();
        let json = serde_json::to_value(receipt).unwrap();
        assert_eq!(json["settlement_id"], receipt.settlement_id.to_string());
        assert_eq!(json["payout"], 995);
    }
}
