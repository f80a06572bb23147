//! Single entry point wiring the engines to one set of repositories.

use crate::config::LedgerConfig;
use crate::engine::banking::BankingEngine;
use crate::engine::calculator::ComplianceCalculator;
use crate::engine::comparison::{self, ComparisonReport};
use crate::engine::locks::ShipLocks;
use crate::engine::pooling::PoolingEngine;
use crate::error::LedgerResult;
use crate::repository::memory::InMemoryStore;
use crate::repository::{BankingRepository, ComplianceRepository, PoolRepository, RouteRepository};
use std::sync::Arc;

/// The compliance ledger.
///
/// Owns the repositories and a lock registry shared by every engine it
/// hands out, so a balance computation, a banking operation and a pool
/// creation touching the same ship never interleave.
///
/// # Example
///
/// ```
/// use compliance_ledger::prelude::*;
/// use rust_decimal_macros::dec;
/// use std::sync::Arc;
///
/// let store = Arc::new(InMemoryStore::new());
/// let ledger = ComplianceLedger::in_memory(store.clone(), LedgerConfig::default());
///
/// let ship = ShipId::new("IMO-9321483");
/// RouteRepository::insert(&*store, Route::new(ship.clone(), 2025, dec!(82.3), dec!(115))).unwrap();
///
/// let balance = ledger.calculator().compute_balance(&ship, 2025).unwrap();
/// assert_eq!(balance, dec!(33178512));
/// ```
pub struct ComplianceLedger {
    routes: Arc<dyn RouteRepository>,
    compliance: Arc<dyn ComplianceRepository>,
    banking: Arc<dyn BankingRepository>,
    pools: Arc<dyn PoolRepository>,
    config: LedgerConfig,
    locks: Arc<ShipLocks>,
}

impl ComplianceLedger {
    pub fn new(
        routes: Arc<dyn RouteRepository>,
        compliance: Arc<dyn ComplianceRepository>,
        banking: Arc<dyn BankingRepository>,
        pools: Arc<dyn PoolRepository>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            routes,
            compliance,
            banking,
            pools,
            config,
            locks: Arc::new(ShipLocks::new()),
        }
    }

    /// Back every port with the same in-memory store.
    pub fn in_memory(store: Arc<InMemoryStore>, config: LedgerConfig) -> Self {
        Self::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            config,
        )
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn calculator(&self) -> ComplianceCalculator {
        ComplianceCalculator::new(
            self.routes.clone(),
            self.compliance.clone(),
            self.config.clone(),
        )
        .with_locks(self.locks.clone())
    }

    pub fn banking(&self) -> BankingEngine {
        BankingEngine::new(
            self.banking.clone(),
            self.compliance.clone(),
            self.config.params.clone(),
        )
        .with_locks(self.locks.clone())
    }

    pub fn pooling(&self) -> PoolingEngine {
        PoolingEngine::new(
            self.pools.clone(),
            self.compliance.clone(),
            self.config.record_uncovered_deficits,
        )
        .with_locks(self.locks.clone())
    }

    /// Compare every stored route against the latest baseline.
    pub fn compare_routes(&self) -> LedgerResult<ComparisonReport> {
        let routes = self.routes.all()?;
        comparison::compare_routes(&routes, &self.config.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::route::Route;
    use crate::core::ship::ShipId;
    use crate::engine::banking::ApplyOutcome;
    use rust_decimal_macros::dec;

    #[test]
    fn test_engines_share_one_store() {
        let store = Arc::new(InMemoryStore::new());
        let ledger = ComplianceLedger::in_memory(store.clone(), LedgerConfig::default());
        let ship = ShipId::new("S-1");
        RouteRepository::insert(&*store, Route::new(ship.clone(), 2024, dec!(80), dec!(10)))
            .unwrap();

        let balance = ledger.calculator().compute_balance(&ship, 2024).unwrap();
        assert!(balance > dec!(0));

        let record = ledger.banking().bank_surplus(&ship, 2024).unwrap();
        assert_eq!(record.banked_amount(), balance);
        assert_eq!(ledger.banking().total_banked(&ship).unwrap(), balance);
    }

    #[test]
    fn test_surplus_offsets_later_deficit() {
        let store = Arc::new(InMemoryStore::new());
        let ledger = ComplianceLedger::in_memory(store.clone(), LedgerConfig::default());
        let ship = ShipId::new("S-2");
        RouteRepository::insert(&*store, Route::new(ship.clone(), 2024, dec!(80), dec!(10)))
            .unwrap();
        RouteRepository::insert(&*store, Route::new(ship.clone(), 2025, dec!(90), dec!(1)))
            .unwrap();

        let surplus = ledger.calculator().compute_balance(&ship, 2024).unwrap();
        let deficit = ledger.calculator().compute_balance(&ship, 2025).unwrap();
        assert!(deficit < dec!(0));
        assert!(surplus > -deficit);

        ledger.banking().bank_surplus(&ship, 2024).unwrap();
        let outcome: ApplyOutcome = ledger.banking().apply_banked_surplus(&ship, 2025).unwrap();
        assert_eq!(outcome.applied_amount, -deficit);
        assert_eq!(outcome.remaining_deficit, dec!(0));
        assert_eq!(outcome.remaining_banked, surplus + deficit);
        assert_eq!(
            ledger.calculator().record(&ship, 2025).unwrap().balance(),
            dec!(0)
        );
    }

    #[test]
    fn test_compare_routes_needs_baseline() {
        let store = Arc::new(InMemoryStore::new());
        let ledger = ComplianceLedger::in_memory(store, LedgerConfig::default());
        assert!(ledger.compare_routes().is_err());
    }
}
