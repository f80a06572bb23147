use crate::config::{LedgerConfig, RecomputePolicy, RegulatoryParams};
use crate::core::compliance::ShipCompliance;
use crate::core::route::Route;
use crate::core::ship::ShipId;
use crate::engine::locks::ShipLocks;
use crate::error::{LedgerError, LedgerResult};
use crate::repository::{ComplianceRepository, RouteRepository};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Sum of the per-route balances of `routes`.
///
/// Decimal addition is exact, so the result does not depend on the order
/// of the routes. `None` if a route balance or a partial sum overflows.
pub fn aggregate_balance(routes: &[Route], params: &RegulatoryParams) -> Option<Decimal> {
    routes.iter().try_fold(Decimal::ZERO, |acc, r| {
        acc.checked_add(r.compliance_balance(params)?)
    })
}

/// Derives and stores a ship's yearly compliance balance from its routes.
pub struct ComplianceCalculator {
    routes: Arc<dyn RouteRepository>,
    compliance: Arc<dyn ComplianceRepository>,
    config: LedgerConfig,
    locks: Arc<ShipLocks>,
}

impl ComplianceCalculator {
    pub fn new(
        routes: Arc<dyn RouteRepository>,
        compliance: Arc<dyn ComplianceRepository>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            routes,
            compliance,
            config,
            locks: Arc::new(ShipLocks::new()),
        }
    }

    /// Share a lock registry with other engines.
    pub fn with_locks(mut self, locks: Arc<ShipLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Compute the balance of `ship_id` for `year`, store it, and return it.
    ///
    /// # Algorithm
    ///
    /// 1. Load every route of the ship in that year.
    /// 2. Balance = Σ (target − intensity) × fuel × energy density.
    /// 3. Status follows the sign of the balance.
    /// 4. Persist according to the configured [`RecomputePolicy`].
    ///
    /// Returns the balance only, not the stored record.
    pub fn compute_balance(&self, ship_id: &ShipId, year: i32) -> LedgerResult<Decimal> {
        if ship_id.is_blank() {
            return Err(LedgerError::InvalidInput("ship id must not be empty".into()));
        }

        self.locks.with_ship(ship_id, || -> LedgerResult<Decimal> {
            let routes = self.routes.find_by_ship_and_year(ship_id, year)?;
            if routes.is_empty() {
                warn!("no routes for ship {} in {}", ship_id, year);
                return Err(LedgerError::NotFound {
                    entity: "routes",
                    key: format!("ship {} in year {}", ship_id, year),
                });
            }

            let balance = aggregate_balance(&routes, &self.config.params).ok_or_else(|| {
                warn!("balance of ship {} in {} overflows", ship_id, year);
                LedgerError::InvalidInput(format!(
                    "compliance balance of ship {} in year {} is out of range",
                    ship_id, year
                ))
            })?;
            debug!(
                "ship {} year {}: {} routes, balance {}",
                ship_id,
                year,
                routes.len(),
                balance
            );

            let stored = match self.config.recompute_policy {
                RecomputePolicy::Upsert => {
                    match self.compliance.find_by_ship_and_year(ship_id, year)? {
                        Some(existing) => self.compliance.update_balance(existing.id(), balance)?,
                        None => self
                            .compliance
                            .save(ShipCompliance::new(ship_id.clone(), year, balance))?,
                    }
                }
                RecomputePolicy::Append => self
                    .compliance
                    .save(ShipCompliance::new(ship_id.clone(), year, balance))?,
            };

            info!(
                "compliance balance for ship {} in {}: {} ({})",
                ship_id,
                year,
                stored.balance(),
                stored.status()
            );
            Ok(balance)
        })
    }

    /// The stored record for (ship, year).
    pub fn record(&self, ship_id: &ShipId, year: i32) -> LedgerResult<ShipCompliance> {
        self.compliance
            .find_by_ship_and_year(ship_id, year)?
            .ok_or_else(|| LedgerError::compliance_not_found(ship_id, year))
    }

    pub fn records_for_ship(&self, ship_id: &ShipId) -> LedgerResult<Vec<ShipCompliance>> {
        Ok(self.compliance.find_by_ship(ship_id)?)
    }

    pub fn records_for_year(&self, year: i32) -> LedgerResult<Vec<ShipCompliance>> {
        Ok(self.compliance.find_by_year(year)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compliance::ComplianceStatus;
    use crate::error::StorageError;
    use crate::repository::memory::InMemoryStore;
    use rust_decimal_macros::dec;

    fn setup(config: LedgerConfig) -> (Arc<InMemoryStore>, ComplianceCalculator) {
        let store = Arc::new(InMemoryStore::new());
        let calculator = ComplianceCalculator::new(store.clone(), store.clone(), config);
        (store, calculator)
    }

    #[test]
    fn test_single_route_balance() {
        let (store, calculator) = setup(LedgerConfig::default());
        let ship = ShipId::new("S1");
        store
            .insert(Route::new(ship.clone(), 2025, dec!(88.3368), dec!(100)))
            .unwrap();

        let balance = calculator.compute_balance(&ship, 2025).unwrap();
        assert_eq!(balance, dec!(4_100_000));

        let record = calculator.record(&ship, 2025).unwrap();
        assert_eq!(record.balance(), balance);
        assert_eq!(record.status(), ComplianceStatus::Surplus);
    }

    #[test]
    fn test_multi_route_sum() {
        let (store, calculator) = setup(LedgerConfig::default());
        let ship = ShipId::new("S1");
        // +1 × 100 t and −2 × 50 t cancel out exactly.
        store
            .insert(Route::new(ship.clone(), 2025, dec!(88.3368), dec!(100)))
            .unwrap();
        store
            .insert(Route::new(ship.clone(), 2025, dec!(91.3368), dec!(50)))
            .unwrap();
        // Other ship and other year are ignored.
        store
            .insert(Route::new(ShipId::new("S2"), 2025, dec!(10), dec!(100)))
            .unwrap();
        store
            .insert(Route::new(ship.clone(), 2024, dec!(10), dec!(100)))
            .unwrap();

        let balance = calculator.compute_balance(&ship, 2025).unwrap();
        assert_eq!(balance, Decimal::ZERO);
        assert_eq!(
            calculator.record(&ship, 2025).unwrap().status(),
            ComplianceStatus::Compliant
        );
    }

    #[test]
    fn test_no_routes_is_not_found() {
        let (_, calculator) = setup(LedgerConfig::default());
        let result = calculator.compute_balance(&ShipId::new("GHOST"), 2025);
        assert!(matches!(result, Err(LedgerError::NotFound { entity: "routes", .. })));
        assert!(calculator.records_for_year(2025).unwrap().is_empty());
    }

    #[test]
    fn test_oversized_route_is_rejected() {
        let (store, calculator) = setup(LedgerConfig::default());
        let ship = ShipId::new("S1");
        store
            .insert(Route::new(
                ship.clone(),
                2025,
                Decimal::ZERO,
                dec!(10_000_000_000_000_000_000_000_000),
            ))
            .unwrap();

        let result = calculator.compute_balance(&ship, 2025);
        assert!(matches!(result, Err(LedgerError::InvalidInput(_))));
        assert!(calculator.records_for_ship(&ship).unwrap().is_empty());
    }

    #[test]
    fn test_route_sum_overflow_is_rejected() {
        let (store, calculator) = setup(LedgerConfig::default());
        let ship = ShipId::new("S1");
        // Each route alone is about 3.7e28, three together exceed Decimal::MAX.
        for _ in 0..3 {
            store
                .insert(Route::new(
                    ship.clone(),
                    2025,
                    Decimal::ZERO,
                    dec!(10_000_000_000_000_000_000_000),
                ))
                .unwrap();
        }
        let routes = RouteRepository::find_by_ship_and_year(&*store, &ship, 2025).unwrap();
        assert!(routes[0].compliance_balance(&RegulatoryParams::default()).is_some());
        assert_eq!(aggregate_balance(&routes, &RegulatoryParams::default()), None);

        let result = calculator.compute_balance(&ship, 2025);
        assert!(matches!(result, Err(LedgerError::InvalidInput(_))));
    }

    #[test]
    fn test_blank_ship_rejected() {
        let (_, calculator) = setup(LedgerConfig::default());
        let result = calculator.compute_balance(&ShipId::new(" "), 2025);
        assert!(matches!(result, Err(LedgerError::InvalidInput(_))));
    }

    #[test]
    fn test_upsert_overwrites_existing_record() {
        let (store, calculator) = setup(LedgerConfig::default());
        let ship = ShipId::new("S1");
        store
            .insert(Route::new(ship.clone(), 2025, dec!(88.3368), dec!(100)))
            .unwrap();
        calculator.compute_balance(&ship, 2025).unwrap();
        let first = calculator.record(&ship, 2025).unwrap();

        store
            .insert(Route::new(ship.clone(), 2025, dec!(90.3368), dec!(300)))
            .unwrap();
        let balance = calculator.compute_balance(&ship, 2025).unwrap();
        assert_eq!(balance, dec!(-8_200_000));

        let records = calculator.records_for_ship(&ship).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), first.id());
        assert_eq!(records[0].status(), ComplianceStatus::Deficit);
    }

    #[test]
    fn test_append_policy_hits_unique_constraint() {
        let config = LedgerConfig {
            recompute_policy: RecomputePolicy::Append,
            ..Default::default()
        };
        let (store, calculator) = setup(config);
        let ship = ShipId::new("S1");
        store
            .insert(Route::new(ship.clone(), 2025, dec!(80), dec!(10)))
            .unwrap();

        calculator.compute_balance(&ship, 2025).unwrap();
        let second = calculator.compute_balance(&ship, 2025);
        assert!(matches!(
            second,
            Err(LedgerError::Storage(StorageError::Conflict(_)))
        ));
    }

    #[test]
    fn test_custom_params() {
        let mut config = LedgerConfig::default();
        config.params.target_intensity = dec!(90);
        config.params.energy_per_tonne = dec!(40000);
        let (store, calculator) = setup(config);
        let ship = ShipId::new("S1");
        store
            .insert(Route::new(ship.clone(), 2025, dec!(85), dec!(2)))
            .unwrap();
        assert_eq!(calculator.compute_balance(&ship, 2025).unwrap(), dec!(400_000));
    }
}
