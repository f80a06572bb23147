//! Random fleet generation.
//!
//! Produces route sets with a configurable share of ships running above
//! the target intensity, so that the calculator, banking and pooling
//! engines all get exercised.

use crate::core::route::Route;
use crate::core::ship::ShipId;
use rand::Rng;
use rust_decimal::Decimal;

const VESSEL_TYPES: [&str; 4] = ["Container", "BulkCarrier", "Tanker", "RoRo"];
const FUEL_TYPES: [&str; 3] = ["HFO", "LNG", "MGO"];

/// Configuration for generating a random fleet.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Number of ships.
    pub ship_count: usize,
    /// Reporting years, one route set per ship and year.
    pub years: Vec<i32>,
    /// Routes per ship per year.
    pub routes_per_ship_year: usize,
    /// Intensity range in gCO2e/MJ.
    pub min_intensity: Decimal,
    pub max_intensity: Decimal,
    /// Fuel consumption range in tonnes.
    pub min_fuel: Decimal,
    pub max_fuel: Decimal,
    /// Flag the first route of the first year as the baseline.
    pub with_baseline: bool,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            ship_count: 10,
            years: vec![2024, 2025],
            routes_per_ship_year: 3,
            min_intensity: Decimal::from(80),
            max_intensity: Decimal::from(95),
            min_fuel: Decimal::from(50),
            max_fuel: Decimal::from(5_000),
            with_baseline: true,
        }
    }
}

fn random_decimal(rng: &mut impl Rng, min: Decimal, max: Decimal, dp: u32) -> Decimal {
    if max <= min {
        return min;
    }
    let span = max - min;
    // Four decimal places of resolution within the range.
    let step = rng.gen_range(0..=10_000u32);
    (min + span * Decimal::from(step) / Decimal::from(10_000u32)).round_dp(dp)
}

/// Generate a random fleet.
pub fn generate_fleet(config: &FleetConfig) -> Vec<Route> {
    let mut rng = rand::thread_rng();
    let mut routes = Vec::with_capacity(
        config.ship_count * config.years.len() * config.routes_per_ship_year,
    );

    let ships: Vec<ShipId> = (0..config.ship_count)
        .map(|i| ShipId::new(format!("SHIP-{:03}", i)))
        .collect();

    for ship in &ships {
        let vessel_type = VESSEL_TYPES[rng.gen_range(0..VESSEL_TYPES.len())];
        for &year in &config.years {
            for _ in 0..config.routes_per_ship_year {
                let intensity =
                    random_decimal(&mut rng, config.min_intensity, config.max_intensity, 4);
                let fuel = random_decimal(&mut rng, config.min_fuel, config.max_fuel, 1);
                let distance = random_decimal(
                    &mut rng,
                    Decimal::from(500),
                    Decimal::from(15_000),
                    0,
                );
                routes.push(
                    Route::new(ship.clone(), year, intensity, fuel)
                        .with_vessel_type(vessel_type)
                        .with_fuel_type(FUEL_TYPES[rng.gen_range(0..FUEL_TYPES.len())])
                        .with_distance(distance),
                );
            }
        }
    }

    if config.with_baseline {
        if let Some(first) = routes.first_mut() {
            first.set_baseline(true);
        }
    }

    routes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegulatoryParams;
    use crate::engine::comparison::compare_routes;

    #[test]
    fn test_fleet_shape() {
        let config = FleetConfig {
            ship_count: 4,
            years: vec![2024, 2025, 2026],
            routes_per_ship_year: 2,
            ..Default::default()
        };
        let routes = generate_fleet(&config);
        assert_eq!(routes.len(), 4 * 3 * 2);
        assert_eq!(routes.iter().filter(|r| r.is_baseline()).count(), 1);
        for r in &routes {
            assert!(r.ghg_intensity() >= config.min_intensity);
            assert!(r.ghg_intensity() <= config.max_intensity);
            assert!(r.fuel_consumption() >= config.min_fuel);
            assert!(r.fuel_consumption() <= config.max_fuel);
        }
    }

    #[test]
    fn test_fleet_is_comparable() {
        let routes = generate_fleet(&FleetConfig::default());
        let report = compare_routes(&routes, &RegulatoryParams::default()).unwrap();
        assert_eq!(report.comparisons.len(), routes.len() - 1);
    }

    #[test]
    fn test_empty_fleet() {
        let config = FleetConfig {
            ship_count: 0,
            ..Default::default()
        };
        assert!(generate_fleet(&config).is_empty());
    }
}
