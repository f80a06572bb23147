//! Baseline comparison of route intensities.
//!
//! Relates every route of the baseline year and later to the regulatory
//! target and to the fleet's baseline route.

use crate::config::RegulatoryParams;
use crate::core::route::Route;
use crate::core::ship::ShipId;
use crate::error::{LedgerError, LedgerResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How one route measures up against the target and the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteComparison {
    pub route_id: Uuid,
    pub ship_id: ShipId,
    pub year: i32,
    pub ghg_intensity: Decimal,
    /// `(intensity − target) / target × 100`. Positive means above target.
    pub percent_vs_target: f64,
    /// `(intensity / baseline − 1) × 100`; `None` for a zero-intensity baseline.
    pub percent_vs_baseline: Option<f64>,
    /// Intensity at or below the target.
    pub compliant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub baseline: Route,
    pub target_intensity: Decimal,
    pub comparisons: Vec<RouteComparison>,
}

impl ComparisonReport {
    pub fn compliant_count(&self) -> usize {
        self.comparisons.iter().filter(|c| c.compliant).count()
    }
}

/// Relative change from `reference` to `value`, in percent.
fn percent_change(value: Decimal, reference: Decimal) -> f64 {
    let value = value.to_f64().unwrap_or(0.0);
    let reference = reference.to_f64().unwrap_or(0.0);
    (value - reference) / reference * 100.0
}

/// Compare routes against the latest baseline.
///
/// The baseline is the baseline-flagged route with the latest year. Every
/// other route from that year on is compared, ordered by year.
pub fn compare_routes(routes: &[Route], params: &RegulatoryParams) -> LedgerResult<ComparisonReport> {
    let baseline = routes
        .iter()
        .filter(|r| r.is_baseline())
        .fold(None::<&Route>, |best, r| match best {
            Some(b) if b.year() >= r.year() => Some(b),
            _ => Some(r),
        })
        .ok_or_else(|| LedgerError::NotFound {
            entity: "baseline route",
            key: "any year".into(),
        })?;

    let target = params.target_intensity;
    let mut candidates: Vec<&Route> = routes
        .iter()
        .filter(|r| !r.is_baseline() && r.year() >= baseline.year())
        .collect();
    candidates.sort_by_key(|r| r.year());

    let comparisons = candidates
        .into_iter()
        .map(|r| {
            let intensity = r.ghg_intensity();
            let percent_vs_baseline = if baseline.ghg_intensity() == Decimal::ZERO {
                None
            } else {
                Some(percent_change(intensity, baseline.ghg_intensity()))
            };
            RouteComparison {
                route_id: r.id(),
                ship_id: r.ship_id().clone(),
                year: r.year(),
                ghg_intensity: intensity,
                percent_vs_target: percent_change(intensity, target),
                percent_vs_baseline,
                compliant: intensity <= target,
            }
        })
        .collect();

    Ok(ComparisonReport {
        baseline: baseline.clone(),
        target_intensity: target,
        comparisons,
    })
}

impl std::fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Route Comparison ===")?;
        writeln!(f, "Target Intensity:  {}", self.target_intensity)?;
        writeln!(
            f,
            "Baseline:          {} ({}, {} gCO2e/MJ)",
            self.baseline.ship_id(),
            self.baseline.year(),
            self.baseline.ghg_intensity()
        )?;
        writeln!(
            f,
            "Compliant:         {}/{}",
            self.compliant_count(),
            self.comparisons.len()
        )?;
        for c in &self.comparisons {
            let vs_baseline = c
                .percent_vs_baseline
                .map(|p| format!("{:+.2}%", p))
                .unwrap_or_else(|| "n/a".to_string());
            writeln!(
                f,
                "  {:<15} {} {:>10}  target {:+.2}%  baseline {:>8}  [{}]",
                c.ship_id,
                c.year,
                c.ghg_intensity,
                c.percent_vs_target,
                vs_baseline,
                if c.compliant { "OK" } else { "OVER" }
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rust_decimal_macros::dec;

    fn route(ship: &str, year: i32, intensity: Decimal) -> Route {
        Route::new(ShipId::new(ship), year, intensity, dec!(100))
    }

    #[test]
    fn test_comparison_against_target_and_baseline() {
        let routes = vec![
            route("R1", 2024, dec!(91.5)).as_baseline(),
            route("R2", 2025, dec!(82.3)),
            route("R3", 2025, dec!(89.3368)),
            route("R4", 2025, dec!(93.0)),
        ];
        let report = compare_routes(&routes, &RegulatoryParams::default()).unwrap();

        assert_eq!(report.baseline.ship_id().as_str(), "R1");
        assert_eq!(report.comparisons.len(), 3);
        assert_eq!(report.compliant_count(), 2);

        let r2 = &report.comparisons[0];
        assert!(r2.compliant);
        assert_relative_eq!(
            r2.percent_vs_target,
            (82.3 - 89.3368) / 89.3368 * 100.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            r2.percent_vs_baseline.unwrap(),
            (82.3 / 91.5 - 1.0) * 100.0,
            epsilon = 1e-9
        );

        let r3 = &report.comparisons[1];
        assert!(r3.compliant);
        assert_relative_eq!(r3.percent_vs_target, 0.0, epsilon = 1e-12);

        assert!(!report.comparisons[2].compliant);
    }

    #[test]
    fn test_latest_baseline_wins_and_older_routes_skipped() {
        let routes = vec![
            route("OLD", 2023, dec!(90)).as_baseline(),
            route("NEW", 2024, dec!(88)).as_baseline(),
            route("PRE", 2023, dec!(80)),
            route("POST", 2025, dec!(85)),
        ];
        let report = compare_routes(&routes, &RegulatoryParams::default()).unwrap();
        assert_eq!(report.baseline.ship_id().as_str(), "NEW");
        let ships: Vec<&str> = report.comparisons.iter().map(|c| c.ship_id.as_str()).collect();
        assert_eq!(ships, vec!["POST"]);
    }

    #[test]
    fn test_no_baseline() {
        let routes = vec![route("R1", 2025, dec!(80))];
        assert!(matches!(
            compare_routes(&routes, &RegulatoryParams::default()),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_zero_intensity_baseline() {
        let routes = vec![
            route("B", 2025, Decimal::ZERO).as_baseline(),
            route("R", 2025, dec!(10)),
        ];
        let report = compare_routes(&routes, &RegulatoryParams::default()).unwrap();
        assert_eq!(report.comparisons[0].percent_vs_baseline, None);
    }

    #[test]
    fn test_extreme_intensities_stay_finite() {
        let routes = vec![
            route("B", 2025, dec!(0.0000000000000000000000000001)).as_baseline(),
            route("R", 2025, Decimal::MAX),
        ];
        let report = compare_routes(&routes, &RegulatoryParams::default()).unwrap();
        let r = &report.comparisons[0];
        assert!(!r.compliant);
        assert!(r.percent_vs_target.is_finite());
        assert!(r.percent_vs_baseline.unwrap() > 1e50);
    }
}
