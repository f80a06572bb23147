use crate::config::RegulatoryParams;
use crate::core::ship::ShipId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single voyage and its fuel consumption.
///
/// Routes are the input of the balance calculation. The ledger never
/// changes a route; only the store's baseline bookkeeping touches
/// `is_baseline`.
///
/// # Examples
///
/// ```
/// use compliance_ledger::config::RegulatoryParams;
/// use compliance_ledger::core::route::Route;
/// use compliance_ledger::core::ship::ShipId;
/// use rust_decimal_macros::dec;
///
/// let route = Route::new(ShipId::new("SHIP-1"), 2025, dec!(88.3368), dec!(100));
/// let params = RegulatoryParams::default();
///
/// assert_eq!(route.energy_mj(&params), Some(dec!(4_100_000)));
/// assert_eq!(route.compliance_balance(&params), Some(dec!(4_100_000)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    id: Uuid,
    ship_id: ShipId,
    vessel_type: String,
    fuel_type: String,
    year: i32,
    /// Well-to-wake GHG intensity in gCO2e/MJ.
    ghg_intensity: Decimal,
    /// Fuel burned, in tonnes.
    fuel_consumption: Decimal,
    /// Distance sailed, in nautical miles.
    distance: Decimal,
    /// Reported total emissions, in tonnes CO2e.
    total_emissions: Decimal,
    is_baseline: bool,
}

impl Route {
    /// Create a route with a fresh id.
    ///
    /// # Panics
    ///
    /// Panics if `fuel_consumption` or `ghg_intensity` is negative.
    pub fn new(ship_id: ShipId, year: i32, ghg_intensity: Decimal, fuel_consumption: Decimal) -> Self {
        Self::with_id(Uuid::new_v4(), ship_id, year, ghg_intensity, fuel_consumption)
    }

    /// Create a route with a specific ID (useful for imports and tests).
    pub fn with_id(
        id: Uuid,
        ship_id: ShipId,
        year: i32,
        ghg_intensity: Decimal,
        fuel_consumption: Decimal,
    ) -> Self {
        assert!(
            fuel_consumption >= Decimal::ZERO,
            "Fuel consumption must not be negative, got {}",
            fuel_consumption
        );
        assert!(
            ghg_intensity >= Decimal::ZERO,
            "GHG intensity must not be negative, got {}",
            ghg_intensity
        );
        Self {
            id,
            ship_id,
            vessel_type: String::new(),
            fuel_type: String::new(),
            year,
            ghg_intensity,
            fuel_consumption,
            distance: Decimal::ZERO,
            total_emissions: Decimal::ZERO,
            is_baseline: false,
        }
    }

    pub fn with_vessel_type(mut self, vessel_type: impl Into<String>) -> Self {
        self.vessel_type = vessel_type.into();
        self
    }

    pub fn with_fuel_type(mut self, fuel_type: impl Into<String>) -> Self {
        self.fuel_type = fuel_type.into();
        self
    }

    pub fn with_distance(mut self, distance: Decimal) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_total_emissions(mut self, total_emissions: Decimal) -> Self {
        self.total_emissions = total_emissions;
        self
    }

    /// Mark this route as the fleet baseline for its year.
    pub fn as_baseline(mut self) -> Self {
        self.is_baseline = true;
        self
    }

    pub(crate) fn set_baseline(&mut self, is_baseline: bool) {
        self.is_baseline = is_baseline;
    }

    /// Energy used on this route in MJ: fuel mass × energy density.
    ///
    /// `None` if the product does not fit in a `Decimal`.
    pub fn energy_mj(&self, params: &RegulatoryParams) -> Option<Decimal> {
        self.fuel_consumption.checked_mul(params.energy_per_tonne)
    }

    /// Compliance balance contributed by this route:
    /// `(target − intensity) × energy`. Positive means surplus.
    ///
    /// `None` on overflow.
    pub fn compliance_balance(&self, params: &RegulatoryParams) -> Option<Decimal> {
        params
            .target_intensity
            .checked_sub(self.ghg_intensity)?
            .checked_mul(self.energy_mj(params)?)
    }

    // --- Accessors ---

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn ship_id(&self) -> &ShipId {
        &self.ship_id
    }

    pub fn vessel_type(&self) -> &str {
        &self.vessel_type
    }

    pub fn fuel_type(&self) -> &str {
        &self.fuel_type
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn ghg_intensity(&self) -> Decimal {
        self.ghg_intensity
    }

    pub fn fuel_consumption(&self) -> Decimal {
        self.fuel_consumption
    }

    pub fn distance(&self) -> Decimal {
        self.distance
    }

    pub fn total_emissions(&self) -> Decimal {
        self.total_emissions
    }

    pub fn is_baseline(&self) -> bool {
        self.is_baseline
    }
}
