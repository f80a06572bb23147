use crate::core::ship::ShipId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tranche of surplus banked by a ship in a given year.
///
/// The amount only ever shrinks after creation (as deficits consume it)
/// and never goes below zero. Past `expiry_year` the tranche is flagged
/// expired and stops counting as available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankingRecord {
    id: Uuid,
    ship_id: ShipId,
    /// Year the surplus was earned.
    year: i32,
    banked_amount: Decimal,
    expiry_year: i32,
    is_expired: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BankingRecord {
    /// Bank `amount` earned in `year`, usable for `horizon_years`.
    ///
    /// # Panics
    ///
    /// Panics if `amount` is negative or the expiry year overflows `i32`.
    pub fn new(ship_id: ShipId, year: i32, amount: Decimal, horizon_years: i32) -> Self {
        assert!(
            amount >= Decimal::ZERO,
            "Banked amount must not be negative, got {}",
            amount
        );
        let Some(expiry_year) = year.checked_add(horizon_years) else {
            panic!("Expiry year out of range: {} + {}", year, horizon_years);
        };
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            ship_id,
            year,
            banked_amount: amount,
            expiry_year,
            is_expired: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn set_amount(&mut self, amount: Decimal) {
        self.banked_amount = amount.max(Decimal::ZERO);
        self.updated_at = Utc::now();
    }

    pub(crate) fn expire(&mut self) {
        self.is_expired = true;
        self.updated_at = Utc::now();
    }

    /// Whether the tranche has reached its expiry year as of `current_year`.
    pub fn is_due_to_expire(&self, current_year: i32) -> bool {
        !self.is_expired && self.expiry_year <= current_year
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn ship_id(&self) -> &ShipId {
        &self.ship_id
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn banked_amount(&self) -> Decimal {
        self.banked_amount
    }

    pub fn expiry_year(&self) -> i32 {
        self.expiry_year
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_record() {
        let record = BankingRecord::new(ShipId::new("S1"), 2024, dec!(50_000_000), 3);
        assert_eq!(record.banked_amount(), dec!(50_000_000));
        assert_eq!(record.expiry_year(), 2027);
        assert!(!record.is_expired());
    }

    #[test]
    fn test_due_to_expire() {
        let mut record = BankingRecord::new(ShipId::new("S1"), 2024, dec!(10), 3);
        assert!(!record.is_due_to_expire(2026));
        assert!(record.is_due_to_expire(2027));
        record.expire();
        assert!(!record.is_due_to_expire(2030));
    }

    #[test]
    fn test_amount_never_negative() {
        let mut record = BankingRecord::new(ShipId::new("S1"), 2024, dec!(10), 3);
        record.set_amount(dec!(-4));
        assert_eq!(record.banked_amount(), Decimal::ZERO);
    }

    #[test]
    #[should_panic(expected = "must not be negative")]
    fn test_negative_amount_rejected() {
        BankingRecord::new(ShipId::new("S1"), 2024, dec!(-1), 3);
    }

    #[test]
    #[should_panic(expected = "Expiry year out of range")]
    fn test_expiry_year_overflow_rejected() {
        BankingRecord::new(ShipId::new("S1"), i32::MAX, dec!(1), 3);
    }
}
