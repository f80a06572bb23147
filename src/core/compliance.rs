use crate::core::ship::ShipId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Compliance status, derived purely from the sign of a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceStatus {
    Surplus,
    Deficit,
    Compliant,
}

impl ComplianceStatus {
    pub fn from_balance(balance: Decimal) -> Self {
        if balance > Decimal::ZERO {
            ComplianceStatus::Surplus
        } else if balance < Decimal::ZERO {
            ComplianceStatus::Deficit
        } else {
            ComplianceStatus::Compliant
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Surplus => "surplus",
            ComplianceStatus::Deficit => "deficit",
            ComplianceStatus::Compliant => "compliant",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The compliance balance of one ship for one reporting year.
///
/// Balance is in MJ-weighted gCO2e (positive = surplus). The status field
/// is never set on its own: it is recomputed whenever the balance changes,
/// so the two always agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipCompliance {
    id: Uuid,
    ship_id: ShipId,
    year: i32,
    balance: Decimal,
    status: ComplianceStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ShipCompliance {
    pub fn new(ship_id: ShipId, year: i32, balance: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            ship_id,
            year,
            balance,
            status: ComplianceStatus::from_balance(balance),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the balance, re-deriving the status and bumping `updated_at`.
    pub fn set_balance(&mut self, balance: Decimal) {
        self.balance = balance;
        self.status = ComplianceStatus::from_balance(balance);
        self.updated_at = Utc::now();
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

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn status(&self) -> ComplianceStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
