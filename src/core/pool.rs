use crate::core::ship::ShipId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A group of ships pooling their compliance balances for one year.
///
/// The aggregate balance is non-negative for every pool that the ledger
/// creates; pools with a net deficit are rejected before anything is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    id: Uuid,
    name: String,
    year: i32,
    member_ships: Vec<ShipId>,
    total_balance: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Pool {
    pub fn new(
        name: impl Into<String>,
        year: i32,
        member_ships: Vec<ShipId>,
        total_balance: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            year,
            member_ships,
            total_balance,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn member_ships(&self) -> &[ShipId] {
        &self.member_ships
    }

    pub fn contains(&self, ship_id: &ShipId) -> bool {
        self.member_ships.contains(ship_id)
    }

    pub fn total_balance(&self) -> Decimal {
        self.total_balance
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// One ship's row in a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolMember {
    id: Uuid,
    pool_id: Uuid,
    ship_id: ShipId,
    /// The ship's own balance at pool creation.
    contribution_balance: Decimal,
    /// Deficit covered from the pool's surplus (zero for surplus ships).
    allocated_deficit: Decimal,
    joined_at: DateTime<Utc>,
}

impl PoolMember {
    pub fn new(
        pool_id: Uuid,
        ship_id: ShipId,
        contribution_balance: Decimal,
        allocated_deficit: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pool_id,
            ship_id,
            contribution_balance,
            allocated_deficit,
            joined_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pool_id(&self) -> Uuid {
        self.pool_id
    }

    pub fn ship_id(&self) -> &ShipId {
        &self.ship_id
    }

    pub fn contribution_balance(&self) -> Decimal {
        self.contribution_balance
    }

    pub fn allocated_deficit(&self) -> Decimal {
        self.allocated_deficit
    }

    /// Deficit left uncovered after allocation (zero for surplus ships).
    pub fn uncovered_deficit(&self) -> Decimal {
        let deficit = (-self.contribution_balance).max(Decimal::ZERO);
        deficit - self.allocated_deficit
    }

    /// Balance after pooling: own balance plus whatever the pool covered.
    pub fn balance_after_pooling(&self) -> Decimal {
        self.contribution_balance + self.allocated_deficit
    }

    pub fn joined_at(&self) -> DateTime<Utc> {
        self.joined_at
    }
}
