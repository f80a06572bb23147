//! Storage ports the ledger engines depend on.
//!
//! The engines only see these traits. [`memory::InMemoryStore`] is the
//! bundled implementation; a database adapter implements the same traits.

pub mod memory;

use crate::core::banking::BankingRecord;
use crate::core::compliance::ShipCompliance;
use crate::core::pool::{Pool, PoolMember};
use crate::core::route::Route;
use crate::core::ship::ShipId;
use crate::error::StorageError;
use rust_decimal::Decimal;
use uuid::Uuid;

pub type StorageResult<T> = Result<T, StorageError>;

/// Voyage records. Read-only from the ledger's point of view.
pub trait RouteRepository: Send + Sync {
    fn all(&self) -> StorageResult<Vec<Route>>;

    fn find_by_id(&self, id: Uuid) -> StorageResult<Option<Route>>;

    fn find_by_ship_and_year(&self, ship_id: &ShipId, year: i32) -> StorageResult<Vec<Route>>;

    fn insert(&self, route: Route) -> StorageResult<Route>;

    /// Make `id` the only baseline route of its year.
    fn set_baseline(&self, id: Uuid) -> StorageResult<()>;
}

/// One compliance record per (ship, year).
pub trait ComplianceRepository: Send + Sync {
    fn find_by_ship_and_year(
        &self,
        ship_id: &ShipId,
        year: i32,
    ) -> StorageResult<Option<ShipCompliance>>;

    /// Insert a new record. Fails with [`StorageError::Conflict`] when a
    /// record for the same (ship, year) exists.
    fn save(&self, record: ShipCompliance) -> StorageResult<ShipCompliance>;

    /// Set a new balance; the status is re-derived in the same write.
    fn update_balance(&self, id: Uuid, balance: Decimal) -> StorageResult<ShipCompliance>;

    /// All records of a ship, newest year first.
    fn find_by_ship(&self, ship_id: &ShipId) -> StorageResult<Vec<ShipCompliance>>;

    /// All records of a year, ordered by ship id.
    fn find_by_year(&self, year: i32) -> StorageResult<Vec<ShipCompliance>>;

    fn delete(&self, id: Uuid) -> StorageResult<()>;
}

/// Banked surplus tranches.
pub trait BankingRepository: Send + Sync {
    /// Non-expired records of a ship, oldest origin year first.
    fn find_active_by_ship(&self, ship_id: &ShipId) -> StorageResult<Vec<BankingRecord>>;

    /// Every record of a ship, expired ones included.
    fn find_by_ship(&self, ship_id: &ShipId) -> StorageResult<Vec<BankingRecord>>;

    fn save(&self, record: BankingRecord) -> StorageResult<BankingRecord>;

    fn update_amount(&self, id: Uuid, banked_amount: Decimal) -> StorageResult<BankingRecord>;

    fn mark_expired(&self, id: Uuid) -> StorageResult<()>;

    /// Non-expired records whose expiry year is at or before `current_year`.
    fn find_expired_records(&self, current_year: i32) -> StorageResult<Vec<BankingRecord>>;

    /// Sum of the amounts of a ship's non-expired records.
    fn total_banked(&self, ship_id: &ShipId) -> StorageResult<Decimal>;

    fn delete(&self, id: Uuid) -> StorageResult<()>;
}

/// Pools and their member rows.
pub trait PoolRepository: Send + Sync {
    fn save(&self, pool: Pool) -> StorageResult<Pool>;

    fn add_member(&self, member: PoolMember) -> StorageResult<PoolMember>;

    fn find_by_id(&self, id: Uuid) -> StorageResult<Option<Pool>>;

    /// Pools of a year, most recently created first.
    fn find_by_year(&self, year: i32) -> StorageResult<Vec<Pool>>;

    /// Pools listing the ship as a member, most recently created first.
    fn find_by_ship(&self, ship_id: &ShipId) -> StorageResult<Vec<Pool>>;

    /// Member rows of a pool in the order they were added.
    fn find_members_by_pool(&self, pool_id: Uuid) -> StorageResult<Vec<PoolMember>>;

    /// Delete a pool together with its member rows.
    fn delete(&self, id: Uuid) -> StorageResult<()>;

    fn remove_member(&self, member_id: Uuid) -> StorageResult<()>;
}
