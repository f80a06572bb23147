use crate::core::banking::BankingRecord;
use crate::core::compliance::ShipCompliance;
use crate::core::pool::{Pool, PoolMember};
use crate::core::route::Route;
use crate::core::ship::ShipId;
use crate::error::StorageError;
use crate::repository::{
    BankingRepository, ComplianceRepository, PoolRepository, RouteRepository, StorageResult,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Full contents of an [`InMemoryStore`], in insertion order.
///
/// Serializable so a store can be persisted between runs as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub compliance: Vec<ShipCompliance>,
    #[serde(default)]
    pub banking: Vec<BankingRecord>,
    #[serde(default)]
    pub pools: Vec<Pool>,
    #[serde(default)]
    pub pool_members: Vec<PoolMember>,
}

/// Thread-safe in-memory implementation of every repository port.
///
/// Enforces the unique (ship, year) constraint on compliance records and
/// returns query results in the same order a relational adapter would.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreSnapshot>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> StorageResult<StoreSnapshot> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, StoreSnapshot>> {
        self.state
            .read()
            .map_err(|_| StorageError::Unavailable("store lock poisoned".into()))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, StoreSnapshot>> {
        self.state
            .write()
            .map_err(|_| StorageError::Unavailable("store lock poisoned".into()))
    }
}

fn not_found(entity: &'static str, id: Uuid) -> StorageError {
    StorageError::NotFound {
        entity,
        id: id.to_string(),
    }
}

impl RouteRepository for InMemoryStore {
    fn all(&self) -> StorageResult<Vec<Route>> {
        Ok(self.read()?.routes.clone())
    }

    fn find_by_id(&self, id: Uuid) -> StorageResult<Option<Route>> {
        Ok(self.read()?.routes.iter().find(|r| r.id() == id).cloned())
    }

    fn find_by_ship_and_year(&self, ship_id: &ShipId, year: i32) -> StorageResult<Vec<Route>> {
        Ok(self
            .read()?
            .routes
            .iter()
            .filter(|r| r.ship_id() == ship_id && r.year() == year)
            .cloned()
            .collect())
    }

    fn insert(&self, route: Route) -> StorageResult<Route> {
        let mut state = self.write()?;
        if state.routes.iter().any(|r| r.id() == route.id()) {
            return Err(StorageError::Conflict(format!(
                "route {} already exists",
                route.id()
            )));
        }
        state.routes.push(route.clone());
        Ok(route)
    }

    fn set_baseline(&self, id: Uuid) -> StorageResult<()> {
        let mut state = self.write()?;
        let year = state
            .routes
            .iter()
            .find(|r| r.id() == id)
            .map(|r| r.year())
            .ok_or_else(|| not_found("route", id))?;
        for route in state.routes.iter_mut().filter(|r| r.year() == year) {
            route.set_baseline(route.id() == id);
        }
        Ok(())
    }
}

impl ComplianceRepository for InMemoryStore {
    fn find_by_ship_and_year(
        &self,
        ship_id: &ShipId,
        year: i32,
    ) -> StorageResult<Option<ShipCompliance>> {
        Ok(self
            .read()?
            .compliance
            .iter()
            .find(|c| c.ship_id() == ship_id && c.year() == year)
            .cloned())
    }

    fn save(&self, record: ShipCompliance) -> StorageResult<ShipCompliance> {
        let mut state = self.write()?;
        if state
            .compliance
            .iter()
            .any(|c| c.ship_id() == record.ship_id() && c.year() == record.year())
        {
            return Err(StorageError::Conflict(format!(
                "compliance record for ship {} in year {} already exists",
                record.ship_id(),
                record.year()
            )));
        }
        state.compliance.push(record.clone());
        Ok(record)
    }

    fn update_balance(&self, id: Uuid, balance: Decimal) -> StorageResult<ShipCompliance> {
        let mut state = self.write()?;
        let record = state
            .compliance
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or_else(|| not_found("compliance record", id))?;
        record.set_balance(balance);
        Ok(record.clone())
    }

    fn find_by_ship(&self, ship_id: &ShipId) -> StorageResult<Vec<ShipCompliance>> {
        let mut records: Vec<ShipCompliance> = self
            .read()?
            .compliance
            .iter()
            .filter(|c| c.ship_id() == ship_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.year().cmp(&a.year()));
        Ok(records)
    }

    fn find_by_year(&self, year: i32) -> StorageResult<Vec<ShipCompliance>> {
        let mut records: Vec<ShipCompliance> = self
            .read()?
            .compliance
            .iter()
            .filter(|c| c.year() == year)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.ship_id().cmp(b.ship_id()));
        Ok(records)
    }

    fn delete(&self, id: Uuid) -> StorageResult<()> {
        let mut state = self.write()?;
        let before = state.compliance.len();
        state.compliance.retain(|c| c.id() != id);
        if state.compliance.len() == before {
            return Err(not_found("compliance record", id));
        }
        Ok(())
    }
}

impl BankingRepository for InMemoryStore {
    fn find_active_by_ship(&self, ship_id: &ShipId) -> StorageResult<Vec<BankingRecord>> {
        let mut records: Vec<BankingRecord> = self
            .read()?
            .banking
            .iter()
            .filter(|b| b.ship_id() == ship_id && !b.is_expired())
            .cloned()
            .collect();
        records.sort_by_key(|b| b.year());
        Ok(records)
    }

    fn find_by_ship(&self, ship_id: &ShipId) -> StorageResult<Vec<BankingRecord>> {
        let mut records: Vec<BankingRecord> = self
            .read()?
            .banking
            .iter()
            .filter(|b| b.ship_id() == ship_id)
            .cloned()
            .collect();
        records.sort_by_key(|b| b.year());
        Ok(records)
    }

    fn save(&self, record: BankingRecord) -> StorageResult<BankingRecord> {
        let mut state = self.write()?;
        if state.banking.iter().any(|b| b.id() == record.id()) {
            return Err(StorageError::Conflict(format!(
                "banking record {} already exists",
                record.id()
            )));
        }
        state.banking.push(record.clone());
        Ok(record)
    }

    fn update_amount(&self, id: Uuid, banked_amount: Decimal) -> StorageResult<BankingRecord> {
        let mut state = self.write()?;
        let record = state
            .banking
            .iter_mut()
            .find(|b| b.id() == id)
            .ok_or_else(|| not_found("banking record", id))?;
        record.set_amount(banked_amount);
        Ok(record.clone())
    }

    fn mark_expired(&self, id: Uuid) -> StorageResult<()> {
        let mut state = self.write()?;
        let record = state
            .banking
            .iter_mut()
            .find(|b| b.id() == id)
            .ok_or_else(|| not_found("banking record", id))?;
        record.expire();
        Ok(())
    }

    fn find_expired_records(&self, current_year: i32) -> StorageResult<Vec<BankingRecord>> {
        Ok(self
            .read()?
            .banking
            .iter()
            .filter(|b| b.is_due_to_expire(current_year))
            .cloned()
            .collect())
    }

    fn total_banked(&self, ship_id: &ShipId) -> StorageResult<Decimal> {
        self.read()?
            .banking
            .iter()
            .filter(|b| b.ship_id() == ship_id && !b.is_expired())
            .try_fold(Decimal::ZERO, |acc, b| acc.checked_add(b.banked_amount()))
            .ok_or_else(|| {
                StorageError::Conflict(format!("banked total of ship {} is out of range", ship_id))
            })
    }

    fn delete(&self, id: Uuid) -> StorageResult<()> {
        let mut state = self.write()?;
        let before = state.banking.len();
        state.banking.retain(|b| b.id() != id);
        if state.banking.len() == before {
            return Err(not_found("banking record", id));
        }
        Ok(())
    }
}

impl PoolRepository for InMemoryStore {
    fn save(&self, pool: Pool) -> StorageResult<Pool> {
        let mut state = self.write()?;
        if state.pools.iter().any(|p| p.id() == pool.id()) {
            return Err(StorageError::Conflict(format!(
                "pool {} already exists",
                pool.id()
            )));
        }
        state.pools.push(pool.clone());
        Ok(pool)
    }

    fn add_member(&self, member: PoolMember) -> StorageResult<PoolMember> {
        let mut state = self.write()?;
        if !state.pools.iter().any(|p| p.id() == member.pool_id()) {
            return Err(not_found("pool", member.pool_id()));
        }
        state.pool_members.push(member.clone());
        Ok(member)
    }

    fn find_by_id(&self, id: Uuid) -> StorageResult<Option<Pool>> {
        Ok(self.read()?.pools.iter().find(|p| p.id() == id).cloned())
    }

    fn find_by_year(&self, year: i32) -> StorageResult<Vec<Pool>> {
        Ok(self
            .read()?
            .pools
            .iter()
            .rev()
            .filter(|p| p.year() == year)
            .cloned()
            .collect())
    }

    fn find_by_ship(&self, ship_id: &ShipId) -> StorageResult<Vec<Pool>> {
        Ok(self
            .read()?
            .pools
            .iter()
            .rev()
            .filter(|p| p.contains(ship_id))
            .cloned()
            .collect())
    }

    fn find_members_by_pool(&self, pool_id: Uuid) -> StorageResult<Vec<PoolMember>> {
        Ok(self
            .read()?
            .pool_members
            .iter()
            .filter(|m| m.pool_id() == pool_id)
            .cloned()
            .collect())
    }

    fn delete(&self, id: Uuid) -> StorageResult<()> {
        let mut state = self.write()?;
        let before = state.pools.len();
        state.pools.retain(|p| p.id() != id);
        if state.pools.len() == before {
            return Err(not_found("pool", id));
        }
        state.pool_members.retain(|m| m.pool_id() != id);
        Ok(())
    }

    fn remove_member(&self, member_id: Uuid) -> StorageResult<()> {
        let mut state = self.write()?;
        let before = state.pool_members.len();
        state.pool_members.retain(|m| m.id() != member_id);
        if state.pool_members.len() == before {
            return Err(not_found("pool member", member_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ship(id: &str) -> ShipId {
        ShipId::new(id)
    }

    #[test]
    fn test_compliance_unique_per_ship_and_year() {
        let store = InMemoryStore::new();
        ComplianceRepository::save(&store, ShipCompliance::new(ship("S1"), 2025, dec!(10))).unwrap();
        let dup = ComplianceRepository::save(&store, ShipCompliance::new(ship("S1"), 2025, dec!(20)));
        assert!(matches!(dup, Err(StorageError::Conflict(_))));

        // Same ship, other year is fine.
        ComplianceRepository::save(&store, ShipCompliance::new(ship("S1"), 2026, dec!(20))).unwrap();
    }

    #[test]
    fn test_compliance_query_ordering() {
        let store = InMemoryStore::new();
        for (s, y) in [("B", 2024), ("A", 2025), ("B", 2025), ("B", 2023)] {
            ComplianceRepository::save(&store, ShipCompliance::new(ship(s), y, dec!(1))).unwrap();
        }
        let years: Vec<i32> = ComplianceRepository::find_by_ship(&store, &ship("B"))
            .unwrap()
            .iter()
            .map(|c| c.year())
            .collect();
        assert_eq!(years, vec![2025, 2024, 2023]);

        let ships: Vec<String> = ComplianceRepository::find_by_year(&store, 2025)
            .unwrap()
            .iter()
            .map(|c| c.ship_id().to_string())
            .collect();
        assert_eq!(ships, vec!["A", "B"]);
    }

    #[test]
    fn test_update_balance_rederives_status() {
        let store = InMemoryStore::new();
        let saved =
            ComplianceRepository::save(&store, ShipCompliance::new(ship("S1"), 2025, dec!(-5))).unwrap();
        let updated = store.update_balance(saved.id(), Decimal::ZERO).unwrap();
        assert_eq!(
            updated.status(),
            crate::core::compliance::ComplianceStatus::Compliant
        );
    }

    #[test]
    fn test_active_banking_sorted_by_origin_year() {
        let store = InMemoryStore::new();
        BankingRepository::save(&store, BankingRecord::new(ship("S1"), 2025, dec!(3), 3)).unwrap();
        BankingRepository::save(&store, BankingRecord::new(ship("S1"), 2023, dec!(1), 3)).unwrap();
        let expired = BankingRepository::save(&store, BankingRecord::new(ship("S1"), 2022, dec!(9), 3))
            .unwrap();
        BankingRepository::save(&store, BankingRecord::new(ship("S1"), 2024, dec!(2), 3)).unwrap();
        store.mark_expired(expired.id()).unwrap();

        let years: Vec<i32> = store
            .find_active_by_ship(&ship("S1"))
            .unwrap()
            .iter()
            .map(|b| b.year())
            .collect();
        assert_eq!(years, vec![2023, 2024, 2025]);
        assert_eq!(store.total_banked(&ship("S1")).unwrap(), dec!(6));
        assert_eq!(BankingRepository::find_by_ship(&store, &ship("S1")).unwrap().len(), 4);
    }

    #[test]
    fn test_total_banked_overflow_is_an_error() {
        let store = InMemoryStore::new();
        BankingRepository::save(&store, BankingRecord::new(ship("S1"), 2023, Decimal::MAX, 3)).unwrap();
        BankingRepository::save(&store, BankingRecord::new(ship("S1"), 2024, Decimal::MAX, 3)).unwrap();
        assert!(matches!(
            store.total_banked(&ship("S1")),
            Err(StorageError::Conflict(_))
        ));
    }

    #[test]
    fn test_find_expired_records() {
        let store = InMemoryStore::new();
        BankingRepository::save(&store, BankingRecord::new(ship("S1"), 2022, dec!(1), 3)).unwrap();
        BankingRepository::save(&store, BankingRecord::new(ship("S2"), 2024, dec!(1), 3)).unwrap();
        assert_eq!(store.find_expired_records(2025).unwrap().len(), 1);
        assert_eq!(store.find_expired_records(2027).unwrap().len(), 2);
    }

    #[test]
    fn test_set_baseline_is_exclusive_per_year() {
        let store = InMemoryStore::new();
        let a = store
            .insert(Route::new(ship("S1"), 2025, dec!(80), dec!(1)).as_baseline())
            .unwrap();
        let b = store.insert(Route::new(ship("S2"), 2025, dec!(85), dec!(1))).unwrap();
        let other_year = store
            .insert(Route::new(ship("S3"), 2024, dec!(90), dec!(1)).as_baseline())
            .unwrap();

        store.set_baseline(b.id()).unwrap();

        assert!(!RouteRepository::find_by_id(&store, a.id()).unwrap().unwrap().is_baseline());
        assert!(RouteRepository::find_by_id(&store, b.id()).unwrap().unwrap().is_baseline());
        assert!(RouteRepository::find_by_id(&store, other_year.id())
            .unwrap()
            .unwrap()
            .is_baseline());
    }

    #[test]
    fn test_set_baseline_unknown_route() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.set_baseline(Uuid::new_v4()),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn test_pool_delete_cascades_members() {
        let store = InMemoryStore::new();
        let pool = PoolRepository::save(&store, Pool::new("P", 2025, vec![ship("A")], dec!(5))).unwrap();
        store
            .add_member(PoolMember::new(pool.id(), ship("A"), dec!(5), Decimal::ZERO))
            .unwrap();
        PoolRepository::delete(&store, pool.id()).unwrap();
        assert!(store.find_members_by_pool(pool.id()).unwrap().is_empty());
        assert!(PoolRepository::find_by_id(&store, pool.id()).unwrap().is_none());
    }

    #[test]
    fn test_member_requires_pool() {
        let store = InMemoryStore::new();
        let orphan = PoolMember::new(Uuid::new_v4(), ship("A"), dec!(5), Decimal::ZERO);
        assert!(store.add_member(orphan).is_err());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let store = InMemoryStore::new();
        store.insert(Route::new(ship("S1"), 2025, dec!(80), dec!(10))).unwrap();
        ComplianceRepository::save(&store, ShipCompliance::new(ship("S1"), 2025, dec!(7))).unwrap();

        let json = serde_json::to_string(&store.snapshot().unwrap()).unwrap();
        let restored = InMemoryStore::from_snapshot(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.snapshot().unwrap(), store.snapshot().unwrap());
    }
}
