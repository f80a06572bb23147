use crate::core::pool::{Pool, PoolMember};
use crate::core::ship::ShipId;
use crate::engine::locks::ShipLocks;
use crate::error::{LedgerError, LedgerResult};
use crate::repository::{ComplianceRepository, PoolRepository};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Allocation decided for one ship of a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub ship_id: ShipId,
    pub contribution_balance: Decimal,
    pub allocated_deficit: Decimal,
}

/// Result of the greedy allocation, in member-row order.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationPlan {
    pub allocations: Vec<Allocation>,
    /// Surplus left over after every deficit was served.
    pub remaining_surplus: Decimal,
}

/// Distribute the pool's surplus over its deficits, largest deficit first.
///
/// # Algorithm
///
/// 1. Split ships into deficits (balance < 0) and surplus (balance ≥ 0).
/// 2. Available surplus = Σ surplus balances.
/// 3. Stable-sort deficits by |balance| descending; equal deficits keep
///    their input order.
/// 4. Each deficit takes `min(|balance|, available)`. The walk stops as soon
///    as nothing is left.
/// 5. Deficits past that point get a zero allocation row only when
///    `record_uncovered` is set.
/// 6. Every surplus ship gets a row with zero allocation.
///
/// Returns `None` when the surplus sum does not fit in a `Decimal`.
pub fn plan_greedy_allocation(
    balances: &[(ShipId, Decimal)],
    record_uncovered: bool,
) -> Option<AllocationPlan> {
    let mut deficits: Vec<&(ShipId, Decimal)> =
        balances.iter().filter(|(_, b)| *b < Decimal::ZERO).collect();
    let surplus: Vec<&(ShipId, Decimal)> =
        balances.iter().filter(|(_, b)| *b >= Decimal::ZERO).collect();

    let mut available = surplus
        .iter()
        .try_fold(Decimal::ZERO, |acc, (_, b)| acc.checked_add(*b))?;
    deficits.sort_by(|a, b| b.1.abs().cmp(&a.1.abs()));

    let mut allocations = Vec::with_capacity(balances.len());
    let mut served = 0;

    for (ship_id, balance) in &deficits {
        let deficit = balance.abs();
        let allocated = if available >= deficit {
            available -= deficit;
            deficit
        } else {
            let partial = available;
            available = Decimal::ZERO;
            partial
        };
        allocations.push(Allocation {
            ship_id: ship_id.clone(),
            contribution_balance: *balance,
            allocated_deficit: allocated,
        });
        served += 1;

        if available <= Decimal::ZERO {
            break;
        }
    }

    if record_uncovered {
        for (ship_id, balance) in deficits.iter().skip(served) {
            allocations.push(Allocation {
                ship_id: ship_id.clone(),
                contribution_balance: *balance,
                allocated_deficit: Decimal::ZERO,
            });
        }
    }

    for (ship_id, balance) in surplus {
        allocations.push(Allocation {
            ship_id: ship_id.clone(),
            contribution_balance: *balance,
            allocated_deficit: Decimal::ZERO,
        });
    }

    Some(AllocationPlan {
        allocations,
        remaining_surplus: available,
    })
}

/// A stored pool and the member rows written for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolCreation {
    pub pool: Pool,
    pub members: Vec<PoolMember>,
}

impl std::fmt::Display for PoolCreation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Pool '{}' ({}) ===", self.pool.name(), self.pool.year())?;
        writeln!(f, "Pool ID:        {}", self.pool.id())?;
        writeln!(f, "Total Balance:  {}", self.pool.total_balance())?;
        writeln!(f, "Members:        {}", self.members.len())?;
        for member in &self.members {
            writeln!(
                f,
                "  {:<15} contribution {:>20}  allocated {:>20}",
                member.ship_id(),
                member.contribution_balance(),
                member.allocated_deficit()
            )?;
        }
        Ok(())
    }
}

/// Creates compliance pools and reads them back.
pub struct PoolingEngine {
    pools: Arc<dyn PoolRepository>,
    compliance: Arc<dyn ComplianceRepository>,
    record_uncovered_deficits: bool,
    locks: Arc<ShipLocks>,
}

impl PoolingEngine {
    pub fn new(
        pools: Arc<dyn PoolRepository>,
        compliance: Arc<dyn ComplianceRepository>,
        record_uncovered_deficits: bool,
    ) -> Self {
        Self {
            pools,
            compliance,
            record_uncovered_deficits,
            locks: Arc::new(ShipLocks::new()),
        }
    }

    /// Share a lock registry with other engines.
    pub fn with_locks(mut self, locks: Arc<ShipLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Pool the `year` balances of `ship_ids` under `name`.
    ///
    /// Fails with `NotFound` for the first ship without a compliance record
    /// and with `InvalidPool` when the balances sum below zero; in both
    /// cases nothing is stored. If a member write fails, the pool and the
    /// rows written so far are deleted before the error is returned.
    pub fn create_pool(
        &self,
        name: &str,
        year: i32,
        ship_ids: &[ShipId],
    ) -> LedgerResult<PoolCreation> {
        validate_request(name, ship_ids)?;

        self.locks.with_ships(ship_ids, || -> LedgerResult<PoolCreation> {
            let mut balances = Vec::with_capacity(ship_ids.len());
            for ship_id in ship_ids {
                let record = self
                    .compliance
                    .find_by_ship_and_year(ship_id, year)?
                    .ok_or_else(|| LedgerError::compliance_not_found(ship_id, year))?;
                balances.push((ship_id.clone(), record.balance()));
            }

            let total_balance = balances
                .iter()
                .try_fold(Decimal::ZERO, |acc, (_, b)| acc.checked_add(*b))
                .ok_or_else(|| out_of_range(name, year))?;
            if total_balance < Decimal::ZERO {
                warn!(
                    "rejecting pool '{}' for {}: total balance {}",
                    name, year, total_balance
                );
                return Err(LedgerError::InvalidPool { total_balance });
            }

            let plan = plan_greedy_allocation(&balances, self.record_uncovered_deficits)
                .ok_or_else(|| out_of_range(name, year))?;
            let pool = self
                .pools
                .save(Pool::new(name, year, ship_ids.to_vec(), total_balance))?;

            let mut members = Vec::with_capacity(plan.allocations.len());
            for allocation in plan.allocations {
                debug!(
                    "pool {}: ship {} contribution {} allocated {}",
                    pool.id(),
                    allocation.ship_id,
                    allocation.contribution_balance,
                    allocation.allocated_deficit
                );
                let member = PoolMember::new(
                    pool.id(),
                    allocation.ship_id,
                    allocation.contribution_balance,
                    allocation.allocated_deficit,
                );
                match self.pools.add_member(member) {
                    Ok(saved) => members.push(saved),
                    Err(e) => {
                        if let Err(rollback) = self.pools.delete(pool.id()) {
                            warn!("rollback of pool {} failed: {}", pool.id(), rollback);
                        }
                        return Err(e.into());
                    }
                }
            }

            info!(
                "created pool '{}' ({}) for {} with {} members, total {}, unallocated surplus {}",
                pool.name(),
                pool.id(),
                year,
                members.len(),
                total_balance,
                plan.remaining_surplus
            );
            Ok(PoolCreation { pool, members })
        })
    }

    pub fn pool(&self, pool_id: Uuid) -> LedgerResult<Pool> {
        self.pools
            .find_by_id(pool_id)?
            .ok_or_else(|| LedgerError::NotFound {
                entity: "pool",
                key: pool_id.to_string(),
            })
    }

    pub fn pools_for_year(&self, year: i32) -> LedgerResult<Vec<Pool>> {
        Ok(self.pools.find_by_year(year)?)
    }

    pub fn pools_for_ship(&self, ship_id: &ShipId) -> LedgerResult<Vec<Pool>> {
        Ok(self.pools.find_by_ship(ship_id)?)
    }

    pub fn members(&self, pool_id: Uuid) -> LedgerResult<Vec<PoolMember>> {
        Ok(self.pools.find_members_by_pool(pool_id)?)
    }
}

fn out_of_range(name: &str, year: i32) -> LedgerError {
    warn!("rejecting pool '{}' for {}: balance sum out of range", name, year);
    LedgerError::InvalidInput(format!(
        "balance sum of pool '{}' in year {} is out of range",
        name, year
    ))
}

fn validate_request(name: &str, ship_ids: &[ShipId]) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::InvalidInput("pool name must not be empty".into()));
    }
    if ship_ids.is_empty() {
        return Err(LedgerError::InvalidInput("a pool needs at least one ship".into()));
    }
    let mut seen = HashSet::new();
    for ship_id in ship_ids {
        if ship_id.is_blank() {
            return Err(LedgerError::InvalidInput("ship id must not be empty".into()));
        }
        if !seen.insert(ship_id) {
            return Err(LedgerError::InvalidInput(format!(
                "ship {} listed more than once",
                ship_id
            )));
        }
    }
    Ok(())
}
