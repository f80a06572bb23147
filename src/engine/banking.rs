use crate::config::RegulatoryParams;
use crate::core::banking::BankingRecord;
use crate::core::ship::ShipId;
use crate::engine::locks::ShipLocks;
use crate::error::{LedgerError, LedgerResult};
use crate::repository::{BankingRepository, ComplianceRepository};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of applying banked surplus to a deficit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    /// Total consumed from banked records.
    pub applied_amount: Decimal,
    /// Deficit still open after the banked surplus ran out (zero if covered).
    pub remaining_deficit: Decimal,
    /// Sum of the active records' amounts after the operation.
    pub remaining_banked: Decimal,
}

impl std::fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Banked Surplus Applied ===")?;
        writeln!(f, "Applied:           {}", self.applied_amount)?;
        writeln!(f, "Remaining Deficit: {}", self.remaining_deficit)?;
        writeln!(f, "Remaining Banked:  {}", self.remaining_banked)
    }
}

/// One record touched by a FIFO allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct FifoStep {
    pub record_id: Uuid,
    pub origin_year: i32,
    pub amount_before: Decimal,
    pub amount_after: Decimal,
}

impl FifoStep {
    pub fn consumed(&self) -> Decimal {
        self.amount_before - self.amount_after
    }
}

/// The full effect of covering a deficit from banked records, computed
/// before anything is written.
#[derive(Debug, Clone, PartialEq)]
pub struct FifoPlan {
    pub steps: Vec<FifoStep>,
    pub applied: Decimal,
    pub remaining_deficit: Decimal,
    pub remaining_banked: Decimal,
}

/// Plan how banked `records` cover `deficit`, oldest origin year first.
///
/// # Algorithm
///
/// 1. Sort records by origin year (stable, so equal years keep their order).
/// 2. Walk them while deficit remains: a record at least as large as the
///    open deficit closes it and keeps the rest; a smaller one is drained
///    to zero.
/// 3. Records after the deficit closes stay untouched.
///
/// `applied` never exceeds `deficit`, and
/// `applied + remaining_banked` equals the total banked before the plan.
/// Returns `None` when the banked total does not fit in a `Decimal`.
pub fn plan_fifo_allocation(records: &[BankingRecord], deficit: Decimal) -> Option<FifoPlan> {
    let mut ordered: Vec<&BankingRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.year());

    let mut to_resolve = deficit.max(Decimal::ZERO);
    let mut applied = Decimal::ZERO;
    let mut remaining_banked = Decimal::ZERO;
    let mut steps = Vec::new();

    for record in ordered {
        let amount = record.banked_amount();
        if to_resolve == Decimal::ZERO {
            remaining_banked = remaining_banked.checked_add(amount)?;
            continue;
        }

        let amount_after = if amount >= to_resolve {
            applied += to_resolve;
            let rest = amount - to_resolve;
            to_resolve = Decimal::ZERO;
            rest
        } else {
            applied += amount;
            to_resolve -= amount;
            Decimal::ZERO
        };
        remaining_banked = remaining_banked.checked_add(amount_after)?;

        steps.push(FifoStep {
            record_id: record.id(),
            origin_year: record.year(),
            amount_before: amount,
            amount_after,
        });
    }

    Some(FifoPlan {
        steps,
        applied,
        remaining_deficit: to_resolve,
        remaining_banked,
    })
}

/// Banks surplus balances and spends banked surplus against deficits.
pub struct BankingEngine {
    banking: Arc<dyn BankingRepository>,
    compliance: Arc<dyn ComplianceRepository>,
    params: RegulatoryParams,
    locks: Arc<ShipLocks>,
}

impl BankingEngine {
    pub fn new(
        banking: Arc<dyn BankingRepository>,
        compliance: Arc<dyn ComplianceRepository>,
        params: RegulatoryParams,
    ) -> Self {
        Self {
            banking,
            compliance,
            params,
            locks: Arc::new(ShipLocks::new()),
        }
    }

    /// Share a lock registry with other engines.
    pub fn with_locks(mut self, locks: Arc<ShipLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Bank the positive balance of (ship, year) as a new tranche.
    ///
    /// The compliance record itself is left as it is: banking records the
    /// surplus, it does not move it.
    pub fn bank_surplus(&self, ship_id: &ShipId, year: i32) -> LedgerResult<BankingRecord> {
        self.locks.with_ship(ship_id, || -> LedgerResult<BankingRecord> {
            let compliance = self
                .compliance
                .find_by_ship_and_year(ship_id, year)?
                .ok_or_else(|| LedgerError::compliance_not_found(ship_id, year))?;

            if compliance.balance() <= Decimal::ZERO {
                warn!(
                    "refusing to bank for ship {} in {}: balance {}",
                    ship_id,
                    year,
                    compliance.balance()
                );
                return Err(LedgerError::NoSurplus {
                    ship_id: ship_id.clone(),
                    year,
                    balance: compliance.balance(),
                });
            }

            if year.checked_add(self.params.banking_horizon_years).is_none() {
                warn!("expiry year of ship {} banking from {} is out of range", ship_id, year);
                return Err(LedgerError::InvalidInput(format!(
                    "year {} plus a {} year horizon is out of range",
                    year, self.params.banking_horizon_years
                )));
            }

            let record = BankingRecord::new(
                ship_id.clone(),
                year,
                compliance.balance(),
                self.params.banking_horizon_years,
            );
            let saved = self.banking.save(record)?;
            info!(
                "banked {} for ship {} from {} (expires {})",
                saved.banked_amount(),
                ship_id,
                year,
                saved.expiry_year()
            );
            Ok(saved)
        })
    }

    /// Cover the deficit of (ship, year) from the ship's active banked
    /// records, oldest first, and store the improved balance.
    ///
    /// If a write fails part-way, records already reduced are restored to
    /// their previous amounts before the storage error is returned.
    pub fn apply_banked_surplus(&self, ship_id: &ShipId, year: i32) -> LedgerResult<ApplyOutcome> {
        self.locks.with_ship(ship_id, || -> LedgerResult<ApplyOutcome> {
            let compliance = self
                .compliance
                .find_by_ship_and_year(ship_id, year)?
                .ok_or_else(|| LedgerError::compliance_not_found(ship_id, year))?;

            let balance = compliance.balance();
            if balance >= Decimal::ZERO {
                warn!(
                    "nothing to cover for ship {} in {}: balance {}",
                    ship_id, year, balance
                );
                return Err(LedgerError::NoDeficit {
                    ship_id: ship_id.clone(),
                    year,
                    balance,
                });
            }

            let records = self.banking.find_active_by_ship(ship_id)?;
            if records.is_empty() {
                warn!("ship {} has no active banked surplus", ship_id);
                return Err(LedgerError::NoBankedSurplus {
                    ship_id: ship_id.clone(),
                });
            }

            let plan = plan_fifo_allocation(&records, balance.abs()).ok_or_else(|| {
                warn!("banked total of ship {} is out of range", ship_id);
                LedgerError::InvalidInput(format!("banked total of ship {} is out of range", ship_id))
            })?;

            for (done, step) in plan.steps.iter().enumerate() {
                debug!(
                    "ship {}: tranche {} ({}) {} -> {}",
                    ship_id, step.record_id, step.origin_year, step.amount_before, step.amount_after
                );
                if let Err(e) = self.banking.update_amount(step.record_id, step.amount_after) {
                    self.restore(&plan.steps[..done]);
                    return Err(e.into());
                }
            }

            let new_balance = balance.checked_add(plan.applied).ok_or_else(|| {
                LedgerError::InvalidInput(format!(
                    "balance of ship {} in year {} is out of range",
                    ship_id, year
                ))
            })?;
            if let Err(e) = self.compliance.update_balance(compliance.id(), new_balance) {
                self.restore(&plan.steps);
                return Err(e.into());
            }

            info!(
                "applied {} banked surplus to ship {} in {}: balance {} -> {}",
                plan.applied, ship_id, year, balance, new_balance
            );
            Ok(ApplyOutcome {
                applied_amount: plan.applied,
                remaining_deficit: plan.remaining_deficit,
                remaining_banked: plan.remaining_banked,
            })
        })
    }

    fn restore(&self, steps: &[FifoStep]) {
        for step in steps.iter().rev() {
            if let Err(e) = self.banking.update_amount(step.record_id, step.amount_before) {
                warn!(
                    "rollback of banking record {} to {} failed: {}",
                    step.record_id, step.amount_before, e
                );
            }
        }
    }

    /// Flag every active record whose expiry year is at or before
    /// `current_year` as expired. Returns the records that were flagged.
    pub fn expire_records(&self, current_year: i32) -> LedgerResult<Vec<BankingRecord>> {
        let due = self.banking.find_expired_records(current_year)?;
        let mut expired = Vec::with_capacity(due.len());
        for mut record in due {
            self.locks.with_ship(record.ship_id(), || {
                self.banking.mark_expired(record.id())
            })?;
            info!(
                "banking record {} of ship {} ({}, {}) expired",
                record.id(),
                record.ship_id(),
                record.year(),
                record.banked_amount()
            );
            record.expire();
            expired.push(record);
        }
        Ok(expired)
    }

    /// Sum of a ship's active banked amounts.
    pub fn total_banked(&self, ship_id: &ShipId) -> LedgerResult<Decimal> {
        Ok(self.banking.total_banked(ship_id)?)
    }

    pub fn active_records(&self, ship_id: &ShipId) -> LedgerResult<Vec<BankingRecord>> {
        Ok(self.banking.find_active_by_ship(ship_id)?)
    }

    pub fn all_records(&self, ship_id: &ShipId) -> LedgerResult<Vec<BankingRecord>> {
        Ok(self.banking.find_by_ship(ship_id)?)
    }
}
