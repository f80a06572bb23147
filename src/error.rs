use crate::core::ship::ShipId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Failures reported by a repository adapter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    #[error("{entity} '{id}' not found in store")]
    NotFound { entity: &'static str, id: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failures of a ledger operation.
///
/// Every precondition violation has its own variant so a caller can map it
/// to a distinct response. None of them is retried inside the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
    #[error("no surplus to bank for ship {ship_id} in {year} (balance {balance})")]
    NoSurplus {
        ship_id: ShipId,
        year: i32,
        balance: Decimal,
    },
    #[error("no deficit to cover for ship {ship_id} in {year} (balance {balance})")]
    NoDeficit {
        ship_id: ShipId,
        year: i32,
        balance: Decimal,
    },
    #[error("no active banked surplus for ship {ship_id}")]
    NoBankedSurplus { ship_id: ShipId },
    #[error("pool total balance must be non-negative, got {total_balance}")]
    InvalidPool { total_balance: Decimal },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LedgerError {
    pub(crate) fn compliance_not_found(ship_id: &ShipId, year: i32) -> Self {
        LedgerError::NotFound {
            entity: "compliance record",
            key: format!("ship {} in year {}", ship_id, year),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
