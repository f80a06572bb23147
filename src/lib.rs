//! # compliance-ledger
//!
//! Greenhouse-gas intensity compliance ledger for shipping fleets.
//!
//! Given the routes a ship sailed in a reporting year, this crate derives
//! its compliance balance against the regulatory intensity target, banks
//! surpluses for later years, spends banked surplus against deficits and
//! pools balances across ships.
//!
//! ## Architecture
//!
//! - **core**: Ships, routes, compliance records, banking records, pools
//! - **engine**: Balance calculation, FIFO banking, greedy pooling, baseline comparison
//! - **repository**: Storage ports and the bundled in-memory store
//! - **ledger**: Facade wiring the engines to one set of repositories
//! - **config**: Regulatory parameters and ledger policies
//! - **simulation**: Random fleet generation

pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod repository;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::{LedgerConfig, RecomputePolicy, RegulatoryParams};
    pub use crate::core::banking::BankingRecord;
    pub use crate::core::compliance::{ComplianceStatus, ShipCompliance};
    pub use crate::core::pool::{Pool, PoolMember};
    pub use crate::core::route::Route;
    pub use crate::core::ship::ShipId;
    pub use crate::engine::banking::{ApplyOutcome, BankingEngine};
    pub use crate::engine::calculator::ComplianceCalculator;
    pub use crate::engine::comparison::ComparisonReport;
    pub use crate::engine::pooling::{PoolCreation, PoolingEngine};
    pub use crate::error::{LedgerError, LedgerResult, StorageError};
    pub use crate::ledger::ComplianceLedger;
    pub use crate::repository::memory::{InMemoryStore, StoreSnapshot};
    pub use crate::repository::{
        BankingRepository, ComplianceRepository, PoolRepository, RouteRepository,
    };
}
