//! Domain types of the compliance ledger.

pub mod banking;
pub mod compliance;
pub mod pool;
pub mod route;
pub mod ship;
