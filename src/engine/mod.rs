//! Calculation, banking, pooling and comparison engines.

pub mod banking;
pub mod calculator;
pub mod comparison;
pub mod locks;
pub mod pooling;
