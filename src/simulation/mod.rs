//! Synthetic data for load testing and demos.

pub mod fleet;
