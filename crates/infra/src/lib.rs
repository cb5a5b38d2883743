//! Infrastructure layer: persistence adapters, configuration and wiring.

pub mod config;
pub mod counter;
pub mod repository;
pub mod stock;
pub mod wiring;

#[cfg(test)]
mod integration_tests;
