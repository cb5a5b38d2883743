//! Durable numbering counters.

pub mod postgres;

pub use postgres::PostgresCounterStore;
