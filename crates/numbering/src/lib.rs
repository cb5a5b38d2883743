//! Per-scope document numbering.
//!
//! A number is `{company code/}{type prefix}{financial year}/{sequence}`; the
//! sequence comes from a `CounterStore` that increments atomically per
//! `(company, document type, financial year)` scope.

pub mod generator;
pub mod scheme;
pub mod store;

use chrono::NaiveDate;

pub use factoryerp_documents::{DocumentNumber, FinancialYear};
pub use generator::DocumentNumberGenerator;
pub use scheme::{NumberFormat, NumberingScheme};
pub use store::{CounterError, CounterStore, InMemoryCounterStore, SequenceScope};

/// Financial year (April 1 to March 31) a date falls in.
pub fn current_financial_year(date: NaiveDate) -> FinancialYear {
    FinancialYear::containing(date)
}
