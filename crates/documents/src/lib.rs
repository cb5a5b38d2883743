//! Financial documents: quotations, customer orders, purchase orders and invoices.
//!
//! Pure domain: line-item arithmetic, per-type status graphs, status
//! timestamps and the document value itself. No I/O.

pub mod calculator;
pub mod document;
pub mod kind;
pub mod line_item;
pub mod payment;
pub mod period;
pub mod summary;
pub mod timestamps;
pub mod transitions;

pub use calculator::{LineAmounts, LineItemCalculator, RoundingPolicy};
pub use document::{
    AuditFields, FinancialDocument, KeyDates, NewDocument, ReservationToken, SourceReference, StatusChange,
};
pub use kind::{DocumentStatus, DocumentType, PartyRole};
pub use line_item::{Discount, DiscountKind, LineItem, PlaceOfSupply, TaxComponent, TaxComponentKind};
pub use payment::{PaymentEvent, PaymentMethod};
pub use period::{DocumentNumber, FinancialYear};
pub use summary::{AmountSummary, Settlement, TaxTotal};
pub use timestamps::{StatusTimestamps, TimestampField, timestamp_field};
pub use transitions::TransitionValidator;
