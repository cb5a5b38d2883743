//! Invoice payment ledger.
//!
//! Applies partial payments against an invoice's outstanding balance and
//! derives the resulting status through the invoice transition graph.
//! Deterministic domain logic only (no IO, no storage).

pub mod ledger;

pub use factoryerp_documents::{PaymentEvent, PaymentMethod};
pub use ledger::{NewPayment, PaymentApplication, PaymentLedger};
