//! `factoryerp-core`: shared building blocks of the document lifecycle engine.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{CompanyId, DocumentId, PartyId, PaymentId, ProductId, UserId};
