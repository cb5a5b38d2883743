//! Document lifecycle orchestration.
//!
//! Composes the pure document logic (calculator, transition graphs, payment
//! ledger) with the collaborators the engine needs but does not own:
//! persistence, numbering counters, stock reservations and the audit sink.

pub mod audit;
pub mod ports;
pub mod requests;
pub mod service;

pub use audit::{AuditAction, AuditRecord};
pub use ports::{DocumentRepository, StockReservations};
pub use requests::{ChangeStatus, CreateDocument, MarkOverdue, OrderDraftPayload, RecordPayment, ReviseLines};
pub use service::DocumentLifecycleService;
