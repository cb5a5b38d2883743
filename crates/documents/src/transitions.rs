//! Per-type status transition graphs.
//!
//! Each document type maps to an immutable adjacency table. The tables are
//! exhaustive: anything not listed, self-transitions included, is rejected.

use factoryerp_core::{DomainError, DomainResult};

use crate::kind::{DocumentStatus, DocumentType};

use DocumentStatus::*;

fn quotation_edges(from: DocumentStatus) -> &'static [DocumentStatus] {
    match from {
        Draft => &[PendingApproval, Cancelled],
        PendingApproval => &[Approved, Rejected, Cancelled],
        Approved => &[Sent, Cancelled],
        Sent => &[Acknowledged, Negotiation, Accepted, Rejected, Expired, Cancelled],
        Negotiation => &[Accepted, Rejected, Cancelled],
        Accepted => &[Converted],
        _ => &[],
    }
}

fn customer_order_edges(from: DocumentStatus) -> &'static [DocumentStatus] {
    match from {
        Draft => &[Confirmed, Cancelled],
        Confirmed => &[InProduction, Cancelled],
        InProduction => &[QualityCheck, Cancelled],
        QualityCheck => &[ReadyForDispatch, InProduction],
        ReadyForDispatch => &[Dispatched],
        Dispatched => &[Delivered],
        _ => &[],
    }
}

fn purchase_order_edges(from: DocumentStatus) -> &'static [DocumentStatus] {
    match from {
        Draft => &[Sent, Cancelled],
        Sent => &[Acknowledged, Cancelled],
        Acknowledged => &[PartiallyReceived, Received, Cancelled],
        PartiallyReceived => &[Received, Cancelled],
        _ => &[],
    }
}

fn invoice_edges(from: DocumentStatus) -> &'static [DocumentStatus] {
    match from {
        Draft => &[Sent, Cancelled],
        Sent => &[Paid, PartiallyPaid, Overdue, Cancelled],
        PartiallyPaid => &[Paid, Overdue, Cancelled],
        Overdue => &[Paid, PartiallyPaid, Cancelled],
        _ => &[],
    }
}

/// Stateless validator over the per-type graphs.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TransitionValidator;

impl TransitionValidator {
    /// Outgoing edges of `from` in the graph of `document_type`.
    pub fn allowed_targets(document_type: DocumentType, from: DocumentStatus) -> &'static [DocumentStatus] {
        match document_type {
            DocumentType::Quotation => quotation_edges(from),
            DocumentType::CustomerOrder => customer_order_edges(from),
            DocumentType::PurchaseOrder => purchase_order_edges(from),
            DocumentType::Invoice => invoice_edges(from),
        }
    }

    pub fn can_transition(document_type: DocumentType, from: DocumentStatus, to: DocumentStatus) -> bool {
        document_type.has_status(from) && Self::allowed_targets(document_type, from).contains(&to)
    }

    pub fn assert_transition(
        document_type: DocumentType,
        from: DocumentStatus,
        to: DocumentStatus,
    ) -> DomainResult<()> {
        if Self::can_transition(document_type, from, to) {
            return Ok(());
        }
        let reason = if Self::is_terminal(document_type, from) {
            " (terminal status)"
        } else {
            ""
        };
        Err(DomainError::invalid_transition(format!(
            "{document_type}: {from} -> {to}{reason}"
        )))
    }

    /// Terminal statuses of a type: members of its graph with no outgoing edges.
    pub fn is_terminal(document_type: DocumentType, status: DocumentStatus) -> bool {
        document_type.has_status(status) && Self::allowed_targets(document_type, status).is_empty()
    }
}
