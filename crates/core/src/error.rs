//! Domain error model.

use thiserror::Error;

/// Result type used across the engine.
pub type DomainResult<T> = Result<T, DomainError>;

/// Business-rule failure raised by the lifecycle engine.
///
/// Every variant is a deterministic, local failure: it is raised synchronously
/// by the component that detects it and travels unmodified to the caller.
/// Transport and storage errors are mapped into these kinds at the boundary
/// where they occur.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A line item failed validation (quantity, rate, discount or tax rate).
    #[error("invalid line item: {0}")]
    InvalidLineItem(String),

    /// A document was submitted without line items.
    #[error("document has no line items")]
    EmptyDocument,

    /// The numbering counter could not produce the next sequence.
    #[error("document number generation failed: {0}")]
    NumberGenerationFailed(String),

    /// The requested status is not reachable from the current one.
    #[error("invalid status transition: {0}")]
    InvalidStatusTransition(String),

    /// A payment amount was non-positive or exceeded the outstanding balance.
    #[error("invalid payment amount: {0}")]
    InvalidPaymentAmount(String),

    /// Line items can no longer be edited in the document's status.
    #[error("document not editable: {0}")]
    DocumentNotEditable(String),

    /// A stale write was rejected by the persistence boundary.
    #[error("concurrent modification: {0}")]
    ConcurrentModification(String),

    /// Request data was malformed (dates, wrong document type, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The requested document does not exist in the company scope.
    #[error("not found")]
    NotFound,

    /// The stock reservation collaborator refused or failed.
    #[error("stock reservation failed: {0}")]
    StockReservation(String),

    /// A persistence adapter is in a state it cannot recover from by itself.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn invalid_line_item(msg: impl Into<String>) -> Self {
        Self::InvalidLineItem(msg.into())
    }

    pub fn number_generation_failed(msg: impl Into<String>) -> Self {
        Self::NumberGenerationFailed(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidStatusTransition(msg.into())
    }

    pub fn invalid_payment(msg: impl Into<String>) -> Self {
        Self::InvalidPaymentAmount(msg.into())
    }

    pub fn not_editable(msg: impl Into<String>) -> Self {
        Self::DocumentNotEditable(msg.into())
    }

    pub fn concurrent_modification(msg: impl Into<String>) -> Self {
        Self::ConcurrentModification(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn stock_reservation(msg: impl Into<String>) -> Self {
        Self::StockReservation(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Whether a caller may retry after re-reading the latest state.
    ///
    /// Only counter outages and stale writes qualify; everything else is an
    /// input error that fails the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NumberGenerationFailed(_) | Self::ConcurrentModification(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_counter_and_concurrency_failures_are_retryable() {
        assert!(DomainError::number_generation_failed("down").is_retryable());
        assert!(DomainError::concurrent_modification("stale").is_retryable());

        assert!(!DomainError::EmptyDocument.is_retryable());
        assert!(!DomainError::invalid_line_item("qty").is_retryable());
        assert!(!DomainError::invalid_transition("draft -> paid").is_retryable());
        assert!(!DomainError::invalid_payment("0").is_retryable());
        assert!(!DomainError::not_editable("sent").is_retryable());
        assert!(!DomainError::not_found().is_retryable());
        assert!(!DomainError::storage("lock poisoned").is_retryable());
    }

    #[test]
    fn messages_carry_context() {
        let err = DomainError::invalid_transition("invoice: paid -> sent");
        assert_eq!(err.to_string(), "invalid status transition: invoice: paid -> sent");
    }
}
