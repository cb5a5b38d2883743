//! Collaborator traits consumed by the lifecycle service.

use std::sync::Arc;

use factoryerp_core::{CompanyId, DocumentId, DomainResult, ExpectedVersion};
use factoryerp_documents::{FinancialDocument, LineItem, ReservationToken};

/// Company-scoped document persistence.
///
/// Implementations must:
/// - compare `expected` with the stored version and fail with
///   `DomainError::ConcurrentModification` on mismatch
/// - store the document at `stored version + 1` and return it committed at
///   that version
/// - never return a document of another company from `find_by_id`
pub trait DocumentRepository: Send + Sync {
    fn save(&self, document: &FinancialDocument, expected: ExpectedVersion) -> DomainResult<FinancialDocument>;

    fn find_by_id(&self, company_id: CompanyId, document_id: DocumentId) -> DomainResult<Option<FinancialDocument>>;
}

impl<R> DocumentRepository for Arc<R>
where
    R: DocumentRepository + ?Sized,
{
    fn save(&self, document: &FinancialDocument, expected: ExpectedVersion) -> DomainResult<FinancialDocument> {
        (**self).save(document, expected)
    }

    fn find_by_id(&self, company_id: CompanyId, document_id: DocumentId) -> DomainResult<Option<FinancialDocument>> {
        (**self).find_by_id(company_id, document_id)
    }
}

/// Warehouse stock reservations for customer orders.
///
/// Failures surface as `DomainError::StockReservation`.
pub trait StockReservations: Send + Sync {
    fn reserve(
        &self,
        company_id: CompanyId,
        document_id: DocumentId,
        lines: &[LineItem],
    ) -> DomainResult<ReservationToken>;

    fn release(&self, token: &ReservationToken) -> DomainResult<()>;
}

impl<S> StockReservations for Arc<S>
where
    S: StockReservations + ?Sized,
{
    fn reserve(
        &self,
        company_id: CompanyId,
        document_id: DocumentId,
        lines: &[LineItem],
    ) -> DomainResult<ReservationToken> {
        (**self).reserve(company_id, document_id, lines)
    }

    fn release(&self, token: &ReservationToken) -> DomainResult<()> {
        (**self).release(token)
    }
}
