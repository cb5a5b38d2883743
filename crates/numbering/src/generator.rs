use tracing::{debug, warn};

use factoryerp_core::{CompanyId, DomainError, DomainResult};
use factoryerp_documents::{DocumentNumber, DocumentType, FinancialYear};

use crate::scheme::NumberingScheme;
use crate::store::{CounterStore, SequenceScope};

/// Draws the next number for a scope and renders it with the scheme.
///
/// Holds no state of its own: uniqueness is entirely the counter store's
/// atomic increment. There is no fallback to counting existing documents.
#[derive(Debug, Clone)]
pub struct DocumentNumberGenerator<C> {
    counter: C,
    scheme: NumberingScheme,
}

impl<C> DocumentNumberGenerator<C>
where
    C: CounterStore,
{
    pub fn new(counter: C) -> Self {
        Self::with_scheme(counter, NumberingScheme::default())
    }

    pub fn with_scheme(counter: C, scheme: NumberingScheme) -> Self {
        Self { counter, scheme }
    }

    pub fn scheme(&self) -> &NumberingScheme {
        &self.scheme
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }

    pub fn next_number(
        &self,
        company_id: CompanyId,
        document_type: DocumentType,
        financial_year: FinancialYear,
    ) -> DomainResult<DocumentNumber> {
        let scope = SequenceScope::new(company_id, document_type, financial_year);
        let sequence = self.counter.next_sequence(&scope).map_err(|e| {
            warn!(scope = %scope.key(), error = %e, "counter store failed");
            DomainError::number_generation_failed(format!("{}: {e}", scope.key()))
        })?;

        let number = self.scheme.render(company_id, document_type, financial_year, sequence);
        debug!(scope = %scope.key(), sequence, number = %number, "document number drawn");
        Ok(number)
    }
}
