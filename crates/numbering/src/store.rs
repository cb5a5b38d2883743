use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use factoryerp_core::CompanyId;
use factoryerp_documents::{DocumentType, FinancialYear};

/// Numbering scope: one independent counter per company, type and year.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SequenceScope {
    pub company_id: CompanyId,
    pub document_type: DocumentType,
    pub financial_year: FinancialYear,
}

impl SequenceScope {
    pub fn new(company_id: CompanyId, document_type: DocumentType, financial_year: FinancialYear) -> Self {
        Self {
            company_id,
            document_type,
            financial_year,
        }
    }

    /// Stable storage key, `company:type:fy`.
    pub fn key(&self) -> String {
        format!("{}:{}:{}", self.company_id, self.document_type, self.financial_year)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CounterError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),

    #[error("counter for {0} is exhausted")]
    Exhausted(String),
}

/// Durable per-scope counter.
///
/// `next_sequence` must be a single atomic increment-and-read: two callers
/// never observe the same value for one scope. Gaps are allowed (a drawn
/// number may go unused when the caller later fails).
pub trait CounterStore: Send + Sync {
    fn next_sequence(&self, scope: &SequenceScope) -> Result<u64, CounterError>;
}

impl<S> CounterStore for Arc<S>
where
    S: CounterStore + ?Sized,
{
    fn next_sequence(&self, scope: &SequenceScope) -> Result<u64, CounterError> {
        (**self).next_sequence(scope)
    }
}

/// Mutex-guarded counters for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    counters: Mutex<HashMap<SequenceScope, u64>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a scope so the next drawn sequence is `last + 1`.
    ///
    /// Used when numbering continues from records migrated out of another system.
    pub fn with_start(self, scope: SequenceScope, last: u64) -> Self {
        if let Ok(mut counters) = self.counters.lock() {
            counters.insert(scope, last);
        }
        self
    }

    /// Last sequence handed out for `scope` (0 when none).
    pub fn current(&self, scope: &SequenceScope) -> u64 {
        self.counters
            .lock()
            .ok()
            .and_then(|c| c.get(scope).copied())
            .unwrap_or(0)
    }
}

impl CounterStore for InMemoryCounterStore {
    fn next_sequence(&self, scope: &SequenceScope) -> Result<u64, CounterError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| CounterError::Unavailable("lock poisoned".to_string()))?;

        let counter = counters.entry(*scope).or_insert(0);
        *counter = counter
            .checked_add(1)
            .ok_or_else(|| CounterError::Exhausted(scope.key()))?;
        Ok(*counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(document_type: DocumentType) -> SequenceScope {
        SequenceScope::new(CompanyId::new(), document_type, FinancialYear::starting(2024))
    }

    #[test]
    fn sequences_start_at_one_and_increase() {
        let store = InMemoryCounterStore::new();
        let s = scope(DocumentType::Invoice);

        assert_eq!(store.next_sequence(&s).unwrap(), 1);
        assert_eq!(store.next_sequence(&s).unwrap(), 2);
        assert_eq!(store.current(&s), 2);
    }

    #[test]
    fn scopes_are_independent() {
        let store = InMemoryCounterStore::new();
        let invoices = scope(DocumentType::Invoice);
        let orders = SequenceScope {
            document_type: DocumentType::CustomerOrder,
            ..invoices
        };
        let next_year = SequenceScope {
            financial_year: FinancialYear::starting(2025),
            ..invoices
        };

        store.next_sequence(&invoices).unwrap();
        store.next_sequence(&invoices).unwrap();

        assert_eq!(store.next_sequence(&orders).unwrap(), 1);
        assert_eq!(store.next_sequence(&next_year).unwrap(), 1);
    }

    #[test]
    fn seeded_scope_continues_after_start() {
        let s = scope(DocumentType::PurchaseOrder);
        let store = InMemoryCounterStore::new().with_start(s, 41);
        assert_eq!(store.next_sequence(&s).unwrap(), 42);
    }

    #[test]
    fn exhausted_counter_is_an_error() {
        let s = scope(DocumentType::Quotation);
        let store = InMemoryCounterStore::new().with_start(s, u64::MAX);
        assert!(matches!(store.next_sequence(&s), Err(CounterError::Exhausted(_))));
    }

    #[test]
    fn key_renders_company_type_and_year() {
        let s = scope(DocumentType::CustomerOrder);
        assert_eq!(s.key(), format!("{}:customer_order:2024-25", s.company_id));
    }
}
