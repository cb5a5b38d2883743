use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use factoryerp_core::{AggregateRoot, CompanyId, DocumentId, DomainError, DomainResult, ExpectedVersion};
use factoryerp_documents::FinancialDocument;
use factoryerp_lifecycle::DocumentRepository;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct DocumentKey {
    company_id: CompanyId,
    document_id: DocumentId,
}

/// In-memory, company-scoped document repository.
///
/// Intended for tests/dev. The version check and the write happen under one
/// write lock, so of two racing saves against the same version exactly one
/// commits.
#[derive(Debug, Default)]
pub struct InMemoryDocumentRepository {
    documents: RwLock<HashMap<DocumentKey, FinancialDocument>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// All documents of a company, ordered by number.
    pub fn list(&self, company_id: CompanyId) -> Vec<FinancialDocument> {
        let documents = match self.documents.read() {
            Ok(d) => d,
            Err(_) => return vec![],
        };
        let mut listed: Vec<FinancialDocument> = documents
            .iter()
            .filter(|(key, _)| key.company_id == company_id)
            .map(|(_, doc)| doc.clone())
            .collect();
        listed.sort_by(|a, b| a.number().cmp(b.number()));
        listed
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentRepository for InMemoryDocumentRepository {
    fn save(&self, document: &FinancialDocument, expected: ExpectedVersion) -> DomainResult<FinancialDocument> {
        let key = DocumentKey {
            company_id: document.company_id(),
            document_id: document.id_typed(),
        };

        let mut documents = self
            .documents
            .write()
            .map_err(|_| DomainError::storage("document store lock poisoned"))?;

        let current = documents.get(&key).map(|d| d.version()).unwrap_or(0);
        expected.check(current).map_err(|_| {
            DomainError::concurrent_modification(format!(
                "{} {}: expected {expected:?}, stored version is {current}",
                document.document_type(),
                document.number()
            ))
        })?;

        let committed = document.clone().committed(current + 1);
        documents.insert(key, committed.clone());
        debug!(
            document_id = %key.document_id,
            version = committed.version(),
            "document saved"
        );
        Ok(committed)
    }

    fn find_by_id(&self, company_id: CompanyId, document_id: DocumentId) -> DomainResult<Option<FinancialDocument>> {
        let documents = self
            .documents
            .read()
            .map_err(|_| DomainError::storage("document store lock poisoned"))?;
        Ok(documents
            .get(&DocumentKey {
                company_id,
                document_id,
            })
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use factoryerp_core::{PartyId, ProductId, UserId};
    use factoryerp_documents::{
        DocumentNumber, DocumentStatus, DocumentType, KeyDates, LineItem, LineItemCalculator, NewDocument,
    };
    use rust_decimal_macros::dec;

    fn test_document(company_id: CompanyId, number: &str) -> FinancialDocument {
        let lines = vec![LineItem::new(ProductId::new(), dec!(1), dec!(50))];
        let amounts = LineItemCalculator::default().compute_document(&lines).unwrap();
        FinancialDocument::draft(
            DocumentId::new(),
            NewDocument {
                company_id,
                document_type: DocumentType::PurchaseOrder,
                party_id: PartyId::new(),
                lines,
                dates: KeyDates::issued_on(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()),
                source: None,
                actor: UserId::new(),
                occurred_at: Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap(),
            },
            DocumentNumber::new(number),
            amounts,
        )
        .unwrap()
    }

    #[test]
    fn save_bumps_the_version() {
        let repo = InMemoryDocumentRepository::new();
        let doc = test_document(CompanyId::new(), "PO/2024-25/0001");

        let v1 = repo.save(&doc, ExpectedVersion::new_aggregate()).unwrap();
        assert_eq!(v1.version(), 1);

        let sent = v1
            .transition(DocumentStatus::Sent, UserId::new(), Utc::now())
            .unwrap();
        let v2 = repo.save(&sent, ExpectedVersion::Exact(1)).unwrap();
        assert_eq!(v2.version(), 2);
        assert_eq!(
            repo.find_by_id(doc.company_id(), doc.id_typed()).unwrap().unwrap().status(),
            DocumentStatus::Sent
        );
    }

    #[test]
    fn stale_save_is_rejected() {
        let repo = InMemoryDocumentRepository::new();
        let doc = test_document(CompanyId::new(), "PO/2024-25/0001");
        repo.save(&doc, ExpectedVersion::new_aggregate()).unwrap();

        let err = repo.save(&doc, ExpectedVersion::new_aggregate()).unwrap_err();
        assert!(matches!(err, DomainError::ConcurrentModification(_)));

        let err = repo.save(&doc, ExpectedVersion::Exact(7)).unwrap_err();
        assert!(matches!(err, DomainError::ConcurrentModification(_)));
    }

    #[test]
    fn racing_saves_commit_exactly_once() {
        let repo = InMemoryDocumentRepository::new();
        let doc = test_document(CompanyId::new(), "PO/2024-25/0001");
        let v1 = repo.save(&doc, ExpectedVersion::new_aggregate()).unwrap();

        let outcomes: Vec<bool> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| repo.save(&v1, ExpectedVersion::Exact(1)).is_ok()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    }

    #[test]
    fn lookups_are_company_scoped() {
        let repo = InMemoryDocumentRepository::new();
        let company = CompanyId::new();
        let doc = test_document(company, "PO/2024-25/0002");
        repo.save(&doc, ExpectedVersion::new_aggregate()).unwrap();
        repo.save(&test_document(company, "PO/2024-25/0001"), ExpectedVersion::new_aggregate())
            .unwrap();
        repo.save(&test_document(CompanyId::new(), "PO/2024-25/0001"), ExpectedVersion::new_aggregate())
            .unwrap();

        assert!(repo.find_by_id(CompanyId::new(), doc.id_typed()).unwrap().is_none());
        let numbers: Vec<String> = repo.list(company).iter().map(|d| d.number().to_string()).collect();
        assert_eq!(numbers, vec!["PO/2024-25/0001", "PO/2024-25/0002"]);
        assert_eq!(repo.len(), 3);
    }

    #[test]
    fn poisoned_store_is_a_non_retryable_storage_failure() {
        let repo = InMemoryDocumentRepository::new();
        let doc = test_document(CompanyId::new(), "PO/2024-25/0001");

        let poisoned = std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = repo.documents.write().unwrap();
                panic!("writer died while holding the lock");
            })
            .join()
        });
        assert!(poisoned.is_err());

        let err = repo.save(&doc, ExpectedVersion::new_aggregate()).unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));
        assert!(!err.is_retryable());

        let err = repo.find_by_id(doc.company_id(), doc.id_typed()).unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));
    }
}
