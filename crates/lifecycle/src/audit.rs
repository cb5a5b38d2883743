use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use factoryerp_core::{AggregateRoot, CompanyId, DocumentId, UserId};
use factoryerp_documents::{DocumentNumber, DocumentStatus, DocumentType, FinancialDocument};
use factoryerp_events::Event;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    StatusChanged,
    LinesRevised,
    PaymentRecorded,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::StatusChanged => "status_changed",
            AuditAction::LinesRevised => "lines_revised",
            AuditAction::PaymentRecorded => "payment_recorded",
        }
    }
}

/// Immutable record of one committed lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event_id: Uuid,
    pub company_id: CompanyId,
    pub document_id: DocumentId,
    pub document_type: DocumentType,
    pub document_number: DocumentNumber,
    pub action: AuditAction,
    /// `None` for creation.
    pub from_status: Option<DocumentStatus>,
    pub to_status: DocumentStatus,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
    /// Committed version the operation produced.
    pub version: u64,
}

impl AuditRecord {
    pub fn for_document(
        document: &FinancialDocument,
        action: AuditAction,
        from_status: Option<DocumentStatus>,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            company_id: document.company_id(),
            document_id: document.id_typed(),
            document_type: document.document_type(),
            document_number: document.number().clone(),
            action,
            from_status,
            to_status: document.status(),
            actor,
            occurred_at,
            version: document.version(),
        }
    }
}

impl Event for AuditRecord {
    fn event_type(&self) -> &'static str {
        match self.action {
            AuditAction::Created => "lifecycle.document.created",
            AuditAction::StatusChanged => "lifecycle.document.status_changed",
            AuditAction::LinesRevised => "lifecycle.document.lines_revised",
            AuditAction::PaymentRecorded => "lifecycle.document.payment_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
