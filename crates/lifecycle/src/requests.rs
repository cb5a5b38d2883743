//! Inputs of the lifecycle operations.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use factoryerp_core::{CompanyId, PartyId, UserId};
use factoryerp_documents::{DocumentStatus, DocumentType, KeyDates, LineItem, SourceReference};
use factoryerp_invoicing::NewPayment;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDocument {
    pub company_id: CompanyId,
    pub document_type: DocumentType,
    pub party_id: PartyId,
    pub lines: Vec<LineItem>,
    pub dates: KeyDates,
    #[serde(default)]
    pub source: Option<SourceReference>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl CreateDocument {
    /// Customer order request built from a converted quotation's payload.
    ///
    /// The order is issued on `issue_date`; the promised delivery date carries over.
    pub fn from_order_draft(
        payload: OrderDraftPayload,
        issue_date: NaiveDate,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        let mut dates = KeyDates::issued_on(issue_date);
        dates.expected_delivery = payload.expected_delivery;
        Self {
            company_id: payload.company_id,
            document_type: DocumentType::CustomerOrder,
            party_id: payload.party_id,
            lines: payload.lines,
            dates,
            source: Some(payload.source),
            actor,
            occurred_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub to: DocumentStatus,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviseLines {
    pub lines: Vec<LineItem>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// The recording user and time travel inside the payment itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayment {
    pub payment: NewPayment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkOverdue {
    /// Business date the due date is compared against.
    pub as_of: NaiveDate,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Data handed to the order-creation collaborator when a quotation converts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraftPayload {
    pub company_id: CompanyId,
    pub party_id: PartyId,
    pub lines: Vec<LineItem>,
    #[serde(default)]
    pub expected_delivery: Option<NaiveDate>,
    pub source: SourceReference,
}
