//! Document types and the statuses they can take.

use serde::{Deserialize, Serialize};

use factoryerp_core::DomainError;

/// The four financial document types sharing the lifecycle engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Quotation,
    CustomerOrder,
    PurchaseOrder,
    Invoice,
}

/// Which side of the trade the document's party is on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Customer,
    Supplier,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        DocumentType::Quotation,
        DocumentType::CustomerOrder,
        DocumentType::PurchaseOrder,
        DocumentType::Invoice,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Quotation => "quotation",
            DocumentType::CustomerOrder => "customer_order",
            DocumentType::PurchaseOrder => "purchase_order",
            DocumentType::Invoice => "invoice",
        }
    }

    pub fn party_role(self) -> PartyRole {
        match self {
            DocumentType::PurchaseOrder => PartyRole::Supplier,
            _ => PartyRole::Customer,
        }
    }

    /// Statuses that belong to this type's transition graph.
    pub fn statuses(self) -> &'static [DocumentStatus] {
        use DocumentStatus::*;
        match self {
            DocumentType::Quotation => &[
                Draft,
                PendingApproval,
                Approved,
                Sent,
                Acknowledged,
                Negotiation,
                Accepted,
                Rejected,
                Expired,
                Converted,
                Cancelled,
            ],
            DocumentType::CustomerOrder => &[
                Draft,
                Confirmed,
                InProduction,
                QualityCheck,
                ReadyForDispatch,
                Dispatched,
                Delivered,
                Cancelled,
            ],
            DocumentType::PurchaseOrder => &[
                Draft,
                Sent,
                Acknowledged,
                PartiallyReceived,
                Received,
                Cancelled,
            ],
            DocumentType::Invoice => &[Draft, Sent, PartiallyPaid, Overdue, Paid, Cancelled],
        }
    }

    pub fn has_status(self, status: DocumentStatus) -> bool {
        self.statuses().contains(&status)
    }

    /// Statuses in which line items may still be revised.
    pub fn editable_statuses(self) -> &'static [DocumentStatus] {
        match self {
            DocumentType::Quotation => &[DocumentStatus::Draft, DocumentStatus::Sent],
            _ => &[DocumentStatus::Draft],
        }
    }

    /// Only invoices track payments against an outstanding balance.
    pub fn tracks_settlement(self) -> bool {
        matches!(self, DocumentType::Invoice)
    }
}

impl core::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for DocumentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown document type '{s}'")))
    }
}

/// Union of all document statuses; each type uses the subset in its graph.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    PendingApproval,
    Approved,
    Sent,
    Acknowledged,
    Negotiation,
    Accepted,
    Rejected,
    Expired,
    Converted,
    Cancelled,
    Confirmed,
    InProduction,
    QualityCheck,
    ReadyForDispatch,
    Dispatched,
    Delivered,
    PartiallyReceived,
    Received,
    PartiallyPaid,
    Paid,
    Overdue,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 22] = [
        DocumentStatus::Draft,
        DocumentStatus::PendingApproval,
        DocumentStatus::Approved,
        DocumentStatus::Sent,
        DocumentStatus::Acknowledged,
        DocumentStatus::Negotiation,
        DocumentStatus::Accepted,
        DocumentStatus::Rejected,
        DocumentStatus::Expired,
        DocumentStatus::Converted,
        DocumentStatus::Cancelled,
        DocumentStatus::Confirmed,
        DocumentStatus::InProduction,
        DocumentStatus::QualityCheck,
        DocumentStatus::ReadyForDispatch,
        DocumentStatus::Dispatched,
        DocumentStatus::Delivered,
        DocumentStatus::PartiallyReceived,
        DocumentStatus::Received,
        DocumentStatus::PartiallyPaid,
        DocumentStatus::Paid,
        DocumentStatus::Overdue,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::PendingApproval => "pending_approval",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Sent => "sent",
            DocumentStatus::Acknowledged => "acknowledged",
            DocumentStatus::Negotiation => "negotiation",
            DocumentStatus::Accepted => "accepted",
            DocumentStatus::Rejected => "rejected",
            DocumentStatus::Expired => "expired",
            DocumentStatus::Converted => "converted",
            DocumentStatus::Cancelled => "cancelled",
            DocumentStatus::Confirmed => "confirmed",
            DocumentStatus::InProduction => "in_production",
            DocumentStatus::QualityCheck => "quality_check",
            DocumentStatus::ReadyForDispatch => "ready_for_dispatch",
            DocumentStatus::Dispatched => "dispatched",
            DocumentStatus::Delivered => "delivered",
            DocumentStatus::PartiallyReceived => "partially_received",
            DocumentStatus::Received => "received",
            DocumentStatus::PartiallyPaid => "partially_paid",
            DocumentStatus::Paid => "paid",
            DocumentStatus::Overdue => "overdue",
        }
    }
}

impl core::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for DocumentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown document status '{s}'")))
    }
}
