//! Status-timestamp side effects as a lookup table.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kind::{DocumentStatus, DocumentType};

/// Named timestamp set when a document enters a status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampField {
    SubmittedForApprovalAt,
    ApprovedAt,
    SentAt,
    IssuedAt,
    AcknowledgedAt,
    NegotiationStartedAt,
    AcceptedAt,
    RejectedAt,
    ExpiredAt,
    ConvertedAt,
    CancelledAt,
    ConfirmedAt,
    ProductionStartedAt,
    QualityCheckStartedAt,
    ReadyForDispatchAt,
    DispatchedAt,
    DeliveredAt,
    PartiallyReceivedAt,
    ReceivedAt,
    PartiallyPaidAt,
    PaidAt,
    OverdueAt,
}

/// `(document type, target status) -> timestamp field`.
///
/// `None` for `draft` (never a transition target) and for statuses outside
/// the type's graph.
pub fn timestamp_field(document_type: DocumentType, to: DocumentStatus) -> Option<TimestampField> {
    use DocumentStatus as S;
    use TimestampField as F;

    if !document_type.has_status(to) {
        return None;
    }

    let field = match (document_type, to) {
        (_, S::Draft) => return None,
        (DocumentType::Invoice, S::Sent) => F::IssuedAt,
        (_, S::Sent) => F::SentAt,
        (_, S::PendingApproval) => F::SubmittedForApprovalAt,
        (_, S::Approved) => F::ApprovedAt,
        (_, S::Acknowledged) => F::AcknowledgedAt,
        (_, S::Negotiation) => F::NegotiationStartedAt,
        (_, S::Accepted) => F::AcceptedAt,
        (_, S::Rejected) => F::RejectedAt,
        (_, S::Expired) => F::ExpiredAt,
        (_, S::Converted) => F::ConvertedAt,
        (_, S::Cancelled) => F::CancelledAt,
        (_, S::Confirmed) => F::ConfirmedAt,
        (_, S::InProduction) => F::ProductionStartedAt,
        (_, S::QualityCheck) => F::QualityCheckStartedAt,
        (_, S::ReadyForDispatch) => F::ReadyForDispatchAt,
        (_, S::Dispatched) => F::DispatchedAt,
        (_, S::Delivered) => F::DeliveredAt,
        (_, S::PartiallyReceived) => F::PartiallyReceivedAt,
        (_, S::Received) => F::ReceivedAt,
        (_, S::PartiallyPaid) => F::PartiallyPaidAt,
        (_, S::Paid) => F::PaidAt,
        (_, S::Overdue) => F::OverdueAt,
    };
    Some(field)
}

/// Timestamps recorded per field; the first entry into a status wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusTimestamps(BTreeMap<TimestampField, DateTime<Utc>>);

impl StatusTimestamps {
    pub fn get(&self, field: TimestampField) -> Option<DateTime<Utc>> {
        self.0.get(&field).copied()
    }

    /// Records `at` unless the field already holds a value. Returns whether it was set.
    pub fn record_first(&mut self, field: TimestampField, at: DateTime<Utc>) -> bool {
        if self.0.contains_key(&field) {
            return false;
        }
        self.0.insert(field, at);
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TimestampField, DateTime<Utc>)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}
