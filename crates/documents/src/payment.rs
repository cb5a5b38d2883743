use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use factoryerp_core::{CompanyId, DocumentId, PaymentId, UserId};
use factoryerp_events::Event;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Cheque,
    Upi,
    Card,
    Other,
}

/// A payment recorded against an invoice. Append-only: never edited or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub payment_id: PaymentId,
    pub company_id: CompanyId,
    pub invoice_id: DocumentId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    /// Bank/cheque/UPI reference, if any.
    pub reference: Option<String>,
    pub paid_on: NaiveDate,
    pub recorded_by: UserId,
    pub recorded_at: DateTime<Utc>,
}

impl Event for PaymentEvent {
    fn event_type(&self) -> &'static str {
        "invoicing.invoice.payment_recorded"
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}
