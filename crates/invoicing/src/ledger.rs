use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use factoryerp_core::{DomainError, DomainResult, PaymentId, UserId};
use factoryerp_documents::{
    AmountSummary, DocumentStatus, DocumentType, FinancialDocument, PaymentEvent, PaymentMethod,
    TransitionValidator,
};

/// Payment data supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayment {
    pub payment_id: PaymentId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
    pub paid_on: NaiveDate,
    pub recorded_by: UserId,
    pub recorded_at: DateTime<Utc>,
}

impl NewPayment {
    pub fn new(
        amount: Decimal,
        method: PaymentMethod,
        paid_on: NaiveDate,
        recorded_by: UserId,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            payment_id: PaymentId::new(),
            amount,
            method,
            reference: None,
            paid_on,
            recorded_by,
            recorded_at,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Result of applying one payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentApplication {
    invoice: FinancialDocument,
    previous_status: DocumentStatus,
    event: PaymentEvent,
}

impl PaymentApplication {
    pub fn invoice(&self) -> &FinancialDocument {
        &self.invoice
    }

    pub fn summary(&self) -> &AmountSummary {
        self.invoice.amounts()
    }

    pub fn previous_status(&self) -> DocumentStatus {
        self.previous_status
    }

    pub fn new_status(&self) -> DocumentStatus {
        self.invoice.status()
    }

    pub fn status_changed(&self) -> bool {
        self.previous_status != self.invoice.status()
    }

    pub fn event(&self) -> &PaymentEvent {
        &self.event
    }

    pub fn into_parts(self) -> (FinancialDocument, PaymentEvent) {
        (self.invoice, self.event)
    }

    /// Replace the invoice with the version a repository committed.
    pub fn committed(mut self, invoice: FinancialDocument) -> Self {
        self.invoice = invoice;
        self
    }
}

/// Stateless payment application over invoices.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PaymentLedger;

impl PaymentLedger {
    /// Apply `payment` to `invoice`.
    ///
    /// All-or-nothing: on any error the input invoice is untouched and no
    /// payment is recorded. Status moves go through the transition graph; a
    /// draft invoice is issued (`draft -> sent`) before it can be part-paid.
    pub fn apply_payment(invoice: &FinancialDocument, payment: NewPayment) -> DomainResult<PaymentApplication> {
        if invoice.document_type() != DocumentType::Invoice {
            return Err(DomainError::validation(format!(
                "payments apply to invoices only, not to a {}",
                invoice.document_type()
            )));
        }

        let outstanding = invoice.amounts().outstanding();
        if payment.amount <= Decimal::ZERO {
            return Err(DomainError::invalid_payment(format!(
                "amount {} must be positive",
                payment.amount
            )));
        }
        if payment.amount > outstanding {
            return Err(DomainError::invalid_payment(format!(
                "amount {} exceeds outstanding {outstanding} on {}",
                payment.amount,
                invoice.number()
            )));
        }

        let event = PaymentEvent {
            payment_id: payment.payment_id,
            company_id: invoice.company_id(),
            invoice_id: invoice.id_typed(),
            amount: payment.amount,
            method: payment.method,
            reference: payment.reference,
            paid_on: payment.paid_on,
            recorded_by: payment.recorded_by,
            recorded_at: payment.recorded_at,
        };

        let mut updated = invoice.append_payment(event.clone())?;
        let target = Self::target_status(updated.status(), updated.amounts().outstanding());

        if updated.status() == DocumentStatus::Draft {
            updated = updated.transition(DocumentStatus::Sent, event.recorded_by, event.recorded_at)?;
        }
        if updated.status() != target {
            updated = updated.transition(target, event.recorded_by, event.recorded_at)?;
        }

        debug!(
            invoice_id = %invoice.id_typed(),
            amount = %event.amount,
            outstanding = %updated.amounts().outstanding(),
            from = %invoice.status(),
            to = %updated.status(),
            "payment applied"
        );

        Ok(PaymentApplication {
            invoice: updated,
            previous_status: invoice.status(),
            event,
        })
    }

    /// Status an invoice should take after a payment leaves `outstanding`.
    fn target_status(current: DocumentStatus, outstanding: Decimal) -> DocumentStatus {
        if outstanding.is_zero() {
            return DocumentStatus::Paid;
        }
        match current {
            DocumentStatus::Overdue => DocumentStatus::Overdue,
            _ => DocumentStatus::PartiallyPaid,
        }
    }

    /// `Some(Overdue)` when the invoice is past its due date on `as_of`, still
    /// owes money and may legally move to `overdue`.
    pub fn overdue_target(invoice: &FinancialDocument, as_of: NaiveDate) -> Option<DocumentStatus> {
        let due_date = invoice.dates().due_date?;
        let past_due = due_date < as_of;
        let owing = invoice.amounts().outstanding() > Decimal::ZERO;
        let reachable =
            TransitionValidator::can_transition(invoice.document_type(), invoice.status(), DocumentStatus::Overdue);

        (past_due && owing && reachable).then_some(DocumentStatus::Overdue)
    }
}
