use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use factoryerp_core::{AggregateRoot, CompanyId, DocumentId, DomainError, DomainResult, PartyId, UserId};

use crate::kind::{DocumentStatus, DocumentType};
use crate::line_item::LineItem;
use crate::payment::PaymentEvent;
use crate::period::{DocumentNumber, FinancialYear};
use crate::summary::{AmountSummary, Settlement};
use crate::timestamps::{StatusTimestamps, timestamp_field};
use crate::transitions::TransitionValidator;

/// Key business dates of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDates {
    pub issue_date: NaiveDate,
    /// Quotations: offer validity.
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    /// Orders: promised delivery date.
    #[serde(default)]
    pub expected_delivery: Option<NaiveDate>,
    /// Invoices: payment due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl KeyDates {
    pub fn issued_on(issue_date: NaiveDate) -> Self {
        Self {
            issue_date,
            valid_until: None,
            expected_delivery: None,
            due_date: None,
        }
    }

    pub fn valid_until(mut self, date: NaiveDate) -> Self {
        self.valid_until = Some(date);
        self
    }

    pub fn expected_delivery(mut self, date: NaiveDate) -> Self {
        self.expected_delivery = Some(date);
        self
    }

    pub fn due_on(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    /// Follow-up dates may not precede the issue date.
    pub fn validate(&self) -> DomainResult<()> {
        let checks = [
            ("valid_until", self.valid_until),
            ("expected_delivery", self.expected_delivery),
            ("due_date", self.due_date),
        ];
        for (name, date) in checks {
            if let Some(date) = date {
                if date < self.issue_date {
                    return Err(DomainError::validation(format!(
                        "{name} {date} is before issue date {}",
                        self.issue_date
                    )));
                }
            }
        }
        Ok(())
    }
}

/// One entry of the append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: DocumentStatus,
    pub to: DocumentStatus,
    pub at: DateTime<Utc>,
    pub actor: UserId,
}

/// Created/modified bookkeeping owned by the surrounding CRUD layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFields {
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub modified_by: UserId,
    pub modified_at: DateTime<Utc>,
}

impl AuditFields {
    fn touched(mut self, actor: UserId, at: DateTime<Utc>) -> Self {
        self.modified_by = actor;
        self.modified_at = at;
        self
    }
}

/// Reference to the document another one was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    pub document_type: DocumentType,
    pub document_id: DocumentId,
    pub number: DocumentNumber,
}

/// Opaque token handed out by the stock reservation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationToken(String);

impl ReservationToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ReservationToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Input for assembling a new draft document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub company_id: CompanyId,
    pub document_type: DocumentType,
    pub party_id: PartyId,
    pub lines: Vec<LineItem>,
    pub dates: KeyDates,
    pub source: Option<SourceReference>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// A quotation, customer order, purchase order or invoice.
///
/// Values are never mutated in place: every operation returns a new document
/// and leaves the input untouched, so a failed step cannot leave a
/// half-updated record behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialDocument {
    id: DocumentId,
    company_id: CompanyId,
    document_type: DocumentType,
    number: DocumentNumber,
    financial_year: FinancialYear,
    party_id: PartyId,
    lines: Vec<LineItem>,
    amounts: AmountSummary,
    status: DocumentStatus,
    dates: KeyDates,
    timestamps: StatusTimestamps,
    history: Vec<StatusChange>,
    payments: Vec<PaymentEvent>,
    source: Option<SourceReference>,
    stock_reservation: Option<ReservationToken>,
    audit: AuditFields,
    version: u64,
}

impl FinancialDocument {
    /// Assemble a not-yet-saved draft (version 0).
    ///
    /// `amounts` must have been computed from `new.lines`; invoices get an
    /// unpaid settlement attached.
    pub fn draft(
        id: DocumentId,
        new: NewDocument,
        number: DocumentNumber,
        amounts: AmountSummary,
    ) -> DomainResult<Self> {
        if new.lines.is_empty() {
            return Err(DomainError::EmptyDocument);
        }
        new.dates.validate()?;

        let amounts = if new.document_type.tracks_settlement() {
            amounts.settled_against(Decimal::ZERO)?
        } else {
            AmountSummary {
                settlement: None,
                ..amounts
            }
        };

        Ok(Self {
            id,
            company_id: new.company_id,
            document_type: new.document_type,
            number,
            financial_year: FinancialYear::containing(new.dates.issue_date),
            party_id: new.party_id,
            lines: new.lines,
            amounts,
            status: DocumentStatus::Draft,
            dates: new.dates,
            timestamps: StatusTimestamps::default(),
            history: Vec::new(),
            payments: Vec::new(),
            source: new.source,
            stock_reservation: None,
            audit: AuditFields {
                created_by: new.actor,
                created_at: new.occurred_at,
                modified_by: new.actor,
                modified_at: new.occurred_at,
            },
            version: 0,
        })
    }

    pub fn id_typed(&self) -> DocumentId {
        self.id
    }

    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    pub fn number(&self) -> &DocumentNumber {
        &self.number
    }

    pub fn financial_year(&self) -> FinancialYear {
        self.financial_year
    }

    pub fn party_id(&self) -> PartyId {
        self.party_id
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn amounts(&self) -> &AmountSummary {
        &self.amounts
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn dates(&self) -> &KeyDates {
        &self.dates
    }

    pub fn timestamps(&self) -> &StatusTimestamps {
        &self.timestamps
    }

    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    pub fn payments(&self) -> &[PaymentEvent] {
        &self.payments
    }

    pub fn source(&self) -> Option<&SourceReference> {
        self.source.as_ref()
    }

    pub fn stock_reservation(&self) -> Option<&ReservationToken> {
        self.stock_reservation.as_ref()
    }

    pub fn audit(&self) -> &AuditFields {
        &self.audit
    }

    pub fn is_editable(&self) -> bool {
        self.document_type.editable_statuses().contains(&self.status)
    }

    pub fn is_terminal(&self) -> bool {
        TransitionValidator::is_terminal(self.document_type, self.status)
    }

    /// Move to `to` if the type's graph allows it.
    ///
    /// Sets the type-specific timestamp for `to` (first entry wins) and appends
    /// to the status history. Line items and amounts are untouched.
    ///
    /// Payment statuses must agree with the settlement: `paid` needs nothing
    /// outstanding, `partially_paid` needs something paid and something owed.
    pub fn transition(&self, to: DocumentStatus, actor: UserId, at: DateTime<Utc>) -> DomainResult<Self> {
        TransitionValidator::assert_transition(self.document_type, self.status, to)?;
        self.assert_settlement_allows(to)?;

        let mut next = self.clone();
        if let Some(field) = timestamp_field(self.document_type, to) {
            next.timestamps.record_first(field, at);
        }
        next.history.push(StatusChange {
            from: self.status,
            to,
            at,
            actor,
        });
        next.status = to;
        next.audit = self.audit.touched(actor, at);
        Ok(next)
    }

    fn assert_settlement_allows(&self, to: DocumentStatus) -> DomainResult<()> {
        let Some(settlement) = self.amounts.settlement else {
            return Ok(());
        };
        let consistent = match to {
            DocumentStatus::Paid => settlement.outstanding.is_zero(),
            DocumentStatus::PartiallyPaid => {
                settlement.paid > Decimal::ZERO && settlement.outstanding > Decimal::ZERO
            }
            _ => return Ok(()),
        };
        if consistent {
            return Ok(());
        }
        Err(DomainError::invalid_transition(format!(
            "{} {}: {} -> {to} with {} paid and {} outstanding; record a payment instead",
            self.document_type, self.number, self.status, settlement.paid, settlement.outstanding
        )))
    }

    /// Replace line items and their recomputed amounts while still editable.
    pub fn revise_lines(
        &self,
        lines: Vec<LineItem>,
        amounts: AmountSummary,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if !self.is_editable() {
            return Err(DomainError::not_editable(format!(
                "{} {} is {}",
                self.document_type, self.number, self.status
            )));
        }
        if lines.is_empty() {
            return Err(DomainError::EmptyDocument);
        }

        let amounts = if self.document_type.tracks_settlement() {
            amounts.settled_against(self.amounts.paid())?
        } else {
            amounts
        };

        let mut next = self.clone();
        next.lines = lines;
        next.amounts = amounts;
        next.audit = self.audit.touched(actor, at);
        Ok(next)
    }

    /// Append a payment and move it into the settlement.
    ///
    /// Guards the settlement identity: the amount must be positive and must not
    /// exceed the outstanding balance. Status is left to the caller.
    pub fn append_payment(&self, payment: PaymentEvent) -> DomainResult<Self> {
        let Some(settlement) = self.amounts.settlement else {
            return Err(DomainError::validation(format!(
                "payments apply to invoices only, not to a {}",
                self.document_type
            )));
        };
        if payment.invoice_id != self.id || payment.company_id != self.company_id {
            return Err(DomainError::validation("payment belongs to a different invoice"));
        }
        if payment.amount <= Decimal::ZERO {
            return Err(DomainError::invalid_payment(format!(
                "amount {} must be positive",
                payment.amount
            )));
        }
        if payment.amount > settlement.outstanding {
            return Err(DomainError::invalid_payment(format!(
                "amount {} exceeds outstanding {}",
                payment.amount, settlement.outstanding
            )));
        }

        let mut next = self.clone();
        next.amounts.settlement = Some(Settlement {
            paid: settlement.paid + payment.amount,
            outstanding: settlement.outstanding - payment.amount,
        });
        next.audit = self.audit.touched(payment.recorded_by, payment.recorded_at);
        next.payments.push(payment);
        Ok(next)
    }

    pub fn with_stock_reservation(&self, token: Option<ReservationToken>) -> Self {
        let mut next = self.clone();
        next.stock_reservation = token;
        next
    }

    /// Stamp the version assigned by a persistence adapter on commit.
    pub fn committed(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

impl AggregateRoot for FinancialDocument {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
