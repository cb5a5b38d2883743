//! Lifecycle service: the single entry point for mutating financial documents.
//!
//! Every mutating operation follows the same pipeline:
//!
//! ```text
//! request
//!   -> pure transform (calculator / transition graph / payment ledger)
//!   -> collaborator hooks (numbering, stock reservations)
//!   -> repository save (ExpectedVersion::Exact(current version))
//!   -> audit record published
//! ```
//!
//! The service holds no locks and keeps no state between calls. Stale writes
//! are detected by the repository and come back as
//! `DomainError::ConcurrentModification`; the caller re-reads and retries.
//! Audit publication happens after the save; a failed publish is logged and
//! does not undo the committed change.

use tracing::{debug, info, instrument, warn};

use factoryerp_core::{AggregateRoot, CompanyId, DocumentId, DomainError, DomainResult, ExpectedVersion};
use factoryerp_documents::{
    DocumentStatus, DocumentType, FinancialDocument, FinancialYear, LineItemCalculator, NewDocument,
    ReservationToken, SourceReference,
};
use factoryerp_events::EventBus;
use factoryerp_invoicing::{PaymentApplication, PaymentLedger};
use factoryerp_numbering::{CounterStore, DocumentNumberGenerator};

use crate::audit::{AuditAction, AuditRecord};
use crate::ports::{DocumentRepository, StockReservations};
use crate::requests::{ChangeStatus, CreateDocument, MarkOverdue, OrderDraftPayload, RecordPayment, ReviseLines};

#[derive(Debug)]
pub struct DocumentLifecycleService<R, C, S, B> {
    repository: R,
    numbers: DocumentNumberGenerator<C>,
    calculator: LineItemCalculator,
    stock: S,
    audit: B,
}

impl<R, C, S, B> DocumentLifecycleService<R, C, S, B> {
    pub fn new(
        repository: R,
        numbers: DocumentNumberGenerator<C>,
        calculator: LineItemCalculator,
        stock: S,
        audit: B,
    ) -> Self {
        Self {
            repository,
            numbers,
            calculator,
            stock,
            audit,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn calculator(&self) -> &LineItemCalculator {
        &self.calculator
    }

    pub fn audit_bus(&self) -> &B {
        &self.audit
    }
}

impl<R, C, S, B> DocumentLifecycleService<R, C, S, B>
where
    R: DocumentRepository,
    C: CounterStore,
    S: StockReservations,
    B: EventBus<AuditRecord>,
{
    /// Create a draft document with computed amounts and a fresh number.
    ///
    /// Lines and dates are validated before a number is drawn, so rejected
    /// input never consumes a sequence.
    #[instrument(
        skip(self, request),
        fields(company_id = %request.company_id, document_type = %request.document_type),
        err
    )]
    pub fn create_document(&self, request: CreateDocument) -> DomainResult<FinancialDocument> {
        let amounts = self.calculator.compute_document(&request.lines)?;
        request.dates.validate()?;

        let financial_year = FinancialYear::containing(request.dates.issue_date);
        let number = self
            .numbers
            .next_number(request.company_id, request.document_type, financial_year)?;

        let draft = FinancialDocument::draft(
            DocumentId::new(),
            NewDocument {
                company_id: request.company_id,
                document_type: request.document_type,
                party_id: request.party_id,
                lines: request.lines,
                dates: request.dates,
                source: request.source,
                actor: request.actor,
                occurred_at: request.occurred_at,
            },
            number,
            amounts,
        )?;

        let saved = self.repository.save(&draft, ExpectedVersion::new_aggregate())?;
        info!(
            document_id = %saved.id_typed(),
            number = %saved.number(),
            grand_total = %saved.amounts().grand_total,
            "document created"
        );

        self.publish(AuditRecord::for_document(
            &saved,
            AuditAction::Created,
            None,
            request.actor,
            request.occurred_at,
        ));
        Ok(saved)
    }

    /// Move a document along its type's transition graph.
    ///
    /// Customer orders reserve stock on `confirmed -> in_production`. A
    /// cancellation drops the held reservation from the document and releases
    /// it once the cancellation is committed; a failed release is logged with
    /// its token.
    #[instrument(
        skip(self, document, request),
        fields(
            document_id = %document.id_typed(),
            document_type = %document.document_type(),
            from = %document.status(),
            to = %request.to
        ),
        err
    )]
    pub fn change_status(&self, document: &FinancialDocument, request: ChangeStatus) -> DomainResult<FinancialDocument> {
        let from = document.status();
        let mut next = document.transition(request.to, request.actor, request.occurred_at)?;

        let reserved = if reserves_stock(document.document_type(), from, request.to) {
            let token = self
                .stock
                .reserve(document.company_id(), document.id_typed(), document.lines())?;
            debug!(token = %token, "stock reserved");
            next = next.with_stock_reservation(Some(token.clone()));
            Some(token)
        } else {
            None
        };

        let held = if request.to == DocumentStatus::Cancelled {
            document.stock_reservation().cloned()
        } else {
            None
        };
        if held.is_some() {
            next = next.with_stock_reservation(None);
        }

        let saved = match self.repository.save(&next, ExpectedVersion::Exact(document.version())) {
            Ok(saved) => saved,
            Err(err) => {
                if let Some(token) = reserved {
                    self.release_quietly(&token);
                }
                return Err(err);
            }
        };

        if let Some(token) = held {
            self.release_quietly(&token);
        }

        info!(version = saved.version(), "status changed");
        self.publish(AuditRecord::for_document(
            &saved,
            AuditAction::StatusChanged,
            Some(from),
            request.actor,
            request.occurred_at,
        ));
        Ok(saved)
    }

    /// Replace line items and recompute amounts while the document is editable.
    #[instrument(
        skip(self, document, request),
        fields(document_id = %document.id_typed(), status = %document.status()),
        err
    )]
    pub fn recompute_amounts(&self, document: &FinancialDocument, request: ReviseLines) -> DomainResult<FinancialDocument> {
        if !document.is_editable() {
            return Err(DomainError::not_editable(format!(
                "{} {} is {}",
                document.document_type(),
                document.number(),
                document.status()
            )));
        }

        let amounts = self.calculator.compute_document(&request.lines)?;
        let next = document.revise_lines(request.lines, amounts, request.actor, request.occurred_at)?;
        let saved = self.repository.save(&next, ExpectedVersion::Exact(document.version()))?;

        debug!(grand_total = %saved.amounts().grand_total, "amounts recomputed");
        self.publish(AuditRecord::for_document(
            &saved,
            AuditAction::LinesRevised,
            Some(document.status()),
            request.actor,
            request.occurred_at,
        ));
        Ok(saved)
    }

    /// Payload for creating a customer order from an accepted quotation.
    ///
    /// Pure: the quotation is not modified here; moving it to `converted` is a
    /// separate `change_status` call once the order exists.
    pub fn convert_quotation_to_order(&self, quotation: &FinancialDocument) -> DomainResult<OrderDraftPayload> {
        if quotation.document_type() != DocumentType::Quotation {
            return Err(DomainError::validation(format!(
                "only quotations convert to orders, got a {}",
                quotation.document_type()
            )));
        }
        if quotation.status() != DocumentStatus::Accepted {
            return Err(DomainError::invalid_transition(format!(
                "quotation {} is {}; only accepted quotations convert to orders",
                quotation.number(),
                quotation.status()
            )));
        }

        Ok(OrderDraftPayload {
            company_id: quotation.company_id(),
            party_id: quotation.party_id(),
            lines: quotation.lines().to_vec(),
            expected_delivery: quotation.dates().expected_delivery,
            source: SourceReference {
                document_type: DocumentType::Quotation,
                document_id: quotation.id_typed(),
                number: quotation.number().clone(),
            },
        })
    }

    /// Record a payment against an invoice and save the result.
    #[instrument(
        skip(self, invoice, request),
        fields(invoice_id = %invoice.id_typed(), amount = %request.payment.amount),
        err
    )]
    pub fn apply_payment(&self, invoice: &FinancialDocument, request: RecordPayment) -> DomainResult<PaymentApplication> {
        let application = PaymentLedger::apply_payment(invoice, request.payment)?;
        let saved = self
            .repository
            .save(application.invoice(), ExpectedVersion::Exact(invoice.version()))?;

        info!(
            outstanding = %saved.amounts().outstanding(),
            status = %saved.status(),
            "payment recorded"
        );
        let event = application.event();
        self.publish(AuditRecord::for_document(
            &saved,
            AuditAction::PaymentRecorded,
            Some(invoice.status()),
            event.recorded_by,
            event.recorded_at,
        ));
        Ok(application.committed(saved))
    }

    /// Move a past-due invoice to `overdue`. `None` when nothing is due.
    pub fn mark_overdue(&self, invoice: &FinancialDocument, request: MarkOverdue) -> DomainResult<Option<FinancialDocument>> {
        if invoice.document_type() != DocumentType::Invoice {
            return Err(DomainError::validation(format!(
                "only invoices become overdue, got a {}",
                invoice.document_type()
            )));
        }

        match PaymentLedger::overdue_target(invoice, request.as_of) {
            Some(to) => self
                .change_status(
                    invoice,
                    ChangeStatus {
                        to,
                        actor: request.actor,
                        occurred_at: request.occurred_at,
                    },
                )
                .map(Some),
            None => Ok(None),
        }
    }

    pub fn load(&self, company_id: CompanyId, document_id: DocumentId) -> DomainResult<FinancialDocument> {
        self.repository
            .find_by_id(company_id, document_id)?
            .ok_or(DomainError::NotFound)
    }

    fn publish(&self, record: AuditRecord) {
        let document_id = record.document_id;
        let action = record.action.as_str();
        if let Err(e) = self.audit.publish(record) {
            warn!(%document_id, action, error = ?e, "audit record not published");
        }
    }

    fn release_quietly(&self, token: &ReservationToken) {
        match self.stock.release(token) {
            Ok(()) => debug!(token = %token, "stock released"),
            Err(e) => warn!(token = %token, error = %e, "stock release failed; reservation needs manual release"),
        }
    }
}

fn reserves_stock(document_type: DocumentType, from: DocumentStatus, to: DocumentStatus) -> bool {
    document_type == DocumentType::CustomerOrder
        && from == DocumentStatus::Confirmed
        && to == DocumentStatus::InProduction
}
