//! Integration tests for the full document lifecycle pipeline.
//!
//! Tests: Request → LifecycleService → Repository → AuditBus
//!
//! Verifies:
//! - Quotations travel to accepted, convert, and spawn a linked customer order
//! - Invoice payments reconcile to the grand total
//! - Stock hooks reserve on production start and release on cancellation
//! - Optimistic concurrency conflicts are detected

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;

    use factoryerp_core::{AggregateRoot, CompanyId, DomainError, PartyId, ProductId, UserId};
    use factoryerp_documents::{
        Discount, DocumentStatus, DocumentType, FinancialDocument, KeyDates, LineItem, PlaceOfSupply,
        TimestampField,
    };
    use factoryerp_events::{EventBus, Subscription};
    use factoryerp_invoicing::{NewPayment, PaymentMethod};
    use factoryerp_lifecycle::{
        AuditAction, AuditRecord, ChangeStatus, CreateDocument, MarkOverdue, RecordPayment, ReviseLines,
    };
    use factoryerp_numbering::InMemoryCounterStore;

    use crate::config::EngineConfig;
    use crate::stock::InMemoryStockReservations;
    use crate::wiring::{Engine, build_engine, build_in_memory_engine};

    fn setup() -> (Engine, Subscription<AuditRecord>) {
        factoryerp_observability::init_for_tests();
        let engine = build_in_memory_engine(&EngineConfig::default());
        // Subscribe BEFORE any records are published
        let audit = engine.audit.subscribe();
        (engine, audit)
    }

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, day, hour, 0, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, day).unwrap()
    }

    fn test_line() -> LineItem {
        LineItem::new(ProductId::new(), dec!(10), dec!(100))
            .with_discount(Discount::percentage(dec!(10)))
            .with_tax(dec!(18), Some(PlaceOfSupply::IntraState))
    }

    fn test_request(company_id: CompanyId, document_type: DocumentType, lines: Vec<LineItem>) -> CreateDocument {
        CreateDocument {
            company_id,
            document_type,
            party_id: PartyId::new(),
            lines,
            dates: KeyDates::issued_on(date(2)),
            source: None,
            actor: UserId::new(),
            occurred_at: ts(2, 9),
        }
    }

    fn step(engine: &Engine, doc: &FinancialDocument, to: DocumentStatus, at: DateTime<Utc>) -> FinancialDocument {
        engine
            .service
            .change_status(
                doc,
                ChangeStatus {
                    to,
                    actor: UserId::new(),
                    occurred_at: at,
                },
            )
            .unwrap()
    }

    fn pay(engine: &Engine, invoice: &FinancialDocument, amount: rust_decimal::Decimal) -> Result<FinancialDocument, DomainError> {
        engine
            .service
            .apply_payment(
                invoice,
                RecordPayment {
                    payment: NewPayment::new(amount, PaymentMethod::Upi, date(10), UserId::new(), ts(10, 15))
                        .with_reference("UTR-8841"),
                },
            )
            .map(|applied| applied.invoice().clone())
    }

    #[test]
    fn quotation_converts_into_a_linked_customer_order() {
        let (engine, audit) = setup();
        let company = CompanyId::new();

        let mut request = test_request(company, DocumentType::Quotation, vec![test_line()]);
        request.dates = KeyDates::issued_on(date(2)).valid_until(date(30)).expected_delivery(date(25));
        let quotation = engine.service.create_document(request).unwrap();
        assert_eq!(quotation.number().as_str(), "QT/2024-25/0001");
        assert_eq!(quotation.amounts().grand_total, dec!(1062));

        let quotation = step(&engine, &quotation, DocumentStatus::PendingApproval, ts(3, 9));
        let quotation = step(&engine, &quotation, DocumentStatus::Approved, ts(3, 11));
        let quotation = step(&engine, &quotation, DocumentStatus::Sent, ts(4, 9));

        // still editable while sent
        let quotation = engine
            .service
            .recompute_amounts(
                &quotation,
                ReviseLines {
                    lines: vec![test_line(), LineItem::new(ProductId::new(), dec!(2), dec!(19))],
                    actor: UserId::new(),
                    occurred_at: ts(5, 9),
                },
            )
            .unwrap();
        assert_eq!(quotation.amounts().grand_total, dec!(1100));

        let accepted = step(&engine, &quotation, DocumentStatus::Accepted, ts(6, 9));
        let payload = engine.service.convert_quotation_to_order(&accepted).unwrap();
        assert_eq!(payload.source.number, *accepted.number());
        assert_eq!(payload.lines, accepted.lines());

        let order = engine
            .service
            .create_document(CreateDocument::from_order_draft(payload, date(6), UserId::new(), ts(6, 10)))
            .unwrap();
        let converted = step(&engine, &accepted, DocumentStatus::Converted, ts(6, 11));

        assert_eq!(order.document_type(), DocumentType::CustomerOrder);
        assert_eq!(order.number().as_str(), "SO/2024-25/0001");
        assert_eq!(order.source().map(|s| s.document_id), Some(accepted.id_typed()));
        assert_eq!(order.dates().expected_delivery, Some(date(25)));
        assert_eq!(order.amounts(), accepted.amounts());

        assert!(converted.is_terminal());
        assert_eq!(converted.timestamps().get(TimestampField::SentAt), Some(ts(4, 9)));
        assert_eq!(converted.timestamps().get(TimestampField::ConvertedAt), Some(ts(6, 11)));
        assert_eq!(converted.history().len(), 5);

        let actions: Vec<AuditAction> = audit.drain().into_iter().map(|r| r.action).collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::Created,
                AuditAction::StatusChanged,
                AuditAction::StatusChanged,
                AuditAction::StatusChanged,
                AuditAction::LinesRevised,
                AuditAction::StatusChanged,
                AuditAction::Created,
                AuditAction::StatusChanged,
            ]
        );
    }

    #[test]
    fn invoice_payments_reconcile_to_the_grand_total() {
        let (engine, audit) = setup();
        let company = CompanyId::new();

        let invoice = engine
            .service
            .create_document(test_request(company, DocumentType::Invoice, vec![test_line()]))
            .unwrap();
        assert_eq!(invoice.number().as_str(), "INV/2024-25/001");
        assert_eq!(invoice.amounts().outstanding(), dec!(1062.00));

        let partial = pay(&engine, &invoice, dec!(600.00)).unwrap();
        assert_eq!(partial.status(), DocumentStatus::PartiallyPaid);
        assert_eq!(partial.amounts().paid(), dec!(600.00));
        assert_eq!(partial.amounts().outstanding(), dec!(462.00));
        assert!(partial.timestamps().get(TimestampField::IssuedAt).is_some());

        let paid = pay(&engine, &partial, dec!(462.00)).unwrap();
        assert_eq!(paid.status(), DocumentStatus::Paid);
        assert_eq!(paid.amounts().outstanding(), dec!(0));
        assert_eq!(paid.payments().len(), 2);
        assert_eq!(paid.payments()[0].reference.as_deref(), Some("UTR-8841"));

        let err = pay(&engine, &paid, dec!(0.01)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidPaymentAmount(_)));

        let stored = engine.service.load(company, invoice.id_typed()).unwrap();
        assert_eq!(stored, paid);

        let records = audit.drain();
        let payments: Vec<_> = records
            .iter()
            .filter(|r| r.action == AuditAction::PaymentRecorded)
            .map(|r| (r.from_status, r.to_status))
            .collect();
        assert_eq!(
            payments,
            vec![
                (Some(DocumentStatus::Draft), DocumentStatus::PartiallyPaid),
                (Some(DocumentStatus::PartiallyPaid), DocumentStatus::Paid),
            ]
        );
    }

    #[test]
    fn overdue_invoice_is_flagged_and_still_accepts_payments() {
        let (engine, _audit) = setup();
        let mut request = test_request(CompanyId::new(), DocumentType::Invoice, vec![test_line()]);
        request.dates = KeyDates::issued_on(date(2)).due_on(date(12));
        let invoice = engine.service.create_document(request).unwrap();
        let sent = step(&engine, &invoice, DocumentStatus::Sent, ts(2, 12));

        let check = |as_of: NaiveDate| MarkOverdue {
            as_of,
            actor: UserId::new(),
            occurred_at: ts(20, 0),
        };
        assert_eq!(engine.service.mark_overdue(&sent, check(date(12))).unwrap(), None);

        let overdue = engine.service.mark_overdue(&sent, check(date(13))).unwrap().unwrap();
        assert_eq!(overdue.status(), DocumentStatus::Overdue);

        let partial = pay(&engine, &overdue, dec!(62)).unwrap();
        assert_eq!(partial.status(), DocumentStatus::Overdue);
        assert_eq!(partial.amounts().outstanding(), dec!(1000));

        let paid = pay(&engine, &partial, dec!(1000)).unwrap();
        assert_eq!(paid.status(), DocumentStatus::Paid);
        assert_eq!(engine.service.mark_overdue(&paid, check(date(30))).unwrap(), None);
    }

    #[test]
    fn stock_is_reserved_for_production_and_released_on_cancel() {
        factoryerp_observability::init_for_tests();
        let company = CompanyId::new();
        let casting = ProductId::new();
        let engine = build_engine(
            &EngineConfig::default(),
            Arc::new(InMemoryCounterStore::new()),
            InMemoryStockReservations::new().with_available(company, casting, dec!(15)),
        );

        let big = engine
            .service
            .create_document(test_request(
                company,
                DocumentType::CustomerOrder,
                vec![LineItem::new(casting, dec!(20), dec!(40))],
            ))
            .unwrap();
        let big = step(&engine, &big, DocumentStatus::Confirmed, ts(3, 9));
        let err = engine
            .service
            .change_status(
                &big,
                ChangeStatus {
                    to: DocumentStatus::InProduction,
                    actor: UserId::new(),
                    occurred_at: ts(3, 10),
                },
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::StockReservation(_)));
        assert_eq!(
            engine.service.load(company, big.id_typed()).unwrap().status(),
            DocumentStatus::Confirmed
        );

        let small = engine
            .service
            .create_document(test_request(
                company,
                DocumentType::CustomerOrder,
                vec![LineItem::new(casting, dec!(12), dec!(40))],
            ))
            .unwrap();
        let small = step(&engine, &small, DocumentStatus::Confirmed, ts(4, 9));
        let producing = step(&engine, &small, DocumentStatus::InProduction, ts(4, 10));
        assert_eq!(engine.stock.available(company, casting), Some(dec!(3)));
        assert!(producing.stock_reservation().is_some());

        let cancelled = step(&engine, &producing, DocumentStatus::Cancelled, ts(5, 9));
        assert_eq!(cancelled.status(), DocumentStatus::Cancelled);
        assert!(cancelled.stock_reservation().is_none());
        assert_eq!(engine.stock.available(company, casting), Some(dec!(15)));
        assert_eq!(engine.stock.active_reservations(), 0);
    }

    #[test]
    fn concurrent_status_changes_commit_once() {
        let (engine, audit) = setup();
        let company = CompanyId::new();
        let po = engine
            .service
            .create_document(test_request(company, DocumentType::PurchaseOrder, vec![test_line()]))
            .unwrap();
        let po = step(&engine, &po, DocumentStatus::Sent, ts(3, 9));

        let targets = [
            DocumentStatus::Acknowledged,
            DocumentStatus::Cancelled,
            DocumentStatus::Acknowledged,
            DocumentStatus::Cancelled,
        ];
        let results: Vec<Result<FinancialDocument, DomainError>> = std::thread::scope(|s| {
            let handles: Vec<_> = targets
                .iter()
                .map(|to| {
                    let (service, po) = (&engine.service, &po);
                    s.spawn(move || {
                        service.change_status(
                            po,
                            ChangeStatus {
                                to: *to,
                                actor: UserId::new(),
                                occurred_at: ts(4, 9),
                            },
                        )
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let committed: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(committed.len(), 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(err, DomainError::ConcurrentModification(_)));
            assert!(err.is_retryable());
        }

        let stored = engine.service.load(company, po.id_typed()).unwrap();
        assert_eq!(stored.version(), po.version() + 1);
        assert_eq!(stored.status(), committed[0].status());

        // created + sent + the single winner
        assert_eq!(audit.drain().len(), 3);
    }

    #[test]
    fn configured_numbering_and_whole_unit_round_off() {
        factoryerp_observability::init_for_tests();
        let company = CompanyId::new();
        let json = format!(r#"{{"company_codes":{{"{company}":"ACME"}}}}"#);
        let config = EngineConfig::from_lookup(|key| match key {
            "FACTORYERP_NUMBERING" => Some(json.clone()),
            "FACTORYERP_GRAND_TOTAL_SCALE" => Some("0".to_string()),
            _ => None,
        })
        .unwrap();
        let engine = build_in_memory_engine(&config);

        // 3 x 33.33 = 99.99, 5% tax = 5.00 -> 104.99 rounds to 105
        let invoice = engine
            .service
            .create_document(test_request(
                company,
                DocumentType::Invoice,
                vec![LineItem::new(ProductId::new(), dec!(3), dec!(33.33)).with_tax(dec!(5), None)],
            ))
            .unwrap();

        assert_eq!(invoice.number().as_str(), "ACME/INV/2024-25/001");
        assert_eq!(invoice.amounts().grand_total, dec!(105));
        assert_eq!(invoice.amounts().rounding_adjustment, dec!(0.01));
        assert_eq!(invoice.amounts().outstanding(), dec!(105));
    }

    #[test]
    fn failed_create_leaves_no_trace() {
        let (engine, audit) = setup();
        let mut request = test_request(CompanyId::new(), DocumentType::Invoice, vec![test_line()]);
        request.dates = KeyDates::issued_on(date(10)).due_on(date(9));

        let err = engine.service.create_document(request).unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert!(engine.repository.is_empty());
        assert!(audit.drain().is_empty());
    }
}
