use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use factoryerp_core::{CompanyId, DocumentId, DomainError, DomainResult, ProductId};
use factoryerp_documents::{LineItem, ReservationToken};
use factoryerp_lifecycle::StockReservations;

#[derive(Debug, Clone)]
struct Reservation {
    document_id: DocumentId,
    quantities: BTreeMap<ProductId, Decimal>,
}

#[derive(Debug, Default)]
struct Ledger {
    /// Products with a tracked balance; anything absent is unconstrained.
    available: HashMap<(CompanyId, ProductId), Decimal>,
    reservations: HashMap<ReservationToken, (CompanyId, Reservation)>,
}

/// In-memory stock reservations for tests/dev.
///
/// A reservation covers every line of an order at once: either all tracked
/// products have enough available quantity, or nothing is reserved.
#[derive(Debug, Default)]
pub struct InMemoryStockReservations {
    ledger: Mutex<Ledger>,
}

impl InMemoryStockReservations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `product` for `company` with `quantity` available.
    pub fn with_available(self, company_id: CompanyId, product_id: ProductId, quantity: Decimal) -> Self {
        if let Ok(mut ledger) = self.ledger.lock() {
            ledger.available.insert((company_id, product_id), quantity);
        }
        self
    }

    pub fn available(&self, company_id: CompanyId, product_id: ProductId) -> Option<Decimal> {
        self.ledger
            .lock()
            .ok()
            .and_then(|l| l.available.get(&(company_id, product_id)).copied())
    }

    pub fn active_reservations(&self) -> usize {
        self.ledger.lock().map(|l| l.reservations.len()).unwrap_or(0)
    }

    /// Document an active reservation belongs to.
    pub fn reserved_for(&self, token: &ReservationToken) -> Option<DocumentId> {
        self.ledger
            .lock()
            .ok()
            .and_then(|l| l.reservations.get(token).map(|(_, r)| r.document_id))
    }
}

impl StockReservations for InMemoryStockReservations {
    fn reserve(
        &self,
        company_id: CompanyId,
        document_id: DocumentId,
        lines: &[LineItem],
    ) -> DomainResult<ReservationToken> {
        let mut quantities: BTreeMap<ProductId, Decimal> = BTreeMap::new();
        for line in lines {
            *quantities.entry(line.product_id).or_default() += line.quantity;
        }

        let mut ledger = self
            .ledger
            .lock()
            .map_err(|_| DomainError::stock_reservation("stock ledger lock poisoned"))?;

        for (product_id, quantity) in &quantities {
            if let Some(available) = ledger.available.get(&(company_id, *product_id)) {
                if available < quantity {
                    return Err(DomainError::stock_reservation(format!(
                        "product {product_id}: requested {quantity}, available {available}"
                    )));
                }
            }
        }
        for (product_id, quantity) in &quantities {
            if let Some(available) = ledger.available.get_mut(&(company_id, *product_id)) {
                *available -= *quantity;
            }
        }

        let token = ReservationToken::new(format!("rsv-{}", Uuid::now_v7()));
        ledger.reservations.insert(
            token.clone(),
            (
                company_id,
                Reservation {
                    document_id,
                    quantities,
                },
            ),
        );
        debug!(%document_id, token = %token, "stock reserved");
        Ok(token)
    }

    /// Releasing an unknown or already released token is a no-op.
    fn release(&self, token: &ReservationToken) -> DomainResult<()> {
        let mut ledger = self
            .ledger
            .lock()
            .map_err(|_| DomainError::stock_reservation("stock ledger lock poisoned"))?;

        let Some((company_id, reservation)) = ledger.reservations.remove(token) else {
            debug!(token = %token, "release of unknown reservation ignored");
            return Ok(());
        };
        for (product_id, quantity) in reservation.quantities {
            if let Some(available) = ledger.available.get_mut(&(company_id, product_id)) {
                *available += quantity;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn reserve_and_release_restore_availability() {
        let company = CompanyId::new();
        let bolt = ProductId::new();
        let stock = InMemoryStockReservations::new().with_available(company, bolt, dec!(10));
        let lines = vec![
            LineItem::new(bolt, dec!(4), dec!(1)),
            LineItem::new(bolt, dec!(3), dec!(1)),
        ];

        let token = stock.reserve(company, DocumentId::new(), &lines).unwrap();
        assert_eq!(stock.available(company, bolt), Some(dec!(3)));
        assert_eq!(stock.active_reservations(), 1);

        stock.release(&token).unwrap();
        assert_eq!(stock.available(company, bolt), Some(dec!(10)));

        // second release is a no-op
        stock.release(&token).unwrap();
        assert_eq!(stock.available(company, bolt), Some(dec!(10)));
    }

    #[test]
    fn shortage_reserves_nothing() {
        let company = CompanyId::new();
        let (bolt, nut) = (ProductId::new(), ProductId::new());
        let stock = InMemoryStockReservations::new()
            .with_available(company, bolt, dec!(10))
            .with_available(company, nut, dec!(1));
        let lines = vec![
            LineItem::new(bolt, dec!(5), dec!(1)),
            LineItem::new(nut, dec!(2), dec!(1)),
        ];

        let err = stock.reserve(company, DocumentId::new(), &lines).unwrap_err();

        assert!(matches!(err, DomainError::StockReservation(_)));
        assert_eq!(stock.available(company, bolt), Some(dec!(10)));
        assert_eq!(stock.active_reservations(), 0);
    }

    #[test]
    fn untracked_products_are_unconstrained() {
        let stock = InMemoryStockReservations::new();
        let document_id = DocumentId::new();
        let token = stock
            .reserve(
                CompanyId::new(),
                document_id,
                &[LineItem::new(ProductId::new(), dec!(1000), dec!(1))],
            )
            .unwrap();
        assert_eq!(stock.reserved_for(&token), Some(document_id));
    }
}
