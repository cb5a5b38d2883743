use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use factoryerp_core::{DomainError, DomainResult};

use crate::line_item::TaxComponentKind;

/// Document-level total of one tax component across all lines.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxTotal {
    pub kind: TaxComponentKind,
    pub amount: Decimal,
}

/// Payment position of an invoice.
///
/// Invariant: `outstanding == grand_total - paid` and `outstanding >= 0`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Settlement {
    pub paid: Decimal,
    pub outstanding: Decimal,
}

impl Settlement {
    /// Nothing paid yet.
    pub fn unpaid(grand_total: Decimal) -> Self {
        Self {
            paid: Decimal::ZERO,
            outstanding: grand_total,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.outstanding.is_zero()
    }
}

/// Aggregate amounts of a document's line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountSummary {
    pub subtotal: Decimal,
    pub total_discount: Decimal,
    pub taxable_amount: Decimal,
    pub total_tax: Decimal,
    pub rounding_adjustment: Decimal,
    pub grand_total: Decimal,
    pub tax_breakup: Vec<TaxTotal>,
    /// Present on invoices only.
    #[serde(default)]
    pub settlement: Option<Settlement>,
}

impl AmountSummary {
    /// Attach an invoice settlement carrying `paid` forward onto these totals.
    ///
    /// Fails when the new grand total would fall below what has already been paid.
    pub fn settled_against(mut self, paid: Decimal) -> DomainResult<Self> {
        if paid > self.grand_total {
            return Err(DomainError::validation(format!(
                "grand total {} is below the amount already paid ({paid})",
                self.grand_total
            )));
        }
        self.settlement = Some(Settlement {
            paid,
            outstanding: self.grand_total - paid,
        });
        Ok(self)
    }

    pub fn paid(&self) -> Decimal {
        self.settlement.map(|s| s.paid).unwrap_or(Decimal::ZERO)
    }

    pub fn outstanding(&self) -> Decimal {
        self.settlement.map(|s| s.outstanding).unwrap_or(Decimal::ZERO)
    }

    /// Checks both amount identities (and the settlement identity when present).
    pub fn is_consistent(&self) -> bool {
        let totals = self.taxable_amount == self.subtotal - self.total_discount
            && self.grand_total == self.taxable_amount + self.total_tax + self.rounding_adjustment;
        let settlement = match self.settlement {
            Some(s) => s.outstanding >= Decimal::ZERO && s.outstanding == self.grand_total - s.paid,
            None => true,
        };
        totals && settlement
    }
}
