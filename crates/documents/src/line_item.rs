use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use factoryerp_core::ProductId;

/// How a line discount is expressed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    /// `value` is a percentage of the line's gross amount.
    Percentage,
    /// `value` is a money amount taken off the gross amount.
    Absolute,
}

/// Discount applied to one line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Discount {
    pub kind: DiscountKind,
    pub value: Decimal,
}

impl Discount {
    pub fn none() -> Self {
        Self::absolute(Decimal::ZERO)
    }

    pub fn percentage(value: Decimal) -> Self {
        Self {
            kind: DiscountKind::Percentage,
            value,
        }
    }

    pub fn absolute(value: Decimal) -> Self {
        Self {
            kind: DiscountKind::Absolute,
            value,
        }
    }
}

impl Default for Discount {
    fn default() -> Self {
        Self::none()
    }
}

/// Place-of-supply flag deciding how a line's tax is broken up.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceOfSupply {
    /// Two co-equal components (central + state).
    IntraState,
    /// One integrated component.
    InterState,
}

/// Named tax component of a breakup.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxComponentKind {
    Cgst,
    Sgst,
    Igst,
}

/// One component of a tax breakup.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxComponent {
    pub kind: TaxComponentKind,
    /// Percent applied for this component.
    pub rate: Decimal,
    pub amount: Decimal,
}

/// One priced unit within a document.
///
/// Amounts derived from a line (taxable amount, tax, total) are never stored on
/// the line; they are recomputed by the calculator whenever needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub description: Option<String>,
    pub quantity: Decimal,
    /// Unit rate in currency units.
    pub rate: Decimal,
    #[serde(default)]
    pub discount: Discount,
    /// Tax rate in percent (e.g. `18` for 18 %).
    pub tax_rate: Decimal,
    /// `None` means the tax is not broken up into components.
    #[serde(default)]
    pub supply: Option<PlaceOfSupply>,
}

impl LineItem {
    /// A line without discount, tax or breakup.
    pub fn new(product_id: ProductId, quantity: Decimal, rate: Decimal) -> Self {
        Self {
            product_id,
            description: None,
            quantity,
            rate,
            discount: Discount::none(),
            tax_rate: Decimal::ZERO,
            supply: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_discount(mut self, discount: Discount) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_tax(mut self, tax_rate: Decimal, supply: Option<PlaceOfSupply>) -> Self {
        self.tax_rate = tax_rate;
        self.supply = supply;
        self
    }
}
