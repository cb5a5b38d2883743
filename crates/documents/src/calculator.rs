//! Line-item amount calculator.
//!
//! Pure and deterministic: the same items and policy always produce the same
//! amounts, so a document's summary can be recomputed at any time.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use factoryerp_core::{DomainError, DomainResult};

use crate::line_item::{DiscountKind, LineItem, PlaceOfSupply, TaxComponent, TaxComponentKind};
use crate::summary::{AmountSummary, TaxTotal};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Rounding applied to every document type alike.
///
/// Amounts are always rounded half-up (away from zero) to the nearest unit of
/// the given scale; nothing is truncated. `grand_total_scale` below
/// `amount_scale` produces a non-zero rounding adjustment (whole-unit round-off
/// with `0`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoundingPolicy {
    pub amount_scale: u32,
    pub grand_total_scale: u32,
}

impl RoundingPolicy {
    pub fn round_amount(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(self.amount_scale, RoundingStrategy::MidpointAwayFromZero)
    }

    pub fn round_grand_total(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(
            self.grand_total_scale.min(self.amount_scale),
            RoundingStrategy::MidpointAwayFromZero,
        )
    }
}

impl Default for RoundingPolicy {
    fn default() -> Self {
        Self {
            amount_scale: 2,
            grand_total_scale: 2,
        }
    }
}

/// Amounts derived from a single line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub gross: Decimal,
    pub discount_amount: Decimal,
    pub taxable_amount: Decimal,
    pub tax_amount: Decimal,
    pub line_total: Decimal,
    pub tax_breakup: Vec<TaxComponent>,
}

/// Stateless calculator turning line items into taxed, discounted, rounded amounts.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct LineItemCalculator {
    policy: RoundingPolicy,
}

impl LineItemCalculator {
    pub fn new(policy: RoundingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RoundingPolicy {
        self.policy
    }

    pub fn compute_line(&self, item: &LineItem) -> DomainResult<LineAmounts> {
        validate(item)?;

        let gross = self.policy.round_amount(checked_mul(item.quantity, item.rate)?);

        let discount_amount = match item.discount.kind {
            DiscountKind::Percentage => {
                if item.discount.value > HUNDRED {
                    return Err(DomainError::invalid_line_item(format!(
                        "discount of {}% exceeds the gross amount",
                        item.discount.value
                    )));
                }
                self.percent_of(gross, item.discount.value)?
            }
            DiscountKind::Absolute => self.policy.round_amount(item.discount.value),
        };
        if discount_amount > gross {
            return Err(DomainError::invalid_line_item(format!(
                "discount {discount_amount} exceeds gross amount {gross}"
            )));
        }

        let taxable_amount = gross - discount_amount;
        let tax_breakup = self.tax_breakup(taxable_amount, item.tax_rate, item.supply)?;
        let tax_amount = match item.supply {
            Some(_) => tax_breakup
                .iter()
                .try_fold(Decimal::ZERO, |sum, c| checked_add(sum, c.amount))?,
            None => self.percent_of(taxable_amount, item.tax_rate)?,
        };

        Ok(LineAmounts {
            gross,
            discount_amount,
            taxable_amount,
            tax_amount,
            line_total: checked_add(taxable_amount, tax_amount)?,
            tax_breakup,
        })
    }

    pub fn compute_document(&self, items: &[LineItem]) -> DomainResult<AmountSummary> {
        if items.is_empty() {
            return Err(DomainError::EmptyDocument);
        }

        let mut subtotal = Decimal::ZERO;
        let mut total_discount = Decimal::ZERO;
        let mut taxable_amount = Decimal::ZERO;
        let mut total_tax = Decimal::ZERO;
        let mut components: BTreeMap<TaxComponentKind, Decimal> = BTreeMap::new();

        for (idx, item) in items.iter().enumerate() {
            let line = self.compute_line(item).map_err(|e| match e {
                DomainError::InvalidLineItem(msg) => {
                    DomainError::invalid_line_item(format!("line {}: {msg}", idx + 1))
                }
                other => other,
            })?;

            subtotal = checked_add(subtotal, line.gross)?;
            total_discount = checked_add(total_discount, line.discount_amount)?;
            taxable_amount = checked_add(taxable_amount, line.taxable_amount)?;
            total_tax = checked_add(total_tax, line.tax_amount)?;
            for component in &line.tax_breakup {
                let total = components.entry(component.kind).or_default();
                *total = checked_add(*total, component.amount)?;
            }
        }

        let unrounded = checked_add(taxable_amount, total_tax)?;
        let grand_total = self.policy.round_grand_total(unrounded);
        let rounding_adjustment = grand_total.checked_sub(unrounded).ok_or_else(overflow)?;

        Ok(AmountSummary {
            subtotal,
            total_discount,
            taxable_amount,
            total_tax,
            rounding_adjustment,
            grand_total,
            tax_breakup: components
                .into_iter()
                .map(|(kind, amount)| TaxTotal { kind, amount })
                .collect(),
            settlement: None,
        })
    }

    fn tax_breakup(
        &self,
        taxable: Decimal,
        tax_rate: Decimal,
        supply: Option<PlaceOfSupply>,
    ) -> DomainResult<Vec<TaxComponent>> {
        let components = match supply {
            None => Vec::new(),
            Some(PlaceOfSupply::InterState) => vec![TaxComponent {
                kind: TaxComponentKind::Igst,
                rate: tax_rate,
                amount: self.percent_of(taxable, tax_rate)?,
            }],
            Some(PlaceOfSupply::IntraState) => {
                let half_rate = tax_rate / Decimal::TWO;
                let half = self.percent_of(taxable, half_rate)?;
                vec![
                    TaxComponent {
                        kind: TaxComponentKind::Cgst,
                        rate: half_rate,
                        amount: half,
                    },
                    TaxComponent {
                        kind: TaxComponentKind::Sgst,
                        rate: half_rate,
                        amount: half,
                    },
                ]
            }
        };
        Ok(components)
    }

    fn percent_of(&self, amount: Decimal, percent: Decimal) -> DomainResult<Decimal> {
        let value = checked_mul(amount, percent)?
            .checked_div(HUNDRED)
            .ok_or_else(overflow)?;
        Ok(self.policy.round_amount(value))
    }
}

fn overflow() -> DomainError {
    DomainError::invalid_line_item("amount overflow")
}

fn checked_mul(a: Decimal, b: Decimal) -> DomainResult<Decimal> {
    a.checked_mul(b).ok_or_else(overflow)
}

fn checked_add(a: Decimal, b: Decimal) -> DomainResult<Decimal> {
    a.checked_add(b).ok_or_else(overflow)
}

fn validate(item: &LineItem) -> DomainResult<()> {
    if item.quantity <= Decimal::ZERO {
        return Err(DomainError::invalid_line_item("quantity must be positive"));
    }
    if item.rate < Decimal::ZERO {
        return Err(DomainError::invalid_line_item("rate must not be negative"));
    }
    if item.discount.value < Decimal::ZERO {
        return Err(DomainError::invalid_line_item("discount must not be negative"));
    }
    if item.tax_rate < Decimal::ZERO {
        return Err(DomainError::invalid_line_item("tax rate must not be negative"));
    }
    Ok(())
}
