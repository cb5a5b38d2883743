use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use factoryerp_core::{CompanyId, DomainError, DomainResult};
use factoryerp_documents::{DocumentNumber, DocumentType, FinancialYear};

/// Prefix and zero-padding width for one document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFormat {
    pub prefix: String,
    pub width: usize,
}

impl NumberFormat {
    pub fn new(prefix: impl Into<String>, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            width,
        }
    }
}

/// Number formats per document type plus optional per-company codes.
///
/// Deserializable from JSON; omitted fields keep their defaults:
///
/// ```json
/// { "invoice": { "prefix": "INV/", "width": 5 }, "company_codes": { "<uuid>": "ACME" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberingScheme {
    pub quotation: NumberFormat,
    pub customer_order: NumberFormat,
    pub purchase_order: NumberFormat,
    pub invoice: NumberFormat,
    pub company_codes: BTreeMap<CompanyId, String>,
}

impl Default for NumberingScheme {
    fn default() -> Self {
        Self {
            quotation: NumberFormat::new("QT/", 4),
            customer_order: NumberFormat::new("SO/", 4),
            purchase_order: NumberFormat::new("PO/", 4),
            invoice: NumberFormat::new("INV/", 3),
            company_codes: BTreeMap::new(),
        }
    }
}

impl NumberingScheme {
    pub fn format_for(&self, document_type: DocumentType) -> &NumberFormat {
        match document_type {
            DocumentType::Quotation => &self.quotation,
            DocumentType::CustomerOrder => &self.customer_order,
            DocumentType::PurchaseOrder => &self.purchase_order,
            DocumentType::Invoice => &self.invoice,
        }
    }

    pub fn with_company_code(mut self, company_id: CompanyId, code: impl Into<String>) -> Self {
        self.company_codes.insert(company_id, code.into());
        self
    }

    /// Rejects empty prefixes and zero widths.
    pub fn validate(&self) -> DomainResult<()> {
        for ty in DocumentType::ALL {
            let format = self.format_for(ty);
            if format.prefix.trim().is_empty() {
                return Err(DomainError::validation(format!("{ty}: number prefix is empty")));
            }
            if format.width == 0 {
                return Err(DomainError::validation(format!("{ty}: number width must be positive")));
            }
        }
        if let Some((company, _)) = self.company_codes.iter().find(|(_, code)| code.trim().is_empty()) {
            return Err(DomainError::validation(format!("company {company}: empty company code")));
        }
        Ok(())
    }

    /// Render a number. Sequences wider than the configured width are kept whole.
    pub fn render(
        &self,
        company_id: CompanyId,
        document_type: DocumentType,
        financial_year: FinancialYear,
        sequence: u64,
    ) -> DocumentNumber {
        let format = self.format_for(document_type);
        let company = self
            .company_codes
            .get(&company_id)
            .map(|code| format!("{code}/"))
            .unwrap_or_default();
        DocumentNumber::new(format!(
            "{company}{prefix}{financial_year}/{sequence:0width$}",
            prefix = format.prefix,
            width = format.width,
        ))
    }
}
