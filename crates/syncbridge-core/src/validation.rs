//! # Validation Module
//!
//! Checks a pulled Target record before it enters its write transaction.
//!
//! ## Where Validation Sits
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Import Record Pipeline                             │
//! │                                                                         │
//! │  TargetGateway pull ──► validate_* (THIS MODULE) ──► mapper ──► upsert │
//! │                              │                                          │
//! │                              └── Err → counted as failed, no tx opened │
//! │                                                                         │
//! │  The Source schema enforces the same rules (NOT NULL, UNIQUE); failing │
//! │  here gives a readable message instead of a constraint error.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{TargetPayment, TargetPurchaseInvoice};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Widest natural key the Source columns accept.
pub const MAX_KEY_LEN: usize = 50;

/// Validates a natural-key field: non-blank and at most [`MAX_KEY_LEN`] chars.
///
/// ## Example
/// ```rust
/// use syncbridge_core::validation::validate_key;
///
/// assert!(validate_key("invoice_number", "FA-001").is_ok());
/// assert!(validate_key("invoice_number", "  ").is_err());
/// ```
pub fn validate_key(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_KEY_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_KEY_LEN,
        });
    }

    Ok(())
}

/// Validates a pulled purchase invoice.
///
/// ## Rules
/// - `invoice_number` and `supplier_code` are valid keys
/// - line numbers are unique within the invoice
pub fn validate_purchase_invoice(invoice: &TargetPurchaseInvoice) -> ValidationResult<()> {
    validate_key("invoice_number", &invoice.invoice_number)?;
    validate_key("supplier_code", &invoice.supplier_code)?;

    let mut seen = HashSet::with_capacity(invoice.lines.len());
    for line in &invoice.lines {
        if !seen.insert(line.line_no) {
            return Err(ValidationError::DuplicateLineNo {
                line_no: line.line_no,
            });
        }
    }

    Ok(())
}

/// Validates a pulled payment: `payment_number` and `party_code` are valid keys.
pub fn validate_payment(payment: &TargetPayment) -> ValidationResult<()> {
    validate_key("payment_number", &payment.payment_number)?;
    validate_key("party_code", &payment.party_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::{Money, TaxRate};
    use crate::types::{PaymentKind, PurchaseAmounts, TargetPurchaseInvoiceLine};
    use chrono::NaiveDate;

    fn line(line_no: i64) -> TargetPurchaseInvoiceLine {
        TargetPurchaseInvoiceLine {
            line_no,
            line_type: None,
            article_code: None,
            designation: None,
            quantity: 1.0,
            unit_price_ht: Money::zero(),
            amount_ht: Money::zero(),
            tax_rate: TaxRate::zero(),
            amount_tva: Money::zero(),
            amount_ttc: Money::zero(),
            account_code: None,
            cost_center: None,
        }
    }

    fn invoice(number: &str, lines: Vec<TargetPurchaseInvoiceLine>) -> TargetPurchaseInvoice {
        TargetPurchaseInvoice {
            invoice_number: number.into(),
            supplier_ref: None,
            supplier_code: "F01".into(),
            supplier_name: None,
            issue_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            due_date: None,
            label: None,
            amounts: PurchaseAmounts::default(),
            currency: None,
            status: None,
            internal_ref: None,
            lines,
        }
    }

    #[test]
    fn test_key_rules() {
        assert!(validate_key("k", "A").is_ok());
        assert_eq!(
            validate_key("k", "").unwrap_err(),
            ValidationError::Required { field: "k".into() }
        );
        assert!(validate_key("k", &"X".repeat(MAX_KEY_LEN + 1)).is_err());
    }

    #[test]
    fn test_purchase_invoice_rejects_duplicate_lines() {
        assert!(validate_purchase_invoice(&invoice("FA-1", vec![line(1), line(2)])).is_ok());
        assert_eq!(
            validate_purchase_invoice(&invoice("FA-1", vec![line(1), line(1)])).unwrap_err(),
            ValidationError::DuplicateLineNo { line_no: 1 }
        );
        assert!(validate_purchase_invoice(&invoice(" ", vec![])).is_err());
    }

    #[test]
    fn test_payment_requires_party() {
        let mut payment = TargetPayment {
            payment_number: "RG-1".into(),
            invoice_number: None,
            party_code: String::new(),
            party_name: None,
            payment_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            amount: Money::from_cents(100),
            method: None,
            reference: None,
            account_code: None,
            journal: None,
            entry_number: None,
            kind: PaymentKind::Supplier,
            status: None,
        };
        assert!(validate_payment(&payment).is_err());
        payment.party_code = "F01".into();
        assert!(validate_payment(&payment).is_ok());
    }
}
