//! # Record Mapper
//!
//! Pure, stateless translation between the Source and Target schemas.
//!
//! ## Mapping Directions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mapping Functions                                │
//! │                                                                         │
//! │  map_invoice_to_target          SourceInvoice  → TargetSalesInvoice     │
//! │    • subject       ← subject       | "Source invoice"                   │
//! │    • party_code    ← customer_code | configured default party           │
//! │    • article_code  ← product_code  | "UNKNOWN_ARTICLE"                  │
//! │    • description   ← description   | "(no description)"                 │
//! │    • line_type     ← line_type     | "Product"                          │
//! │    • unit_price    ← unit_price_net                                     │
//! │                                                                         │
//! │  map_purchase_invoice_to_source TargetPurchaseInvoice → Source row      │
//! │  map_purchase_line_to_source    TargetPurchaseInvoiceLine → Source row  │
//! │  map_payment_to_source          TargetPayment  → SourcePayment          │
//! │    • renames only, optional text coalesced to ""                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No function here can fail. Every substituted fallback on the export path
//! is reported as a [`MappingDefault`] so the caller can log it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{
    SourceInvoice, SourceInvoiceLine, SourcePayment, SourcePurchaseInvoice,
    SourcePurchaseInvoiceLine, TargetPayment, TargetPurchaseInvoice, TargetPurchaseInvoiceLine,
    TargetSalesInvoice, TargetSalesInvoiceLine,
};
use crate::IMPORTED_PURCHASE_STATUS;

// =============================================================================
// Documented Defaults
// =============================================================================

/// Subject used when a Source invoice has none.
pub const DEFAULT_SUBJECT: &str = "Source invoice";

/// Article code used when a Source line has no product.
pub const UNKNOWN_ARTICLE: &str = "UNKNOWN_ARTICLE";

/// Description used when a Source line has none.
pub const NO_DESCRIPTION: &str = "(no description)";

/// Line type used when a Source line has none.
pub const DEFAULT_LINE_TYPE: &str = "Product";

/// Party code used when neither the invoice nor the configuration names one.
pub const FALLBACK_PARTY_CODE: &str = "CLIENT_ATHENEO";

/// Run-level inputs to the export mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingDefaults {
    /// Target account charged when the Source invoice has no customer code.
    pub party_code: String,
}

impl Default for MappingDefaults {
    fn default() -> Self {
        MappingDefaults {
            party_code: FALLBACK_PARTY_CODE.to_string(),
        }
    }
}

/// A documented fallback value substituted during mapping.
///
/// Not an error: the record is still written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MappingDefault {
    Subject,
    PartyCode,
    ArticleCode { line_no: i64 },
    Description { line_no: i64 },
    LineType { line_no: i64 },
}

impl fmt::Display for MappingDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingDefault::Subject => write!(f, "subject defaulted"),
            MappingDefault::PartyCode => write!(f, "party code defaulted"),
            MappingDefault::ArticleCode { line_no } => {
                write!(f, "line {}: article code defaulted", line_no)
            }
            MappingDefault::Description { line_no } => {
                write!(f, "line {}: description defaulted", line_no)
            }
            MappingDefault::LineType { line_no } => {
                write!(f, "line {}: line type defaulted", line_no)
            }
        }
    }
}

/// Returns the trimmed value, or `None` when absent or blank.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Empty-string coalescing for optional Target text.
fn coalesce(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

// =============================================================================
// Export: Source → Target
// =============================================================================

/// Maps a Source invoice to the Target document payload.
///
/// Line count and `line_no` values are preserved exactly.
pub fn map_invoice_to_target(
    invoice: &SourceInvoice,
    defaults: &MappingDefaults,
) -> TargetSalesInvoice {
    map_invoice_to_target_traced(invoice, defaults).0
}

/// Same as [`map_invoice_to_target`], also listing every fallback it applied.
pub fn map_invoice_to_target_traced(
    invoice: &SourceInvoice,
    defaults: &MappingDefaults,
) -> (TargetSalesInvoice, Vec<MappingDefault>) {
    let mut applied = Vec::new();

    let subject = match present(&invoice.subject) {
        Some(s) => s.to_string(),
        None => {
            applied.push(MappingDefault::Subject);
            DEFAULT_SUBJECT.to_string()
        }
    };

    let party_code = match present(&invoice.customer_code) {
        Some(code) => code.to_string(),
        None => {
            applied.push(MappingDefault::PartyCode);
            defaults.party_code.clone()
        }
    };

    let lines = invoice
        .lines
        .iter()
        .map(|line| map_invoice_line(line, &mut applied))
        .collect();

    let target = TargetSalesInvoice {
        party_code,
        issue_date: invoice.issue_date,
        due_date: invoice.due_date,
        subject,
        internal_ref: invoice.chrono_ref.clone(),
        lines,
    };

    (target, applied)
}

fn map_invoice_line(
    line: &SourceInvoiceLine,
    applied: &mut Vec<MappingDefault>,
) -> TargetSalesInvoiceLine {
    let line_no = line.line_no;

    let mut or_default = |value: &Option<String>, fallback: &str, kind: MappingDefault| {
        present(value).map(str::to_string).unwrap_or_else(|| {
            applied.push(kind);
            fallback.to_string()
        })
    };

    let article_code = or_default(
        &line.product_code,
        UNKNOWN_ARTICLE,
        MappingDefault::ArticleCode { line_no },
    );
    let description = or_default(
        &line.description,
        NO_DESCRIPTION,
        MappingDefault::Description { line_no },
    );
    let line_type = or_default(
        &line.line_type,
        DEFAULT_LINE_TYPE,
        MappingDefault::LineType { line_no },
    );

    TargetSalesInvoiceLine {
        line_no,
        article_code,
        description,
        quantity: line.quantity,
        unit_price: line.unit_price_net,
        tax_rate: line.tax_rate,
        line_type,
    }
}

// =============================================================================
// Import: Target → Source
// =============================================================================

/// Deterministic internal reference for an imported purchase invoice.
///
/// Format: `{TAG}-FA-{yyyymmdd}-{invoice_number}`. The date is fixed-width,
/// so distinct `(tag, date, number)` inputs never produce the same string.
pub fn chrono_reference(source_tag: &str, issue_date: NaiveDate, invoice_number: &str) -> String {
    format!(
        "{}-FA-{}-{}",
        source_tag,
        issue_date.format("%Y%m%d"),
        invoice_number
    )
}

/// Maps a Target purchase invoice header (and its lines) to a Source row.
///
/// Header rules: status is the imported-validated code, net to pay equals the
/// TTC amount, and the Target invoice number becomes the external reference.
pub fn map_purchase_invoice_to_source(
    invoice: &TargetPurchaseInvoice,
    source_tag: &str,
) -> SourcePurchaseInvoice {
    SourcePurchaseInvoice {
        chrono_ref: chrono_reference(source_tag, invoice.issue_date, &invoice.invoice_number),
        status: IMPORTED_PURCHASE_STATUS.to_string(),
        supplier_code: invoice.supplier_code.clone(),
        supplier_name: coalesce(&invoice.supplier_name),
        supplier_ref: coalesce(&invoice.supplier_ref),
        issue_date: invoice.issue_date,
        due_date: invoice.due_date,
        label: coalesce(&invoice.label),
        total_ht: invoice.amounts.ht,
        total_tva: invoice.amounts.tva,
        total_ttc: invoice.amounts.ttc,
        net_to_pay: invoice.amounts.ttc,
        currency: coalesce(&invoice.currency),
        external_ref: invoice.invoice_number.clone(),
        lines: invoice.lines.iter().map(map_purchase_line_to_source).collect(),
    }
}

/// Maps one Target purchase line; the unit price feeds both gross and net.
pub fn map_purchase_line_to_source(line: &TargetPurchaseInvoiceLine) -> SourcePurchaseInvoiceLine {
    SourcePurchaseInvoiceLine {
        line_no: line.line_no,
        line_type: coalesce(&line.line_type),
        article_code: coalesce(&line.article_code),
        designation: coalesce(&line.designation),
        quantity: line.quantity,
        unit_price_gross: line.unit_price_ht,
        unit_price_net: line.unit_price_ht,
        total_ht: line.amount_ht,
        tax_rate: line.tax_rate,
        total_tva: line.amount_tva,
        total_ttc: line.amount_ttc,
        account_code: coalesce(&line.account_code),
        cost_center: coalesce(&line.cost_center),
    }
}

pub fn map_payment_to_source(payment: &TargetPayment) -> SourcePayment {
    SourcePayment {
        payment_number: payment.payment_number.clone(),
        invoice_number: coalesce(&payment.invoice_number),
        party_code: payment.party_code.clone(),
        party_name: coalesce(&payment.party_name),
        payment_date: payment.payment_date,
        amount: payment.amount,
        method: coalesce(&payment.method),
        reference: coalesce(&payment.reference),
        account_code: coalesce(&payment.account_code),
        journal: coalesce(&payment.journal),
        entry_number: coalesce(&payment.entry_number),
        kind: payment.kind,
        status: coalesce(&payment.status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::{Money, TaxRate};
    use crate::types::{InvoiceTotals, PaymentKind, PurchaseAmounts};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn source_line(line_no: i64, product_code: Option<&str>) -> SourceInvoiceLine {
        SourceInvoiceLine {
            line_no,
            line_type: None,
            product_code: product_code.map(String::from),
            description: Some(format!("Line {}", line_no)),
            tax_rate: TaxRate::from_bps(2000),
            quantity: 2.0,
            unit_price_gross: Money::from_cents(1200),
            unit_price_net: Money::from_cents(1000),
            total_net: Money::from_cents(2000),
            total_ht: Money::from_cents(2000),
        }
    }

    fn source_invoice(lines: Vec<SourceInvoiceLine>) -> SourceInvoice {
        SourceInvoice {
            id: 7,
            chrono_ref: "FV-2024-0007".into(),
            status: "VALID".into(),
            customer_code: None,
            issue_date: date(2024, 1, 15),
            due_date: Some(date(2024, 2, 15)),
            totals: InvoiceTotals::default(),
            subject: None,
            lines,
        }
    }

    #[test]
    fn test_missing_subject_and_product_use_documented_defaults() {
        let invoice = source_invoice(vec![source_line(1, None)]);
        let target = map_invoice_to_target(&invoice, &MappingDefaults::default());

        assert_eq!(target.subject, DEFAULT_SUBJECT);
        assert_eq!(target.lines[0].article_code, UNKNOWN_ARTICLE);
        assert_eq!(target.lines[0].line_type, DEFAULT_LINE_TYPE);
        assert_eq!(target.internal_ref, "FV-2024-0007");
        assert_eq!(target.lines[0].unit_price.cents(), 1000);
    }

    #[test]
    fn test_line_count_and_numbers_preserved() {
        let invoice = source_invoice(vec![
            source_line(3, Some("A")),
            source_line(1, Some("B")),
            source_line(10, Some("C")),
        ]);
        let target = map_invoice_to_target(&invoice, &MappingDefaults::default());

        let numbers: Vec<i64> = target.lines.iter().map(|l| l.line_no).collect();
        assert_eq!(numbers, vec![3, 1, 10]);
        let codes: Vec<&str> = target.lines.iter().map(|l| l.article_code.as_str()).collect();
        assert_eq!(codes, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_party_code_prefers_customer_code() {
        let mut invoice = source_invoice(vec![]);
        let defaults = MappingDefaults {
            party_code: "DIVERS".into(),
        };

        let (target, applied) = map_invoice_to_target_traced(&invoice, &defaults);
        assert_eq!(target.party_code, "DIVERS");
        assert!(applied.contains(&MappingDefault::PartyCode));

        invoice.customer_code = Some("C00042".into());
        let (target, applied) = map_invoice_to_target_traced(&invoice, &defaults);
        assert_eq!(target.party_code, "C00042");
        assert!(!applied.contains(&MappingDefault::PartyCode));
    }

    #[test]
    fn test_blank_text_counts_as_absent() {
        let mut line = source_line(1, Some("   "));
        line.description = Some(String::new());
        let invoice = source_invoice(vec![line]);

        let (target, applied) = map_invoice_to_target_traced(&invoice, &MappingDefaults::default());
        assert_eq!(target.lines[0].article_code, UNKNOWN_ARTICLE);
        assert_eq!(target.lines[0].description, NO_DESCRIPTION);
        assert!(applied.contains(&MappingDefault::ArticleCode { line_no: 1 }));
        assert!(applied.contains(&MappingDefault::Description { line_no: 1 }));
    }

    #[test]
    fn test_chrono_reference_is_deterministic() {
        let a = chrono_reference("SAGE", date(2024, 1, 5), "F123");
        let b = chrono_reference("SAGE", date(2024, 1, 5), "F123");
        assert_eq!(a, "SAGE-FA-20240105-F123");
        assert_eq!(a, b);
        assert_ne!(a, chrono_reference("SAGE", date(2024, 1, 6), "F123"));
    }

    #[test]
    fn test_purchase_invoice_header_rules() {
        let invoice = TargetPurchaseInvoice {
            invoice_number: "FA-881".into(),
            supplier_ref: None,
            supplier_code: "F0001".into(),
            supplier_name: Some("Acme".into()),
            issue_date: date(2024, 1, 20),
            due_date: None,
            label: None,
            amounts: PurchaseAmounts {
                ht: Money::from_cents(10_000),
                tva: Money::from_cents(2_000),
                ttc: Money::from_cents(12_000),
            },
            currency: Some("EUR".into()),
            status: None,
            internal_ref: None,
            lines: vec![TargetPurchaseInvoiceLine {
                line_no: 4,
                line_type: None,
                article_code: Some("ART".into()),
                designation: None,
                quantity: 1.0,
                unit_price_ht: Money::from_cents(10_000),
                amount_ht: Money::from_cents(10_000),
                tax_rate: TaxRate::from_bps(2000),
                amount_tva: Money::from_cents(2_000),
                amount_ttc: Money::from_cents(12_000),
                account_code: Some("607000".into()),
                cost_center: None,
            }],
        };

        let row = map_purchase_invoice_to_source(&invoice, "SAGE");
        assert_eq!(row.chrono_ref, "SAGE-FA-20240120-FA-881");
        assert_eq!(row.status, IMPORTED_PURCHASE_STATUS);
        assert_eq!(row.net_to_pay, row.total_ttc);
        assert_eq!(row.external_ref, "FA-881");
        assert_eq!(row.supplier_ref, "");
        assert_eq!(row.lines[0].line_no, 4);
        assert_eq!(row.lines[0].unit_price_gross, row.lines[0].unit_price_net);
        assert_eq!(row.lines[0].designation, "");
    }

    #[test]
    fn test_payment_renames_and_coalesces() {
        let payment = TargetPayment {
            payment_number: "RG-1".into(),
            invoice_number: None,
            party_code: "C1".into(),
            party_name: Some("Client One".into()),
            payment_date: date(2024, 1, 10),
            amount: Money::from_cents(4_250),
            method: Some("VIR".into()),
            reference: None,
            account_code: Some("411000".into()),
            journal: Some("BQ1".into()),
            entry_number: None,
            kind: PaymentKind::Customer,
            status: None,
        };

        let row = map_payment_to_source(&payment);
        assert_eq!(row.payment_number, "RG-1");
        assert_eq!(row.invoice_number, "");
        assert_eq!(row.party_name, "Client One");
        assert_eq!(row.amount.cents(), 4_250);
        assert_eq!(row.kind, PaymentKind::Customer);
        assert_eq!(row.entry_number, "");
    }
}
