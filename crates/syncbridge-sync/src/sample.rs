//! # Dry-Run Sample Data
//!
//! Records the gateway returns instead of querying the Target when a run is
//! simulated. Dates are relative to the run day so the samples always fall
//! inside the default lookback windows, except one of each kind that is
//! dated a year back and must be filtered out.

use chrono::{Days, NaiveDate};

use syncbridge_core::{Money, TaxRate};

use crate::protocol::{LedgerEntry, RemoteDocument, RemoteDocumentLine};

fn days_ago(today: NaiveDate, days: u64) -> NaiveDate {
    today.checked_sub_days(Days::new(days)).unwrap_or(today)
}

fn line(line_no: i64, article: &str, designation: &str, qty: f64, unit_cents: i64, bps: u32) -> RemoteDocumentLine {
    let ht = Money::from_cents((unit_cents as f64 * qty).round() as i64);
    let rate = TaxRate::from_bps(bps);
    let tva = ht.calculate_tax(rate);

    RemoteDocumentLine {
        line_no,
        line_type: Some("Product".into()),
        article_code: Some(article.into()),
        designation: Some(designation.into()),
        quantity: qty,
        unit_price_ht: Money::from_cents(unit_cents),
        amount_ht: ht,
        tax_rate: rate,
        amount_tva: tva,
        amount_ttc: ht + tva,
        account_code: Some("607000".into()),
        cost_center: None,
    }
}

fn document(number: &str, supplier: &str, date: NaiveDate, lines: Vec<RemoteDocumentLine>) -> RemoteDocument {
    let ht: Money = lines.iter().map(|l| l.amount_ht).sum();
    let tva: Money = lines.iter().map(|l| l.amount_tva).sum();

    RemoteDocument {
        number: number.into(),
        supplier_ref: Some(format!("{}-REF", number)),
        supplier_code: supplier.into(),
        supplier_name: None,
        date,
        due_date: date.checked_add_days(Days::new(30)),
        label: Some(format!("Purchase {}", number)),
        total_ht: ht,
        total_tva: tva,
        total_ttc: ht + tva,
        currency: Some("EUR".into()),
        status: None,
        internal_ref: None,
        lines,
    }
}

/// Purchase documents for a simulated `ListDocuments` call.
pub fn purchase_documents(today: NaiveDate) -> Vec<RemoteDocument> {
    vec![
        document(
            "FA-DRY-001",
            "F0001",
            days_ago(today, 2),
            vec![
                line(1, "PAPER-A4", "Paper A4 box", 10.0, 2_450, 2000),
                line(2, "TONER-K", "Black toner", 2.0, 6_990, 2000),
            ],
        ),
        document(
            "FA-DRY-002",
            "F0002",
            days_ago(today, 5),
            vec![line(1, "SRV-CLEAN", "Office cleaning", 1.0, 38_000, 1000)],
        ),
        // Outside every configurable default window.
        document(
            "FA-DRY-OLD",
            "F0001",
            days_ago(today, 400),
            vec![line(1, "PAPER-A4", "Paper A4 box", 1.0, 2_450, 2000)],
        ),
    ]
}

fn entry(number: &str, party: &str, kind: &str, date: NaiveDate, cents: i64) -> LedgerEntry {
    LedgerEntry {
        number: number.into(),
        invoice_number: Some(format!("INV-{}", number)),
        party_code: party.into(),
        party_name: None,
        date,
        amount: Money::from_cents(cents),
        method: Some("Virement".into()),
        reference: None,
        account_code: Some("512000".into()),
        journal: Some("BQ1".into()),
        entry_number: None,
        kind: kind.into(),
        status: None,
    }
}

/// Ledger entries for a simulated `ListLedgerEntries` call.
pub fn ledger_entries(today: NaiveDate) -> Vec<LedgerEntry> {
    vec![
        entry("RG-DRY-001", "C0001", "Client", days_ago(today, 1), 12_000),
        entry("RG-DRY-002", "F0001", "Fournisseur", days_ago(today, 3), 40_900),
        entry("RG-DRY-OLD", "C0002", "Client", days_ago(today, 400), 5_000),
    ]
}
