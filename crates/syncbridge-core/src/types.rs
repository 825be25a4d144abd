//! # Record Types
//!
//! Every record that flows through the bridge, grouped by the side that owns it.
//!
//! ## Record Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Record Directions                               │
//! │                                                                         │
//! │  EXPORT (Source → Target)                                              │
//! │  SourceInvoice ──map──► TargetSalesInvoice ──push──► Target document   │
//! │        ▲                                                    │           │
//! │        └────────────── OutcomeStatus (OK / KO) ◄────────────┘           │
//! │                                                                         │
//! │  IMPORT (Target → Source)                                              │
//! │  TargetPurchaseInvoice ──map──► SourcePurchaseInvoice ──upsert──► DB   │
//! │  TargetPayment         ──map──► SourcePayment         ──upsert──► DB   │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                                   UpsertOutcome {id, Inserted|Updated} │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records carry no identity beyond their natural keys: invoice id on the
//! export side, chrono reference for purchase invoices, and
//! `(payment_number, kind)` for payments.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, TaxRate};

// =============================================================================
// Source Sales Invoice (export input)
// =============================================================================

/// Header totals of a Source sales invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub ht: Money,
    pub ttc: Money,
    pub net_to_pay: Money,
}

/// A sales invoice pending export, as read from the Source store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInvoice {
    /// Source primary key.
    pub id: i64,

    /// Source-side chrono number (e.g. "FV-2024-0001").
    pub chrono_ref: String,

    pub status: String,

    /// Counterpart customer account, when the Source knows it.
    pub customer_code: Option<String>,

    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub totals: InvoiceTotals,
    pub subject: Option<String>,

    /// Lines in `line_no` order.
    pub lines: Vec<SourceInvoiceLine>,
}

/// One line of a Source sales invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInvoiceLine {
    pub line_no: i64,
    pub line_type: Option<String>,
    pub product_code: Option<String>,
    pub description: Option<String>,
    pub tax_rate: TaxRate,
    pub quantity: f64,
    pub unit_price_gross: Money,
    pub unit_price_net: Money,
    pub total_net: Money,
    pub total_ht: Money,
}

// =============================================================================
// Target Sales Invoice (export payload)
// =============================================================================

/// The document pushed to the Target system for one Source invoice.
///
/// Built fresh per run by the mapper and never persisted locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSalesInvoice {
    pub party_code: String,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub subject: String,

    /// Source chrono number, echoed so the document can be traced back.
    pub internal_ref: String,

    pub lines: Vec<TargetSalesInvoiceLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSalesInvoiceLine {
    /// Copied unchanged from the Source line.
    pub line_no: i64,
    pub article_code: String,
    pub description: String,
    pub quantity: f64,
    pub unit_price: Money,
    pub tax_rate: TaxRate,
    pub line_type: String,
}

// =============================================================================
// Target Purchase Invoice (import input)
// =============================================================================

/// Header amounts of a purchase invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PurchaseAmounts {
    pub ht: Money,
    pub tva: Money,
    pub ttc: Money,
}

/// A supplier invoice as pulled from the Target system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPurchaseInvoice {
    pub invoice_number: String,
    pub supplier_ref: Option<String>,
    pub supplier_code: String,
    pub supplier_name: Option<String>,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub label: Option<String>,
    pub amounts: PurchaseAmounts,
    pub currency: Option<String>,
    pub status: Option<String>,
    pub internal_ref: Option<String>,
    pub lines: Vec<TargetPurchaseInvoiceLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPurchaseInvoiceLine {
    pub line_no: i64,
    pub line_type: Option<String>,
    pub article_code: Option<String>,
    pub designation: Option<String>,
    pub quantity: f64,
    pub unit_price_ht: Money,
    pub amount_ht: Money,
    pub tax_rate: TaxRate,
    pub amount_tva: Money,
    pub amount_ttc: Money,
    pub account_code: Option<String>,
    pub cost_center: Option<String>,
}

// =============================================================================
// Target Payment (import input)
// =============================================================================

/// Which side of the ledger a payment settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PaymentKind {
    Customer,
    Supplier,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Customer => "Customer",
            PaymentKind::Supplier => "Supplier",
        }
    }
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentKind {
    type Err = CoreError;

    /// Accepts the English names and the Target ledger's own labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customer" | "client" => Ok(PaymentKind::Customer),
            "supplier" | "fournisseur" => Ok(PaymentKind::Supplier),
            _ => Err(CoreError::UnknownPaymentKind(s.to_string())),
        }
    }
}

/// A settlement entry as pulled from the Target ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPayment {
    pub payment_number: String,
    pub invoice_number: Option<String>,
    pub party_code: String,
    pub party_name: Option<String>,
    pub payment_date: NaiveDate,
    pub amount: Money,
    pub method: Option<String>,
    pub reference: Option<String>,
    pub account_code: Option<String>,
    pub journal: Option<String>,
    pub entry_number: Option<String>,
    pub kind: PaymentKind,
    pub status: Option<String>,
}

// =============================================================================
// Source Import Records (import output)
// =============================================================================

/// A purchase invoice ready to be upserted into the Source store.
///
/// Optional Target text has been coalesced to empty strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePurchaseInvoice {
    /// Deterministic natural key, see [`crate::mapper::chrono_reference`].
    pub chrono_ref: String,
    pub status: String,
    pub supplier_code: String,
    pub supplier_name: String,
    pub supplier_ref: String,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub label: String,
    pub total_ht: Money,
    pub total_tva: Money,
    pub total_ttc: Money,
    pub net_to_pay: Money,
    pub currency: String,

    /// Target invoice number.
    pub external_ref: String,

    pub lines: Vec<SourcePurchaseInvoiceLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePurchaseInvoiceLine {
    pub line_no: i64,
    pub line_type: String,
    pub article_code: String,
    pub designation: String,
    pub quantity: f64,
    pub unit_price_gross: Money,
    pub unit_price_net: Money,
    pub total_ht: Money,
    pub tax_rate: TaxRate,
    pub total_tva: Money,
    pub total_ttc: Money,
    pub account_code: String,
    pub cost_center: String,
}

/// A payment ready to be upserted into the Source store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePayment {
    pub payment_number: String,
    pub invoice_number: String,
    pub party_code: String,
    pub party_name: String,
    pub payment_date: NaiveDate,
    pub amount: Money,
    pub method: String,
    pub reference: String,
    pub account_code: String,
    pub journal: String,
    pub entry_number: String,
    pub kind: PaymentKind,
    pub status: String,
}

// =============================================================================
// Outcomes
// =============================================================================

/// Export acknowledgment written back to the Source invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Ok,
    Ko,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Ok => "OK",
            OutcomeStatus::Ko => "KO",
        }
    }

    /// Message recorded when the caller has nothing more specific to say.
    pub fn default_message(&self) -> &'static str {
        match self {
            OutcomeStatus::Ok => "Export succeeded",
            OutcomeStatus::Ko => "Unknown error",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an upsert created a new row or rewrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpsertOperation {
    Inserted,
    Updated,
}

impl fmt::Display for UpsertOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpsertOperation::Inserted => write!(f, "inserted"),
            UpsertOperation::Updated => write!(f, "updated"),
        }
    }
}

/// Typed result of a Source-side upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    pub id: i64,
    pub operation: UpsertOperation,
}

// =============================================================================
// Date Range
// =============================================================================

/// An inclusive calendar date range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> CoreResult<Self> {
        if start > end {
            return Err(CoreError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(DateRange { start, end })
    }

    /// The trailing window `[today - days, today]`.
    pub fn lookback(today: NaiveDate, days: u32) -> Self {
        let start = today
            .checked_sub_days(chrono::Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        DateRange { start, end: today }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inclusive on both bounds.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days between the bounds.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "from {} to {}",
            self.start.format("%d/%m/%Y"),
            self.end.format("%d/%m/%Y")
        )
    }
}
