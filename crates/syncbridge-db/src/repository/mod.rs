//! # Repository Module
//!
//! Source store repositories, one per table family.
//!
//! ## Read / Write Split
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  EXPORT                                                                 │
//! │  InvoiceRepository         list_pending_ids / fetch_invoice /           │
//! │                            fetch_invoice_lines / fetch_pending          │
//! │                            (independent reads, no transaction)          │
//! │  OutcomeRepository         record (own short transaction)               │
//! │                                                                         │
//! │  IMPORT                                                                 │
//! │  PurchaseInvoiceRepository upsert_header / clear_lines / insert_line    │
//! │  PaymentRepository         upsert                                       │
//! │                            (all on the caller's per-record transaction) │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod invoice;
pub mod outcome;
pub mod payment;
pub mod purchase;

use chrono::NaiveDate;
use syncbridge_core::TaxRate;

use crate::error::{DbError, DbResult};

/// Storage format for calendar dates.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a stored `YYYY-MM-DD` column.
pub(crate) fn parse_date(entity: &str, id: impl ToString, field: &str, raw: &str) -> DbResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|e| DbError::invalid_data(entity, id, field, format!("'{}': {}", raw, e)))
}

pub(crate) fn parse_optional_date(
    entity: &str,
    id: impl ToString,
    field: &str,
    raw: Option<&str>,
) -> DbResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => parse_date(entity, id, field, value).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn tax_rate_from_bps(entity: &str, id: impl ToString, bps: i64) -> DbResult<TaxRate> {
    u32::try_from(bps)
        .map(TaxRate::from_bps)
        .map_err(|_| DbError::invalid_data(entity, id, "tax_rate_bps", format!("{} is out of range", bps)))
}
