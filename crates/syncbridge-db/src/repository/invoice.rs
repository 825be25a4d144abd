//! # Sales Invoice Reader
//!
//! Two-stage lookup of sales invoices waiting to be exported.
//!
//! ## Read Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       fetch_pending()                                   │
//! │                                                                         │
//! │  1. list_pending_ids()  ── sync_status IS NULL OR 'KO', ascending id   │
//! │                                                                         │
//! │  2. for each id (independent reads, no transaction spans the loop):    │
//! │       fetch_invoice(id)        ── None → invoice vanished, dropped     │
//! │       fetch_invoice_lines(id)  ── ordered by line_no                   │
//! │           │                                                             │
//! │           ├── Ok  → PendingInvoice::Loaded                             │
//! │           └── Err → PendingInvoice::Unreadable (logged, batch goes on) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invoices recorded `KO` stay pending, so the next scheduled run retries them.

use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{format_date, parse_date, parse_optional_date, tax_rate_from_bps};
use syncbridge_core::{InvoiceTotals, Money, SourceInvoice, SourceInvoiceLine};

const ENTITY: &str = "SalesInvoice";

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: i64,
    chrono_ref: String,
    status: String,
    customer_code: Option<String>,
    issue_date: String,
    due_date: Option<String>,
    total_ht_cents: i64,
    total_ttc_cents: i64,
    net_to_pay_cents: i64,
    subject: Option<String>,
}

impl InvoiceRow {
    fn into_invoice(self) -> DbResult<SourceInvoice> {
        Ok(SourceInvoice {
            issue_date: parse_date(ENTITY, self.id, "issue_date", &self.issue_date)?,
            due_date: parse_optional_date(ENTITY, self.id, "due_date", self.due_date.as_deref())?,
            id: self.id,
            chrono_ref: self.chrono_ref,
            status: self.status,
            customer_code: self.customer_code,
            totals: InvoiceTotals {
                ht: Money::from_cents(self.total_ht_cents),
                ttc: Money::from_cents(self.total_ttc_cents),
                net_to_pay: Money::from_cents(self.net_to_pay_cents),
            },
            subject: self.subject,
            lines: Vec::new(),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceLineRow {
    invoice_id: i64,
    line_no: i64,
    line_type: Option<String>,
    product_code: Option<String>,
    description: Option<String>,
    tax_rate_bps: i64,
    quantity: f64,
    unit_price_gross_cents: i64,
    unit_price_net_cents: i64,
    total_net_cents: i64,
    total_ht_cents: i64,
}

impl InvoiceLineRow {
    fn into_line(self) -> DbResult<SourceInvoiceLine> {
        Ok(SourceInvoiceLine {
            tax_rate: tax_rate_from_bps(ENTITY, self.invoice_id, self.tax_rate_bps)?,
            line_no: self.line_no,
            line_type: self.line_type,
            product_code: self.product_code,
            description: self.description,
            quantity: self.quantity,
            unit_price_gross: Money::from_cents(self.unit_price_gross_cents),
            unit_price_net: Money::from_cents(self.unit_price_net_cents),
            total_net: Money::from_cents(self.total_net_cents),
            total_ht: Money::from_cents(self.total_ht_cents),
        })
    }
}

/// An invoice id whose detail could not be read.
#[derive(Debug)]
pub struct SkippedInvoice {
    pub id: i64,
    pub error: DbError,
}

/// One entry of a pending snapshot.
#[derive(Debug)]
pub enum PendingInvoice {
    Loaded(SourceInvoice),
    Unreadable(SkippedInvoice),
}

impl PendingInvoice {
    pub fn id(&self) -> i64 {
        match self {
            PendingInvoice::Loaded(invoice) => invoice.id,
            PendingInvoice::Unreadable(skipped) => skipped.id,
        }
    }
}

/// Result of one pending snapshot.
#[derive(Debug, Default)]
pub struct PendingBatch {
    /// Every pending id that still exists, in ascending id order.
    pub entries: Vec<PendingInvoice>,
}

impl PendingBatch {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn invoices(&self) -> impl Iterator<Item = &SourceInvoice> {
        self.entries.iter().filter_map(|entry| match entry {
            PendingInvoice::Loaded(invoice) => Some(invoice),
            PendingInvoice::Unreadable(_) => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SkippedInvoice> {
        self.entries.iter().filter_map(|entry| match entry {
            PendingInvoice::Unreadable(skipped) => Some(skipped),
            PendingInvoice::Loaded(_) => None,
        })
    }
}

/// Repository for reading sales invoices to export.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Ids of invoices never exported or last recorded `KO`.
    pub async fn list_pending_ids(&self) -> DbResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id
            FROM sales_invoices
            WHERE sync_status IS NULL OR sync_status = 'KO'
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = ids.len(), "Listed pending invoice ids");
        Ok(ids)
    }

    /// Reads one invoice header. `lines` is left empty.
    ///
    /// Returns `Ok(None)` when the id does not exist.
    pub async fn fetch_invoice(&self, id: i64) -> DbResult<Option<SourceInvoice>> {
        let row = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT
                id, chrono_ref, status, customer_code,
                issue_date, due_date,
                total_ht_cents, total_ttc_cents, net_to_pay_cents,
                subject
            FROM sales_invoices
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(InvoiceRow::into_invoice).transpose()
    }

    /// Reads the lines of one invoice, ordered by `line_no`.
    pub async fn fetch_invoice_lines(&self, id: i64) -> DbResult<Vec<SourceInvoiceLine>> {
        let rows = sqlx::query_as::<_, InvoiceLineRow>(
            r#"
            SELECT
                invoice_id, line_no, line_type, product_code, description,
                tax_rate_bps, quantity,
                unit_price_gross_cents, unit_price_net_cents,
                total_net_cents, total_ht_cents
            FROM sales_invoice_lines
            WHERE invoice_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(InvoiceLineRow::into_line).collect()
    }

    /// Reads one invoice together with its lines.
    pub async fn fetch_detail(&self, id: i64) -> DbResult<Option<SourceInvoice>> {
        let Some(mut invoice) = self.fetch_invoice(id).await? else {
            return Ok(None);
        };
        invoice.lines = self.fetch_invoice_lines(id).await?;
        Ok(Some(invoice))
    }

    /// Snapshot of every pending invoice with per-id failure isolation.
    ///
    /// Only the id listing can fail the whole call.
    pub async fn fetch_pending(&self) -> DbResult<PendingBatch> {
        let ids = self.list_pending_ids().await?;
        let mut batch = PendingBatch::default();

        for id in ids {
            match self.fetch_detail(id).await {
                Ok(Some(invoice)) => batch.entries.push(PendingInvoice::Loaded(invoice)),
                Ok(None) => {
                    debug!(invoice_id = id, "Pending invoice vanished before fetch");
                }
                Err(error) => {
                    warn!(invoice_id = id, error = %error, "Skipping unreadable invoice");
                    batch
                        .entries
                        .push(PendingInvoice::Unreadable(SkippedInvoice { id, error }));
                }
            }
        }

        Ok(batch)
    }

    /// Inserts a sales invoice with its lines in one transaction; returns the new id.
    ///
    /// Used to populate development stores. `invoice.id` is ignored.
    pub async fn insert(&self, invoice: &SourceInvoice) -> DbResult<i64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let id = sqlx::query(
            r#"
            INSERT INTO sales_invoices (
                chrono_ref, status, customer_code, issue_date, due_date,
                total_ht_cents, total_ttc_cents, net_to_pay_cents, subject
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&invoice.chrono_ref)
        .bind(&invoice.status)
        .bind(&invoice.customer_code)
        .bind(format_date(invoice.issue_date))
        .bind(invoice.due_date.map(format_date))
        .bind(invoice.totals.ht.cents())
        .bind(invoice.totals.ttc.cents())
        .bind(invoice.totals.net_to_pay.cents())
        .bind(&invoice.subject)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for line in &invoice.lines {
            sqlx::query(
                r#"
                INSERT INTO sales_invoice_lines (
                    invoice_id, line_no, line_type, product_code, description,
                    tax_rate_bps, quantity, unit_price_gross_cents, unit_price_net_cents,
                    total_net_cents, total_ht_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(id)
            .bind(line.line_no)
            .bind(&line.line_type)
            .bind(&line.product_code)
            .bind(&line.description)
            .bind(i64::from(line.tax_rate.bps()))
            .bind(line.quantity)
            .bind(line.unit_price_gross.cents())
            .bind(line.unit_price_net.cents())
            .bind(line.total_net.cents())
            .bind(line.total_ht.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(invoice_id = id, chrono_ref = %invoice.chrono_ref, "Sales invoice inserted");
        Ok(id)
    }

    /// Number of sales invoices in the store.
    pub async fn count(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sales_invoices")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Current write-back status of an invoice (`None` when never exported).
    pub async fn sync_status(&self, id: i64) -> DbResult<Option<String>> {
        let status = sqlx::query_scalar::<_, Option<String>>(
            "SELECT sync_status FROM sales_invoices WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        Ok(status)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
