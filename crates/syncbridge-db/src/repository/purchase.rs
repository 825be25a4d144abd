//! # Purchase Invoice Repository
//!
//! Idempotent import of supplier invoices pulled from the Target system.
//!
//! ## Per-Record Write Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  caller: tx = db.begin()                                               │
//! │                                                                         │
//! │  upsert_header(tx, header)                                             │
//! │     ├── chrono_ref unknown  → INSERT → {id, Inserted}                  │
//! │     └── chrono_ref known    → UPDATE → {id, Updated}                   │
//! │  clear_lines(tx, id)          (only needed when Updated)               │
//! │  insert_line(tx, id, line) × N                                         │
//! │                                                                         │
//! │  caller: tx.commit()   or   drop / rollback → nothing of the record    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The write methods take a `SqliteConnection` so they always run on the
//! caller's transaction; they never open one themselves.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::format_date;
use syncbridge_core::{
    SourcePurchaseInvoice, SourcePurchaseInvoiceLine, UpsertOperation, UpsertOutcome,
};

/// A stored purchase invoice header, as read back for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredPurchaseInvoice {
    pub id: i64,
    pub chrono_ref: String,
    pub status: String,
    pub supplier_code: String,
    pub label: String,
    pub total_ttc_cents: i64,
    pub net_to_pay_cents: i64,
    pub external_ref: String,
}

/// A stored purchase line, as read back for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredPurchaseLine {
    pub line_no: i64,
    pub article_code: String,
    pub total_ht_cents: i64,
}

/// Repository for imported purchase invoices.
#[derive(Debug, Clone)]
pub struct PurchaseInvoiceRepository {
    pool: SqlitePool,
}

impl PurchaseInvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseInvoiceRepository { pool }
    }

    // =========================================================================
    // Transactional writes
    // =========================================================================

    /// Inserts or updates the header keyed by `chrono_ref`.
    pub async fn upsert_header(
        &self,
        conn: &mut SqliteConnection,
        invoice: &SourcePurchaseInvoice,
    ) -> DbResult<UpsertOutcome> {
        let now = Utc::now().to_rfc3339();
        let due_date = invoice.due_date.map(format_date);

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM purchase_invoices WHERE chrono_ref = ?1",
        )
        .bind(&invoice.chrono_ref)
        .fetch_optional(&mut *conn)
        .await?;

        let outcome = match existing {
            Some(id) => {
                sqlx::query(
                    r#"
                    UPDATE purchase_invoices SET
                        status = ?1, supplier_code = ?2, supplier_name = ?3, supplier_ref = ?4,
                        issue_date = ?5, due_date = ?6, label = ?7,
                        total_ht_cents = ?8, total_tva_cents = ?9, total_ttc_cents = ?10,
                        net_to_pay_cents = ?11, currency = ?12, external_ref = ?13,
                        updated_at = ?14
                    WHERE id = ?15
                    "#,
                )
                .bind(&invoice.status)
                .bind(&invoice.supplier_code)
                .bind(&invoice.supplier_name)
                .bind(&invoice.supplier_ref)
                .bind(format_date(invoice.issue_date))
                .bind(&due_date)
                .bind(&invoice.label)
                .bind(invoice.total_ht.cents())
                .bind(invoice.total_tva.cents())
                .bind(invoice.total_ttc.cents())
                .bind(invoice.net_to_pay.cents())
                .bind(&invoice.currency)
                .bind(&invoice.external_ref)
                .bind(&now)
                .bind(id)
                .execute(&mut *conn)
                .await?;

                UpsertOutcome {
                    id,
                    operation: UpsertOperation::Updated,
                }
            }
            None => {
                let id = sqlx::query(
                    r#"
                    INSERT INTO purchase_invoices (
                        chrono_ref, status, supplier_code, supplier_name, supplier_ref,
                        issue_date, due_date, label,
                        total_ht_cents, total_tva_cents, total_ttc_cents, net_to_pay_cents,
                        currency, external_ref, imported_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)
                    "#,
                )
                .bind(&invoice.chrono_ref)
                .bind(&invoice.status)
                .bind(&invoice.supplier_code)
                .bind(&invoice.supplier_name)
                .bind(&invoice.supplier_ref)
                .bind(format_date(invoice.issue_date))
                .bind(&due_date)
                .bind(&invoice.label)
                .bind(invoice.total_ht.cents())
                .bind(invoice.total_tva.cents())
                .bind(invoice.total_ttc.cents())
                .bind(invoice.net_to_pay.cents())
                .bind(&invoice.currency)
                .bind(&invoice.external_ref)
                .bind(&now)
                .execute(&mut *conn)
                .await?
                .last_insert_rowid();

                UpsertOutcome {
                    id,
                    operation: UpsertOperation::Inserted,
                }
            }
        };

        debug!(
            chrono_ref = %invoice.chrono_ref,
            id = outcome.id,
            operation = %outcome.operation,
            "Purchase invoice header upserted"
        );

        Ok(outcome)
    }

    /// Removes every line of a header; returns how many were deleted.
    pub async fn clear_lines(&self, conn: &mut SqliteConnection, invoice_id: i64) -> DbResult<u64> {
        let deleted = sqlx::query("DELETE FROM purchase_invoice_lines WHERE purchase_invoice_id = ?1")
            .bind(invoice_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();
        Ok(deleted)
    }

    pub async fn insert_line(
        &self,
        conn: &mut SqliteConnection,
        invoice_id: i64,
        line: &SourcePurchaseInvoiceLine,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO purchase_invoice_lines (
                purchase_invoice_id, line_no, line_type, article_code, designation,
                quantity, unit_price_gross_cents, unit_price_net_cents, total_ht_cents,
                tax_rate_bps, total_tva_cents, total_ttc_cents, account_code, cost_center
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(invoice_id)
        .bind(line.line_no)
        .bind(&line.line_type)
        .bind(&line.article_code)
        .bind(&line.designation)
        .bind(line.quantity)
        .bind(line.unit_price_gross.cents())
        .bind(line.unit_price_net.cents())
        .bind(line.total_ht.cents())
        .bind(i64::from(line.tax_rate.bps()))
        .bind(line.total_tva.cents())
        .bind(line.total_ttc.cents())
        .bind(&line.account_code)
        .bind(&line.cost_center)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn find_by_chrono_ref(&self, chrono_ref: &str) -> DbResult<Option<StoredPurchaseInvoice>> {
        let row = sqlx::query_as::<_, StoredPurchaseInvoice>(
            r#"
            SELECT id, chrono_ref, status, supplier_code, label,
                   total_ttc_cents, net_to_pay_cents, external_ref
            FROM purchase_invoices
            WHERE chrono_ref = ?1
            "#,
        )
        .bind(chrono_ref)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn lines_for(&self, invoice_id: i64) -> DbResult<Vec<StoredPurchaseLine>> {
        let rows = sqlx::query_as::<_, StoredPurchaseLine>(
            r#"
            SELECT line_no, article_code, total_ht_cents
            FROM purchase_invoice_lines
            WHERE purchase_invoice_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Number of stored headers.
    pub async fn count(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM purchase_invoices")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Number of stored lines across all headers.
    pub async fn line_count(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM purchase_invoice_lines")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use syncbridge_core::{Money, TaxRate};

    fn header(label: &str, line_count: i64) -> SourcePurchaseInvoice {
        SourcePurchaseInvoice {
            chrono_ref: "SAGE-FA-20240110-FA-1".into(),
            status: "2".into(),
            supplier_code: "F001".into(),
            supplier_name: "Acme".into(),
            supplier_ref: String::new(),
            issue_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            due_date: None,
            label: label.into(),
            total_ht: Money::from_cents(1000),
            total_tva: Money::from_cents(200),
            total_ttc: Money::from_cents(1200),
            net_to_pay: Money::from_cents(1200),
            currency: "EUR".into(),
            external_ref: "FA-1".into(),
            lines: (1..=line_count)
                .map(|line_no| SourcePurchaseInvoiceLine {
                    line_no,
                    line_type: String::new(),
                    article_code: format!("A{}", line_no),
                    designation: String::new(),
                    quantity: 1.0,
                    unit_price_gross: Money::from_cents(100),
                    unit_price_net: Money::from_cents(100),
                    total_ht: Money::from_cents(100),
                    tax_rate: TaxRate::from_bps(2000),
                    total_tva: Money::from_cents(20),
                    total_ttc: Money::from_cents(120),
                    account_code: String::new(),
                    cost_center: String::new(),
                })
                .collect(),
        }
    }

    async fn write(db: &Database, invoice: &SourcePurchaseInvoice) -> UpsertOutcome {
        let repo = db.purchase_invoices();
        let mut tx = db.begin().await.unwrap();
        let outcome = repo.upsert_header(&mut tx, invoice).await.unwrap();
        repo.clear_lines(&mut tx, outcome.id).await.unwrap();
        for line in &invoice.lines {
            repo.insert_line(&mut tx, outcome.id, line).await.unwrap();
        }
        tx.commit().await.unwrap();
        outcome
    }

    #[tokio::test]
    async fn test_second_upsert_updates_in_place() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let first = write(&db, &header("first", 3)).await;
        let second = write(&db, &header("second", 2)).await;

        assert_eq!(first.operation, UpsertOperation::Inserted);
        assert_eq!(second.operation, UpsertOperation::Updated);
        assert_eq!(first.id, second.id);

        let repo = db.purchase_invoices();
        assert_eq!(repo.count().await.unwrap(), 1);
        let stored = repo.find_by_chrono_ref("SAGE-FA-20240110-FA-1").await.unwrap().unwrap();
        assert_eq!(stored.label, "second");
        assert_eq!(repo.lines_for(stored.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rollback_leaves_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.purchase_invoices();
        let invoice = header("x", 2);

        let mut tx = db.begin().await.unwrap();
        let outcome = repo.upsert_header(&mut tx, &invoice).await.unwrap();
        repo.insert_line(&mut tx, outcome.id, &invoice.lines[0]).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 0);
        assert_eq!(repo.line_count().await.unwrap(), 0);
    }
}
