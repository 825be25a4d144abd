//! # Outcome Recorder
//!
//! Writes the export acknowledgment back onto a Source sales invoice.
//!
//! Each call runs in its own short transaction, independent of any remote
//! write: the invoice's write-back columns are updated and one row is
//! appended to `sales_invoice_export_log`. Either both land or neither does.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use syncbridge_core::OutcomeStatus;

/// One row of the export audit log.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ExportLogEntry {
    pub id: String,
    pub invoice_id: i64,
    pub status: String,
    pub message: String,
    pub exported_at: String,
}

/// Repository for export outcomes.
#[derive(Debug, Clone)]
pub struct OutcomeRepository {
    pool: SqlitePool,
}

impl OutcomeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OutcomeRepository { pool }
    }

    /// Records `status` for `invoice_id`.
    ///
    /// A missing or blank `message` is replaced by the status default
    /// ("Export succeeded" / "Unknown error").
    ///
    /// ## Errors
    /// - `NotFound` if the invoice does not exist (nothing is written)
    pub async fn record(
        &self,
        invoice_id: i64,
        status: OutcomeStatus,
        message: Option<&str>,
    ) -> DbResult<()> {
        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(status.default_message());
        let now = Utc::now().to_rfc3339();

        debug!(invoice_id, status = %status, "Recording export outcome");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let updated = sqlx::query(
            r#"
            UPDATE sales_invoices
            SET sync_status = ?1, sync_message = ?2, synced_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(status.as_str())
        .bind(message)
        .bind(&now)
        .bind(invoice_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(DbError::not_found("SalesInvoice", invoice_id));
        }

        sqlx::query(
            r#"
            INSERT INTO sales_invoice_export_log (id, invoice_id, status, message, exported_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(invoice_id)
        .bind(status.as_str())
        .bind(message)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Audit rows for one invoice, oldest first.
    pub async fn history(&self, invoice_id: i64) -> DbResult<Vec<ExportLogEntry>> {
        let rows = sqlx::query_as::<_, ExportLogEntry>(
            r#"
            SELECT id, invoice_id, status, message, exported_at
            FROM sales_invoice_export_log
            WHERE invoice_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Total number of recorded outcomes.
    pub async fn count(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sales_invoice_export_log")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
