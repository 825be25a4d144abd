//! # Payment Repository
//!
//! Idempotent import of customer and supplier payments.
//!
//! A payment is identified by `(payment_number, kind)`: the same number may
//! exist once as a customer receipt and once as a supplier settlement.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::format_date;
use syncbridge_core::{PaymentKind, SourcePayment, UpsertOperation, UpsertOutcome};

/// A stored payment, as read back for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredPayment {
    pub id: i64,
    pub payment_number: String,
    pub kind: String,
    pub party_code: String,
    pub payment_date: String,
    pub amount_cents: i64,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Inserts or updates one payment on the caller's transaction.
    pub async fn upsert(&self, conn: &mut SqliteConnection, payment: &SourcePayment) -> DbResult<UpsertOutcome> {
        let now = Utc::now().to_rfc3339();

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM payments WHERE payment_number = ?1 AND kind = ?2",
        )
        .bind(&payment.payment_number)
        .bind(payment.kind.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        let outcome = match existing {
            Some(id) => {
                sqlx::query(
                    r#"
                    UPDATE payments SET
                        invoice_number = ?1, party_code = ?2, party_name = ?3,
                        payment_date = ?4, amount_cents = ?5, method = ?6, reference = ?7,
                        account_code = ?8, journal = ?9, entry_number = ?10, status = ?11,
                        updated_at = ?12
                    WHERE id = ?13
                    "#,
                )
                .bind(&payment.invoice_number)
                .bind(&payment.party_code)
                .bind(&payment.party_name)
                .bind(format_date(payment.payment_date))
                .bind(payment.amount.cents())
                .bind(&payment.method)
                .bind(&payment.reference)
                .bind(&payment.account_code)
                .bind(&payment.journal)
                .bind(&payment.entry_number)
                .bind(&payment.status)
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
                    INSERT INTO payments (
                        payment_number, kind, invoice_number, party_code, party_name,
                        payment_date, amount_cents, method, reference,
                        account_code, journal, entry_number, status,
                        imported_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
                    "#,
                )
                .bind(&payment.payment_number)
                .bind(payment.kind.as_str())
                .bind(&payment.invoice_number)
                .bind(&payment.party_code)
                .bind(&payment.party_name)
                .bind(format_date(payment.payment_date))
                .bind(payment.amount.cents())
                .bind(&payment.method)
                .bind(&payment.reference)
                .bind(&payment.account_code)
                .bind(&payment.journal)
                .bind(&payment.entry_number)
                .bind(&payment.status)
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
            payment_number = %payment.payment_number,
            kind = %payment.kind,
            operation = %outcome.operation,
            "Payment upserted"
        );

        Ok(outcome)
    }

    pub async fn find(&self, payment_number: &str, kind: PaymentKind) -> DbResult<Option<StoredPayment>> {
        let row = sqlx::query_as::<_, StoredPayment>(
            r#"
            SELECT id, payment_number, kind, party_code, payment_date, amount_cents, status
            FROM payments
            WHERE payment_number = ?1 AND kind = ?2
            "#,
        )
        .bind(payment_number)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM payments")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
