//! # Purchase Invoice Import
//!
//! Target → Source: purchase invoices issued within the lookback window are
//! upserted by chrono reference, header and lines in one transaction.
//!
//! ## Per-Record Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate ──► map ──► BEGIN                                            │
//! │                         upsert header (by chrono_ref)                   │
//! │                         updated? delete existing lines                  │
//! │                         insert every line                               │
//! │                       COMMIT              (ROLLBACK in dry-run)         │
//! │                                                                         │
//! │  Any failure inside the transaction rolls it back: the store holds     │
//! │  either the whole invoice or what it held before.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Local, NaiveDate};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use syncbridge_core::mapper::map_purchase_invoice_to_source;
use syncbridge_core::validation::validate_purchase_invoice;
use syncbridge_core::{
    DateRange, SourcePurchaseInvoice, TargetPurchaseInvoice, UpsertOperation, UpsertOutcome,
};
use syncbridge_db::{Database, DbError, DbResult, PurchaseInvoiceRepository};

use super::{RecordAck, RunContext, RunPhase, RunSummary};
use crate::error::{RecordError, SyncError, SyncResult};
use crate::gateway::TargetGateway;

const LABEL: &str = "Import of purchase invoices";

pub struct PurchaseInvoiceImporter {
    db: Database,
    gateway: TargetGateway,
    lookback_days: u32,
    source_tag: String,
    today: NaiveDate,
}

impl PurchaseInvoiceImporter {
    pub fn new(
        db: Database,
        gateway: TargetGateway,
        lookback_days: u32,
        source_tag: impl Into<String>,
    ) -> Self {
        PurchaseInvoiceImporter {
            db,
            gateway,
            lookback_days,
            source_tag: source_tag.into(),
            today: Local::now().date_naive(),
        }
    }

    /// Anchors the lookback window on `today` instead of the local date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self.gateway = self.gateway.with_today(today);
        self
    }

    pub async fn run(mut self) -> SyncResult<RunSummary> {
        let mut ctx = RunContext::start(LABEL, self.gateway.is_dry_run());

        let range = DateRange::lookback(self.today, self.lookback_days);
        info!(lookback_days = self.lookback_days, "Period: {}", range);

        ctx.enter(RunPhase::FetchingBatch);
        if let Err(e) = self.gateway.open().await {
            return Err(ctx.fail(SyncError::Connection(e)));
        }

        let invoices = match self.gateway.pull_purchase_invoices(&range).await {
            Ok(invoices) => invoices,
            Err(e) => {
                self.gateway.close().await;
                return Err(ctx.fail(SyncError::RemoteQuery(e)));
            }
        };

        if invoices.is_empty() {
            info!("No purchase invoice found for the period");
        } else {
            info!(count = invoices.len(), "Purchase invoices to import");
        }

        for (index, invoice) in invoices.iter().enumerate() {
            ctx.enter(RunPhase::ProcessingRecord(index));
            let result = self.import_one(invoice).await;
            ctx.record(invoice.invoice_number.clone(), result);
        }

        self.gateway.close().await;
        Ok(ctx.finish())
    }

    async fn import_one(&self, invoice: &TargetPurchaseInvoice) -> Result<RecordAck, RecordError> {
        validate_purchase_invoice(invoice)?;

        let record = map_purchase_invoice_to_source(invoice, &self.source_tag);
        let repo = self.db.purchase_invoices();

        let mut tx = self.db.begin().await.map_err(RecordError::Transaction)?;

        let outcome = match write_invoice(&repo, &mut tx, &record).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(chrono_ref = %record.chrono_ref, error = %rollback, "Rollback failed");
                }
                return Err(RecordError::Transaction(e));
            }
        };

        if self.gateway.is_dry_run() {
            tx.rollback().await.map_err(tx_error)?;
            debug!(chrono_ref = %record.chrono_ref, operation = %outcome.operation, "Dry-run: rolled back");
            return Ok(RecordAck::Simulated);
        }

        tx.commit().await.map_err(tx_error)?;
        Ok(RecordAck::Imported(outcome))
    }
}

/// Header, then lines, on the caller's transaction.
async fn write_invoice(
    repo: &PurchaseInvoiceRepository,
    conn: &mut SqliteConnection,
    record: &SourcePurchaseInvoice,
) -> DbResult<UpsertOutcome> {
    let outcome = repo.upsert_header(conn, record).await?;

    if outcome.operation == UpsertOperation::Updated {
        let removed = repo.clear_lines(conn, outcome.id).await?;
        debug!(chrono_ref = %record.chrono_ref, removed, "Replacing purchase invoice lines");
    }

    for line in &record.lines {
        repo.insert_line(conn, outcome.id, line).await?;
    }

    Ok(outcome)
}

fn tx_error(err: sqlx::Error) -> RecordError {
    RecordError::Transaction(DbError::TransactionFailed(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Credentials;
    use crate::testing::{remote_document, FakeConnector};
    use std::sync::Arc;
    use syncbridge_db::DbConfig;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn importer(db: &Database, fake: &FakeConnector, dry_run: bool) -> PurchaseInvoiceImporter {
        let gateway = TargetGateway::new(Arc::new(fake.clone()), Credentials::default(), dry_run);
        PurchaseInvoiceImporter::new(db.clone(), gateway, 30, "SAGE").with_today(date(2024, 1, 31))
    }

    #[tokio::test]
    async fn test_import_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fake = FakeConnector::new().with_documents(vec![
            remote_document("FA-1", date(2024, 1, 10), 3),
            remote_document("FA-2", date(2024, 1, 12), 1),
        ]);

        let first = importer(&db, &fake, false).run().await.unwrap();
        assert_eq!(first.succeeded(), 2);
        assert!(first.records.iter().all(|r| matches!(
            r.result,
            Ok(RecordAck::Imported(UpsertOutcome { operation: UpsertOperation::Inserted, .. }))
        )));

        let second = importer(&db, &fake, false).run().await.unwrap();
        assert_eq!(second.succeeded(), 2);
        assert!(second.records.iter().all(|r| matches!(
            r.result,
            Ok(RecordAck::Imported(UpsertOutcome { operation: UpsertOperation::Updated, .. }))
        )));

        let repo = db.purchase_invoices();
        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.line_count().await.unwrap(), 4);

        let stored = repo
            .find_by_chrono_ref("SAGE-FA-20240110-FA-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, "2");
        assert_eq!(stored.external_ref, "FA-1");
        assert_eq!(stored.net_to_pay_cents, stored.total_ttc_cents);
    }

    #[tokio::test]
    async fn test_failed_line_rolls_back_the_whole_invoice() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query(
            r#"
            CREATE TRIGGER reject_line_3 BEFORE INSERT ON purchase_invoice_lines
            WHEN NEW.line_no = 3
            BEGIN
                SELECT RAISE(ABORT, 'line 3 rejected');
            END
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();

        let fake = FakeConnector::new().with_documents(vec![
            remote_document("FA-BAD", date(2024, 1, 10), 5),
            remote_document("FA-OK", date(2024, 1, 11), 2),
        ]);

        let summary = importer(&db, &fake, false).run().await.unwrap();

        assert_eq!(summary.total(), 2);
        assert_eq!(summary.failed(), 1);
        let failure = summary.failures().next().unwrap();
        assert_eq!(failure.key, "FA-BAD");
        assert!(matches!(failure.result, Err(RecordError::Transaction(_))));

        let repo = db.purchase_invoices();
        assert!(repo
            .find_by_chrono_ref("SAGE-FA-20240110-FA-BAD")
            .await
            .unwrap()
            .is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.line_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_invalid_record_is_counted_without_a_write() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut blank = remote_document("FA-1", date(2024, 1, 10), 1);
        blank.supplier_code = "  ".into();
        let fake = FakeConnector::new().with_documents(vec![
            blank,
            remote_document("FA-2", date(2024, 1, 10), 1),
        ]);

        let summary = importer(&db, &fake, false).run().await.unwrap();

        assert_eq!(summary.failed(), 1);
        assert!(matches!(
            summary.records[0].result,
            Err(RecordError::Validation(_))
        ));
        assert_eq!(db.purchase_invoices().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_document_does_not_abort_the_run() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fake = FakeConnector::new()
            .with_documents(vec![
                remote_document("FA-1", date(2024, 1, 10), 1),
                remote_document("FA-2", date(2024, 1, 12), 2),
            ])
            .with_rejected_document("FA-BAD");

        let summary = importer(&db, &fake, false).run().await.unwrap();

        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 0);
        assert_eq!(db.purchase_invoices().count().await.unwrap(), 2);
        assert_eq!(fake.closes(), 1);
    }

    #[tokio::test]
    async fn test_window_bounds_are_inclusive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fake = FakeConnector::new().with_documents(vec![
            remote_document("FA-EDGE-START", date(2024, 1, 1), 1),
            remote_document("FA-BEFORE", date(2023, 12, 31), 1),
            remote_document("FA-EDGE-END", date(2024, 1, 31), 1),
            remote_document("FA-AFTER", date(2024, 2, 1), 1),
        ]);

        let summary = importer(&db, &fake, false).run().await.unwrap();

        let keys: Vec<_> = summary.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["FA-EDGE-START", "FA-EDGE-END"]);
    }

    #[tokio::test]
    async fn test_dry_run_leaves_the_store_untouched() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fake = FakeConnector::new();

        let summary = importer(&db, &fake, true).run().await.unwrap();

        assert_eq!(summary.total(), 2);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(fake.connects(), 0);
        assert_eq!(db.purchase_invoices().count().await.unwrap(), 0);
        assert_eq!(db.purchase_invoices().line_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pull_failure_is_fatal() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fake = FakeConnector::new().failing_pull();

        let err = importer(&db, &fake, false).run().await.unwrap_err();

        assert!(matches!(err, SyncError::RemoteQuery(_)));
        assert_eq!(fake.closes(), 1);
    }
}
