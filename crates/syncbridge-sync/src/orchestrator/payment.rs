//! # Payment Import
//!
//! Target → Source: ledger settlements dated within the lookback window are
//! upserted by `(payment_number, kind)`, one transaction per payment.

use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

use syncbridge_core::mapper::map_payment_to_source;
use syncbridge_core::validation::validate_payment;
use syncbridge_core::{DateRange, PaymentKind, TargetPayment};
use syncbridge_db::{Database, DbError};

use super::{RecordAck, RunContext, RunPhase, RunSummary};
use crate::error::{RecordError, SyncError, SyncResult};
use crate::gateway::TargetGateway;

const LABEL: &str = "Import of payments";

pub struct PaymentImporter {
    db: Database,
    gateway: TargetGateway,
    lookback_days: u32,
    today: NaiveDate,
}

impl PaymentImporter {
    pub fn new(db: Database, gateway: TargetGateway, lookback_days: u32) -> Self {
        PaymentImporter {
            db,
            gateway,
            lookback_days,
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

        let payments = match self.gateway.pull_payments(&range).await {
            Ok(payments) => payments,
            Err(e) => {
                self.gateway.close().await;
                return Err(ctx.fail(SyncError::RemoteQuery(e)));
            }
        };

        if payments.is_empty() {
            info!("No payment found for the period");
        } else {
            let customers = payments
                .iter()
                .filter(|p| p.kind == PaymentKind::Customer)
                .count();
            info!(
                count = payments.len(),
                customers,
                suppliers = payments.len() - customers,
                "Payments to import"
            );
        }

        for (index, payment) in payments.iter().enumerate() {
            ctx.enter(RunPhase::ProcessingRecord(index));
            let result = self.import_one(payment).await;
            ctx.record(
                format!("{} ({})", payment.payment_number, payment.kind),
                result,
            );
        }

        self.gateway.close().await;
        Ok(ctx.finish())
    }

    async fn import_one(&self, payment: &TargetPayment) -> Result<RecordAck, RecordError> {
        validate_payment(payment)?;

        let record = map_payment_to_source(payment);
        let mut tx = self.db.begin().await.map_err(RecordError::Transaction)?;

        let outcome = match self.db.payments().upsert(&mut tx, &record).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(payment = %record.payment_number, error = %rollback, "Rollback failed");
                }
                return Err(RecordError::Transaction(e));
            }
        };

        if self.gateway.is_dry_run() {
            tx.rollback().await.map_err(tx_error)?;
            debug!(payment = %record.payment_number, operation = %outcome.operation, "Dry-run: rolled back");
            return Ok(RecordAck::Simulated);
        }

        tx.commit().await.map_err(tx_error)?;
        Ok(RecordAck::Imported(outcome))
    }
}

fn tx_error(err: sqlx::Error) -> RecordError {
    RecordError::Transaction(DbError::TransactionFailed(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Credentials;
    use crate::testing::{ledger_entry, FakeConnector};
    use std::sync::Arc;
    use syncbridge_core::{UpsertOperation, UpsertOutcome};
    use syncbridge_db::DbConfig;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn importer(db: &Database, fake: &FakeConnector, dry_run: bool) -> PaymentImporter {
        let gateway = TargetGateway::new(Arc::new(fake.clone()), Credentials::default(), dry_run);
        PaymentImporter::new(db.clone(), gateway, 7).with_today(date(2024, 3, 10))
    }

    #[tokio::test]
    async fn test_same_number_two_kinds() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fake = FakeConnector::new().with_ledger(vec![
            ledger_entry("RG-1", "Client", date(2024, 3, 9)),
            ledger_entry("RG-1", "Fournisseur", date(2024, 3, 9)),
            ledger_entry("RG-2", "Banque", date(2024, 3, 9)),
            ledger_entry("RG-3", "Client", date(2024, 2, 1)),
        ]);

        let summary = importer(&db, &fake, false).run().await.unwrap();

        let keys: Vec<_> = summary.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["RG-1 (Customer)", "RG-1 (Supplier)"]);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(db.payments().count().await.unwrap(), 2);

        let again = importer(&db, &fake, false).run().await.unwrap();
        assert!(again.records.iter().all(|r| matches!(
            r.result,
            Ok(RecordAck::Imported(UpsertOutcome { operation: UpsertOperation::Updated, .. }))
        )));
        assert_eq!(db.payments().count().await.unwrap(), 2);

        let stored = db
            .payments()
            .find("RG-1", PaymentKind::Supplier)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.amount_cents, 5_000);
    }

    #[tokio::test]
    async fn test_blank_party_fails_only_that_payment() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut blank = ledger_entry("RG-1", "Client", date(2024, 3, 9));
        blank.party_code = String::new();
        let fake = FakeConnector::new().with_ledger(vec![
            blank,
            ledger_entry("RG-2", "Client", date(2024, 3, 8)),
        ]);

        let summary = importer(&db, &fake, false).run().await.unwrap();

        assert_eq!(summary.failed(), 1);
        assert!(matches!(
            summary.records[0].result,
            Err(RecordError::Validation(_))
        ));
        assert_eq!(db.payments().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_uses_samples_and_writes_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fake = FakeConnector::new();

        let summary = importer(&db, &fake, true).run().await.unwrap();

        assert_eq!(summary.total(), 2);
        assert!(summary
            .records
            .iter()
            .all(|r| matches!(r.result, Ok(RecordAck::Simulated))));
        assert_eq!(fake.connects(), 0);
        assert_eq!(db.payments().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_connection_failure_is_fatal() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fake = FakeConnector::new().failing_connect();

        let err = importer(&db, &fake, false).run().await.unwrap_err();
        assert!(matches!(err, SyncError::Connection(_)));
    }
}
