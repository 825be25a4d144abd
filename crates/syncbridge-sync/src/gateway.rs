//! # Target Gateway
//!
//! The engine's single handle on the Target system for one run.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         TargetGateway                                   │
//! │                                                                         │
//! │  open()                  connect + login       (skipped in dry-run)    │
//! │  push_sales_invoice()    one document          (logged in dry-run)     │
//! │  pull_purchase_invoices  range query, re-filtered on issue date        │
//! │  pull_payments           range query, re-filtered on payment date      │
//! │  close()                 best effort, never fails                      │
//! │                                                                         │
//! │  In dry-run the pulls return the sample records from sample.rs and     │
//! │  the connector is never called.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The Target's range queries may return records outside the requested
//! period. Everything the gateway returns is inside the range. Items the
//! transport could not decode are logged by natural key and left out; they
//! never fail the pull.

use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tracing::{debug, info, warn};

use syncbridge_core::{DateRange, TargetPayment, TargetPurchaseInvoice, TargetSalesInvoice};

use crate::error::{GatewayError, GatewayResult};
use crate::protocol::{
    LedgerEntry, RejectedItem, RemoteDocument, SalesDocument, PURCHASE_INVOICE_TYPE,
};
use crate::remote::{Credentials, RemoteConnector, RemoteSession};
use crate::sample;

/// Acknowledgment of one pushed sales invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushAck {
    /// Number the Target gave the document; `None` in dry-run or when the
    /// Target does not report one.
    pub document_number: Option<String>,
}

pub struct TargetGateway {
    connector: Arc<dyn RemoteConnector>,
    credentials: Credentials,
    dry_run: bool,
    today: NaiveDate,
    session: Option<Box<dyn RemoteSession>>,
}

impl TargetGateway {
    pub fn new(connector: Arc<dyn RemoteConnector>, credentials: Credentials, dry_run: bool) -> Self {
        TargetGateway {
            connector,
            credentials,
            dry_run,
            today: Local::now().date_naive(),
            session: None,
        }
    }

    /// Anchors the dry-run sample dates on `today`.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Connects and logs in. Idempotent; a no-op in dry-run.
    pub async fn open(&mut self) -> GatewayResult<()> {
        if self.dry_run {
            info!("Dry-run: Target session not opened");
            return Ok(());
        }

        if self.session.is_none() {
            let session = self.connector.connect(&self.credentials).await?;
            self.session = Some(session);
        }

        Ok(())
    }

    fn session(&mut self) -> GatewayResult<&mut (dyn RemoteSession + 'static)> {
        self.session.as_deref_mut().ok_or(GatewayError::NoSession)
    }

    /// Creates and commits one sales document on the Target.
    ///
    /// Any remote failure is reported as [`GatewayError::Write`] carrying the
    /// invoice's internal reference.
    pub async fn push_sales_invoice(&mut self, invoice: &TargetSalesInvoice) -> GatewayResult<PushAck> {
        if self.dry_run {
            debug!(
                reference = %invoice.internal_ref,
                party = %invoice.party_code,
                lines = invoice.lines.len(),
                "Dry-run: sales document not sent"
            );
            return Ok(PushAck {
                document_number: None,
            });
        }

        let session = self.session()?;
        match session.create_sales_document(SalesDocument::from(invoice)).await {
            Ok(document_number) => Ok(PushAck { document_number }),
            Err(e @ GatewayError::Write { .. }) => Err(e),
            Err(other) => Err(GatewayError::Write {
                reference: invoice.internal_ref.clone(),
                reason: other.to_string(),
            }),
        }
    }

    /// Purchase invoices issued within `range`, both bounds included.
    pub async fn pull_purchase_invoices(
        &mut self,
        range: &DateRange,
    ) -> GatewayResult<Vec<TargetPurchaseInvoice>> {
        let items: Vec<Result<RemoteDocument, RejectedItem>> = if self.dry_run {
            sample::purchase_documents(self.today)
                .into_iter()
                .map(Ok)
                .collect()
        } else {
            self.session()?
                .list_documents(PURCHASE_INVOICE_TYPE, range)
                .await?
        };

        let received = items.len();
        let invoices: Vec<TargetPurchaseInvoice> = keep_decoded(items, "purchase document")
            .into_iter()
            .map(TargetPurchaseInvoice::from)
            .filter(|invoice| {
                let inside = range.contains(invoice.issue_date);
                if !inside {
                    debug!(
                        invoice = %invoice.invoice_number,
                        issue_date = %invoice.issue_date,
                        "Discarding purchase invoice outside the requested period"
                    );
                }
                inside
            })
            .collect();

        if invoices.len() < received {
            info!(
                received,
                kept = invoices.len(),
                "Some purchase documents were not kept"
            );
        }

        Ok(invoices)
    }

    /// Ledger payments dated within `range`, both bounds included.
    ///
    /// Entries whose kind is neither customer nor supplier are dropped with
    /// a warning.
    pub async fn pull_payments(&mut self, range: &DateRange) -> GatewayResult<Vec<TargetPayment>> {
        let items: Vec<Result<LedgerEntry, RejectedItem>> = if self.dry_run {
            sample::ledger_entries(self.today)
                .into_iter()
                .map(Ok)
                .collect()
        } else {
            self.session()?.list_ledger_entries(range).await?
        };

        let received = items.len();
        let mut payments = Vec::with_capacity(received);

        for entry in keep_decoded(items, "ledger entry") {
            let number = entry.number.clone();
            let payment = match TargetPayment::try_from(entry) {
                Ok(payment) => payment,
                Err(e) => {
                    warn!(payment = %number, error = %e, "Skipping ledger entry");
                    continue;
                }
            };

            if !range.contains(payment.payment_date) {
                debug!(
                    payment = %payment.payment_number,
                    payment_date = %payment.payment_date,
                    "Discarding payment outside the requested period"
                );
                continue;
            }

            payments.push(payment);
        }

        if payments.len() < received {
            info!(received, kept = payments.len(), "Some ledger entries were not kept");
        }

        Ok(payments)
    }

    /// Ends the session. Failures are logged, never returned.
    pub async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            match session.close().await {
                Ok(()) => info!("Target session closed"),
                Err(e) => warn!(error = %e, "Target session did not close cleanly"),
            }
        }
    }
}

/// Decoded items, in order. Rejected ones are logged and dropped.
fn keep_decoded<T>(items: Vec<Result<T, RejectedItem>>, what: &str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Ok(record) => Some(record),
            Err(rejected) => {
                warn!(
                    key = rejected.key.as_deref().unwrap_or("<no key>"),
                    reason = %rejected.reason,
                    "Skipping undecodable {}",
                    what
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ledger_entry, remote_document, FakeConnector};
    use syncbridge_core::{MappingDefaults, PaymentKind, SourceInvoice};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn january() -> DateRange {
        DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap()
    }

    fn gateway(fake: &FakeConnector, dry_run: bool) -> TargetGateway {
        TargetGateway::new(Arc::new(fake.clone()), Credentials::default(), dry_run)
    }

    #[tokio::test]
    async fn test_pull_filters_over_returned_records() {
        let fake = FakeConnector::new()
            .with_documents(vec![
                remote_document("FA-1", date(2023, 12, 31), 2),
                remote_document("FA-2", date(2024, 1, 1), 1),
                remote_document("FA-3", date(2024, 1, 31), 1),
                remote_document("FA-4", date(2024, 2, 1), 1),
            ])
            .with_ledger(vec![
                ledger_entry("RG-1", "Client", date(2024, 1, 15)),
                ledger_entry("RG-2", "Fournisseur", date(2024, 2, 1)),
                ledger_entry("RG-3", "Banque", date(2024, 1, 15)),
            ]);

        let mut gw = gateway(&fake, false);
        gw.open().await.unwrap();

        let invoices = gw.pull_purchase_invoices(&january()).await.unwrap();
        let numbers: Vec<_> = invoices.iter().map(|i| i.invoice_number.as_str()).collect();
        assert_eq!(numbers, vec!["FA-2", "FA-3"]);

        let payments = gw.pull_payments(&january()).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].kind, PaymentKind::Customer);

        gw.close().await;
        assert_eq!(fake.closes(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_items_are_skipped() {
        let fake = FakeConnector::new()
            .with_documents(vec![remote_document("FA-1", date(2024, 1, 10), 1)])
            .with_rejected_document("FA-BAD")
            .with_ledger(vec![ledger_entry("RG-1", "Client", date(2024, 1, 15))])
            .with_rejected_entry("RG-BAD");

        let mut gw = gateway(&fake, false);
        gw.open().await.unwrap();

        let invoices = gw.pull_purchase_invoices(&january()).await.unwrap();
        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].invoice_number, "FA-1");

        let payments = gw.pull_payments(&january()).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].payment_number, "RG-1");
    }

    #[tokio::test]
    async fn test_dry_run_never_connects() {
        let fake = FakeConnector::new();
        let mut gw = gateway(&fake, true).with_today(date(2024, 6, 15));
        gw.open().await.unwrap();

        let window = DateRange::lookback(date(2024, 6, 15), 30);
        let invoices = gw.pull_purchase_invoices(&window).await.unwrap();
        assert_eq!(invoices.len(), 2);

        let payments = gw.pull_payments(&DateRange::lookback(date(2024, 6, 15), 7)).await.unwrap();
        assert_eq!(payments.len(), 2);

        let invoice = SourceInvoice {
            id: 1,
            chrono_ref: "FV-1".into(),
            status: "VALID".into(),
            customer_code: None,
            issue_date: date(2024, 6, 1),
            due_date: None,
            totals: Default::default(),
            subject: None,
            lines: vec![],
        };
        let target = syncbridge_core::mapper::map_invoice_to_target(&invoice, &MappingDefaults::default());
        assert_eq!(gw.push_sales_invoice(&target).await.unwrap().document_number, None);

        gw.close().await;
        assert_eq!(fake.connects(), 0);
        assert!(fake.pushed().is_empty());
    }

    #[tokio::test]
    async fn test_push_without_session() {
        let fake = FakeConnector::new();
        let mut gw = gateway(&fake, false);

        let invoice = TargetSalesInvoice {
            party_code: "C1".into(),
            issue_date: date(2024, 1, 2),
            due_date: None,
            subject: "s".into(),
            internal_ref: "FV-1".into(),
            lines: vec![],
        };
        assert!(matches!(
            gw.push_sales_invoice(&invoice).await,
            Err(GatewayError::NoSession)
        ));
    }

    #[tokio::test]
    async fn test_push_failure_is_a_write_error() {
        let fake = FakeConnector::new().failing_push("FV-9");
        let mut gw = gateway(&fake, false);
        gw.open().await.unwrap();

        let invoice = TargetSalesInvoice {
            party_code: "C1".into(),
            issue_date: date(2024, 1, 2),
            due_date: None,
            subject: "s".into(),
            internal_ref: "FV-9".into(),
            lines: vec![],
        };
        let err = gw.push_sales_invoice(&invoice).await.unwrap_err();
        assert!(matches!(err, GatewayError::Write { ref reference, .. } if reference == "FV-9"));
    }
}
