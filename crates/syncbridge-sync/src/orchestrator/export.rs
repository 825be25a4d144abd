//! # Sales Invoice Export
//!
//! Source → Target: every pending sales invoice becomes one Target document.
//!
//! ```text
//! fetch_pending ──► open session ──► for each invoice:
//!                                      map ──► push ──► write OK/KO back
//!                                      (unreadable: write KO back)
//!                                    close session
//! ```
//!
//! The outcome is written back whatever the push result, except in dry-run
//! where the Source store is left untouched.

use tracing::{debug, error, info};

use syncbridge_core::mapper::map_invoice_to_target_traced;
use syncbridge_core::{MappingDefaults, OutcomeStatus, SourceInvoice};
use syncbridge_db::{Database, PendingInvoice};

use super::{RecordAck, RunContext, RunPhase, RunSummary};
use crate::error::{RecordError, SyncError, SyncResult};
use crate::gateway::TargetGateway;

const LABEL: &str = "Export of sales invoices";

pub struct InvoiceExporter {
    db: Database,
    gateway: TargetGateway,
    defaults: MappingDefaults,
}

impl InvoiceExporter {
    pub fn new(db: Database, gateway: TargetGateway, defaults: MappingDefaults) -> Self {
        InvoiceExporter {
            db,
            gateway,
            defaults,
        }
    }

    pub async fn run(mut self) -> SyncResult<RunSummary> {
        let dry_run = self.gateway.is_dry_run();
        let mut ctx = RunContext::start(LABEL, dry_run);

        ctx.enter(RunPhase::FetchingBatch);
        let batch = match self.db.invoices().fetch_pending().await {
            Ok(batch) => batch,
            Err(e) => return Err(ctx.fail(SyncError::Database(e))),
        };

        if batch.is_empty() {
            info!("No pending sales invoice to export");
            return Ok(ctx.finish());
        }

        info!(
            pending = batch.len(),
            unreadable = batch.skipped().count(),
            "Pending sales invoices loaded"
        );

        if let Err(e) = self.gateway.open().await {
            return Err(ctx.fail(SyncError::Connection(e)));
        }

        for (index, entry) in batch.entries.into_iter().enumerate() {
            ctx.enter(RunPhase::ProcessingRecord(index));

            match entry {
                PendingInvoice::Loaded(invoice) => {
                    let result = self.export_one(&invoice).await;
                    self.write_back(&mut ctx, invoice.id, &result.as_ref()).await;
                    ctx.record(invoice.chrono_ref, result);
                }
                PendingInvoice::Unreadable(skipped) => {
                    let err = RecordError::Fetch(skipped.error.to_string());
                    self.write_back(&mut ctx, skipped.id, &Err(&err)).await;
                    ctx.record(format!("invoice #{}", skipped.id), Err(err));
                }
            }
        }

        self.gateway.close().await;
        Ok(ctx.finish())
    }

    async fn export_one(&mut self, invoice: &SourceInvoice) -> Result<RecordAck, RecordError> {
        let (target, applied) = map_invoice_to_target_traced(invoice, &self.defaults);
        for default in &applied {
            debug!(invoice = %invoice.chrono_ref, "Mapping fallback: {}", default);
        }

        let ack = self
            .gateway
            .push_sales_invoice(&target)
            .await
            .map_err(RecordError::Write)?;

        if self.gateway.is_dry_run() {
            Ok(RecordAck::Simulated)
        } else {
            Ok(RecordAck::Exported {
                document_number: ack.document_number,
            })
        }
    }

    /// Records the OK/KO outcome on the Source invoice.
    ///
    /// A failure here is logged and counted; it never changes the record's
    /// own result.
    async fn write_back(
        &self,
        ctx: &mut RunContext,
        invoice_id: i64,
        result: &Result<&RecordAck, &RecordError>,
    ) {
        if self.gateway.is_dry_run() {
            return;
        }

        let (status, message) = match result {
            Ok(RecordAck::Exported {
                document_number: Some(number),
            }) => (OutcomeStatus::Ok, Some(format!("Exported as {}", number))),
            Ok(_) => (OutcomeStatus::Ok, None),
            Err(e) => (OutcomeStatus::Ko, Some(e.to_string())),
        };

        if let Err(e) = self
            .db
            .outcomes()
            .record(invoice_id, status, message.as_deref())
            .await
        {
            error!(invoice_id, status = %status, error = %e, "Failed to write export outcome back");
            ctx.outcome_write_failed();
        }
    }
}
