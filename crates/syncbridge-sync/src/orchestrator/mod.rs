//! # Run Orchestrators
//!
//! One orchestrator per run kind. All three share the same shape:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Run State Machine                              │
//! │                                                                         │
//! │  Idle ──► FetchingBatch ──► ProcessingRecord(0) ──► ... ──► Reporting   │
//! │               │                  │                              │       │
//! │               │                  │ record fails: counted,       ▼       │
//! │               │                  │ next record                Done     │
//! │               ▼                                                         │
//! │             Fatal   (store unreachable, session cannot open,           │
//! │                      range query fails)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A record failure never escapes its own iteration. Only the phases before
//! the first record can end a run early.

use std::fmt;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use syncbridge_core::UpsertOutcome;

use crate::error::{RecordError, SyncError};

pub mod export;
pub mod payment;
pub mod purchase;

pub use export::InvoiceExporter;
pub use payment::PaymentImporter;
pub use purchase::PurchaseInvoiceImporter;

// =============================================================================
// Run Phase
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    FetchingBatch,
    /// Index of the record being processed.
    ProcessingRecord(usize),
    Reporting,
    Done,
    Fatal,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Idle => write!(f, "idle"),
            RunPhase::FetchingBatch => write!(f, "fetching batch"),
            RunPhase::ProcessingRecord(i) => write!(f, "processing record {}", i),
            RunPhase::Reporting => write!(f, "reporting"),
            RunPhase::Done => write!(f, "done"),
            RunPhase::Fatal => write!(f, "fatal"),
        }
    }
}

// =============================================================================
// Record Outcomes
// =============================================================================

/// What happened to a record that went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordAck {
    /// Sales invoice created on the Target.
    Exported { document_number: Option<String> },

    /// Row written to the Source store.
    Imported(UpsertOutcome),

    /// Dry-run: the pipeline ran, nothing external was written.
    Simulated,
}

impl fmt::Display for RecordAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordAck::Exported {
                document_number: Some(number),
            } => write!(f, "exported as {}", number),
            RecordAck::Exported {
                document_number: None,
            } => write!(f, "exported"),
            RecordAck::Imported(outcome) => write!(f, "{} (id {})", outcome.operation, outcome.id),
            RecordAck::Simulated => write!(f, "simulated"),
        }
    }
}

/// Per-record result, keyed by the record's natural key.
#[derive(Debug)]
pub struct RecordOutcome {
    pub key: String,
    pub result: Result<RecordAck, RecordError>,
}

impl RecordOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

// =============================================================================
// Run Summary
// =============================================================================

/// Everything a finished run reports.
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub label: &'static str,
    pub dry_run: bool,
    /// One entry per record attempted, in processing order.
    pub records: Vec<RecordOutcome>,
    /// Export outcomes that could not be written back to the Source.
    pub outcome_write_failures: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.records.iter().filter(|r| !r.is_success())
    }
}

// =============================================================================
// Run Context
// =============================================================================

/// Run-scoped bookkeeping shared by the orchestrators.
pub(crate) struct RunContext {
    run_id: Uuid,
    label: &'static str,
    dry_run: bool,
    phase: RunPhase,
    started: Instant,
    records: Vec<RecordOutcome>,
    outcome_write_failures: usize,
}

impl RunContext {
    pub(crate) fn start(label: &'static str, dry_run: bool) -> Self {
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, dry_run, "===== {} started =====", label);
        if dry_run {
            warn!("DRY-RUN mode: no write will reach the Target or the Source store");
        }

        RunContext {
            run_id,
            label,
            dry_run,
            phase: RunPhase::Idle,
            started: Instant::now(),
            records: Vec::new(),
            outcome_write_failures: 0,
        }
    }

    pub(crate) fn enter(&mut self, phase: RunPhase) {
        debug!(from = %self.phase, to = %phase, "Run phase");
        self.phase = phase;
    }

    pub(crate) fn record(&mut self, key: String, result: Result<RecordAck, RecordError>) {
        match &result {
            Ok(ack) => info!(key = %key, "OK: {}", ack),
            Err(e) => error!(key = %key, kind = e.kind(), "KO: {}", e),
        }
        self.records.push(RecordOutcome { key, result });
    }

    pub(crate) fn outcome_write_failed(&mut self) {
        self.outcome_write_failures += 1;
    }

    /// Logs the fatal error and hands it back for propagation.
    pub(crate) fn fail(&mut self, err: SyncError) -> SyncError {
        let failed_in = self.phase;
        self.enter(RunPhase::Fatal);
        error!(run_id = %self.run_id, phase = %failed_in, error = %err, "{} aborted", self.label);
        err
    }

    pub(crate) fn finish(mut self) -> RunSummary {
        self.enter(RunPhase::Reporting);

        let summary = RunSummary {
            run_id: self.run_id,
            label: self.label,
            dry_run: self.dry_run,
            records: std::mem::take(&mut self.records),
            outcome_write_failures: self.outcome_write_failures,
        };

        info!(
            run_id = %summary.run_id,
            total = summary.total(),
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "===== {} finished =====",
            self.label
        );
        if summary.outcome_write_failures > 0 {
            warn!(
                count = summary.outcome_write_failures,
                "Some export outcomes could not be written back"
            );
        }

        self.enter(RunPhase::Done);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use syncbridge_core::UpsertOperation;

    #[test]
    fn test_summary_counts() {
        let mut ctx = RunContext::start("Test run", false);
        ctx.enter(RunPhase::ProcessingRecord(0));
        ctx.record("A".into(), Ok(RecordAck::Simulated));
        ctx.record(
            "B".into(),
            Err(RecordError::Write(GatewayError::Disconnected)),
        );
        ctx.record(
            "C".into(),
            Ok(RecordAck::Imported(UpsertOutcome {
                id: 3,
                operation: UpsertOperation::Updated,
            })),
        );

        let summary = ctx.finish();
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.failures().next().unwrap().key, "B");
    }

    #[test]
    fn test_ack_display() {
        let ack = RecordAck::Imported(UpsertOutcome {
            id: 7,
            operation: UpsertOperation::Inserted,
        });
        assert_eq!(ack.to_string(), "inserted (id 7)");
        assert_eq!(
            RecordAck::Exported {
                document_number: Some("FV00001".into())
            }
            .to_string(),
            "exported as FV00001"
        );
    }
}
