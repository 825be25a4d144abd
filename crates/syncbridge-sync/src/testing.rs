//! In-process Target stand-in for engine tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use syncbridge_core::{DateRange, Money, TaxRate};

use crate::error::{GatewayError, GatewayResult};
use crate::protocol::{
    LedgerEntry, RejectedItem, RemoteDocument, RemoteDocumentLine, SalesDocument,
};
use crate::remote::{Credentials, RemoteConnector, RemoteSession};

#[derive(Default)]
struct FakeState {
    connects: usize,
    closes: usize,
    fail_connect: bool,
    fail_pull: bool,
    failing_refs: HashSet<String>,
    documents: Vec<Result<RemoteDocument, RejectedItem>>,
    ledger: Vec<Result<LedgerEntry, RejectedItem>>,
    pushed: Vec<SalesDocument>,
}

/// Records every call; clones share state.
#[derive(Clone, Default)]
pub(crate) struct FakeConnector {
    state: Arc<Mutex<FakeState>>,
}

impl FakeConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_documents(self, documents: Vec<RemoteDocument>) -> Self {
        self.state.lock().unwrap().documents = documents.into_iter().map(Ok).collect();
        self
    }

    pub(crate) fn with_ledger(self, ledger: Vec<LedgerEntry>) -> Self {
        self.state.lock().unwrap().ledger = ledger.into_iter().map(Ok).collect();
        self
    }

    /// Appends a document that failed to decode.
    pub(crate) fn with_rejected_document(self, key: &str) -> Self {
        self.state.lock().unwrap().documents.push(Err(rejected(key)));
        self
    }

    /// Appends a ledger entry that failed to decode.
    pub(crate) fn with_rejected_entry(self, key: &str) -> Self {
        self.state.lock().unwrap().ledger.push(Err(rejected(key)));
        self
    }

    /// Pushes of the document with this internal reference fail.
    pub(crate) fn failing_push(self, internal_ref: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_refs
            .insert(internal_ref.to_string());
        self
    }

    pub(crate) fn failing_connect(self) -> Self {
        self.state.lock().unwrap().fail_connect = true;
        self
    }

    pub(crate) fn failing_pull(self) -> Self {
        self.state.lock().unwrap().fail_pull = true;
        self
    }

    pub(crate) fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub(crate) fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    pub(crate) fn pushed(&self) -> Vec<SalesDocument> {
        self.state.lock().unwrap().pushed.clone()
    }
}

#[async_trait]
impl RemoteConnector for FakeConnector {
    async fn connect(&self, _credentials: &Credentials) -> GatewayResult<Box<dyn RemoteSession>> {
        let mut state = self.state.lock().unwrap();
        state.connects += 1;
        if state.fail_connect {
            return Err(GatewayError::Connection("connection refused".into()));
        }
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSession {
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl RemoteSession for FakeSession {
    async fn create_sales_document(
        &mut self,
        document: SalesDocument,
    ) -> GatewayResult<Option<String>> {
        let mut state = self.state.lock().unwrap();
        if state.failing_refs.contains(&document.internal_ref) {
            return Err(GatewayError::Remote {
                code: "E42".into(),
                message: "account locked".into(),
            });
        }
        state.pushed.push(document);
        Ok(Some(format!("FV{:05}", state.pushed.len())))
    }

    async fn list_documents(
        &mut self,
        _document_type: &str,
        _range: &DateRange,
    ) -> GatewayResult<Vec<Result<RemoteDocument, RejectedItem>>> {
        let state = self.state.lock().unwrap();
        if state.fail_pull {
            return Err(GatewayError::Disconnected);
        }
        Ok(state.documents.clone())
    }

    async fn list_ledger_entries(
        &mut self,
        _range: &DateRange,
    ) -> GatewayResult<Vec<Result<LedgerEntry, RejectedItem>>> {
        let state = self.state.lock().unwrap();
        if state.fail_pull {
            return Err(GatewayError::Disconnected);
        }
        Ok(state.ledger.clone())
    }

    async fn close(&mut self) -> GatewayResult<()> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}

fn rejected(key: &str) -> RejectedItem {
    RejectedItem {
        key: Some(key.to_string()),
        reason: "Invalid amount 'N/A': unexpected character".into(),
    }
}

/// A purchase document with `line_count` lines numbered from 1.
pub(crate) fn remote_document(number: &str, date: NaiveDate, line_count: i64) -> RemoteDocument {
    let lines = (1..=line_count)
        .map(|line_no| RemoteDocumentLine {
            line_no,
            line_type: None,
            article_code: Some(format!("ART-{}", line_no)),
            designation: None,
            quantity: 1.0,
            unit_price_ht: Money::from_cents(1_000),
            amount_ht: Money::from_cents(1_000),
            tax_rate: TaxRate::from_bps(2000),
            amount_tva: Money::from_cents(200),
            amount_ttc: Money::from_cents(1_200),
            account_code: None,
            cost_center: None,
        })
        .collect::<Vec<_>>();

    RemoteDocument {
        number: number.into(),
        supplier_ref: None,
        supplier_code: "F0001".into(),
        supplier_name: None,
        date,
        due_date: None,
        label: None,
        total_ht: Money::from_cents(1_000 * line_count),
        total_tva: Money::from_cents(200 * line_count),
        total_ttc: Money::from_cents(1_200 * line_count),
        currency: None,
        status: None,
        internal_ref: None,
        lines,
    }
}

pub(crate) fn ledger_entry(number: &str, kind: &str, date: NaiveDate) -> LedgerEntry {
    LedgerEntry {
        number: number.into(),
        invoice_number: None,
        party_code: "C0001".into(),
        party_name: None,
        date,
        amount: Money::from_cents(5_000),
        method: None,
        reference: None,
        account_code: None,
        journal: None,
        entry_number: None,
        kind: kind.into(),
        status: None,
    }
}
