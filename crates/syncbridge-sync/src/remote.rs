//! # Remote Session Seam
//!
//! The capabilities the engine needs from the Target system, as traits.
//!
//! ```text
//! ┌──────────────────┐  connect(credentials)  ┌──────────────────────────┐
//! │ RemoteConnector  │───────────────────────►│ RemoteSession            │
//! │                  │                        │                          │
//! │ WsRemoteConnector│                        │ create_sales_document    │
//! │ (transport.rs)   │                        │ list_documents           │
//! │                  │                        │ list_ledger_entries      │
//! │ test fakes       │                        │ close                    │
//! └──────────────────┘                        └──────────────────────────┘
//! ```
//!
//! A session is used by one run at a time and is never shared across tasks.

use async_trait::async_trait;
use std::fmt;

use syncbridge_core::DateRange;

use crate::error::GatewayResult;
use crate::protocol::{LedgerEntry, RejectedItem, RemoteDocument, SalesDocument};

/// Target login for one session.
#[derive(Clone, Default)]
pub struct Credentials {
    pub company: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("company", &self.company)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opens sessions against the Target system.
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn connect(&self, credentials: &Credentials) -> GatewayResult<Box<dyn RemoteSession>>;
}

/// One authenticated Target session.
#[async_trait]
pub trait RemoteSession: Send {
    /// Builds and commits one sales document. Returns the Target's document
    /// number when it reports one.
    async fn create_sales_document(&mut self, document: SalesDocument)
        -> GatewayResult<Option<String>>;

    /// Lists documents of one type dated within `range`.
    ///
    /// The Target may return records outside the range; callers filter.
    /// Each item is decoded on its own: a malformed one comes back as
    /// `Err(RejectedItem)` next to the others.
    async fn list_documents(
        &mut self,
        document_type: &str,
        range: &DateRange,
    ) -> GatewayResult<Vec<Result<RemoteDocument, RejectedItem>>>;

    /// Lists ledger settlement entries dated within `range`.
    async fn list_ledger_entries(
        &mut self,
        range: &DateRange,
    ) -> GatewayResult<Vec<Result<LedgerEntry, RejectedItem>>>;

    async fn close(&mut self) -> GatewayResult<()>;
}
