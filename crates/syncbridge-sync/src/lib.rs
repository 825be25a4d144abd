//! # syncbridge-sync: Sync Engine for SyncBridge
//!
//! This crate runs one synchronization pass between the Source store and
//! the Target accounting system.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Engine Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                  Dispatcher (one run per process)                │  │
//! │  │                                                                  │  │
//! │  │  RunMode → Source store + TargetGateway → one orchestrator       │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ InvoiceExporter│  │ PaymentImporter│  │ PurchaseInvoiceImporter│    │
//! │  │                │  │                │  │                        │    │
//! │  │ pending sales  │  │ ledger entries │  │ purchase documents     │    │
//! │  │ invoices → FV  │  │ → payments     │  │ → purchase invoices    │    │
//! │  │ OK/KO written  │  │ upsert by      │  │ upsert by chrono ref,  │    │
//! │  │ back           │  │ (number, kind) │  │ lines replaced         │    │
//! │  └───────┬────────┘  └───────┬────────┘  └───────────┬────────────┘    │
//! │          └───────────────────┼───────────────────────┘                  │
//! │                              ▼                                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  TargetGateway ──► RemoteConnector / RemoteSession (traits)    │   │
//! │  │                    └─ WsRemoteConnector: JSON frames over WS   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Every record is isolated: a failure is logged, counted and the batch  │
//! │  goes on. Dry-run exercises the same pipeline without external writes. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Connector configuration (JSON/TOML file + environment)
//! - [`error`] - Fatal, gateway and per-record error types
//! - [`protocol`] - Target session frames and document field names
//! - [`remote`] - Connector/session traits
//! - [`transport`] - WebSocket session client
//! - [`gateway`] - Dry-run aware Target operations with date filtering
//! - [`orchestrator`] - The three run kinds
//! - [`dispatch`] - Run mode selection
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use syncbridge_sync::{Dispatcher, RunMode, SyncConfig};
//!
//! let config = Arc::new(SyncConfig::load(None)?);
//! let summary = Dispatcher::new(config, false)
//!     .run(RunMode::ImportPayments)
//!     .await?;
//! println!("{} ok, {} failed", summary.succeeded(), summary.failed());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod protocol;
pub mod remote;
pub mod sample;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::SyncConfig;
pub use dispatch::{Dispatcher, RunMode};
pub use error::{GatewayError, RecordError, SyncError, SyncResult};
pub use gateway::{PushAck, TargetGateway};
pub use orchestrator::{RecordAck, RecordOutcome, RunPhase, RunSummary};
pub use remote::{Credentials, RemoteConnector, RemoteSession};
pub use transport::WsRemoteConnector;
