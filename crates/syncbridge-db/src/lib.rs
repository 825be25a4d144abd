//! # syncbridge-db: Source Store for SyncBridge
//!
//! Every read and write the bridge performs against the Source business
//! system, realised on SQLite through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SyncBridge Data Flow                             │
//! │                                                                         │
//! │  syncbridge-sync orchestrators                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  syncbridge-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌──────────────────┐   ┌─────────────┐  │   │
//! │  │   │   Database    │    │   Repositories   │   │ Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                  │   │ (embedded)  │  │   │
//! │  │   │               │    │ InvoiceRepo      │   │             │  │   │
//! │  │   │ SqlitePool    │◄───│ OutcomeRepo      │   │ 0001_source │  │   │
//! │  │   │ begin()       │    │ PurchaseInvRepo  │   │ _schema.sql │  │   │
//! │  │   │               │    │ PaymentRepo      │   │             │  │   │
//! │  │   └───────────────┘    └──────────────────┘   └─────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use syncbridge_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::from_connection_string("sqlite://./source.db")).await?;
//! let batch = db.invoices().fetch_pending().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::invoice::{InvoiceRepository, PendingBatch, PendingInvoice, SkippedInvoice};
pub use repository::outcome::{ExportLogEntry, OutcomeRepository};
pub use repository::payment::{PaymentRepository, StoredPayment};
pub use repository::purchase::{PurchaseInvoiceRepository, StoredPurchaseInvoice, StoredPurchaseLine};
