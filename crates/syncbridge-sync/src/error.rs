//! # Sync Error Types
//!
//! Error types for sync runs.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  SyncError      │  │  GatewayError   │  │  RecordError            │ │
//! │  │  (fatal)        │  │  (remote side)  │  │  (one record)           │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  Fetch                  │ │
//! │  │  ConfigLoad     │  │  NoSession      │  │  Validation             │ │
//! │  │  Connection     │  │  Write          │  │  Write                  │ │
//! │  │  RemoteQuery    │  │  Remote         │  │  Transaction            │ │
//! │  │  Database       │  │  Timeout        │  │                         │ │
//! │  │  UnknownRunMode │  │  Disconnected   │  │  counted, never raised  │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  A SyncError ends the run. A RecordError ends one record; the          │
//! │  orchestrator stores it in the run summary and moves on.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use syncbridge_core::ValidationError;
use syncbridge_db::DbError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type alias for Target gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

// =============================================================================
// Sync Error (fatal)
// =============================================================================

/// Errors that stop a run before or between records.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// `ConnectionStrings.Source` is empty.
    #[error("Source connection string not configured (ConnectionStrings.Source)")]
    MissingSourceConnection,

    /// Target endpoint is not a WebSocket URL.
    #[error("Invalid Target endpoint: {0}")]
    InvalidUrl(String),

    /// Failed to read or parse the configuration file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Run Errors
    // =========================================================================
    /// The Target session could not be opened.
    #[error("Cannot open Target session: {0}")]
    Connection(#[source] GatewayError),

    /// A remote range query failed, so there is no batch to process.
    #[error("Target query failed: {0}")]
    RemoteQuery(#[source] GatewayError),

    /// The Source store is unreachable or the pending listing failed.
    #[error("Source store error: {0}")]
    Database(#[from] DbError),

    /// The requested run mode does not exist.
    #[error("Unknown run mode '{0}'. Expected one of: ExportFactures, ImportReglements, ImportFacturesAchat")]
    UnknownRunMode(String),
}

impl SyncError {
    /// Returns true if this error aborts the process run.
    ///
    /// An unknown run mode is only a warning: nothing was attempted.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SyncError::UnknownRunMode(_))
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::MissingSourceConnection
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
        )
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

// =============================================================================
// Gateway Error (remote side)
// =============================================================================

/// Failures talking to the Target system.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Endpoint unreachable, handshake failed or credentials rejected.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// An operation was called before `open` succeeded.
    #[error("No open Target session")]
    NoSession,

    /// Building or committing one sales document failed.
    ///
    /// The remote store holds no part of that document.
    #[error("Write failed for {reference}: {reason}")]
    Write { reference: String, reason: String },

    /// The remote system answered with a fault.
    #[error("Remote fault {code}: {message}")]
    Remote { code: String, message: String },

    /// A frame that does not match the session protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// No reply within the configured timeout.
    #[error("{operation} timed out after {secs} seconds")]
    Timeout { operation: String, secs: u64 },

    /// The remote side closed the connection.
    #[error("Disconnected from Target")]
    Disconnected,
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Protocol(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for GatewayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => GatewayError::Disconnected,
            WsError::Protocol(p) => GatewayError::Protocol(p.to_string()),
            WsError::Io(io) => GatewayError::Connection(io.to_string()),
            WsError::Tls(tls) => GatewayError::Connection(tls.to_string()),
            other => GatewayError::Connection(other.to_string()),
        }
    }
}

// =============================================================================
// Record Error (isolated)
// =============================================================================

/// Why one record failed. Stored in the run summary, never propagated.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The Source record could not be read.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// A remote record is unfit to be written.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The remote push for this record failed.
    #[error("{0}")]
    Write(#[source] GatewayError),

    /// The record's local transaction failed and was rolled back.
    #[error("Transaction rolled back: {0}")]
    Transaction(#[source] DbError),
}

impl RecordError {
    /// Short category name used in per-record log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            RecordError::Fetch(_) => "fetch",
            RecordError::Validation(_) => "validation",
            RecordError::Write(_) => "write",
            RecordError::Transaction(_) => "transaction",
        }
    }
}
