//! # Database Pool Management
//!
//! Connection pool creation and configuration for the Source store.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Source Store Connection                            │
//! │                                                                         │
//! │  ConnectionStrings.Source (config)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::from_connection_string(s) ← Configure pool settings         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ├── db.invoices()          pending reads (pool)                  │
//! │       ├── db.outcomes()          write-back (own transaction)          │
//! │       ├── db.begin()             one transaction per import record     │
//! │       ├── db.purchase_invoices() upserts on that transaction           │
//! │       └── db.payments()          upserts on that transaction           │
//! │                                                                         │
//! │  Orchestrators are sequential, so a small pool is plenty.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::outcome::OutcomeRepository;
use crate::repository::payment::PaymentRepository;
use crate::repository::purchase::PurchaseInvoiceRepository;

const IN_MEMORY_URL: &str = "sqlite::memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::from_connection_string("sqlite://./data/source.db")
///     .max_connections(2);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// sqlx SQLite URL (`sqlite://path`, `sqlite::memory:`).
    pub url: String,

    /// Maximum number of connections in the pool.
    /// Default: 4
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection acquire timeout.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    /// Whether a missing database file is created.
    /// Default: true
    pub create_if_missing: bool,
}

impl DbConfig {
    /// Configuration for a database file at `path` (created if missing).
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_url(format!("sqlite://{}?mode=rwc", path.as_ref().display()))
    }

    /// Accepts either a sqlx SQLite URL or a bare file path.
    pub fn from_connection_string(conn: &str) -> Self {
        let conn = conn.trim();
        if conn.contains(":memory:") {
            DbConfig {
                url: conn.to_string(),
                ..Self::in_memory()
            }
        } else if conn.starts_with("sqlite:") {
            Self::with_url(conn.to_string())
        } else {
            Self::new(conn)
        }
    }

    fn with_url(url: String) -> Self {
        DbConfig {
            url,
            max_connections: 4,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
            create_if_missing: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Opens the store as it is: a missing file is an error and the schema
    /// is not migrated.
    ///
    /// In-memory stores start empty and keep both.
    pub fn existing_only(mut self) -> Self {
        if !self.is_in_memory() {
            self.create_if_missing = false;
            self.run_migrations = false;
        }
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// A single connection: every SQLite in-memory connection is its own database.
    pub fn in_memory() -> Self {
        DbConfig {
            url: IN_MEMORY_URL.to_string(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(3600),
            run_migrations: true,
            create_if_missing: true,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

// =============================================================================
// Database
// =============================================================================

/// Source store handle providing repository access.
///
/// Cheap to clone; all clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Creates the connection pool and applies migrations.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist (unless `create_if_missing` is off)
    /// 2. Configures SQLite: WAL (file databases), NORMAL synchronous, foreign keys on
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(url = %config.url, "Initializing Source store connection");

        let mut connect_options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true)
            .create_if_missing(config.create_if_missing);

        if !config.is_in_memory() {
            connect_options = connect_options.journal_mode(SqliteJournalMode::Wal);
        }

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Source store pool created"
        );

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies all pending migrations; idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Starts a transaction. Dropping it without `commit` rolls back.
    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    /// Returns the pending sales invoice reader.
    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    /// Returns the export outcome recorder.
    pub fn outcomes(&self) -> OutcomeRepository {
        OutcomeRepository::new(self.pool.clone())
    }

    /// Returns the purchase invoice repository.
    pub fn purchase_invoices(&self) -> PurchaseInvoiceRepository {
        PurchaseInvoiceRepository::new(self.pool.clone())
    }

    /// Returns the payment repository.
    pub fn payments(&self) -> PaymentRepository {
        PaymentRepository::new(self.pool.clone())
    }

    /// Closes the pool; later repository calls fail.
    pub async fn close(&self) {
        info!("Closing Source store connection pool");
        self.pool.close().await;
    }

    /// Checks if the database can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
