//! # Run Dispatcher
//!
//! Maps a run-mode argument to exactly one orchestrator run.
//!
//! ```text
//! ┌──────────────────────────┬───────────────────────────────────────────┐
//! │ Mode (case-insensitive)  │ Run                                       │
//! ├──────────────────────────┼───────────────────────────────────────────┤
//! │ ExportFactures           │ sales invoices  Source → Target           │
//! │ ImportReglements         │ payments        Target → Source           │
//! │ ImportFacturesAchat      │ purchase inv.   Target → Source           │
//! └──────────────────────────┴───────────────────────────────────────────┘
//! ```
//!
//! The English names (`export-invoices`, `import-payments`,
//! `import-purchase-invoices`) are accepted too.
//!
//! A dry run opens the Source store as it is: a missing file is fatal and
//! the schema is never migrated.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use syncbridge_db::{Database, DbConfig};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::gateway::TargetGateway;
use crate::orchestrator::{InvoiceExporter, PaymentImporter, PurchaseInvoiceImporter, RunSummary};
use crate::remote::{Credentials, RemoteConnector};
use crate::transport::WsRemoteConnector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    ExportInvoices,
    ImportPayments,
    ImportPurchaseInvoices,
}

impl RunMode {
    pub const ALL: [RunMode; 3] = [
        RunMode::ExportInvoices,
        RunMode::ImportPayments,
        RunMode::ImportPurchaseInvoices,
    ];

    /// Name used on the command line and in scheduler entries.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::ExportInvoices => "ExportFactures",
            RunMode::ImportPayments => "ImportReglements",
            RunMode::ImportPurchaseInvoices => "ImportFacturesAchat",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exportfactures" | "export-invoices" => Ok(RunMode::ExportInvoices),
            "importreglements" | "import-payments" => Ok(RunMode::ImportPayments),
            "importfacturesachat" | "import-purchase-invoices" => {
                Ok(RunMode::ImportPurchaseInvoices)
            }
            _ => Err(SyncError::UnknownRunMode(s.to_string())),
        }
    }
}

/// Builds the collaborators of one run from the configuration and runs it.
pub struct Dispatcher {
    config: Arc<SyncConfig>,
    dry_run: bool,
    connector: Option<Arc<dyn RemoteConnector>>,
}

impl Dispatcher {
    pub fn new(config: Arc<SyncConfig>, dry_run: bool) -> Self {
        Dispatcher {
            config,
            dry_run,
            connector: None,
        }
    }

    /// Replaces the WebSocket connector built from the configuration.
    pub fn with_connector(mut self, connector: Arc<dyn RemoteConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub async fn run(&self, mode: RunMode) -> SyncResult<RunSummary> {
        info!(mode = %mode, dry_run = self.dry_run, "Dispatching run");

        let connector: Arc<dyn RemoteConnector> = match &self.connector {
            Some(connector) => Arc::clone(connector),
            None => Arc::new(WsRemoteConnector::from_config(&self.config)?),
        };

        let mut db_config = DbConfig::from_connection_string(self.config.source_connection());
        if self.dry_run {
            db_config = db_config.existing_only();
        }
        let db = Database::new(db_config).await?;

        let gateway = TargetGateway::new(connector, self.credentials(), self.dry_run);

        let result = match mode {
            RunMode::ExportInvoices => {
                InvoiceExporter::new(db.clone(), gateway, self.config.mapping_defaults())
                    .run()
                    .await
            }
            RunMode::ImportPayments => {
                PaymentImporter::new(db.clone(), gateway, self.config.payment_lookback_days())
                    .run()
                    .await
            }
            RunMode::ImportPurchaseInvoices => {
                PurchaseInvoiceImporter::new(
                    db.clone(),
                    gateway,
                    self.config.purchase_lookback_days(),
                    self.config.source_tag(),
                )
                .run()
                .await
            }
        };

        db.close().await;
        result
    }

    fn credentials(&self) -> Credentials {
        Credentials {
            company: self.config.target.company_name.clone(),
            username: self.config.target.username.clone(),
            password: self.config.target.password.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeConnector;

    fn config(source: &str) -> Arc<SyncConfig> {
        let mut config = SyncConfig::default();
        config.connection_strings.source = source.into();
        Arc::new(config)
    }

    #[test]
    fn test_run_mode_parsing() {
        assert_eq!("ExportFactures".parse::<RunMode>().unwrap(), RunMode::ExportInvoices);
        assert_eq!("importreglements".parse::<RunMode>().unwrap(), RunMode::ImportPayments);
        assert_eq!(
            " IMPORTFACTURESACHAT ".parse::<RunMode>().unwrap(),
            RunMode::ImportPurchaseInvoices
        );
        assert_eq!(
            "import-purchase-invoices".parse::<RunMode>().unwrap(),
            RunMode::ImportPurchaseInvoices
        );

        let err = "Sync".parse::<RunMode>().unwrap_err();
        assert!(!err.is_fatal());

        for mode in RunMode::ALL {
            assert_eq!(mode.to_string().parse::<RunMode>().unwrap(), mode);
        }
    }

    #[tokio::test]
    async fn test_dry_run_dispatch_never_connects() {
        let fake = FakeConnector::new();
        let dispatcher =
            Dispatcher::new(config("sqlite::memory:"), true).with_connector(Arc::new(fake.clone()));

        for mode in RunMode::ALL {
            let summary = dispatcher.run(mode).await.unwrap();
            assert!(summary.dry_run);
            assert_eq!(summary.failed(), 0);
        }

        assert_eq!(fake.connects(), 0);
    }

    #[tokio::test]
    async fn test_file_store_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.db");
        let fake = FakeConnector::new();

        let dispatcher = Dispatcher::new(config(path.to_str().unwrap()), false)
            .with_connector(Arc::new(fake.clone()));

        let summary = dispatcher.run(RunMode::ExportInvoices).await.unwrap();
        assert_eq!(summary.total(), 0);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_dry_run_never_creates_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.db");
        let fake = FakeConnector::new();

        let dispatcher = Dispatcher::new(config(path.to_str().unwrap()), true)
            .with_connector(Arc::new(fake.clone()));

        let err = dispatcher.run(RunMode::ExportInvoices).await.unwrap_err();
        assert!(matches!(err, SyncError::Database(_)));
        assert!(!path.exists());
        assert_eq!(fake.connects(), 0);
    }

    #[tokio::test]
    async fn test_dry_run_reads_an_existing_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.db");
        let fake = FakeConnector::new();

        Dispatcher::new(config(path.to_str().unwrap()), false)
            .with_connector(Arc::new(fake.clone()))
            .run(RunMode::ExportInvoices)
            .await
            .unwrap();

        let summary = Dispatcher::new(config(path.to_str().unwrap()), true)
            .with_connector(Arc::new(fake.clone()))
            .run(RunMode::ImportPurchaseInvoices)
            .await
            .unwrap();
        assert!(summary.dry_run);
        assert_eq!(summary.failed(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_store_is_fatal() {
        let dispatcher = Dispatcher::new(config("sqlite:///nonexistent-dir/x/source.db"), false)
            .with_connector(Arc::new(FakeConnector::new()));

        let err = dispatcher.run(RunMode::ImportPayments).await.unwrap_err();
        assert!(matches!(err, SyncError::Database(_)));
    }
}
