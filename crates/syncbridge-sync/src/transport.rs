//! # WebSocket Transport
//!
//! WebSocket implementation of [`RemoteConnector`] and [`RemoteSession`].
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Target Session Lifecycle                            │
//! │                                                                         │
//! │  ┌────────────┐  connect_async   ┌────────────┐  OpenSession            │
//! │  │Disconnected│ ───────────────► │ Handshaken │ ──────────────┐         │
//! │  └────────────┘  (connect_timeout)└────────────┘               │         │
//! │        ▲                                                      ▼         │
//! │        │                                             ┌──────────────┐   │
//! │        │            CloseSession                     │    Open      │   │
//! │        └──────────────────────────────────────────── │ call / reply │   │
//! │                                                      └──────────────┘   │
//! │                                                                         │
//! │  One request in flight at a time. Each call waits at most              │
//! │  call_timeout for the frame carrying its own sequence number;          │
//! │  stale replies are dropped, pings are answered on the way.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no reconnection: a broken session fails the current call and
//! the run reports it.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use syncbridge_core::DateRange;

use crate::config::SyncConfig;
use crate::error::{GatewayError, GatewayResult, SyncResult};
use crate::protocol::{
    DateRangePayload, Frame, LedgerEntry, ListDocumentsPayload, OpenSessionPayload, RejectedItem,
    RemoteDocument, RemoteMessage, SalesDocument,
};
use crate::remote::{Credentials, RemoteConnector, RemoteSession};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// =============================================================================
// Connector
// =============================================================================

/// Opens Target sessions over WebSocket.
#[derive(Debug, Clone)]
pub struct WsRemoteConnector {
    endpoint: Option<Url>,
    connect_timeout: Duration,
    call_timeout: Duration,
}

impl WsRemoteConnector {
    pub fn new(endpoint: Option<Url>, connect_timeout: Duration, call_timeout: Duration) -> Self {
        WsRemoteConnector {
            endpoint,
            connect_timeout,
            call_timeout,
        }
    }

    pub fn from_config(config: &SyncConfig) -> SyncResult<Self> {
        let endpoint = config
            .target
            .endpoint_id
            .as_deref()
            .map(Url::parse)
            .transpose()?;

        Ok(Self::new(
            endpoint,
            config.connect_timeout(),
            config.call_timeout(),
        ))
    }

    async fn connect_with_timeout(&self, endpoint: &Url) -> GatewayResult<WsStream> {
        match timeout(self.connect_timeout, connect_async(endpoint.as_str())).await {
            Ok(Ok((stream, response))) => {
                debug!(status = ?response.status(), "WebSocket handshake complete");
                Ok(stream)
            }
            Ok(Err(e)) => Err(GatewayError::from(e)),
            Err(_) => Err(GatewayError::Timeout {
                operation: "Connect".into(),
                secs: self.connect_timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl RemoteConnector for WsRemoteConnector {
    async fn connect(&self, credentials: &Credentials) -> GatewayResult<Box<dyn RemoteSession>> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or_else(|| GatewayError::Connection("no Target endpoint configured".into()))?;

        info!(endpoint = %endpoint, company = %credentials.company, "Connecting to Target");
        let stream = self.connect_with_timeout(endpoint).await?;

        let mut session = WsRemoteSession {
            stream,
            next_seq: 1,
            call_timeout: self.call_timeout,
        };

        let login = RemoteMessage::OpenSession(OpenSessionPayload {
            company: credentials.company.clone(),
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        });

        match session.call(login).await {
            Ok(RemoteMessage::SessionOpened(opened)) => {
                info!(session_id = %opened.session_id, "Target session opened");
                Ok(Box::new(session))
            }
            Ok(other) => Err(unexpected("SessionOpened", &other)),
            Err(GatewayError::Remote { code, message }) => Err(GatewayError::Connection(format!(
                "login rejected ({}): {}",
                code, message
            ))),
            Err(e) => Err(e),
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// An open WebSocket session with the Target.
pub struct WsRemoteSession {
    stream: WsStream,
    next_seq: u64,
    call_timeout: Duration,
}

impl WsRemoteSession {
    /// Sends one request and waits for the reply with the same sequence number.
    async fn call(&mut self, message: RemoteMessage) -> GatewayResult<RemoteMessage> {
        let seq = self.next_seq;
        self.next_seq += 1;

        let operation = message.type_name();
        let json = Frame::new(seq, message).to_json()?;
        debug!(seq, operation, "Sending request");
        self.stream.send(WsMessage::Text(json.into())).await?;

        match timeout(self.call_timeout, self.read_reply(seq)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout {
                operation: operation.to_string(),
                secs: self.call_timeout.as_secs(),
            }),
        }
    }

    async fn read_reply(&mut self, seq: u64) -> GatewayResult<RemoteMessage> {
        loop {
            let Some(result) = self.stream.next().await else {
                return Err(GatewayError::Disconnected);
            };

            match result? {
                WsMessage::Text(text) => {
                    let frame = Frame::from_json(text.as_str())?;
                    if frame.seq != seq {
                        warn!(expected = seq, got = frame.seq, "Discarding stale reply");
                        continue;
                    }

                    debug!(seq, reply = frame.message.type_name(), "Received reply");
                    return match frame.message {
                        RemoteMessage::Fault { code, message } => {
                            Err(GatewayError::Remote { code, message })
                        }
                        other => Ok(other),
                    };
                }
                WsMessage::Ping(data) => {
                    self.stream.send(WsMessage::Pong(data)).await?;
                }
                WsMessage::Pong(_) => {
                    debug!("Received pong");
                }
                WsMessage::Close(frame) => {
                    info!(?frame, "Target closed the session");
                    return Err(GatewayError::Disconnected);
                }
                WsMessage::Binary(_) => {
                    warn!("Received unexpected binary message");
                }
                WsMessage::Frame(_) => {
                    // Raw frame, ignore
                }
            }
        }
    }
}

#[async_trait]
impl RemoteSession for WsRemoteSession {
    async fn create_sales_document(
        &mut self,
        document: SalesDocument,
    ) -> GatewayResult<Option<String>> {
        match self.call(RemoteMessage::CreateSalesDocument(document)).await? {
            RemoteMessage::DocumentCommitted(committed) => Ok(committed.document_number),
            other => Err(unexpected("DocumentCommitted", &other)),
        }
    }

    async fn list_documents(
        &mut self,
        document_type: &str,
        range: &DateRange,
    ) -> GatewayResult<Vec<Result<RemoteDocument, RejectedItem>>> {
        let request = RemoteMessage::ListDocuments(ListDocumentsPayload {
            document_type: document_type.to_string(),
            from: range.start(),
            to: range.end(),
        });

        match self.call(request).await? {
            RemoteMessage::Documents { items } => {
                Ok(items.into_iter().map(RemoteDocument::from_item).collect())
            }
            other => Err(unexpected("Documents", &other)),
        }
    }

    async fn list_ledger_entries(
        &mut self,
        range: &DateRange,
    ) -> GatewayResult<Vec<Result<LedgerEntry, RejectedItem>>> {
        let request = RemoteMessage::ListLedgerEntries(DateRangePayload {
            from: range.start(),
            to: range.end(),
        });

        match self.call(request).await? {
            RemoteMessage::LedgerEntries { items } => {
                Ok(items.into_iter().map(LedgerEntry::from_item).collect())
            }
            other => Err(unexpected("LedgerEntries", &other)),
        }
    }

    async fn close(&mut self) -> GatewayResult<()> {
        let reply = self.call(RemoteMessage::CloseSession).await;
        let _ = self.stream.close(None).await;

        match reply? {
            RemoteMessage::SessionClosed => Ok(()),
            other => Err(unexpected("SessionClosed", &other)),
        }
    }
}

fn unexpected(expected: &str, got: &RemoteMessage) -> GatewayError {
    GatewayError::Protocol(format!(
        "expected {}, got {}",
        expected,
        got.type_name()
    ))
}
