use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::accept_async;

use super::extractor::PageSnapshot;
use super::scheduler::{PageAccessor, TabId};

use async_trait::async_trait;

/// Messages the browser companion pushes over the local WebSocket.
///
/// The channel is deliberately one-way and at-most-once: no acks, no
/// retries, no request/response. A message sent while nothing is listening
/// is lost; the next snapshot or the next scan cycle supersedes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum BridgeMessage {
    /// A tab finished loading a page worth scanning.
    #[serde(rename_all = "camelCase")]
    PageLoaded { tab_id: TabId },

    /// A tab became visible or was hidden/backgrounded.
    #[serde(rename_all = "camelCase")]
    VisibilityChanged { tab_id: TabId, visible: bool },

    /// Fresh capture of a tab's text nodes. Replaces any stored snapshot.
    #[serde(rename_all = "camelCase")]
    PageSnapshot { tab_id: TabId, page: PageSnapshot },

    /// Keep-alive; carries no payload and triggers nothing.
    Ping,
}

/// Tab lifecycle notifications forwarded to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabEvent {
    Loaded(TabId),
    VisibilityChanged(TabId, bool),
}

/// Local WebSocket endpoint the browser companion connects to.
///
/// Stores the freshest snapshot per tab for the scan scheduler to read and
/// forwards lifecycle events to the tracker. Multiple connections are
/// accepted (one per browser profile); they all feed the same state.
pub struct PageBridge {
    pages: Arc<RwLock<HashMap<TabId, PageSnapshot>>>,
    events_tx: mpsc::Sender<TabEvent>,
    port: u16,
}

impl PageBridge {
    pub fn new(port: u16, events_tx: mpsc::Sender<TabEvent>) -> Self {
        Self {
            pages: Arc::new(RwLock::new(HashMap::new())),
            events_tx,
            port,
        }
    }

    /// Bind the listener and serve connections until the process exits.
    pub async fn run(&self) -> Result<()> {
        let addr = format!("127.0.0.1:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind page bridge on {addr}"))?;

        info!("Page bridge listening on ws://{addr}");

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    error!("page bridge accept failed: {err}");
                    continue;
                }
            };

            debug!("browser companion connected from {peer}");
            let pages = self.pages.clone();
            let events_tx = self.events_tx.clone();

            tokio::spawn(async move {
                let ws_stream = match accept_async(stream).await {
                    Ok(ws_stream) => ws_stream,
                    Err(err) => {
                        error!("WebSocket handshake failed: {err}");
                        return;
                    }
                };

                let (_, mut read) = ws_stream.split();

                while let Some(message) = read.next().await {
                    let message = match message {
                        Ok(message) => message,
                        Err(err) => {
                            debug!("WebSocket error: {err}");
                            break;
                        }
                    };

                    let Ok(text) = message.to_text() else {
                        continue;
                    };

                    match serde_json::from_str::<BridgeMessage>(text) {
                        Ok(parsed) => {
                            handle_message(parsed, &pages, &events_tx).await;
                        }
                        Err(err) => {
                            debug!("ignoring malformed bridge message: {err}");
                        }
                    }
                }

                debug!("browser companion disconnected");
            });
        }
    }
}

async fn handle_message(
    message: BridgeMessage,
    pages: &RwLock<HashMap<TabId, PageSnapshot>>,
    events_tx: &mpsc::Sender<TabEvent>,
) {
    match message {
        BridgeMessage::PageLoaded { tab_id } => {
            forward_event(events_tx, TabEvent::Loaded(tab_id)).await;
        }
        BridgeMessage::VisibilityChanged { tab_id, visible } => {
            forward_event(events_tx, TabEvent::VisibilityChanged(tab_id, visible)).await;
        }
        BridgeMessage::PageSnapshot { tab_id, page } => {
            debug!(
                "stored snapshot for tab {tab_id} ({} nodes)",
                page.nodes.len()
            );
            pages.write().await.insert(tab_id, page);
        }
        BridgeMessage::Ping => {}
    }
}

async fn forward_event(events_tx: &mpsc::Sender<TabEvent>, event: TabEvent) {
    // Fire-and-forget: a dropped receiver just means nobody cares anymore.
    if events_tx.send(event).await.is_err() {
        debug!("tab event receiver dropped");
    }
}

#[async_trait]
impl PageAccessor for PageBridge {
    async fn snapshot(&self, tab: TabId) -> Option<PageSnapshot> {
        self.pages.read().await.get(&tab).cloned()
    }
}
