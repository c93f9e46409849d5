use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::extractor::{extract_visible_text, PageSnapshot};

// Set to false to silence per-tick logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// First scan fires this long after a tab is armed.
const INITIAL_SCAN_DELAY_SECS: u64 = 10;
/// Subsequent scans repeat at this period.
const SCAN_INTERVAL_SECS: u64 = 10;

pub type TabId = u32;

/// Visible text pulled out of one tab during one scan cycle.
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub tab_id: TabId,
    pub text: String,
}

/// Read-only access to the freshest page snapshot for a tab. Delivery from
/// the page side is at-most-once, so a tab may simply have nothing yet.
#[async_trait]
pub trait PageAccessor: Send + Sync {
    async fn snapshot(&self, tab: TabId) -> Option<PageSnapshot>;
}

struct TabScan {
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

/// Per-tab scan timers.
///
/// Each armed tab runs one delay-then-interval loop that extracts visible
/// text and forwards it to the analysis side. Arming an already armed tab
/// is a logged no-op; pausing cancels both timers, and re-arming later
/// starts the full delay sequence from scratch.
pub struct ScanScheduler {
    accessor: Arc<dyn PageAccessor>,
    content_tx: mpsc::Sender<ExtractedContent>,
    tabs: Mutex<HashMap<TabId, TabScan>>,
}

impl ScanScheduler {
    pub fn new(accessor: Arc<dyn PageAccessor>, content_tx: mpsc::Sender<ExtractedContent>) -> Self {
        Self {
            accessor,
            content_tx,
            tabs: Mutex::new(HashMap::new()),
        }
    }

    /// Arm the scan timers for a tab. No-op if the tab is already armed.
    pub async fn arm(&self, tab: TabId) {
        let mut tabs = self.tabs.lock().await;
        if tabs.contains_key(&tab) {
            log_warn!("scan already scheduled for tab {tab}");
            return;
        }

        let cancel = CancellationToken::new();
        let worker = tokio::spawn(scan_loop(
            tab,
            self.accessor.clone(),
            self.content_tx.clone(),
            cancel.clone(),
        ));

        tabs.insert(tab, TabScan { cancel, worker });
        log_info!("scan armed for tab {tab}");
    }

    /// Cancel the timers for a tab, if any. Safe to call repeatedly.
    pub async fn pause(&self, tab: TabId) {
        let scan = self.tabs.lock().await.remove(&tab);
        if let Some(scan) = scan {
            scan.cancel.cancel();
            let _ = scan.worker.await;
            log_info!("scan paused for tab {tab}");
        }
    }

    /// Cancel the timers for every armed tab.
    pub async fn pause_all(&self) {
        let drained: Vec<TabScan> = self.tabs.lock().await.drain().map(|(_, scan)| scan).collect();
        for scan in drained {
            scan.cancel.cancel();
            let _ = scan.worker.await;
        }
        log_info!("all scans paused");
    }

    pub async fn armed_count(&self) -> usize {
        self.tabs.lock().await.len()
    }
}

async fn scan_loop(
    tab: TabId,
    accessor: Arc<dyn PageAccessor>,
    content_tx: mpsc::Sender<ExtractedContent>,
    cancel: CancellationToken,
) {
    // One-shot initial delay, then the repeating interval.
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(INITIAL_SCAN_DELAY_SECS)) => {}
        _ = cancel.cancelled() => return,
    }

    perform_scan(tab, accessor.as_ref(), &content_tx).await;

    let period = Duration::from_secs(SCAN_INTERVAL_SECS);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                perform_scan(tab, accessor.as_ref(), &content_tx).await;
            }
            _ = cancel.cancelled() => {
                log_info!("scan loop for tab {tab} shutting down");
                break;
            }
        }
    }
}

async fn perform_scan(
    tab: TabId,
    accessor: &dyn PageAccessor,
    content_tx: &mpsc::Sender<ExtractedContent>,
) {
    let Some(snapshot) = accessor.snapshot(tab).await else {
        log_info!("no snapshot available for tab {tab}; skipping scan");
        return;
    };

    let text = extract_visible_text(&snapshot);
    if text.is_empty() {
        log_info!("tab {tab} has no visible text; skipping scan");
        return;
    }

    log_info!("tab {tab}: extracted {} chars", text.chars().count());

    if content_tx
        .send(ExtractedContent { tab_id: tab, text })
        .await
        .is_err()
    {
        log_warn!("content receiver dropped; scan result discarded");
    }
}
