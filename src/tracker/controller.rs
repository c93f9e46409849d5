use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Result};
use chrono::Utc;
use log::{debug, error, info};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
    time,
};
use uuid::Uuid;

use crate::{
    analysis::{threshold_for, ContentAnalyzer},
    db::{
        models::{Distraction, Session, SessionStatus, TrackingMode},
        Database,
    },
    events::{Alert, EventSink},
    scan::{ExtractedContent, ScanScheduler, TabEvent, TabId},
};

use super::state::{TrackerSnapshot, TrackerState};

/// Distraction records keep at most this much of the scored summary.
const DISTRACTION_SUMMARY_MAX_CHARS: usize = 200;

enum StopReason {
    Manual,
    TimerElapsed,
}

/// Owns the tracking lifecycle: one session at a time, Idle to Running and
/// back. Start validates input, records the session and arms scanning;
/// stop is idempotent and finalizes exactly one history record. Content
/// arriving between the two is scored against the goal, and sub-threshold
/// scores become distractions.
#[derive(Clone)]
pub struct TrackerController {
    state: Arc<Mutex<TrackerState>>,
    db: Database,
    scheduler: Arc<ScanScheduler>,
    analyzer: Arc<dyn ContentAnalyzer>,
    events: Arc<dyn EventSink>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
    visible_tabs: Arc<Mutex<HashSet<TabId>>>,
}

impl TrackerController {
    pub fn new(
        db: Database,
        scheduler: Arc<ScanScheduler>,
        analyzer: Arc<dyn ContentAnalyzer>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let debug_mode = std::env::var("LOCKEDIN_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            state: Arc::new(Mutex::new(TrackerState::new())),
            db,
            scheduler,
            analyzer,
            events,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: if debug_mode { 1 } else { 10 },
            visible_tabs: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn get_state(&self) -> TrackerState {
        self.state.lock().await.clone()
    }

    pub async fn get_snapshot(&self) -> TrackerSnapshot {
        let guard = self.state.lock().await;
        TrackerSnapshot {
            remaining_ms: guard.remaining_ms(),
            state: guard.clone(),
        }
    }

    /// Wire the inbound channels: extracted content from the scan loops and
    /// tab lifecycle events from the bridge.
    pub fn spawn_workers(
        &self,
        mut content_rx: mpsc::Receiver<ExtractedContent>,
        mut events_rx: mpsc::Receiver<TabEvent>,
    ) {
        let me = self.clone();
        tokio::spawn(async move {
            while let Some(content) = content_rx.recv().await {
                me.on_content_received(content).await;
            }
        });

        let me = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                me.handle_tab_event(event).await;
            }
        });
    }

    pub async fn start_tracking(
        &self,
        goal: String,
        mode: Option<TrackingMode>,
        duration_minutes: u32,
    ) -> Result<TrackerState> {
        let goal = goal.trim().to_string();
        if goal.is_empty() {
            return Err(anyhow!("goal text must not be empty"));
        }
        if duration_minutes == 0 {
            return Err(anyhow!("duration must be greater than zero"));
        }

        self.start_with_target(goal, mode.unwrap_or_default(), u64::from(duration_minutes) * 60_000)
            .await
    }

    async fn start_with_target(
        &self,
        goal: String,
        mode: TrackingMode,
        target_ms: u64,
    ) -> Result<TrackerState> {
        {
            let state = self.state.lock().await;
            if state.is_running() {
                return Err(anyhow!("tracking already active"));
            }
        }

        let session_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();

        let session = Session {
            id: session_id.clone(),
            goal: goal.clone(),
            mode,
            started_at,
            stopped_at: None,
            status: SessionStatus::Running,
            target_ms,
            duration_ms: 0,
            distractions: 0,
            created_at: started_at,
            updated_at: started_at,
        };

        self.db.insert_session(&session).await?;

        {
            let mut state = self.state.lock().await;
            state.begin_session(
                session_id.clone(),
                goal,
                mode,
                target_ms,
                started_at,
                Instant::now(),
            );
        }

        // Tabs already on screen start scanning now; tabs loaded later are
        // armed as their events come in.
        let visible: Vec<TabId> = self.visible_tabs.lock().await.iter().copied().collect();
        for tab in visible {
            self.scheduler.arm(tab).await;
        }

        self.spawn_ticker().await;
        self.emit_state_changed().await;

        info!("tracking started (session {session_id})");
        Ok(self.get_state().await)
    }

    /// Stop the current session, if any. Idempotent: stopping while idle is
    /// a no-op and returns `None`.
    pub async fn stop_tracking(&self) -> Result<Option<Session>> {
        self.stop_with_reason(StopReason::Manual).await
    }

    async fn stop_with_reason(&self, reason: StopReason) -> Result<Option<Session>> {
        let stopped_at = Utc::now();

        let snapshot = {
            let mut state = self.state.lock().await;
            if !state.is_running() {
                info!("stop requested while idle; nothing to do");
                return Ok(None);
            }

            let session_id = state
                .session_id
                .clone()
                .ok_or_else(|| anyhow!("missing session id"))?;
            let started_at = state.started_at.unwrap_or_else(Utc::now);

            let session = Session {
                id: session_id,
                goal: state.goal.clone(),
                mode: state.mode,
                started_at,
                stopped_at: Some(stopped_at),
                status: SessionStatus::Completed,
                target_ms: state.target_ms,
                duration_ms: state.elapsed_ms(),
                distractions: state.distractions,
                created_at: started_at,
                updated_at: stopped_at,
            };

            state.reset();
            session
        };

        self.scheduler.pause_all().await;

        // On timer expiry the ticker task is the caller and exits on its
        // own; aborting it here would kill this very call mid-flight.
        if matches!(reason, StopReason::Manual) {
            self.cancel_ticker().await;
        }

        self.db
            .finalize_session(
                &snapshot.id,
                SessionStatus::Completed,
                stopped_at,
                snapshot.duration_ms,
                snapshot.distractions,
            )
            .await?;

        if matches!(reason, StopReason::TimerElapsed) {
            self.events.notify(&Alert::times_up());
        }

        self.emit_state_changed().await;
        self.events.session_completed(&snapshot);

        info!("tracking stopped (session {})", snapshot.id);
        Ok(Some(snapshot))
    }

    /// Score one piece of extracted content against the goal. Content that
    /// arrives while idle, or whose session ended while the model ran, is
    /// discarded as stale.
    pub async fn on_content_received(&self, content: ExtractedContent) {
        let (goal, session_id) = {
            let state = self.state.lock().await;
            if !state.is_running() {
                debug!("content received while idle; discarding");
                return;
            }
            let Some(session_id) = state.session_id.clone() else {
                return;
            };
            (state.goal.clone(), session_id)
        };

        let Some(verdict) = self.analyzer.analyze(&goal, &content.text).await else {
            debug!("scan of tab {} produced no signal", content.tab_id);
            return;
        };

        // The model call suspended us; a stop may have happened meanwhile.
        // The mode is read back fresh so the threshold reflects the current
        // session, not whatever was live when the scan started.
        let mode = {
            let state = self.state.lock().await;
            if !state.is_running() || state.session_id.as_deref() != Some(session_id.as_str()) {
                debug!("session ended during analysis; discarding result");
                return;
            }
            state.mode
        };

        let threshold = threshold_for(mode);
        if verdict.score >= threshold {
            debug!(
                "tab {} on topic (score {:.3} >= {threshold})",
                content.tab_id, verdict.score
            );
            return;
        }

        info!(
            "distraction on tab {}: score {:.3} below {threshold}",
            content.tab_id, verdict.score
        );

        let now = Utc::now();
        let count = match self
            .db
            .increment_session_distractions(&session_id, now)
            .await
        {
            Ok(count) => count,
            Err(err) => {
                error!("failed to persist distraction count: {err}");
                self.state.lock().await.distractions + 1
            }
        };

        {
            let mut state = self.state.lock().await;
            if state.session_id.as_deref() == Some(session_id.as_str()) {
                state.distractions = count;
            }
        }

        let distraction = Distraction {
            id: Uuid::new_v4().to_string(),
            session_id,
            timestamp: now,
            score: f64::from(verdict.score),
            threshold: f64::from(threshold),
            summary: Some(truncate_chars(&verdict.summary, DISTRACTION_SUMMARY_MAX_CHARS)),
        };
        if let Err(err) = self.db.insert_distraction(&distraction).await {
            error!("failed to persist distraction record: {err}");
        }

        self.events.distraction_detected(&distraction);
        self.events.notify(&Alert::drift());
        self.emit_state_changed().await;
    }

    /// React to tab lifecycle changes from the bridge. Visibility is
    /// tracked even while idle so a later start knows what to arm.
    pub async fn handle_tab_event(&self, event: TabEvent) {
        match event {
            TabEvent::Loaded(tab) => {
                self.visible_tabs.lock().await.insert(tab);
                if self.is_running().await {
                    self.scheduler.arm(tab).await;
                }
            }
            TabEvent::VisibilityChanged(tab, visible) => {
                {
                    let mut tabs = self.visible_tabs.lock().await;
                    if visible {
                        tabs.insert(tab);
                    } else {
                        tabs.remove(&tab);
                    }
                }

                if visible {
                    if self.is_running().await {
                        self.scheduler.arm(tab).await;
                    }
                } else {
                    self.scheduler.pause(tab).await;
                }
            }
        }
    }

    async fn is_running(&self) -> bool {
        self.state.lock().await.is_running()
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let me = self.clone();
        let tick_interval = self.tick_interval;
        let heartbeat_every = self.heartbeat_every_ticks;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            let mut ticks: u32 = 0;
            loop {
                interval.tick().await;

                let (snapshot, remaining) = {
                    let guard = me.state.lock().await;
                    if !guard.is_running() {
                        break;
                    }
                    let remaining = guard.remaining_ms();
                    (
                        TrackerSnapshot {
                            remaining_ms: remaining,
                            state: guard.clone(),
                        },
                        remaining,
                    )
                };

                if remaining <= 0 {
                    if let Err(err) = me.stop_with_reason(StopReason::TimerElapsed).await {
                        error!("failed to stop session on timer completion: {err}");
                    }
                    break;
                }

                ticks = ticks.wrapping_add(1);
                if ticks % heartbeat_every == 0 {
                    me.events.heartbeat(&snapshot);
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    async fn emit_state_changed(&self) {
        let snapshot = self.get_snapshot().await;
        self.events.state_changed(&snapshot);
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}
