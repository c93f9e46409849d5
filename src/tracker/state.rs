use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp;
use std::time::Instant;

use crate::db::models::TrackingMode;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrackerStatus {
    Idle,
    Running,
}

impl Default for TrackerStatus {
    fn default() -> Self {
        TrackerStatus::Idle
    }
}

/// The live tracking state. Exactly one of these exists, owned by the
/// controller; every mutation goes through its transition methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerState {
    pub status: TrackerStatus,
    pub session_id: Option<String>,
    pub goal: String,
    pub mode: TrackingMode,
    pub target_ms: u64,
    pub distractions: u32,
    pub started_at: Option<DateTime<Utc>>,
    /// Monotonic anchor for elapsed-time math; wall clocks can jump.
    #[serde(skip)]
    pub running_anchor: Option<Instant>,
}

impl Default for TrackerState {
    fn default() -> Self {
        Self {
            status: TrackerStatus::Idle,
            session_id: None,
            goal: String::new(),
            mode: TrackingMode::Broad,
            target_ms: 0,
            distractions: 0,
            started_at: None,
            running_anchor: None,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSnapshot {
    pub state: TrackerState,
    pub remaining_ms: i64,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.status == TrackerStatus::Running
    }

    pub fn elapsed_ms(&self) -> u64 {
        match (self.status, self.running_anchor) {
            (TrackerStatus::Running, Some(anchor)) => anchor.elapsed().as_millis() as u64,
            _ => 0,
        }
    }

    pub fn remaining_ms(&self) -> i64 {
        match self.status {
            TrackerStatus::Idle => 0,
            TrackerStatus::Running => {
                let remaining = self.target_ms as i64 - self.elapsed_ms() as i64;
                cmp::max(remaining, 0)
            }
        }
    }

    pub fn begin_session(
        &mut self,
        session_id: String,
        goal: String,
        mode: TrackingMode,
        target_ms: u64,
        started_at: DateTime<Utc>,
        now: Instant,
    ) {
        *self = Self {
            status: TrackerStatus::Running,
            session_id: Some(session_id),
            goal,
            mode,
            target_ms,
            distractions: 0,
            started_at: Some(started_at),
            running_anchor: Some(now),
        };
    }

    /// Back to Idle; the finalized session record carries everything worth
    /// keeping.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_idle() {
        let state = TrackerState::new();
        assert_eq!(state.status, TrackerStatus::Idle);
        assert_eq!(state.remaining_ms(), 0);
        assert_eq!(state.elapsed_ms(), 0);
    }

    #[test]
    fn begin_session_transitions_to_running() {
        let mut state = TrackerState::new();
        state.begin_session(
            "abc".into(),
            "Learn Go".into(),
            TrackingMode::Specific,
            25 * 60 * 1000,
            Utc::now(),
            Instant::now(),
        );

        assert!(state.is_running());
        assert_eq!(state.goal, "Learn Go");
        assert_eq!(state.distractions, 0);
        let remaining = state.remaining_ms();
        assert!(remaining > 0 && remaining <= 25 * 60 * 1000);
    }

    #[test]
    fn reset_clears_everything() {
        let mut state = TrackerState::new();
        state.begin_session(
            "abc".into(),
            "goal".into(),
            TrackingMode::Broad,
            60_000,
            Utc::now(),
            Instant::now(),
        );
        state.distractions = 4;

        state.reset();
        assert_eq!(state.status, TrackerStatus::Idle);
        assert!(state.session_id.is_none());
        assert_eq!(state.distractions, 0);
        assert!(state.goal.is_empty());
    }
}
