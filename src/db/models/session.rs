use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Running,
    Completed,
    Interrupted,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "Running",
            SessionStatus::Completed => "Completed",
            SessionStatus::Interrupted => "Interrupted",
        }
    }
}

/// How strictly page content is compared against the goal. Specific mode
/// uses a higher similarity threshold than Broad, so it flags more drift.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrackingMode {
    Broad,
    Specific,
}

impl TrackingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingMode::Broad => "Broad",
            TrackingMode::Specific => "Specific",
        }
    }
}

impl Default for TrackingMode {
    fn default() -> Self {
        TrackingMode::Broad
    }
}

/// One focus session: the goal the user committed to, when it ran, and how
/// many scans drifted below the similarity threshold while it did.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub goal: String,
    pub mode: TrackingMode,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub target_ms: u64,
    pub duration_ms: u64,
    pub distractions: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
