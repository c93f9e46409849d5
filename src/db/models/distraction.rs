use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scan cycle whose similarity score fell below the active threshold.
/// `summary` keeps a short excerpt of the page summary that triggered the
/// alert so the stats view can show what the distraction was.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distraction {
    pub id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub score: f64,
    pub threshold: f64,
    pub summary: Option<String>,
}
