use log::error;
use serde::Serialize;
use tauri::{AppHandle, Emitter};
use tauri_plugin_notification::NotificationExt;

use crate::db::models::{Distraction, Session};
use crate::tracker::state::TrackerSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertPriority {
    Normal,
    High,
}

/// A user-facing alert: title, body, priority and an optional action the
/// user can take from the notification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub title: String,
    pub body: String,
    pub priority: AlertPriority,
    pub action: Option<String>,
}

impl Alert {
    pub fn drift() -> Self {
        Self {
            title: "⚠️ Stay Focused!".to_string(),
            body: "The content you are viewing may not align with your goal.".to_string(),
            priority: AlertPriority::High,
            action: Some("Get Back on Track".to_string()),
        }
    }

    pub fn times_up() -> Self {
        Self {
            title: "⏰ Time's Up!".to_string(),
            body: "Great job! Your tracking session has ended.".to_string(),
            priority: AlertPriority::High,
            action: None,
        }
    }
}

/// Outbound side of the tracker: UI events and desktop notifications.
///
/// A trait so the controller can run (and be tested) without a Tauri
/// runtime behind it.
pub trait EventSink: Send + Sync {
    fn state_changed(&self, snapshot: &TrackerSnapshot);
    fn heartbeat(&self, snapshot: &TrackerSnapshot);
    fn session_completed(&self, session: &Session);
    fn distraction_detected(&self, distraction: &Distraction);
    fn notify(&self, alert: &Alert);
}

#[derive(Serialize, Clone)]
struct SessionCompletedEvent<'a> {
    session_id: &'a str,
    session: &'a Session,
}

/// Production sink: Tauri events toward the window, plus OS notifications
/// for alerts. Emission is fire-and-forget; a closed window just means
/// nobody is listening right now.
pub struct TauriEventSink {
    app: AppHandle,
}

impl TauriEventSink {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl EventSink for TauriEventSink {
    fn state_changed(&self, snapshot: &TrackerSnapshot) {
        let _ = self.app.emit("tracking-state-changed", snapshot);
    }

    fn heartbeat(&self, snapshot: &TrackerSnapshot) {
        let _ = self.app.emit("tracking-heartbeat", snapshot);
    }

    fn session_completed(&self, session: &Session) {
        let payload = SessionCompletedEvent {
            session_id: &session.id,
            session,
        };
        let _ = self.app.emit("session-completed", payload);
    }

    fn distraction_detected(&self, distraction: &Distraction) {
        let _ = self.app.emit("distraction-detected", distraction);
    }

    fn notify(&self, alert: &Alert) {
        // Desktop notifications have no action buttons; the window gets
        // the full alert (action label included) as an event instead.
        let _ = self.app.emit("alert", alert);

        let result = self
            .app
            .notification()
            .builder()
            .title(&alert.title)
            .body(&alert.body)
            .show();
        if let Err(err) = result {
            error!("failed to show notification: {err}");
        }
    }
}
