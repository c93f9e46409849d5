use tauri::State;

use crate::{
    db::models::{Distraction, Session, TrackingMode},
    tracker::{TrackerSnapshot, TrackerState},
};

use crate::AppState;

#[tauri::command]
pub async fn get_tracking_state(state: State<'_, AppState>) -> Result<TrackerSnapshot, String> {
    Ok(state.tracker.get_snapshot().await)
}

#[tauri::command]
pub async fn start_tracking(
    state: State<'_, AppState>,
    goal: String,
    mode: Option<TrackingMode>,
    duration_minutes: u32,
) -> Result<TrackerState, String> {
    state
        .tracker
        .start_tracking(goal, mode, duration_minutes)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn stop_tracking(state: State<'_, AppState>) -> Result<Option<Session>, String> {
    state.tracker.stop_tracking().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn list_sessions(state: State<'_, AppState>) -> Result<Vec<Session>, String> {
    state.db.list_sessions().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_distractions_for_session(
    state: State<'_, AppState>,
    session_id: String,
) -> Result<Vec<Distraction>, String> {
    state
        .db
        .get_distractions_for_session(&session_id)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn delete_session(state: State<'_, AppState>, session_id: String) -> Result<(), String> {
    state
        .db
        .delete_session(&session_id)
        .await
        .map_err(|e| e.to_string())
}
