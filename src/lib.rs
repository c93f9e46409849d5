mod analysis;
mod db;
mod events;
mod inference;
mod scan;
mod settings;
mod tracker;
mod utils;

use std::sync::Arc;

use chrono::Utc;
use log::warn;
use tauri::{Manager, State};
use tokio::sync::mpsc;

use analysis::{
    AnalysisConfig, AnalysisPipeline, RecursiveSummarizer, SimilarityScorer, Summarizer,
    TokenEstimator,
};
use db::Database;
use events::TauriEventSink;
use inference::{CloudSummaryModel, FastEmbedder};
use scan::{PageBridge, ScanScheduler};
use settings::{SettingsStore, SummarizerSettings};
use tracker::{
    commands::{
        delete_session, get_distractions_for_session, get_tracking_state, list_sessions,
        start_tracking, stop_tracking,
    },
    TrackerController,
};

pub(crate) struct AppState {
    pub(crate) db: Database,
    pub(crate) tracker: TrackerController,
    pub(crate) settings: SettingsStore,
}

#[tauri::command]
fn get_summarizer_settings(state: State<AppState>) -> Result<SummarizerSettings, String> {
    Ok(state.settings.summarizer())
}

/// Persist new summarizer settings. The live pipeline keeps the backend it
/// was built with; the change applies on the next app start.
#[tauri::command]
fn set_summarizer_settings(
    settings: SummarizerSettings,
    state: State<AppState>,
) -> Result<(), String> {
    state
        .settings
        .update_summarizer(settings)
        .map_err(|e| e.to_string())
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Locked In starting up...");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_notification::init())
        .setup(|app| {
            let result = (|| -> anyhow::Result<()> {
                let app_data_dir = app
                    .path()
                    .app_data_dir()
                    .map_err(|err| anyhow::anyhow!(err))?;
                std::fs::create_dir_all(&app_data_dir)?;

                let db_path = app_data_dir.join("lockedin.sqlite3");
                let database = Database::new(db_path)?;

                // Close out sessions a previous process left running.
                {
                    let db_for_recovery = database.clone();
                    tauri::async_runtime::block_on(async move {
                        let now = Utc::now();
                        for session in db_for_recovery.get_incomplete_sessions().await? {
                            warn!(
                                "Recovered incomplete session {}; marking as Interrupted",
                                session.id
                            );
                            db_for_recovery
                                .mark_session_interrupted(&session.id, now)
                                .await?;
                        }
                        Ok::<(), anyhow::Error>(())
                    })?;
                }

                let settings_path = app_data_dir.join("settings.json");
                let settings_store = SettingsStore::new(settings_path)?;

                let summary_model = Arc::new(CloudSummaryModel::new(&settings_store.summarizer())?);
                let embedder = Arc::new(FastEmbedder::new(app_data_dir.join("fastembed")));

                let pipeline = AnalysisPipeline::new(
                    RecursiveSummarizer::new(
                        Summarizer::new(summary_model),
                        TokenEstimator::probe(None),
                        AnalysisConfig::default(),
                    ),
                    SimilarityScorer::new(embedder),
                );

                let (content_tx, content_rx) = mpsc::channel(32);
                let (events_tx, events_rx) = mpsc::channel(32);

                let bridge = Arc::new(PageBridge::new(settings_store.bridge().port, events_tx));
                let scheduler = Arc::new(ScanScheduler::new(bridge.clone(), content_tx));

                let sink = Arc::new(TauriEventSink::new(app.handle().clone()));
                let tracker =
                    TrackerController::new(database.clone(), scheduler, Arc::new(pipeline), sink);

                {
                    let tracker_for_workers = tracker.clone();
                    let bridge_for_server = bridge.clone();
                    tauri::async_runtime::block_on(async move {
                        tracker_for_workers.spawn_workers(content_rx, events_rx);
                        tokio::spawn(async move {
                            if let Err(err) = bridge_for_server.run().await {
                                log::error!("page bridge failed: {err}");
                            }
                        });
                    });
                }

                app.manage(AppState {
                    db: database,
                    tracker,
                    settings: settings_store,
                });

                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .invoke_handler(tauri::generate_handler![
            get_tracking_state,
            start_tracking,
            stop_tracking,
            list_sessions,
            get_distractions_for_session,
            delete_session,
            get_summarizer_settings,
            set_summarizer_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
