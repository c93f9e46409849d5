use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// Where the summarization requests go. Any OpenAI-compatible chat
/// completions endpoint works; with no API key configured, summarization
/// stays disabled and scans produce no signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerSettings {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".into(),
            api_key: String::new(),
            model: "gpt-4o-mini".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSettings {
    /// Local port the browser companion connects to.
    pub port: u16,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self { port: 9476 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct UserSettings {
    #[serde(default)]
    summarizer: SummarizerSettings,
    #[serde(default)]
    bridge: BridgeSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn summarizer(&self) -> SummarizerSettings {
        self.data.read().unwrap().summarizer.clone()
    }

    pub fn bridge(&self) -> BridgeSettings {
        self.data.read().unwrap().bridge.clone()
    }

    pub fn update_summarizer(&self, settings: SummarizerSettings) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.summarizer = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let store = SettingsStore::new(dir.path().join("settings.json")).expect("store");
        assert!(store.summarizer().api_key.is_empty());
        assert_eq!(store.bridge().port, 9476);
    }

    #[test]
    fn updates_persist_across_reopen() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).expect("store");
        store
            .update_summarizer(SummarizerSettings {
                endpoint: "http://localhost:8080/v1/chat/completions".into(),
                api_key: "sk-test".into(),
                model: "local-llm".into(),
            })
            .expect("update");

        let reopened = SettingsStore::new(path).expect("reopen");
        assert_eq!(reopened.summarizer().api_key, "sk-test");
        assert_eq!(reopened.summarizer().model, "local-llm");
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").expect("write");

        let store = SettingsStore::new(path).expect("store");
        assert!(store.summarizer().api_key.is_empty());
    }
}
