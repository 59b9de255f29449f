//! Application settings
//!
//! Settings live in a JSON file under the user config dir and every field
//! has a default, so a missing or partial file always yields a usable
//! configuration. Environment variables override the file for the endpoint
//! URLs (useful for pointing the CLI at a staging deployment).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const SETTINGS_FILE_NAME: &str = "settings.json";

pub const DEFAULT_STT_URL: &str = "https://toolkit.rork.com/stt/transcribe/";
pub const DEFAULT_TEXT_URL: &str = "https://toolkit.rork.com/text/llm/";
pub const DEFAULT_OBJECT_URL: &str = "https://toolkit.rork.com/text/object/";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Speech-to-text endpoint (multipart upload).
    pub stt_url: String,

    /// Free-text completion endpoint used for study-note generation.
    pub text_url: String,

    /// Structured-object endpoint used for the pasted-text flow.
    pub object_url: String,

    /// Language hint passed to note generation. "Auto detect" maps to
    /// English in the prompt.
    pub language: String,

    /// Retries after the initial attempt for the transcription upload.
    pub max_retries: u32,

    /// Base delay for the linear backoff between retries.
    pub retry_base_delay_ms: u64,

    /// Per-request timeout for the transcription upload.
    pub request_timeout_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            stt_url: DEFAULT_STT_URL.to_string(),
            text_url: DEFAULT_TEXT_URL.to_string(),
            object_url: DEFAULT_OBJECT_URL.to_string(),
            language: "Auto detect".to_string(),
            max_retries: 2,
            retry_base_delay_ms: 2000,
            request_timeout_secs: 180,
        }
    }
}

impl AppSettings {
    /// Apply `FEYNMAN_STT_URL`, `FEYNMAN_TEXT_URL` and `FEYNMAN_OBJECT_URL`
    /// overrides from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("FEYNMAN_STT_URL") {
            self.stt_url = url;
        }
        if let Ok(url) = std::env::var("FEYNMAN_TEXT_URL") {
            self.text_url = url;
        }
        if let Ok(url) = std::env::var("FEYNMAN_OBJECT_URL") {
            self.object_url = url;
        }
        self
    }

    pub fn retry_policy(&self) -> crate::transcription::RetryPolicy {
        crate::transcription::RetryPolicy {
            max_retries: self.max_retries,
            base_delay_ms: self.retry_base_delay_ms,
        }
    }
}

fn settings_path() -> Result<PathBuf, String> {
    let dir = dirs::config_dir().ok_or("Could not determine config directory")?;
    Ok(dir.join("feynman-notes").join(SETTINGS_FILE_NAME))
}

pub fn load_settings() -> AppSettings {
    let path = match settings_path() {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("Settings: {}", e);
            return AppSettings::default();
        }
    };
    load_from(&path)
}

fn load_from(path: &std::path::Path) -> AppSettings {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<AppSettings>(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Settings: failed to parse {:?}: {}", path, e);
                AppSettings::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppSettings::default(),
        Err(e) => {
            tracing::warn!("Settings: failed to read {:?}: {}", path, e);
            AppSettings::default()
        }
    }
}

/// Persist the settings to the default location, returning the path written.
pub fn save_settings(settings: &AppSettings) -> Result<PathBuf, String> {
    let path = settings_path()?;
    save_to(settings, &path)?;
    Ok(path)
}

fn save_to(settings: &AppSettings, path: &std::path::Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory {:?}: {}", parent, e))?;
    }

    let contents =
        serde_json::to_string_pretty(settings).map_err(|e| format!("Serialize settings: {}", e))?;

    // Write atomically: write to a temp file in the same directory, then rename.
    // This prevents partial/corrupt settings.json if the app crashes mid-write.
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &contents)
        .map_err(|e| format!("Write temp settings {:?}: {}", tmp_path, e))?;

    // On Unix, rename will atomically replace the destination. On Windows, rename
    // fails if the destination exists, so we remove it first (ignoring NotFound).
    if cfg!(windows) {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(format!("Remove existing settings file {:?}: {}", path, e));
                }
            }
        }
    }

    std::fs::rename(&tmp_path, &path)
        .map_err(|e| format!("Rename temp settings {:?} to {:?}: {}", tmp_path, path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_production_endpoints() {
        let settings = AppSettings::default();
        assert_eq!(settings.stt_url, DEFAULT_STT_URL);
        assert_eq!(settings.language, "Auto detect");
        assert_eq!(settings.max_retries, 2);
        assert_eq!(settings.retry_base_delay_ms, 2000);
    }

    #[test]
    fn partial_settings_file_fills_in_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{ "language": "Spanish" }"#).unwrap();
        assert_eq!(settings.language, "Spanish");
        assert_eq!(settings.stt_url, DEFAULT_STT_URL);
        assert_eq!(settings.request_timeout_secs, 180);
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let settings = AppSettings {
            language: "German".to_string(),
            max_retries: 4,
            ..Default::default()
        };
        save_to(&settings, &path).unwrap();

        let loaded = load_from(&path);
        assert_eq!(loaded.language, "German");
        assert_eq!(loaded.max_retries, 4);
        assert_eq!(loaded.stt_url, DEFAULT_STT_URL);
    }

    #[test]
    fn missing_settings_file_loads_defaults() {
        let loaded = load_from(std::path::Path::new("/nonexistent/settings.json"));
        assert_eq!(loaded.language, "Auto detect");
    }

    #[test]
    fn retry_policy_reflects_settings() {
        let settings = AppSettings {
            max_retries: 5,
            retry_base_delay_ms: 10,
            ..Default::default()
        };
        let policy = settings.retry_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.base_delay_ms, 10);
    }
}
