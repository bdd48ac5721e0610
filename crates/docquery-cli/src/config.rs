use std::path::{Path, PathBuf};
use std::time::Duration;

use docquery_core::store_names::{validate_prefix, STORE_NAME_PREFIX};
use docquery_gemini::client::{
    ClientOptions, DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_UPLOAD_BASE_URL,
};
use docquery_gemini::operations::{PollSettings, DEFAULT_OPERATION_TIMEOUT, DEFAULT_POLL_INTERVAL};
use serde::{Deserialize, Serialize};

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
const CURRENT_VERSION: u32 = 1;

/// Environment variable holding the API key. The key is never written to
/// the config file.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub const MODEL_OPTIONS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
    "gemini-2.5-pro",
    "gemini-3-pro-preview",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Schema version. Missing or 0 = pre-versioned config.
    pub config_version: u32,
    pub store_name_prefix: String,
    pub poll_interval_secs: u64,
    pub upload_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub models: Vec<String>,
    pub default_model: String,
    pub api_base_url: String,
    pub upload_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_version: CURRENT_VERSION,
            store_name_prefix: STORE_NAME_PREFIX.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            upload_timeout_secs: DEFAULT_OPERATION_TIMEOUT.as_secs(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            models: MODEL_OPTIONS.iter().map(|m| m.to_string()).collect(),
            default_model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.to_string(),
        }
    }
}

impl Settings {
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_interval_secs),
            timeout: Duration::from_secs(self.upload_timeout_secs),
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            api_base_url: self.api_base_url.clone(),
            upload_base_url: self.upload_base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn supports_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        validate_prefix(&self.store_name_prefix)?;

        if self.poll_interval_secs == 0 {
            return Err(eyre::eyre!("poll_interval_secs must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(eyre::eyre!("request_timeout_secs must be at least 1"));
        }
        if self.upload_timeout_secs < self.poll_interval_secs {
            return Err(eyre::eyre!(
                "upload_timeout_secs ({}) is shorter than poll_interval_secs ({})",
                self.upload_timeout_secs,
                self.poll_interval_secs
            ));
        }
        if self.models.is_empty() {
            return Err(eyre::eyre!("at least one model must be configured"));
        }
        if !self.supports_model(&self.default_model) {
            return Err(eyre::eyre!(
                "default_model {} is not in the configured models",
                self.default_model
            ));
        }
        Ok(())
    }
}

fn config_dir() -> eyre::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| eyre::eyre!("no config directory found"))?;
    Ok(base.join("docquery"))
}

pub fn config_path() -> eyre::Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

/// Load settings from the user config directory, or defaults when no file
/// exists.
pub fn load_settings() -> eyre::Result<Settings> {
    load_settings_from(&config_path()?)
}

pub fn load_settings_from(path: &Path) -> eyre::Result<Settings> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Settings::default());
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;

    // Parse as raw JSON so we can run migrations before deserializing.
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    let on_disk_version = json
        .get("config_version")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;

    let migrated = migrate(json, on_disk_version)?;
    let settings: Settings = serde_json::from_value(migrated)?;
    settings.validate()?;
    Ok(settings)
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
fn migrate(mut json: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update docquery."
        ));
    }

    // v0 → v1: configs written before versioning; stamp the version.
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| eyre::eyre!("config is not a JSON object"))?;
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(1.into()),
        );
        tracing::info!("migrated config v0 → v1");
    }

    Ok(json)
}

pub fn save_settings(settings: &Settings) -> eyre::Result<PathBuf> {
    save_settings_to(settings, &config_dir()?)
}

pub fn save_settings_to(settings: &Settings, dir: &Path) -> eyre::Result<PathBuf> {
    settings.validate()?;
    std::fs::create_dir_all(dir)?;

    // Always write the current version, regardless of what was loaded.
    let mut stamped = settings.clone();
    stamped.config_version = CURRENT_VERSION;

    let path = dir.join("config.json");
    let json = serde_json::to_string_pretty(&stamped)?;

    // Write to a temp file then rename for atomicity
    let tmp_path = dir.join("config.json.tmp");
    std::fs::write(&tmp_path, json.as_bytes())?;
    std::fs::rename(&tmp_path, &path)?;

    tracing::info!(path = %path.display(), "config saved");
    Ok(path)
}
