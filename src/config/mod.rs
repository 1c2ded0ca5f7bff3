//! Typed configuration with JSON5 parsing, environment overrides
//! and validation.
//!
//! Resolution order for the config file: explicit `--config` path, then
//! `$OVOZBOT_CONFIG`, then `./ovozbot.json5`, then
//! `<config dir>/ovozbot/config.json5`. A missing file is not an error;
//! defaults plus environment variables may be a complete configuration
//! on their own.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::tts::{DEFAULT_FEMALE_VOICE, DEFAULT_MALE_VOICE};

/// Project config file name when sitting next to the binary.
const LOCAL_CONFIG_FILE: &str = "ovozbot.json5";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid {var}: {message}")]
    Env { var: String, message: String },
}

/// Validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Telegram transport configuration
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// User ids allowed to run admin commands
    #[serde(default)]
    pub admins: Vec<i64>,

    /// Voice profile database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// TTS service configuration
    #[serde(default)]
    pub tts: TtsConfig,

    /// Staged audio file configuration
    #[serde(default)]
    pub staging: StagingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Telegram transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    /// Bot API token from BotFather
    #[serde(default)]
    pub bot_token: String,

    /// Bot API base URL, overridable for self-hosted gateways
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: default_api_base(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

/// Voice profile database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// SQLite database path, or `:memory:` for ephemeral runs
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "ovozbot.db".to_string()
}

/// TTS service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsConfig {
    /// Synthesis endpoint
    #[serde(default = "default_tts_endpoint")]
    pub endpoint: String,

    /// JSON field holding the hosted audio URL in reference responses
    #[serde(default = "default_url_field")]
    pub url_field: String,

    /// Per-request timeout, also applied to reference downloads
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// Narrator model for the male preference
    #[serde(default = "default_male_voice")]
    pub male_voice: String,

    /// Narrator model for the female preference
    #[serde(default = "default_female_voice")]
    pub female_voice: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_tts_endpoint(),
            url_field: default_url_field(),
            timeout_secs: default_tts_timeout(),
            male_voice: default_male_voice(),
            female_voice: default_female_voice(),
        }
    }
}

impl TtsConfig {
    pub fn voice_table(&self) -> crate::tts::VoiceTable {
        crate::tts::VoiceTable {
            male: self.male_voice.clone(),
            female: self.female_voice.clone(),
        }
    }
}

fn default_tts_endpoint() -> String {
    "https://play.ht/api/transcribe".to_string()
}

fn default_url_field() -> String {
    "file".to_string()
}

fn default_tts_timeout() -> u64 {
    30
}

fn default_male_voice() -> String {
    DEFAULT_MALE_VOICE.to_string()
}

fn default_female_voice() -> String {
    DEFAULT_FEMALE_VOICE.to_string()
}

/// Staged audio file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagingConfig {
    /// Directory for staged audio files awaiting upload
    #[serde(default = "default_staging_dir")]
    pub dir: PathBuf,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: default_staging_dir(),
        }
    }
}

fn default_staging_dir() -> PathBuf {
    std::env::temp_dir().join("ovozbot")
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Log level filter, e.g. `info` or `ovozbot=debug,info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Config {
    /// Parse a JSON5 document into a config.
    pub fn from_json5(raw: &str) -> Result<Self, String> {
        json5::from_str(raw).map_err(|e| e.to_string())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.telegram.bot_token.trim().is_empty() {
            errors.push(ValidationError {
                path: "telegram.botToken".to_string(),
                message: "bot token is required (config or OVOZBOT_BOT_TOKEN)".to_string(),
            });
        }

        if let Err(e) = check_http_url(&self.telegram.api_base) {
            errors.push(ValidationError {
                path: "telegram.apiBase".to_string(),
                message: e,
            });
        }

        if let Err(e) = check_http_url(&self.tts.endpoint) {
            errors.push(ValidationError {
                path: "tts.endpoint".to_string(),
                message: e,
            });
        }

        if self.tts.url_field.is_empty() {
            errors.push(ValidationError {
                path: "tts.urlField".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        if self.tts.timeout_secs == 0 || self.tts.timeout_secs > 300 {
            errors.push(ValidationError {
                path: "tts.timeoutSecs".to_string(),
                message: format!("{} is out of range (1..=300)", self.tts.timeout_secs),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn check_http_url(value: &str) -> Result<(), String> {
    let parsed = Url::parse(value).map_err(|e| e.to_string())?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme {other:?}")),
    }
}

/// Resolve the config file path, if any exists.
pub fn resolve_config_path(cli_override: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_override {
        return Some(path.to_path_buf());
    }

    if let Some(path) = std::env::var_os("OVOZBOT_CONFIG") {
        return Some(PathBuf::from(path));
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    let user = dirs::config_dir()?.join("ovozbot").join("config.json5");
    if user.exists() {
        return Some(user);
    }

    None
}

/// Load configuration from file and environment.
pub fn load(cli_override: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match resolve_config_path(cli_override) {
        Some(path) => {
            let shown = path.display().to_string();
            let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: shown.clone(),
                source,
            })?;
            Config::from_json5(&raw).map_err(|message| ConfigError::Parse {
                path: shown,
                message,
            })?
        }
        None => Config::default(),
    };

    apply_overrides(&mut config, |var| std::env::var(var).ok())?;
    Ok(config)
}

/// Apply environment overrides through a lookup closure.
fn apply_overrides(
    config: &mut Config,
    get: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(token) = get("OVOZBOT_BOT_TOKEN").or_else(|| get("BOT_TOKEN")) {
        config.telegram.bot_token = token;
    }

    let admin_ids = ["OVOZBOT_ADMIN_IDS", "ADMIN_IDS"]
        .iter()
        .find_map(|var| get(var).map(|raw| (*var, raw)));
    if let Some((var, raw)) = admin_ids {
        let mut admins = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let id: i64 = entry.parse().map_err(|_| ConfigError::Env {
                var: var.to_string(),
                message: format!("{entry:?} is not a user id"),
            })?;
            admins.push(id);
        }
        config.admins = admins;
    }

    if let Some(path) = get("OVOZBOT_DB_PATH") {
        config.database.path = path;
    }

    Ok(())
}
