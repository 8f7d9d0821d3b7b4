//! Configuration – reads/writes `~/.banter/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use banter_runtime::{EngineConfig, parse_slot_time};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Persisted configuration stored in `~/.banter/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Group conversation the engine lives in.  Required.
    #[serde(default)]
    pub chat_id: Option<i64>,

    /// Thread inside the group conversation used for replies and
    /// announcements.
    #[serde(default)]
    pub thread_id: Option<i64>,

    /// Base URL of the OpenAI-compatible model server.
    #[serde(default = "default_inference_url")]
    pub inference_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Optional bearer token for the model server.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_inference_timeout_secs")]
    pub inference_timeout_secs: u64,

    #[serde(default = "default_inference_url")]
    pub embedding_url: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_embedding_timeout_secs")]
    pub embedding_timeout_secs: u64,

    /// Number of recent events kept in memory.
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Base per-author reply interval.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: f64,

    /// Sweep period; also the idle horizon for cooldown entries.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    #[serde(default = "default_vector_capacity")]
    pub vector_capacity: usize,

    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    #[serde(default = "default_true")]
    pub enable_schedule: bool,

    /// `"HH:MM"` local start of the morning window.
    #[serde(default = "default_morning_start")]
    pub morning_start: String,

    /// `"HH:MM"` local start of the evening window.
    #[serde(default = "default_evening_start")]
    pub evening_start: String,

    /// IANA timezone of the announcement slots.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_scheduler_interval_secs")]
    pub scheduler_interval_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("chat_id", &self.chat_id)
            .field("thread_id", &self.thread_id)
            .field("inference_url", &self.inference_url)
            .field("model", &self.model)
            .field(
                "api_key",
                if self.api_key.is_empty() { &"<not set>" } else { &"<redacted>" },
            )
            .field("embedding_url", &self.embedding_url)
            .field("embedding_model", &self.embedding_model)
            .field("context_window", &self.context_window)
            .field("db_path", &self.db_path)
            .field("max_parallel", &self.max_parallel)
            .field("enable_schedule", &self.enable_schedule)
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

fn default_inference_url() -> String {
    "http://localhost:1234".to_string()
}
fn default_model() -> String {
    "local-model".to_string()
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_inference_timeout_secs() -> u64 {
    45
}
fn default_embedding_model() -> String {
    "paraphrase-multilingual-minilm-l12-v2".to_string()
}
fn default_embedding_timeout_secs() -> u64 {
    30
}
fn default_context_window() -> usize {
    250
}
fn default_cooldown_secs() -> f64 {
    2.0
}
fn default_cleanup_interval_secs() -> u64 {
    7200
}
fn default_retention_days() -> u32 {
    30
}
fn default_db_path() -> String {
    "banter_memory.db".to_string()
}
fn default_max_parallel() -> usize {
    4
}
fn default_vector_capacity() -> usize {
    1000
}
fn default_similarity_threshold() -> f32 {
    0.3
}
fn default_true() -> bool {
    true
}
fn default_morning_start() -> String {
    "08:00".to_string()
}
fn default_evening_start() -> String {
    "17:00".to_string()
}
fn default_timezone() -> String {
    "Europe/Moscow".to_string()
}
fn default_scheduler_interval_secs() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chat_id: None,
            thread_id: None,
            inference_url: default_inference_url(),
            model: default_model(),
            api_key: String::new(),
            max_tokens: default_max_tokens(),
            inference_timeout_secs: default_inference_timeout_secs(),
            embedding_url: default_inference_url(),
            embedding_model: default_embedding_model(),
            embedding_timeout_secs: default_embedding_timeout_secs(),
            context_window: default_context_window(),
            cooldown_secs: default_cooldown_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            retention_days: default_retention_days(),
            db_path: default_db_path(),
            max_parallel: default_max_parallel(),
            vector_capacity: default_vector_capacity(),
            similarity_threshold: default_similarity_threshold(),
            enable_schedule: true,
            morning_start: default_morning_start(),
            evening_start: default_evening_start(),
            timezone: default_timezone(),
            scheduler_interval_secs: default_scheduler_interval_secs(),
        }
    }
}

impl Config {
    /// Reject configurations the engine cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chat_id.is_none() {
            return Err(ConfigError::Invalid(
                "chat_id is required (set it in the config file or BANTER_CHAT_ID)".into(),
            ));
        }
        if self.context_window == 0 {
            return Err(ConfigError::Invalid("context_window must be positive".into()));
        }
        if self.max_parallel == 0 {
            return Err(ConfigError::Invalid("max_parallel must be positive".into()));
        }
        self.cooldown()?;
        for (name, secs) in [
            ("cleanup_interval_secs", self.cleanup_interval_secs),
            ("scheduler_interval_secs", self.scheduler_interval_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        for (name, value) in [("morning_start", &self.morning_start), ("evening_start", &self.evening_start)] {
            if parse_slot_time(value).is_none() {
                return Err(ConfigError::Invalid(format!("{name} must be HH:MM, got {value:?}")));
            }
        }
        Ok(())
    }

    /// Base reply interval; rejects negative, non-finite and overflowing values.
    fn cooldown(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(self.cooldown_secs).map_err(|_| {
            ConfigError::Invalid(format!(
                "cooldown_secs must be a non-negative number of seconds, got {}",
                self.cooldown_secs
            ))
        })
    }

    /// Validate and translate into the engine's tunables.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        self.validate()?;
        let slot = |s: &str| {
            parse_slot_time(s).ok_or_else(|| ConfigError::Invalid(format!("bad slot time {s:?}")))
        };
        Ok(EngineConfig {
            conversation_id: self.chat_id.unwrap_or_default(),
            thread_id: self.thread_id,
            context_window: self.context_window,
            max_tokens: self.max_tokens,
            inference_timeout: Duration::from_secs(self.inference_timeout_secs),
            embedding_timeout: Duration::from_secs(self.embedding_timeout_secs),
            max_parallel: self.max_parallel,
            cooldown: self.cooldown()?,
            idle_horizon: Duration::from_secs(self.cleanup_interval_secs),
            retention_days: self.retention_days,
            vector_capacity: self.vector_capacity,
            similarity_threshold: self.similarity_threshold,
            enable_schedule: self.enable_schedule,
            morning_start: slot(&self.morning_start)?,
            evening_start: slot(&self.evening_start)?,
            ..EngineConfig::default()
        })
    }
}

/// Return the config path: `BANTER_CONFIG` or `~/.banter/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("BANTER_CONFIG") {
        return PathBuf::from(p);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".banter").join("config.toml")
}

/// Load the effective config: file (or defaults when absent) plus env.
pub fn load() -> Result<Config, ConfigError> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config file at `path`.  Returns `None` if it does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(toml::from_str(&raw)?))
}

/// Apply `BANTER_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `BANTER_CHAT_ID` | `chat_id` |
/// | `BANTER_THREAD_ID` | `thread_id` |
/// | `BANTER_INFERENCE_URL` | `inference_url` |
/// | `BANTER_MODEL` | `model` |
/// | `BANTER_API_KEY` | `api_key` |
/// | `BANTER_EMBEDDING_URL` | `embedding_url` |
/// | `BANTER_EMBEDDING_MODEL` | `embedding_model` |
/// | `BANTER_DB_PATH` | `db_path` |
/// | `BANTER_TIMEZONE` | `timezone` |
/// | `BANTER_MAX_PARALLEL` | `max_parallel` |
/// | `BANTER_CONTEXT_WINDOW` | `context_window` |
/// | `BANTER_ENABLE_SCHEDULE` | `enable_schedule` |
///
/// Unparseable numeric values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(id) = lookup("BANTER_CHAT_ID").and_then(|v| v.trim().parse().ok()) {
        cfg.chat_id = Some(id);
    }
    if let Some(id) = lookup("BANTER_THREAD_ID").and_then(|v| v.trim().parse().ok()) {
        cfg.thread_id = Some(id);
    }
    if let Some(v) = lookup("BANTER_INFERENCE_URL") {
        cfg.inference_url = v;
    }
    if let Some(v) = lookup("BANTER_MODEL") {
        cfg.model = v;
    }
    if let Some(v) = lookup("BANTER_API_KEY") {
        cfg.api_key = v;
    }
    if let Some(v) = lookup("BANTER_EMBEDDING_URL") {
        cfg.embedding_url = v;
    }
    if let Some(v) = lookup("BANTER_EMBEDDING_MODEL") {
        cfg.embedding_model = v;
    }
    if let Some(v) = lookup("BANTER_DB_PATH") {
        cfg.db_path = v;
    }
    if let Some(v) = lookup("BANTER_TIMEZONE") {
        cfg.timezone = v;
    }
    if let Some(n) = lookup("BANTER_MAX_PARALLEL").and_then(|v| v.trim().parse().ok()) {
        cfg.max_parallel = n;
    }
    if let Some(n) = lookup("BANTER_CONTEXT_WINDOW").and_then(|v| v.trim().parse().ok()) {
        cfg.context_window = n;
    }
    if let Some(v) = lookup("BANTER_ENABLE_SCHEDULE") {
        match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => cfg.enable_schedule = true,
            "0" | "false" | "no" | "off" => cfg.enable_schedule = false,
            _ => {}
        }
    }
}

/// Write `cfg` to `path`, creating the parent directory if necessary.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
        // Owner-only directory on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(write_err)?;
        }
    }
    let raw = toml::to_string_pretty(cfg)?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    fn valid() -> Config {
        Config {
            chat_id: Some(-100123),
            ..Config::default()
        }
    }

    #[test]
    fn debug_redacts_api_key() {
        let cfg = Config {
            api_key: "sk-super-secret".into(),
            ..Config::default()
        };
        let debug_str = format!("{cfg:?}");
        assert!(!debug_str.contains("sk-super-secret"));
        assert!(debug_str.contains("<redacted>"));
        assert!(format!("{:?}", Config::default()).contains("<not set>"));
    }

    #[test]
    fn missing_chat_id_is_fatal() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("chat_id"));
    }

    #[test]
    fn malformed_slot_time_is_fatal() {
        let cfg = Config {
            morning_start: "8am".into(),
            ..valid()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_window_is_fatal() {
        let cfg = Config {
            context_window: 0,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_timer_intervals_are_fatal() {
        let cfg = Config {
            cleanup_interval_secs: 0,
            ..valid()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("cleanup_interval_secs"));

        let cfg = Config {
            scheduler_interval_secs: 0,
            ..valid()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("scheduler_interval_secs"));
    }

    #[test]
    fn out_of_range_cooldown_is_rejected_not_panicking() {
        for secs in [1e30, -1.0, f64::NAN, f64::INFINITY] {
            let cfg = Config {
                cooldown_secs: secs,
                ..valid()
            };
            assert!(matches!(cfg.engine_config(), Err(ConfigError::Invalid(_))), "{secs} accepted");
        }
    }

    #[test]
    fn engine_config_carries_values() {
        let cfg = Config {
            thread_id: Some(5),
            cooldown_secs: 1.5,
            morning_start: "07:30".into(),
            ..valid()
        };
        let ec = cfg.engine_config().unwrap();
        assert_eq!(ec.conversation_id, -100123);
        assert_eq!(ec.thread_id, Some(5));
        assert_eq!(ec.cooldown, Duration::from_millis(1500));
        assert_eq!(ec.idle_horizon, Duration::from_secs(7200));
        assert_eq!(ec.morning_start, parse_slot_time("07:30").unwrap());
        assert_eq!(ec.context_window, 250);
    }

    #[test]
    fn partial_file_gets_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "chat_id = -42\nmodel = \"qwen\"\n").unwrap();

        let cfg = load_from(&path).unwrap().unwrap();
        assert_eq!(cfg.chat_id, Some(-42));
        assert_eq!(cfg.model, "qwen");
        assert_eq!(cfg.context_window, 250);
        assert_eq!(cfg.timezone, "Europe/Moscow");
        assert!(cfg.enable_schedule);
    }

    #[test]
    fn garbage_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "chat_id = [nope").unwrap();
        assert!(matches!(load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).unwrap().is_none());
    }

    #[test]
    fn roundtrip_via_save() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&valid(), &path).expect("save");

        let loaded = load_from(&path).unwrap().unwrap();
        assert_eq!(loaded.chat_id, Some(-100123));
        assert_eq!(loaded.morning_start, "08:00");
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&Config::default(), &path).expect("save");
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn config_path_points_to_banter_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".banter"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn overrides_apply_and_ignore_garbage() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            lookup(&[
                ("BANTER_CHAT_ID", "-777"),
                ("BANTER_MODEL", "mistral"),
                ("BANTER_MAX_PARALLEL", "many"),
                ("BANTER_ENABLE_SCHEDULE", "off"),
                ("BANTER_CONTEXT_WINDOW", "50"),
            ]),
        );
        assert_eq!(cfg.chat_id, Some(-777));
        assert_eq!(cfg.model, "mistral");
        assert_eq!(cfg.max_parallel, 4);
        assert!(!cfg.enable_schedule);
        assert_eq!(cfg.context_window, 50);
    }
}
