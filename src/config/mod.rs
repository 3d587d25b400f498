use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_TICK_SECS: u64 = 1;

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// Log level filter string, e.g. "debug", "info,chimed=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default, human-readable) | "json" (structured for log aggregators).
    log_format: Option<String>,
    /// Seconds between scheduler sweeps (default: 1).
    tick_secs: Option<u64>,
    /// Alert webhook URL. Omit to deliver alerts to the log instead.
    webhook_url: Option<String>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

// ─── DaemonConfig ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub data_dir: PathBuf,
    /// Log level filter string.
    pub log: String,
    /// "pretty" | "json" (CHIMED_LOG_FORMAT env var).
    pub log_format: String,
    /// Seconds between scheduler sweeps; never below 1.
    pub tick_secs: u64,
    /// Alert webhook URL (CHIMED_WEBHOOK_URL env var). None = log delivery.
    pub webhook_url: Option<String>,
}

impl DaemonConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(data_dir: Option<PathBuf>, log: Option<String>, tick_secs: Option<u64>) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let log_format = std::env::var("CHIMED_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let tick_secs = tick_secs
            .or(toml.tick_secs)
            .unwrap_or(DEFAULT_TICK_SECS)
            .max(1);

        let webhook_url = std::env::var("CHIMED_WEBHOOK_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.webhook_url);

        Self {
            data_dir,
            log,
            log_format,
            tick_secs,
            webhook_url,
        }
    }

    /// The task store snapshot file.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("tasks.json")
    }

    /// The timezone preference file.
    pub fn tzprefs_path(&self) -> PathBuf {
        self.data_dir.join("tzprefs.json")
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/chimed
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("chimed");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/chimed or ~/.local/share/chimed
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("chimed");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("chimed");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\chimed
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("chimed");
        }
    }
    // Fallback
    PathBuf::from(".chimed")
}
