use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local, discarded on exit (tests, dry runs)
    Memory,
    /// Whole store persisted as one JSON document
    JsonFile,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,
    /// Location of the JSON store; defaults to `<data_dir>/store.json`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Progress tracking knobs
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaybackConfig {
    /// Minimum wall-clock seconds between two progress writes
    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: u64,
    /// How far before the saved position playback resumes
    #[serde(default = "default_resume_rewind_secs")]
    pub resume_rewind_secs: f64,
    /// Saved fraction above which a title restarts from the beginning
    #[serde(default = "default_rewatch_threshold")]
    pub rewatch_threshold: f64,
    /// Completions newer than this count as "recent"
    #[serde(default = "default_completed_recent_hours")]
    pub completed_recent_hours: i64,
    /// Upper bound for displayed progress; 1.0 is reserved for completed items
    #[serde(default = "default_display_cap")]
    pub display_cap: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CatalogConfig {
    /// Number of titles returned by an unfiltered browse
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u32,
    #[serde(default = "default_lockout_secs")]
    pub lockout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AdminConfig {
    /// Identities allowed to curate the catalog
    #[serde(default)]
    pub allowed_emails: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json_logging")]
    pub json: bool,
    pub file: Option<PathBuf>,
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::JsonFile
}

fn default_save_interval_secs() -> u64 {
    5
}

fn default_resume_rewind_secs() -> f64 {
    5.0
}

fn default_rewatch_threshold() -> f64 {
    0.9
}

fn default_completed_recent_hours() -> i64 {
    24
}

fn default_display_cap() -> f64 {
    0.99
}

fn default_page_size() -> usize {
    10
}

fn default_max_failed_attempts() -> u32 {
    5
}

fn default_lockout_secs() -> u64 {
    300 // 5 minutes
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json_logging() -> bool {
    use std::io::IsTerminal;
    !std::io::stdout().is_terminal()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            save_interval_secs: default_save_interval_secs(),
            resume_rewind_secs: default_resume_rewind_secs(),
            rewatch_threshold: default_rewatch_threshold(),
            completed_recent_hours: default_completed_recent_hours(),
            display_cap: default_display_cap(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: default_max_failed_attempts(),
            lockout_secs: default_lockout_secs(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &PathBuf) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let playback = &self.playback;
        if playback.resume_rewind_secs < 0.0 {
            return Err(anyhow::anyhow!("playback.resume_rewind_secs must be non-negative"));
        }
        if !(0.0..=1.0).contains(&playback.rewatch_threshold) {
            return Err(anyhow::anyhow!("playback.rewatch_threshold must be between 0 and 1"));
        }
        if !(0.0..1.0).contains(&playback.display_cap) {
            return Err(anyhow::anyhow!("playback.display_cap must be in [0, 1)"));
        }
        if playback.completed_recent_hours < 0 {
            return Err(anyhow::anyhow!("playback.completed_recent_hours must be non-negative"));
        }

        if self.catalog.page_size == 0 {
            return Err(anyhow::anyhow!("catalog.page_size must be at least 1"));
        }

        if self.auth.max_failed_attempts == 0 {
            return Err(anyhow::anyhow!("auth.max_failed_attempts must be at least 1"));
        }

        for email in &self.admin.allowed_emails {
            if !email.contains('@') {
                return Err(anyhow::anyhow!("Invalid email in admin.allowed_emails: {}", email));
            }
        }

        Ok(())
    }

    pub fn is_admin_configured(&self) -> bool {
        !self.admin.allowed_emails.is_empty()
    }
}
