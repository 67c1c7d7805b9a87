use anyhow::Result;
use std::path::{Path, PathBuf};

/// Overrides the base directory when set to a non-empty path
pub const HOME_ENV: &str = "MARQUEE_HOME";

/// Where config, session, store and log files live
///
/// Config and session files sit at the base; the store goes under `data/`
/// and logs under `logs/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathManager {
    config_dir: PathBuf,
    data_dir: PathBuf,
    log_dir: PathBuf,
}

impl PathManager {
    pub fn with_base(base: &Path) -> Self {
        Self {
            config_dir: base.to_path_buf(),
            data_dir: base.join("data"),
            log_dir: base.join("logs"),
        }
    }

    /// `$MARQUEE_HOME`, then the platform config dir, then `~/.marquee`
    pub fn resolve(home_override: Option<&str>) -> Result<Self> {
        if let Some(home) = home_override.map(str::trim).filter(|h| !h.is_empty()) {
            return Ok(Self::with_base(Path::new(home)));
        }
        let base = dirs::config_dir()
            .map(|dir| dir.join("marquee"))
            .or_else(|| dirs::home_dir().map(|home| home.join(".marquee")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine a config or home directory"))?;
        Ok(Self::with_base(&base))
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn session_file(&self) -> PathBuf {
        self.config_dir.join("session.toml")
    }

    pub fn store_file(&self) -> PathBuf {
        self.data_dir.join("store.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("marquee.log")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir, &self.log_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

impl Default for PathManager {
    fn default() -> Self {
        let home = std::env::var(HOME_ENV).ok();
        Self::resolve(home.as_deref()).unwrap_or_else(|_| Self::with_base(Path::new(".marquee")))
    }
}
