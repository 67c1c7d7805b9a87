use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use marquee_config::{Config, PathManager, StoreBackend};
use serde_json::json;

pub fn run_show(paths: &PathManager, config: &Config, output: &Output) -> Result<()> {
    let config_file = paths.config_file();
    if !config_file.exists() {
        output.warn(format!("No configuration file at {}; showing defaults", config_file.display()));
        output.info("Run 'marquee config init' to write one.");
    }

    if !output.is_human() {
        output.data(&json!({ "file": config_file, "config": config }));
        return Ok(());
    }

    let store_path = match config.store.backend {
        StoreBackend::Memory => "(in memory)".to_string(),
        StoreBackend::JsonFile => config
            .store
            .path
            .clone()
            .unwrap_or_else(|| paths.store_file())
            .display()
            .to_string(),
    };
    let backend = match config.store.backend {
        StoreBackend::Memory => "memory",
        StoreBackend::JsonFile => "json_file",
    };

    output.key_values(
        "Store",
        &[("Config file", config_file.display().to_string()), ("Backend", backend.to_string()), ("Path", store_path)],
    );
    let playback = &config.playback;
    output.key_values(
        "Playback",
        &[
            ("Save interval", format!("{}s", playback.save_interval_secs)),
            ("Resume rewind", format!("{}s", playback.resume_rewind_secs)),
            ("Rewatch threshold", format!("{:.0}%", playback.rewatch_threshold * 100.0)),
            ("Recently completed", format!("{}h", playback.completed_recent_hours)),
            ("Progress cap", format!("{:.0}%", playback.display_cap * 100.0)),
        ],
    );
    output.key_values(
        "Catalog & sign-in",
        &[
            ("Page size", config.catalog.page_size.to_string()),
            ("Max failed sign-ins", config.auth.max_failed_attempts.to_string()),
            ("Lockout", format!("{}s", config.auth.lockout_secs)),
            (
                "Admins",
                if config.is_admin_configured() {
                    config.admin.allowed_emails.join(", ")
                } else {
                    "(none)".to_string()
                },
            ),
        ],
    );
    Ok(())
}

pub fn run_init(paths: &PathManager, force: bool, admins: Vec<String>, output: &Output) -> Result<()> {
    let config_file = paths.config_file();
    if config_file.exists() && !force {
        output.warn(format!("{} already exists; pass --force to overwrite", config_file.display()));
        return Ok(());
    }

    let mut config = Config::default();
    config.admin.allowed_emails = admins;
    config.validate().map_err(|e| eyre!("{}", e))?;

    paths.ensure_directories().map_err(|e| eyre!("Failed to create directories: {}", e))?;
    config
        .save_to_file(&config_file)
        .map_err(|e| eyre!("Failed to write {}: {}", config_file.display(), e))?;
    output.success(format!("Wrote {}", config_file.display()));
    Ok(())
}

pub fn run_path(paths: &PathManager, output: &Output) -> Result<()> {
    if output.is_human() {
        output.key_values(
            "Paths",
            &[
                ("Config", paths.config_file().display().to_string()),
                ("Session", paths.session_file().display().to_string()),
                ("Store", paths.store_file().display().to_string()),
                ("Log", paths.log_file().display().to_string()),
            ],
        );
    }
    output.data(&json!({
        "config": paths.config_file(),
        "session": paths.session_file(),
        "store": paths.store_file(),
        "log": paths.log_file(),
    }));
    Ok(())
}
