use anyhow::Result;
use marquee_config::LoggingConfig;
use std::io;
use std::io::IsTerminal;
use std::path::Path;
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};
use tracing_subscriber::fmt::{self, time::ChronoUtc};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Install the global subscriber
///
/// Verbosity flags win over `RUST_LOG`, which wins over the configured level.
/// Output goes to the configured log file (rotated daily) or to stderr.
pub fn init_logging(verbose_level: u8, quiet: bool, config: Option<&LoggingConfig>) -> Result<()> {
    let default_level = config.map(|c| c.level.as_str()).unwrap_or("info");
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose_level > 0 {
        // -v keeps hyper's connection chatter out of debug output
        let filter_str = match verbose_level {
            1 => "debug,hyper::proto::h1=warn,hyper::client::pool=warn",
            _ => "trace",
        };
        EnvFilter::new(filter_str)
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    let json = match std::env::var("RUST_LOG_JSON") {
        Ok(v) => v == "true",
        Err(_) => config.map(|c| c.json).unwrap_or_else(|| !io::stdout().is_terminal()),
    };

    let registry = Registry::default().with(filter);

    if let Some(log_path) = config.and_then(|c| c.file.as_deref()) {
        let file_appender = rolling_appender(log_path)?;

        if json {
            let json_layer = fmt::layer()
                .json()
                .with_timer(ChronoUtc::rfc_3339())
                .with_writer(file_appender);

            registry.with(json_layer).init();
        } else {
            let fmt_layer = fmt::layer()
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(false)
                .with_writer(file_appender);

            registry.with(fmt_layer).init();
        }
    } else if json {
        let json_layer = fmt::layer()
            .json()
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(io::stderr);

        registry.with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer()
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(io::stderr);

        registry.with(fmt_layer).init();
    }

    Ok(())
}

/// Daily appender writing `marquee.log`, `marquee.log.2026-01-17`, ...
fn rolling_appender(log_path: &Path) -> Result<RollingFileAppender> {
    let log_dir = log_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Log file path has no parent directory"))?;
    std::fs::create_dir_all(log_dir)?;

    let log_filename = log_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid log filename"))?;
    let log_prefix = rotation_prefix(log_filename);

    Ok(RollingFileAppender::new(Rotation::DAILY, log_dir, log_prefix))
}

fn rotation_prefix(filename: &str) -> &str {
    filename.rsplit_once('.').map(|(stem, _)| stem).filter(|s| !s.is_empty()).unwrap_or(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_prefix_drops_extension() {
        assert_eq!(rotation_prefix("marquee.log"), "marquee");
        assert_eq!(rotation_prefix("marquee"), "marquee");
        assert_eq!(rotation_prefix(".hidden"), ".hidden");
    }
}
