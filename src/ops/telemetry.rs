use crate::config::{LogFormat, LoggingConfig};
use anyhow::Result;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Initialize logging on stderr; stdout is reserved for consumed messages.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(cfg: &LoggingConfig) -> Result<()> {
    let filter = build_filter(&cfg.level);
    let registry = tracing_subscriber::registry().with(filter);
    let res = match cfg.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    res.map_err(|e| anyhow::anyhow!("failed to init tracing: {e}"))
}

fn build_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_falls_back_to_info() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert_eq!(build_filter("rmqcat=loud").to_string(), "info");
        assert_eq!(build_filter("debug").to_string(), "debug");
    }
}
