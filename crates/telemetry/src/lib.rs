//! Logging and tracing bootstrap.

use anyhow::{anyhow, Context};
use bookstore_kernel::settings::{LogFormat, TelemetrySettings};
use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INSTALLED: OnceCell<LogFormat> = OnceCell::new();

/// Install the global `tracing` subscriber. Later calls are no-ops.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    if let Some(format) = INSTALLED.get() {
        tracing::debug!(target: "bookstore-telemetry", ?format, "telemetry already initialized");
        return Ok(());
    }

    let filter = build_filter(settings)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match settings.log_format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;

    let _ = INSTALLED.set(settings.log_format.clone());
    tracing::info!(
        target: "bookstore-telemetry",
        format = ?settings.log_format,
        filter = %settings.filter,
        "telemetry initialized"
    );
    Ok(())
}

/// `RUST_LOG` when set, otherwise the configured directive.
fn build_filter(settings: &TelemetrySettings) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.filter)
            .with_context(|| format!("invalid telemetry filter '{}'", settings.filter)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_noop() {
        let settings = TelemetrySettings::default();
        init(&settings).unwrap();
        init(&settings).unwrap();
        assert_eq!(INSTALLED.get(), Some(&LogFormat::Pretty));
    }

    #[test]
    fn configured_filter_is_accepted() {
        let settings = TelemetrySettings {
            filter: "info,bookstore_db=debug".to_string(),
            log_format: LogFormat::Json,
        };
        assert!(build_filter(&settings).is_ok());
    }
}
