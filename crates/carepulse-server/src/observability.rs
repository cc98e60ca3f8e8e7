//! Logging setup.
//!
//! The subscriber starts at `info` so configuration loading is logged; the
//! level from the configuration file replaces it afterwards. `RUST_LOG`
//! takes precedence over both.
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

const STARTUP_LEVEL: &str = "info";

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(STARTUP_LEVEL));
    let (filter_layer, handle) = reload::Layer::new(filter);
    let _ = FILTER_HANDLE.set(handle);

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer())
        .try_init();
}

/// Switch the active filter to `level`. Returns false when `RUST_LOG` is
/// set or tracing was never initialized.
pub fn apply_logging_level(level: &str) -> bool {
    if std::env::var_os("RUST_LOG").is_some() {
        return false;
    }
    FILTER_HANDLE
        .get()
        .is_some_and(|handle| handle.modify(|filter| *filter = EnvFilter::new(level)).is_ok())
}

pub fn shutdown_tracing() {
    tracing::info!("shutting down");
}

