use std::{env, fmt, io::ErrorKind, process::ExitCode};

use carepulse_server::config::loader::{DEFAULT_CONFIG_FILE, load_config};
use carepulse_server::observability::{apply_logging_level, init_tracing};
use carepulse_server::{ServerBuilder, shutdown_tracing};

/// Where the configuration path came from.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    Flag,
    Env,
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Flag => "--config",
            Self::Env => "CAREPULSE_CONFIG",
            Self::Default => "default",
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine.
    if let Err(e) = dotenvy::dotenv() {
        let missing = matches!(&e, dotenvy::Error::Io(io) if io.kind() == ErrorKind::NotFound);
        if !missing {
            eprintln!("Warning: could not read .env: {e}");
        }
    }

    init_tracing();

    let (path, source) = config_path(env::args().skip(1));
    let cfg = match load_config(Some(&path)) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::from(2);
        }
    };
    tracing::info!(%path, %source, "configuration loaded");
    if apply_logging_level(&cfg.logging.level) {
        tracing::debug!(level = %cfg.logging.level, "log level applied");
    }

    let server = match ServerBuilder::new().with_config(cfg).build() {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Server initialization failed: {e}");
            return ExitCode::from(2);
        }
    };

    let code = match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server stopped with an error");
            ExitCode::FAILURE
        }
    };
    shutdown_tracing();
    code
}

/// `--config <path>` first, then `CAREPULSE_CONFIG`, then `carepulse.toml`.
fn config_path(mut args: impl Iterator<Item = String>) -> (String, ConfigSource) {
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return (path, ConfigSource::Flag);
            }
        }
    }
    match env::var("CAREPULSE_CONFIG") {
        Ok(path) if !path.is_empty() => (path, ConfigSource::Env),
        _ => (DEFAULT_CONFIG_FILE.to_string(), ConfigSource::Default),
    }
}
