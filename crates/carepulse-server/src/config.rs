use carepulse_backend::BackendConfig;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Backend project holding users, documents and patient records
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub forms: FormsConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if self.forms.session_ttl_secs == 0 {
            return Err("forms.session_ttl_secs must be > 0".into());
        }
        self.backend.validate()
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    /// Returns the base URL for the server.
    /// If `base_url` is configured, returns that; otherwise computes from host:port.
    pub fn base_url(&self) -> String {
        self.server
            .base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.server.host, self.server.port))
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.forms.session_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base URL for the server, used in links and responses.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Upper bound for request bodies, including uploaded documents
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    16 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormsConfig {
    /// Idle lifetime of a rendered form's server-side state
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

fn default_session_ttl_secs() -> u64 {
    30 * 60
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_FILE: &str = "carepulse.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., CAREPULSE__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("CAREPULSE")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carepulse_backend::BackendMode;

    fn memory() -> AppConfig {
        AppConfig {
            backend: BackendConfig {
                mode: BackendMode::Memory,
                ..BackendConfig::default()
            },
            ..AppConfig::default()
        }
    }

    #[test]
    fn defaults() {
        let cfg = memory();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.addr().port(), 8080);
        assert_eq!(cfg.base_url(), "http://0.0.0.0:8080");
        assert_eq!(cfg.session_ttl(), Duration::from_secs(1800));
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = memory();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));

        let mut cfg = memory();
        cfg.forms.session_ttl_secs = 0;
        assert!(cfg.validate().is_err());

        // Remote backend needs its identifiers.
        let cfg = AppConfig::default();
        assert_eq!(
            cfg.validate().unwrap_err(),
            "backend.project_id must not be empty"
        );
    }
}
