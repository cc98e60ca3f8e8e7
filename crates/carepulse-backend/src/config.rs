use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which backend implementation serves the intake flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    #[default]
    Appwrite,
    /// In-process store, for local development.
    Memory,
}

/// Connection settings for the backend project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub mode: BackendMode,
    /// REST endpoint including the API version, e.g. `https://cloud.appwrite.io/v1`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub project_id: String,
    /// For security, prefer the CAREPULSE__BACKEND__API_KEY env var
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default)]
    pub database_id: String,
    #[serde(default)]
    pub patient_collection_id: String,
    #[serde(default)]
    pub bucket_id: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_endpoint() -> String {
    "http://localhost/v1".into()
}
fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode: BackendMode::default(),
            endpoint: default_endpoint(),
            project_id: String::new(),
            api_key: String::new(),
            database_id: String::new(),
            patient_collection_id: String::new(),
            bucket_id: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<(), String> {
        url::Url::parse(&self.endpoint)
            .map_err(|e| format!("backend.endpoint is not a valid URL: {e}"))?;
        if self.mode == BackendMode::Memory {
            return Ok(());
        }
        for (key, value) in [
            ("project_id", &self.project_id),
            ("api_key", &self.api_key),
            ("database_id", &self.database_id),
            ("patient_collection_id", &self.patient_collection_id),
            ("bucket_id", &self.bucket_id),
        ] {
            if value.trim().is_empty() {
                return Err(format!("backend.{key} must not be empty"));
            }
        }
        if self.timeout_ms == 0 {
            return Err("backend.timeout_ms must be > 0".into());
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Endpoint without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }
}

/// Public retrieval URL of a stored file.
pub fn file_view_url(endpoint: &str, project_id: &str, bucket_id: &str, file_id: &str) -> String {
    format!(
        "{}/storage/buckets/{bucket_id}/files/{file_id}/view?project={project_id}",
        endpoint.trim_end_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> BackendConfig {
        BackendConfig {
            mode: BackendMode::Appwrite,
            endpoint: "https://cloud.appwrite.io/v1/".into(),
            project_id: "proj".into(),
            api_key: "secret".into(),
            database_id: "db".into(),
            patient_collection_id: "patients".into(),
            bucket_id: "bucket".into(),
            timeout_ms: 5_000,
        }
    }

    #[test]
    fn validates_required_identifiers() {
        assert!(filled().validate().is_ok());

        let mut cfg = filled();
        cfg.bucket_id = " ".into();
        assert_eq!(cfg.validate().unwrap_err(), "backend.bucket_id must not be empty");

        let mut cfg = filled();
        cfg.endpoint = "not a url".into();
        assert!(cfg.validate().unwrap_err().contains("endpoint"));
    }

    #[test]
    fn memory_mode_needs_no_project() {
        let cfg = BackendConfig {
            mode: BackendMode::Memory,
            ..BackendConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn builds_view_url() {
        let cfg = filled();
        assert_eq!(cfg.base_url(), "https://cloud.appwrite.io/v1");
        assert_eq!(
            file_view_url(&cfg.endpoint, &cfg.project_id, &cfg.bucket_id, "f1"),
            "https://cloud.appwrite.io/v1/storage/buckets/bucket/files/f1/view?project=proj"
        );
    }

    #[test]
    fn api_key_is_never_serialized() {
        let json = serde_json::to_value(filled()).unwrap();
        assert!(json.get("api_key").is_none());
        assert_eq!(json["project_id"], "proj");
    }
}
