use std::{env, fs};

use carepulse_backend::BackendMode;
use carepulse_server::config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("carepulse.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8081
body_limit_bytes = 1048576

[logging]
level = "debug"

[backend]
endpoint = "https://cloud.appwrite.io/v1"
project_id = "carepulse"
api_key = "secret"
database_id = "intake"
patient_collection_id = "patients"
bucket_id = "documents"
timeout_ms = 5000

[forms]
session_ttl_secs = 600
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 8081);
    assert_eq!(cfg.server.body_limit_bytes, 1_048_576);
    assert_eq!(cfg.logging.level, "debug");
    assert_eq!(cfg.backend.mode, BackendMode::Appwrite);
    assert_eq!(cfg.backend.project_id, "carepulse");
    assert_eq!(cfg.backend.bucket_id, "documents");
    assert_eq!(cfg.forms.session_ttl_secs, 600);
    assert_eq!(cfg.base_url(), "http://127.0.0.1:8081");

    // 2) Env override should win over file
    unsafe {
        env::set_var("CAREPULSE__FORMS__SESSION_TTL_SECS", "90");
        env::set_var("CAREPULSE__BACKEND__API_KEY", "from-env");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.forms.session_ttl_secs, 90);
    assert_eq!(cfg_env.backend.api_key, "from-env");
    unsafe {
        env::remove_var("CAREPULSE__FORMS__SESSION_TTL_SECS");
        env::remove_var("CAREPULSE__BACKEND__API_KEY");
    }

    // 3) Memory mode needs no backend identifiers
    let memory_path = dir.path().join("memory.toml");
    fs::write(&memory_path, "[backend]\nmode = \"memory\"\n").expect("write memory toml");
    let cfg_memory = load_config(memory_path.to_str()).expect("memory mode should be valid");
    assert_eq!(cfg_memory.backend.mode, BackendMode::Memory);
    assert_eq!(cfg_memory.server.port, 8080);

    // 4) Invalid config should error
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[logging]
level = "chatty"

[backend]
mode = "memory"
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("logging.level must be one of"));

    // 5) Remote backend without a project is rejected
    let missing_path = dir.path().join("missing.toml");
    fs::write(&missing_path, "[server]\nport = 9000\n").expect("write toml");
    let err = load_config(missing_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("backend.project_id"));
}
