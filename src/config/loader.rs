use std::{fs, path::Path};

use anyhow::{anyhow, Result};
use regex::Regex;
use tracing::{debug, error, info};

use crate::config::settings::{ClientConfig, LogFormat, LoggingConfig};
use crate::config::validator;

/// Load and validate config from YAML file. A missing file yields defaults.
pub fn file_to_config(path: &Path) -> Result<ClientConfig> {
    if !path.exists() {
        info!("config file '{}' not found, using defaults", path.display());
        return parse_config(String::new());
    }
    let content = fs::read_to_string(path)?;

    let expanded = expand_env_vars(&content);
    parse_config(expanded)
}

pub fn parse_config(content: String) -> Result<ClientConfig> {
    let mut client_config: ClientConfig = if content.trim().is_empty() {
        ClientConfig::default()
    } else {
        serde_yaml::from_str(&content).inspect_err(|e| error!("parse config error: {}", e))?
    };

    // Apply defaults
    if client_config.logging.is_none() {
        client_config.logging = Some(LoggingConfig::new("info".to_owned(), LogFormat::Compact));
    }
    client_config.api.base_url = client_config.api.base_url.trim_end_matches('/').to_owned();

    debug!("validation config ...");
    validator::validate_client_config(&client_config)
        .map_err(|errors| anyhow!("invalid config: {}", errors.join("; ")))?;

    Ok(client_config)
}

/// Replace `${VAR}` and `${VAR:default}` with environment values
pub fn expand_env_vars(input: &str) -> String {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}").expect("static regex");
    re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::StorageKind;
    use serial_test::serial;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn empty_content_yields_defaults() {
        let config = parse_config(String::new()).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
        assert_eq!(config.api.timeout(), Duration::from_millis(10_000));
        assert_eq!(config.storage.kind, StorageKind::File);
        assert_eq!(config.logging.unwrap().format, LogFormat::Compact);
    }

    #[test]
    fn parses_full_config() {
        let yaml = r#"
api:
  base_url: https://civilens.example.org/api/
  timeout_ms: 2500
storage:
  kind: memory
cache:
  default_ttl_seconds: 120
logging:
  level: debug
  format: json
"#;
        let config = parse_config(yaml.to_owned()).unwrap();
        assert_eq!(config.api.base_url, "https://civilens.example.org/api");
        assert_eq!(config.api.timeout(), Duration::from_millis(2500));
        assert_eq!(config.storage.kind, StorageKind::Memory);
        assert_eq!(config.cache.default_ttl(), Some(Duration::from_secs(120)));
        let logging = config.logging.unwrap();
        assert_eq!(logging.level, "debug");
        assert_eq!(logging.format, LogFormat::Json);
    }

    #[test]
    fn rejects_invalid_config_with_all_errors() {
        let yaml = r#"
api:
  base_url: localhost:8000
  timeout_ms: 0
cache:
  default_ttl_seconds: 0
"#;
        let err = parse_config(yaml.to_owned()).unwrap_err().to_string();
        assert!(err.contains("api.base_url"), "{err}");
        assert!(err.contains("api.timeout_ms"), "{err}");
        assert!(err.contains("cache.default_ttl_seconds"), "{err}");
    }

    #[test]
    #[serial]
    fn expands_env_vars_with_defaults() {
        std::env::set_var("CIVILENS_TEST_BASE_URL", "https://api.civilens.test");
        std::env::remove_var("CIVILENS_TEST_MISSING");
        let expanded = expand_env_vars("a: ${CIVILENS_TEST_BASE_URL}\nb: ${CIVILENS_TEST_MISSING:fallback}\n");
        assert_eq!(expanded, "a: https://api.civilens.test\nb: fallback\n");
        std::env::remove_var("CIVILENS_TEST_BASE_URL");
    }

    #[test]
    #[serial]
    fn loads_file_and_missing_file() {
        std::env::set_var("CIVILENS_TEST_STORAGE", "/tmp/civilens-test/session.json");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "storage:\n  kind: file\n  path: ${{CIVILENS_TEST_STORAGE}}").unwrap();

        let config = file_to_config(file.path()).unwrap();
        assert_eq!(config.storage.path.as_deref(), Some("/tmp/civilens-test/session.json"));
        std::env::remove_var("CIVILENS_TEST_STORAGE");

        let missing = file_to_config(Path::new("/definitely/not/here/civilens.yaml")).unwrap();
        assert_eq!(missing.api.base_url, "http://localhost:8000/api");
    }
}
