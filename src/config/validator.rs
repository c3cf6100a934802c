//! Configuration validation with aggregated errors.
//! Every issue is collected so a broken config is reported in one pass.

use tracing::{error, info};

use crate::config::settings::{ApiConfig, CacheConfig, ClientConfig, LoggingConfig, StorageConfig, StorageKind};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_client_config(cfg: &ClientConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_api(&cfg.api, &mut errors);
    validate_storage(&cfg.storage, &mut errors);
    validate_cache(&cfg.cache, &mut errors);
    if let Some(logging) = &cfg.logging {
        validate_logging(logging, &mut errors);
    }

    if errors.is_empty() {
        info!("config validation passed");
        Ok(())
    } else {
        for e in &errors {
            error!("config validation: {}", e);
        }
        Err(errors)
    }
}

fn validate_api(api: &ApiConfig, errors: &mut Vec<String>) {
    if !(api.base_url.starts_with("http://") || api.base_url.starts_with("https://")) {
        errors.push(format!(
            "api.base_url '{}' must start with http:// or https://",
            api.base_url
        ));
    }
    if api.timeout_ms == Some(0) {
        errors.push("api.timeout_ms must be > 0".to_string());
    }
    if let Some(user_agent) = &api.user_agent {
        if user_agent.trim().is_empty() {
            errors.push("api.user_agent must not be empty when set".to_string());
        }
    }
}

fn validate_storage(storage: &StorageConfig, errors: &mut Vec<String>) {
    if storage.kind == StorageKind::File {
        if let Some(path) = &storage.path {
            if path.trim().is_empty() {
                errors.push("storage.path must not be empty for kind=file".to_string());
            }
        }
    }
}

fn validate_cache(cache: &CacheConfig, errors: &mut Vec<String>) {
    if cache.default_ttl_seconds == Some(0) {
        errors.push("cache.default_ttl_seconds must be > 0 when set".to_string());
    }
}

fn validate_logging(logging: &LoggingConfig, errors: &mut Vec<String>) {
    if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
        errors.push(format!(
            "logging.level '{}' must be one of {:?}",
            logging.level, LOG_LEVELS
        ));
    }
}
