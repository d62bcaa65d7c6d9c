//! Configuration loading from JSON files
//!
//! The file is read as a loose JSON object. Missing keys are filled from
//! [`default_config`]; values are checked later by [`crate::validate`].

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};

/// Loosely typed configuration document
pub type RawConfig = Map<String, Value>;

/// Defaults for every known key.
pub fn default_config() -> RawConfig {
    json!({
        "base_url": "https://api.worldbank.org/v2",
        "per_page": 500,
        "retries": 3,
        "timeout": 10,
        "pause": 2,
        "countries": ["CHN"],
        "indicators": ["NY.GDP.PCAP.CD"],
        "date_interval": ["2020:2024"],
        "host": "localhost",
        "port": 5432,
        "user": "postgres",
        "dbname": "postgres",
        "password": "",
        "schema": "public",
        "backend": "postgres",
        "duckdb_path": "statline.duckdb"
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
}

/// Load the configuration at `path`.
///
/// A missing file is created with the defaults. A file that cannot be
/// read or parsed as a JSON object falls back to the defaults.
pub fn load_config(path: &Path) -> Result<RawConfig> {
    log::info!(target: "pipeline", "loading config {}", path.display());

    if !path.exists() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
        }
        let defaults = default_config();
        let text = serde_json::to_string_pretty(&defaults)?;
        std::fs::write(path, text + "\n")
            .with_context(|| format!("Failed to write default config: {}", path.display()))?;
        log::info!(
            target: "pipeline",
            "config {} not found, wrote defaults",
            path.display()
        );
        return Ok(defaults);
    }

    let parsed = std::fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|text| serde_json::from_str::<Value>(&text).map_err(anyhow::Error::from));
    let mut cfg = match parsed {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            log::warn!(
                target: "pipeline",
                "config {} is not a JSON object, using defaults",
                path.display()
            );
            return Ok(default_config());
        }
        Err(e) => {
            log::warn!(
                target: "pipeline",
                "failed to read config {}: {e}, using defaults",
                path.display()
            );
            return Ok(default_config());
        }
    };

    for (key, value) in default_config() {
        if !cfg.contains_key(&key) {
            log::info!(target: "pipeline", "config key {key} missing, using default {value}");
            cfg.insert(key, value);
        }
    }
    Ok(cfg)
}

/// Expand `${VAR}` to the environment variable's value. Other strings
/// pass through unchanged.
pub fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}
