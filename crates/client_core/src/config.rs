use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;

pub const DEFAULT_SETTINGS_FILE: &str = "catalog.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    /// Deployment base URL; API paths are resolved relative to it.
    pub base_url: String,
    pub request_timeout: Duration,
    pub toast_ttl: Duration,
    pub event_capacity: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/".into(),
            request_timeout: Duration::from_secs(10),
            toast_ttl: Duration::from_millis(3000),
            event_capacity: 64,
        }
    }
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the flat TOML file at `path` (if readable), then the environment.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    match read_file_overrides(path) {
        Ok(Some(file_cfg)) => apply_file_overrides(&mut settings, &file_cfg),
        Ok(None) => {}
        Err(err) => tracing::warn!("ignoring settings file {}: {err:#}", path.display()),
    }

    if let Some(v) = env("CATALOG_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = env("APP__BASE_URL") {
        settings.base_url = v;
    }
    if let Some(secs) = env("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
        settings.request_timeout = Duration::from_secs(secs);
    }
    if let Some(ms) = env("APP__TOAST_TTL_MS").and_then(|v| v.parse::<u64>().ok()) {
        settings.toast_ttl = Duration::from_millis(ms);
    }
    if let Some(capacity) = env("APP__EVENT_CAPACITY").and_then(|v| v.parse::<usize>().ok()) {
        settings.event_capacity = capacity.max(1);
    }

    settings
}

fn read_file_overrides(path: &Path) -> anyhow::Result<Option<HashMap<String, String>>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    };
    let table = toml::from_str::<HashMap<String, toml::Value>>(&raw)
        .with_context(|| format!("failed to parse '{}'", path.display()))?;
    Ok(Some(
        table
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    toml::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect(),
    ))
}

fn apply_file_overrides(settings: &mut ClientSettings, file_cfg: &HashMap<String, String>) {
    if let Some(v) = file_cfg.get("base_url") {
        settings.base_url = v.clone();
    }
    if let Some(secs) = file_cfg
        .get("request_timeout_secs")
        .and_then(|v| v.parse::<u64>().ok())
    {
        settings.request_timeout = Duration::from_secs(secs);
    }
    if let Some(ms) = file_cfg.get("toast_ttl_ms").and_then(|v| v.parse::<u64>().ok()) {
        settings.toast_ttl = Duration::from_millis(ms);
    }
    if let Some(capacity) = file_cfg
        .get("event_capacity")
        .and_then(|v| v.parse::<usize>().ok())
    {
        settings.event_capacity = capacity.max(1);
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
