use std::{collections::HashMap, fs};

use serde::Deserialize;

const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8501".into(),
            log_filter: "info".into(),
        }
    }
}

/// Defaults, then `server.toml`, then environment overrides.
pub fn load_settings() -> Settings {
    let file = fs::read_to_string(SETTINGS_FILE).ok();
    settings_from_sources(file.as_deref(), |key| std::env::var(key).ok())
}

pub(crate) fn settings_from_sources(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
            if let Some(v) = file_cfg.get("bind_addr") {
                settings.server_bind = v.clone();
            }
            if let Some(v) = file_cfg.get("log_filter") {
                settings.log_filter = v.clone();
            }
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
