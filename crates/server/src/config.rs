use std::{collections::HashMap, fs, time::Duration};

use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_LLM_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    pub llm_provider: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_base_url: String,
    pub llm_max_tokens: Option<u32>,
    pub echo_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".into(),
            llm_provider: None,
            llm_api_key: None,
            llm_model: "gemini-pro".into(),
            llm_base_url: DEFAULT_LLM_BASE_URL.into(),
            llm_max_tokens: None,
            echo_delay_ms: 1000,
        }
    }
}

impl Settings {
    pub fn echo_delay(&self) -> Duration {
        Duration::from_millis(self.echo_delay_ms)
    }
}

/// Defaults, then `server.toml` in the working directory, then the environment.
pub fn load_settings() -> Settings {
    let raw = fs::read_to_string("server.toml").ok();
    load_settings_from(raw.as_deref(), |key| std::env::var(key).ok())
}

pub(crate) fn load_settings_from(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        match toml::from_str::<HashMap<String, toml::Value>>(raw) {
            Ok(file_cfg) => apply_file(&mut settings, &file_cfg),
            Err(error) => warn!(%error, "ignoring unparseable server.toml"),
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.bind_addr = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }

    if let Some(v) = env("LLM_PROVIDER") {
        settings.llm_provider = non_blank(v);
    }
    if let Some(v) = env("LLM_API_KEY") {
        settings.llm_api_key = non_blank(v);
    }
    if let Some(v) = env("LLM_MODEL").and_then(non_blank) {
        settings.llm_model = v;
    }
    if let Some(v) = env("LLM_BASE_URL").and_then(non_blank) {
        settings.llm_base_url = v;
    }

    if let Some(v) = env("LLM_MAX_TOKENS") {
        match v.trim().parse::<u32>() {
            Ok(parsed) => settings.llm_max_tokens = Some(parsed),
            Err(error) => warn!(value = %v, %error, "ignoring invalid LLM_MAX_TOKENS"),
        }
    }

    if let Some(v) = env("APP__ECHO_DELAY_MS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.echo_delay_ms = parsed,
            Err(error) => warn!(value = %v, %error, "ignoring invalid APP__ECHO_DELAY_MS"),
        }
    }

    settings
}

fn apply_file(settings: &mut Settings, file_cfg: &HashMap<String, toml::Value>) {
    let text = |key: &str| {
        file_cfg
            .get(key)
            .and_then(toml::Value::as_str)
            .map(str::to_string)
    };

    if let Some(v) = text("bind_addr") {
        settings.bind_addr = v;
    }
    if let Some(v) = text("llm_provider") {
        settings.llm_provider = non_blank(v);
    }
    if let Some(v) = text("llm_api_key") {
        settings.llm_api_key = non_blank(v);
    }
    if let Some(v) = text("llm_model").and_then(non_blank) {
        settings.llm_model = v;
    }
    if let Some(v) = text("llm_base_url").and_then(non_blank) {
        settings.llm_base_url = v;
    }
    if let Some(v) = file_cfg
        .get("llm_max_tokens")
        .and_then(toml::Value::as_integer)
    {
        match u32::try_from(v) {
            Ok(parsed) => settings.llm_max_tokens = Some(parsed),
            Err(_) => warn!(value = v, "ignoring out-of-range llm_max_tokens"),
        }
    }
    if let Some(v) = file_cfg
        .get("echo_delay_ms")
        .and_then(toml::Value::as_integer)
    {
        match u64::try_from(v) {
            Ok(parsed) => settings.echo_delay_ms = parsed,
            Err(_) => warn!(value = v, "ignoring negative echo_delay_ms"),
        }
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
