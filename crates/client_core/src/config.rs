use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";
pub const DEFAULT_SETTINGS_FILE: &str = "quiz.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            request_timeout_secs: 60,
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

pub fn load_settings(path: impl AsRef<Path>) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    let path = path.as_ref();
    if let Ok(raw) = fs::read_to_string(path) {
        let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
        apply_file_settings(&mut settings, &file_cfg)
            .with_context(|| format!("invalid settings in '{}'", path.display()))?;
    }

    apply_env_settings(&mut settings, |key| std::env::var(key).ok())?;

    settings.api_base_url = normalize_base_url(&settings.api_base_url)?;
    Ok(settings)
}

fn apply_file_settings(
    settings: &mut ClientSettings,
    file_cfg: &HashMap<String, toml::Value>,
) -> anyhow::Result<()> {
    if let Some(v) = file_cfg.get("api_base_url") {
        settings.api_base_url = v
            .as_str()
            .context("api_base_url must be a string")?
            .to_string();
    }
    if let Some(v) = file_cfg.get("request_timeout_secs") {
        let secs = v
            .as_integer()
            .context("request_timeout_secs must be an integer")?;
        settings.request_timeout_secs =
            u64::try_from(secs).context("request_timeout_secs must not be negative")?;
    }
    Ok(())
}

fn apply_env_settings(
    settings: &mut ClientSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("QUIZ_API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = v
            .trim()
            .parse()
            .with_context(|| format!("APP__REQUEST_TIMEOUT_SECS is not a number: '{v}'"))?;
    }
    Ok(())
}

pub fn normalize_base_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(DEFAULT_API_BASE_URL.to_string());
    }

    let parsed =
        Url::parse(trimmed).with_context(|| format!("invalid api base url '{trimmed}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("api base url must use http or https, got '{}'", parsed.scheme());
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
