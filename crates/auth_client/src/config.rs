use std::{collections::HashMap, fs, time::Duration};

use anyhow::{ensure, Context};
use url::Url;

#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub database_url: String,
    pub login_timeout_secs: u64,
    pub register_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
            database_url: "sqlite://./data/session.db".into(),
            login_timeout_secs: 10,
            register_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    pub fn register_timeout(&self) -> Duration {
        Duration::from_secs(self.register_timeout_secs)
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("client.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("base_url") {
                settings.base_url = v.clone();
            }
            if let Some(v) = file_cfg.get("database_url") {
                settings.database_url = v.clone();
            }
            if let Some(v) = file_cfg.get("login_timeout_secs") {
                if let Ok(parsed) = v.parse::<u64>() {
                    settings.login_timeout_secs = parsed;
                }
            }
            if let Some(v) = file_cfg.get("register_timeout_secs") {
                if let Ok(parsed) = v.parse::<u64>() {
                    settings.register_timeout_secs = parsed;
                }
            }
        }
    }

    if let Ok(v) = std::env::var("API_BASE_URL") {
        settings.base_url = v;
    }
    if let Ok(v) = std::env::var("APP__BASE_URL") {
        settings.base_url = v;
    }

    if let Ok(v) = std::env::var("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Ok(v) = std::env::var("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Ok(v) = std::env::var("APP__LOGIN_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.login_timeout_secs = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__REGISTER_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.register_timeout_secs = parsed;
        }
    }

    settings
}

/// Validates the configured base URL and strips any trailing slash so that
/// route paths (which all start with `/`) concatenate cleanly.
pub fn normalize_base_url(raw: &str) -> anyhow::Result<String> {
    let parsed = Url::parse(raw.trim()).with_context(|| format!("invalid base url '{raw}'"))?;
    ensure!(
        matches!(parsed.scheme(), "http" | "https"),
        "base url must be http or https, got '{}'",
        parsed.scheme()
    );
    Ok(raw.trim().trim_end_matches('/').to_string())
}
