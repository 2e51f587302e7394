use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use client_core::ClientTimings;
use url::Url;

pub const CONFIG_FILE: &str = "chat.toml";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub poll_interval_ms: u64,
    pub activity_check_secs: u64,
    pub inactivity_warning_secs: u64,
    pub upload_grace_ms: u64,
    pub notice_ttl_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            poll_interval_ms: 2_000,
            activity_check_secs: 60,
            inactivity_warning_secs: 15 * 60,
            upload_grace_ms: 1_000,
            notice_ttl_ms: 5_000,
        }
    }
}

impl Settings {
    pub fn to_timings(&self) -> ClientTimings {
        ClientTimings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            activity_check_interval: Duration::from_secs(self.activity_check_secs),
            inactivity_warning_after: Duration::from_secs(self.inactivity_warning_secs),
            upload_grace: Duration::from_millis(self.upload_grace_ms),
            notice_ttl: Duration::from_millis(self.notice_ttl_ms),
        }
    }

    fn apply_file(&mut self, file_cfg: &HashMap<String, String>) {
        if let Some(v) = file_cfg.get("server_url") {
            self.server_url = v.clone();
        }
        set_number(&mut self.poll_interval_ms, file_cfg.get("poll_interval_ms"));
        set_number(&mut self.activity_check_secs, file_cfg.get("activity_check_secs"));
        set_number(
            &mut self.inactivity_warning_secs,
            file_cfg.get("inactivity_warning_secs"),
        );
        set_number(&mut self.upload_grace_ms, file_cfg.get("upload_grace_ms"));
        set_number(&mut self.notice_ttl_ms, file_cfg.get("notice_ttl_ms"));
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("CHAT_SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = env("APP__SERVER_URL") {
            self.server_url = v;
        }
        set_number(&mut self.poll_interval_ms, env("APP__POLL_INTERVAL_MS").as_ref());
        set_number(
            &mut self.activity_check_secs,
            env("APP__ACTIVITY_CHECK_SECS").as_ref(),
        );
        set_number(
            &mut self.inactivity_warning_secs,
            env("APP__INACTIVITY_WARNING_SECS").as_ref(),
        );
        set_number(&mut self.upload_grace_ms, env("APP__UPLOAD_GRACE_MS").as_ref());
        set_number(&mut self.notice_ttl_ms, env("APP__NOTICE_TTL_MS").as_ref());
    }
}

/// Zero and unparsable values keep the current setting; timers cannot tick at zero.
fn set_number(target: &mut u64, raw: Option<&String>) {
    if let Some(parsed) = raw.and_then(|v| v.trim().parse::<u64>().ok()) {
        if parsed > 0 {
            *target = parsed;
        }
    }
}

/// Reads `path` when present, then lets the environment override it.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(path) {
        settings.apply_file(&parse_file(&raw));
    }
    settings.apply_env(|key| std::env::var(key).ok());
    settings
}

fn parse_file(raw: &str) -> HashMap<String, String> {
    let Ok(table) = toml::from_str::<toml::Table>(raw) else {
        return HashMap::new();
    };
    table
        .into_iter()
        .filter_map(|(key, value)| match value {
            toml::Value::String(v) => Some((key, v)),
            toml::Value::Integer(v) => Some((key, v.to_string())),
            _ => None,
        })
        .collect()
}

pub fn normalize_server_url(raw_server_url: &str) -> anyhow::Result<String> {
    let raw_server_url = raw_server_url.trim().trim_end_matches('/');

    if raw_server_url.is_empty() {
        return Ok(DEFAULT_SERVER_URL.to_string());
    }

    let candidate = if raw_server_url.contains("://") {
        raw_server_url.to_string()
    } else {
        format!("http://{raw_server_url}")
    };

    let parsed = Url::parse(&candidate)
        .with_context(|| format!("invalid server url '{raw_server_url}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("unsupported server url scheme '{}'", parsed.scheme());
    }
    Ok(candidate)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
