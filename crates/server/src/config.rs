use std::{collections::HashMap, fs};

use tracing::warn;
use url::Url;

pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x083C4B91577a28cD96DC948952e12D6f5390E13C";
pub const DEFAULT_MAX_ACTION_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub site_url: Url,
    pub contract_address: String,
    pub max_action_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:3000".into(),
            site_url: Url::parse("http://localhost:3000").expect("static default url"),
            contract_address: DEFAULT_CONTRACT_ADDRESS.into(),
            max_action_body_bytes: DEFAULT_MAX_ACTION_BODY_BYTES,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("server.toml") {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());

    settings
}

pub(crate) fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, String>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(error) => {
            warn!(%error, "ignoring unreadable server.toml");
            return;
        }
    };

    if let Some(v) = file_cfg.get("bind_addr") {
        settings.server_bind = v.clone();
    }
    if let Some(v) = file_cfg.get("site_url") {
        set_site_url(settings, v);
    }
    if let Some(v) = file_cfg.get("contract_address") {
        settings.contract_address = v.clone();
    }
    if let Some(v) = file_cfg.get("max_action_body_bytes") {
        set_body_limit(settings, v);
    }
}

pub(crate) fn apply_env_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = lookup("SITE_URL") {
        set_site_url(settings, &v);
    }
    if let Some(v) = lookup("APP__SITE_URL") {
        set_site_url(settings, &v);
    }

    if let Some(v) = lookup("TIPJAR_CONTRACT") {
        settings.contract_address = v;
    }
    if let Some(v) = lookup("APP__CONTRACT_ADDRESS") {
        settings.contract_address = v;
    }

    if let Some(v) = lookup("APP__MAX_ACTION_BODY_BYTES") {
        set_body_limit(settings, &v);
    }
}

fn set_site_url(settings: &mut Settings, raw: &str) {
    match Url::parse(raw.trim()) {
        Ok(url) => settings.site_url = url,
        Err(error) => warn!(site_url = raw, %error, "ignoring invalid site url"),
    }
}

fn set_body_limit(settings: &mut Settings, raw: &str) {
    match raw.trim().parse::<usize>() {
        Ok(limit) if limit > 0 => settings.max_action_body_bytes = limit,
        _ => warn!(value = raw, "ignoring invalid max_action_body_bytes"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
