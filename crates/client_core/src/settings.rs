use std::{collections::HashMap, fs, path::Path, time::Duration};

use tracing::warn;
use url::Url;

use crate::amount::DEFAULT_TIP_AMOUNT;

pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x083C4B91577a28cD96DC948952e12D6f5390E13C";
pub const DEFAULT_FALLBACK_MESSAGE: &str = "Thanks!";
pub const DEFAULT_EXPLORER_TX_BASE: &str = "https://basescan.org/tx";
pub const DEFAULT_WALLET_RPC_URL: &str = "http://127.0.0.1:1248";
pub const DEFAULT_ACCOUNT_POLL: Duration = Duration::from_millis(1500);
pub const SETTINGS_FILE: &str = "tipjar.toml";

#[derive(Debug, Clone)]
pub struct TipSettings {
    pub contract_address: String,
    pub default_amount: String,
    pub fallback_message: String,
    pub explorer_tx_base: String,
    pub wallet_rpc_url: Url,
    pub account_poll_interval: Duration,
}

impl Default for TipSettings {
    fn default() -> Self {
        Self {
            contract_address: DEFAULT_CONTRACT_ADDRESS.into(),
            default_amount: DEFAULT_TIP_AMOUNT.into(),
            fallback_message: DEFAULT_FALLBACK_MESSAGE.into(),
            explorer_tx_base: DEFAULT_EXPLORER_TX_BASE.into(),
            wallet_rpc_url: Url::parse(DEFAULT_WALLET_RPC_URL).expect("static default url"),
            account_poll_interval: DEFAULT_ACCOUNT_POLL,
        }
    }
}

/// Defaults, then `tipjar.toml` in `dir`, then environment overrides.
pub fn load_tip_settings(dir: &Path) -> TipSettings {
    let mut settings = TipSettings::default();

    if let Ok(raw) = fs::read_to_string(dir.join(SETTINGS_FILE)) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());

    settings
}

pub fn apply_file_overrides(settings: &mut TipSettings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, String>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(error) => {
            warn!(%error, "ignoring unreadable {SETTINGS_FILE}");
            return;
        }
    };

    if let Some(v) = file_cfg.get("contract_address") {
        settings.contract_address = v.clone();
    }
    if let Some(v) = file_cfg.get("default_tip_amount") {
        settings.default_amount = v.clone();
    }
    if let Some(v) = file_cfg.get("fallback_message") {
        settings.fallback_message = v.clone();
    }
    if let Some(v) = file_cfg.get("explorer_tx_url") {
        settings.explorer_tx_base = v.clone();
    }
    if let Some(v) = file_cfg.get("wallet_rpc_url") {
        set_wallet_rpc_url(settings, v);
    }
    if let Some(v) = file_cfg.get("account_poll_ms") {
        set_account_poll(settings, v);
    }
}

pub fn apply_env_overrides(settings: &mut TipSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("TIPJAR_CONTRACT") {
        settings.contract_address = v;
    }
    if let Some(v) = lookup("APP__CONTRACT_ADDRESS") {
        settings.contract_address = v;
    }

    if let Some(v) = lookup("APP__DEFAULT_TIP_AMOUNT") {
        settings.default_amount = v;
    }
    if let Some(v) = lookup("APP__FALLBACK_MESSAGE") {
        settings.fallback_message = v;
    }
    if let Some(v) = lookup("APP__EXPLORER_TX_URL") {
        settings.explorer_tx_base = v;
    }

    if let Some(v) = lookup("WALLET_RPC_URL") {
        set_wallet_rpc_url(settings, &v);
    }
    if let Some(v) = lookup("APP__WALLET_RPC_URL") {
        set_wallet_rpc_url(settings, &v);
    }

    if let Some(v) = lookup("APP__ACCOUNT_POLL_MS") {
        set_account_poll(settings, &v);
    }
}

fn set_wallet_rpc_url(settings: &mut TipSettings, raw: &str) {
    match Url::parse(raw.trim()) {
        Ok(url) => settings.wallet_rpc_url = url,
        Err(error) => warn!(wallet_rpc_url = raw, %error, "ignoring invalid wallet rpc url"),
    }
}

fn set_account_poll(settings: &mut TipSettings, raw: &str) {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => settings.account_poll_interval = Duration::from_millis(ms),
        _ => warn!(value = raw, "ignoring invalid account_poll_ms"),
    }
}
