//! CLI configuration: thin wrapper around `dantesync_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--api-host, --api-key, --domain, ...).

use secrecy::SecretString;

use dantesync_core::SyncConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use dantesync_config::{Config, config_path, load_config_or_default};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `SyncConfig` from the config file, the active profile, and
/// CLI overrides. Flags take priority over profile values.
pub fn build_sync_config(global: &GlobalOpts) -> Result<SyncConfig, CliError> {
    let cfg = load_config_or_default();
    let (name, mut profile) = cfg
        .profile(global.profile.as_deref())
        .map_err(|_| CliError::ProfileNotFound {
            name: active_profile_name(global, &cfg),
            available: available_profiles(&cfg),
            path: config_path().display().to_string(),
        })?;

    if let Some(ref host) = global.api_host {
        profile.endpoint = Some(host.clone());
    }
    if let Some(ref domain) = global.domain {
        profile.domain = Some(domain.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    } else if profile.insecure.is_none() {
        profile.insecure = Some(cfg.defaults.insecure);
    }
    profile.timeout = global
        .timeout
        .or(profile.timeout)
        .or(Some(cfg.defaults.timeout));

    let api_key = match global.api_key {
        Some(ref key) => SecretString::from(key.clone()),
        None => dantesync_config::resolve_api_key(&profile, &name)?,
    };

    Ok(profile.to_sync_config_with_key(api_key)?)
}

fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort_unstable();
    names.join(", ")
}

/// Config with plaintext secrets masked, for display.
pub fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.api_key.is_some() {
            profile.api_key = Some("****".into());
        }
    }
    cfg
}
