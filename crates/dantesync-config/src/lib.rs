//! Shared configuration for the dantesync CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `dantesync_core::SyncConfig`. The CLI layers its
//! `GlobalOpts` overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dantesync_core::{BulkApplyOptions, DEFAULT_ENDPOINT, SyncConfig, TlsVerification};
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const KEYRING_SERVICE: &str = "dantesync";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API key configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named domain profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Pick a profile by name, falling back to `default_profile`.
    ///
    /// An unnamed lookup with no matching entry yields an empty profile so
    /// flags and env alone can drive a session.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, Profile), ConfigError> {
        if let Some(name) = name {
            return self
                .profiles
                .get(name)
                .cloned()
                .map(|p| (name.to_owned(), p))
                .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() });
        }

        let name = self
            .default_profile
            .clone()
            .unwrap_or_else(|| "default".into());
        let profile = self.profiles.get(&name).cloned().unwrap_or_default();
        Ok((name, profile))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named Dante domain profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// GraphQL endpoint; the hosted API when unset.
    pub endpoint: Option<String>,

    /// Domain id to sync. `"default"` or empty means none selected.
    pub domain: Option<String>,

    /// API key (plaintext, prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    pub insecure: Option<bool>,

    /// Request timeout in seconds.
    pub timeout: Option<u64>,

    #[serde(default)]
    pub sync: SyncTuning,
}

/// Poller and bulk apply knobs. Unset fields keep the core defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SyncTuning {
    pub poll_interval_secs: Option<u64>,
    pub full_fetch_interval_polls: Option<u64>,
    pub max_channels_for_dropdowns: Option<usize>,
    pub batch_size: Option<usize>,
    pub retries: Option<u32>,
    pub batch_delay_ms: Option<u64>,
    pub retry_delay_ms: Option<u64>,
    pub verify_timeout_ms: Option<u64>,
    pub pause_polling_on_bulk_apply: Option<bool>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "dantesync", "dantesync").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("dantesync");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + `DANTESYNC_` environment. Nested keys use `__`,
/// e.g. `DANTESYNC_DEFAULTS__TIMEOUT`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("DANTESYNC_").split("__"));

    Ok(figment.extract()?)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve an API key from the credential chain (no CLI flag step).
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── Translation ─────────────────────────────────────────────────────

impl Profile {
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    /// Build a `SyncConfig` from this profile with its credential chain
    /// resolved. No CLI flag overrides.
    pub fn to_sync_config(&self, profile_name: &str) -> Result<SyncConfig, ConfigError> {
        let api_key = resolve_api_key(self, profile_name)?;
        self.to_sync_config_with_key(api_key)
    }

    /// Same as [`to_sync_config`](Self::to_sync_config) with an explicit key.
    pub fn to_sync_config_with_key(&self, api_key: SecretString) -> Result<SyncConfig, ConfigError> {
        let endpoint = self.endpoint();
        url::Url::parse(endpoint).map_err(|e| ConfigError::Validation {
            field: "endpoint".into(),
            reason: format!("{endpoint}: {e}"),
        })?;

        let tls = if self.insecure.unwrap_or(false) {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        let base = SyncConfig::default();
        let tuning = &self.sync;
        let bulk = BulkApplyOptions {
            batch_size: tuning.batch_size.unwrap_or(base.bulk.batch_size),
            retries: tuning.retries.unwrap_or(base.bulk.retries),
            batch_delay: tuning
                .batch_delay_ms
                .map_or(base.bulk.batch_delay, Duration::from_millis),
            retry_delay: tuning
                .retry_delay_ms
                .map_or(base.bulk.retry_delay, Duration::from_millis),
            verify_timeout: tuning
                .verify_timeout_ms
                .map_or(base.bulk.verify_timeout, Duration::from_millis),
        };

        let config = SyncConfig {
            endpoint: endpoint.to_owned(),
            api_key,
            tls,
            timeout: self.timeout.map_or(base.timeout, Duration::from_secs),
            domain_id: self.domain.clone(),
            poll_interval: tuning
                .poll_interval_secs
                .map_or(base.poll_interval, Duration::from_secs),
            full_fetch_interval_polls: tuning
                .full_fetch_interval_polls
                .unwrap_or(base.full_fetch_interval_polls),
            max_channels_for_dropdowns: tuning
                .max_channels_for_dropdowns
                .unwrap_or(base.max_channels_for_dropdowns),
            bulk,
            pause_polling_on_bulk_apply: tuning
                .pause_polling_on_bulk_apply
                .unwrap_or(base.pause_polling_on_bulk_apply),
        };

        config.validate().map_err(|e| ConfigError::Validation {
            field: "sync".into(),
            reason: e.to_string(),
        })?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn profiles_load_from_toml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                default_profile = "studio"

                [profiles.studio]
                domain = "dom-1"
                api_key = "plain"

                [profiles.studio.sync]
                poll_interval_secs = 5
                batch_size = 4
                "#,
            )?;

            let config = load_config_from(Path::new("config.toml")).unwrap();
            let (name, profile) = config.profile(None).unwrap();

            assert_eq!(name, "studio");
            assert_eq!(profile.domain.as_deref(), Some("dom-1"));
            assert_eq!(profile.sync.poll_interval_secs, Some(5));
            assert_eq!(config.defaults.output, "table");
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[defaults]\ntimeout = 10\n")?;
            jail.set_env("DANTESYNC_DEFAULTS__TIMEOUT", "45");
            jail.set_env("DANTESYNC_DEFAULT_PROFILE", "rig");

            let config = load_config_from(Path::new("config.toml")).unwrap();

            assert_eq!(config.defaults.timeout, 45);
            assert_eq!(config.default_profile.as_deref(), Some("rig"));
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_| {
            let config = load_config_from(Path::new("absent.toml")).unwrap();
            assert_eq!(config.default_profile.as_deref(), Some("default"));
            assert!(config.profiles.is_empty());
            Ok(())
        });
    }

    #[test]
    fn unknown_named_profile_is_an_error() {
        let config = Config::default();
        assert!(matches!(
            config.profile(Some("nope")),
            Err(ConfigError::UnknownProfile { .. })
        ));
        assert!(config.profile(None).is_ok());
    }

    #[test]
    fn api_key_env_wins() {
        Jail::expect_with(|jail| {
            jail.set_env("DANTESYNC_TEST_KEY", "from-env");
            let profile = Profile {
                api_key_env: Some("DANTESYNC_TEST_KEY".into()),
                api_key: Some("plain".into()),
                ..Profile::default()
            };

            let key = resolve_api_key(&profile, "studio").unwrap();
            assert_eq!(key.expose_secret(), "from-env");
            Ok(())
        });
    }

    #[test]
    fn profile_translates_to_sync_config() {
        let profile = Profile {
            domain: Some("dom-1".into()),
            insecure: Some(true),
            timeout: Some(12),
            sync: SyncTuning {
                full_fetch_interval_polls: Some(5),
                retries: Some(4),
                verify_timeout_ms: Some(2_000),
                ..SyncTuning::default()
            },
            ..Profile::default()
        };

        let config = profile
            .to_sync_config_with_key(SecretString::from("k".to_owned()))
            .unwrap();

        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.selected_domain(), Some("dom-1"));
        assert!(matches!(config.tls, TlsVerification::DangerAcceptInvalid));
        assert_eq!(config.timeout, Duration::from_secs(12));
        assert_eq!(config.full_fetch_interval_polls, 5);
        assert_eq!(config.bulk.retries, 4);
        assert_eq!(config.bulk.batch_size, 10);
        assert_eq!(config.bulk.verify_timeout, Duration::from_secs(2));
    }

    #[test]
    fn out_of_range_tuning_is_rejected() {
        let profile = Profile {
            sync: SyncTuning {
                poll_interval_secs: Some(120),
                ..SyncTuning::default()
            },
            ..Profile::default()
        };

        let err = profile
            .to_sync_config_with_key(SecretString::from("k".to_owned()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "sync"));
    }

    #[test]
    fn bad_endpoint_is_rejected() {
        let profile = Profile {
            endpoint: Some("not a url".into()),
            ..Profile::default()
        };
        assert!(
            profile
                .to_sync_config_with_key(SecretString::from("k".to_owned()))
                .is_err()
        );
    }
}
