use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{ActionError, Result};

pub const ENV_ACCESS_TOKEN: &str = "BROWSER_AUTOMATIONS_ACCESS_TOKEN";
pub const ENV_CRASH_TOKEN: &str = "BUGLESSTACK_ACCESS_TOKEN";
pub const ENV_CRASH_URL: &str = "BUGLESSTACK_URL";
pub const ENV_STORAGE_ENDPOINT: &str = "STORAGE_ENDPOINT";
pub const ENV_STORAGE_ACCESS_TOKEN: &str = "STORAGE_ACCESS_TOKEN";
pub const ENV_STORAGE_PUBLIC_BASE_URL: &str = "STORAGE_PUBLIC_BASE_URL";
pub const ENV_CHROMIUM_PATH: &str = "CHROMIUM_PATH";
pub const ENV_VERBOSE_ERRORS: &str = "BROWSER_AUTOMATIONS_VERBOSE_ERRORS";

pub const DEFAULT_CRASH_ENDPOINT: &str = "https://app.buglesstack.com/api/v1/crashes";
pub const DEFAULT_PORT: u16 = 5123;

pub const ACCESS_TOKEN_MISSING: &str = "BROWSER_AUTOMATIONS_ACCESS_TOKEN environment variable is not set. Please set it to enable access to the browser automations API.";
pub const CRASH_TOKEN_MISSING: &str = "BUGLESSTACK_ACCESS_TOKEN environment variable is not set. Please set it to enable error reporting.";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Shared secret expected in the inbound `Authorization: Bearer` header.
    pub access_token: Option<String>,
    /// Bearer token for the crash-reporting sink.
    pub crash_token: Option<String>,
    pub crash_endpoint: String,
    /// Object storage sink; when absent, rendered documents are returned inline.
    pub storage: Option<StorageConfig>,
    /// Explicit browser executable, overriding engine discovery.
    pub chromium_path: Option<PathBuf>,
    /// Include the error cause chain as a `stack` field in 500 envelopes.
    pub verbose_errors: bool,
    pub port: u16,
    pub timeouts: Timeouts,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Upload endpoint; objects are PUT under `<endpoint>/<key>`.
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Base for the returned public URL; defaults to the endpoint.
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Interval between liveness probes on an open session.
    pub heartbeat_interval: Duration,
    pub navigation: Duration,
    /// Upper bound when polling for a page condition.
    pub wait: Duration,
    pub wait_poll: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(5),
            navigation: Duration::from_secs(30),
            wait: Duration::from_secs(60),
            wait_poll: Duration::from_millis(500),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            crash_token: None,
            crash_endpoint: DEFAULT_CRASH_ENDPOINT.to_string(),
            storage: None,
            chromium_path: None,
            verbose_errors: false,
            port: DEFAULT_PORT,
            timeouts: Timeouts::default(),
        }
    }
}

/// Optional TOML overlay for server/timeout settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    port: Option<u16>,
    #[serde(default, with = "humantime_serde::option")]
    heartbeat_interval: Option<Duration>,
    #[serde(default, with = "humantime_serde::option")]
    navigation_timeout: Option<Duration>,
    #[serde(default, with = "humantime_serde::option")]
    wait_timeout: Option<Duration>,
    #[serde(default, with = "humantime_serde::option")]
    wait_poll_interval: Option<Duration>,
}

impl ServiceConfig {
    /// Reads the environment into a config with default timeouts.
    pub fn from_env() -> Self {
        let storage = env::var(ENV_STORAGE_ENDPOINT).ok().map(|endpoint| StorageConfig {
            endpoint,
            access_token: env::var(ENV_STORAGE_ACCESS_TOKEN).ok(),
            public_base_url: env::var(ENV_STORAGE_PUBLIC_BASE_URL).ok(),
        });

        Self {
            access_token: non_empty(env::var(ENV_ACCESS_TOKEN).ok()),
            crash_token: non_empty(env::var(ENV_CRASH_TOKEN).ok()),
            crash_endpoint: env::var(ENV_CRASH_URL)
                .ok()
                .unwrap_or_else(|| DEFAULT_CRASH_ENDPOINT.to_string()),
            storage,
            chromium_path: env::var(ENV_CHROMIUM_PATH).ok().map(PathBuf::from),
            verbose_errors: env::var(ENV_VERBOSE_ERRORS).is_ok(),
            port: DEFAULT_PORT,
            timeouts: Timeouts::default(),
        }
    }

    /// Environment config with an optional TOML overlay.
    /// Priority: file values > environment/defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_env();
        if let Some(path) = path {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                ActionError::config(format!("Failed to read config {}: {}", path.display(), e))
            })?;
            let file: FileConfig = toml::from_str(&raw).map_err(|e| {
                ActionError::config(format!("Invalid config ({}): {}", path.display(), e))
            })?;
            config.apply(file);
        }
        Ok(config)
    }

    fn apply(&mut self, file: FileConfig) {
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(interval) = file.heartbeat_interval {
            self.timeouts.heartbeat_interval = interval;
        }
        if let Some(nav) = file.navigation_timeout {
            self.timeouts.navigation = nav;
        }
        if let Some(wait) = file.wait_timeout {
            self.timeouts.wait = wait;
        }
        if let Some(poll) = file.wait_poll_interval {
            self.timeouts.wait_poll = poll;
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
