use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::clienv;
use crate::error::{PluginError, Result};
use crate::platform::{ArtifactLocator, PlatformKey, DEFAULT_DIST_URL, DEFAULT_VERSION};

const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_STOP_GRACE_SECS: u64 = 10;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Plugin settings. Priority: env var > config file > default.
///
/// The platform is never configurable; only the mirror and release change the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Root for `kubo/` and `tmp/`
    pub work_dir: PathBuf,
    /// Distribution mirror, e.g. "https://dist.ipfs.tech"
    pub dist_url: String,
    /// Kubo release tag, e.g. "v0.16.0"
    pub version: String,
    pub download_timeout_secs: u64,
    /// SIGTERM -> SIGKILL grace period
    pub stop_grace_secs: u64,
    /// Fallback tracing filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            dist_url: DEFAULT_DIST_URL.to_string(),
            version: DEFAULT_VERSION.to_string(),
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            stop_grace_secs: DEFAULT_STOP_GRACE_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Values read from `KUBO_PLUGIN_*` env vars.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub work_dir: Option<PathBuf>,
    pub dist_url: Option<String>,
    pub version: Option<String>,
    pub download_timeout_secs: Option<u64>,
    pub stop_grace_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            work_dir: clienv::work_dir(),
            dist_url: clienv::dist_url(),
            version: clienv::version(),
            download_timeout_secs: clienv::download_timeout_secs(),
            stop_grace_secs: clienv::stop_grace_secs(),
            log_level: clienv::log_level(),
        }
    }
}

impl PluginConfig {
    /// Config file + env overrides.
    pub fn load() -> Result<Self> {
        let config = Self::load_file(&clienv::config_path())?;
        Ok(config.with_overrides(EnvOverrides::from_env()))
    }

    /// A missing file yields defaults; a malformed one is an error.
    pub fn load_file(path: &Path) -> Result<Self> {
        tracing::trace!(path = %path.display(), "Loading plugin config");

        if !path.exists() {
            tracing::trace!("Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            PluginError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            PluginError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;

        tracing::trace!(?config, "Plugin config loaded");
        Ok(config)
    }

    pub fn with_overrides(mut self, env: EnvOverrides) -> Self {
        if let Some(dir) = env.work_dir {
            self.work_dir = dir;
        }
        if let Some(url) = env.dist_url {
            self.dist_url = url;
        }
        if let Some(version) = env.version {
            self.version = version;
        }
        if let Some(secs) = env.download_timeout_secs {
            self.download_timeout_secs = secs;
        }
        if let Some(secs) = env.stop_grace_secs {
            self.stop_grace_secs = secs;
        }
        if let Some(level) = env.log_level {
            self.log_level = level;
        }
        self
    }

    pub fn locator(&self) -> ArtifactLocator {
        ArtifactLocator::new(&self.dist_url, &self.version, PlatformKey::current())
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }
}
