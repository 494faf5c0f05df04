use std::path::PathBuf;

const ENV_CONFIG: &str = "KUBO_PLUGIN_CONFIG";
const ENV_WORK_DIR: &str = "KUBO_PLUGIN_WORK_DIR";
const ENV_DIST_URL: &str = "KUBO_PLUGIN_DIST_URL";
const ENV_VERSION: &str = "KUBO_PLUGIN_VERSION";
const ENV_DOWNLOAD_TIMEOUT: &str = "KUBO_PLUGIN_DOWNLOAD_TIMEOUT";
const ENV_STOP_GRACE: &str = "KUBO_PLUGIN_STOP_GRACE";
const ENV_LOG: &str = "KUBO_PLUGIN_LOG";

const FALLBACK_CONFIG_DIR: &str = "~/.config";
const PLUGIN_SUBDIR: &str = "kubo-plugin";

/// Non-empty value of an env var.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    let raw = env_opt(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring non-numeric env var");
            None
        }
    }
}

/// Config file path ($KUBO_PLUGIN_CONFIG or ~/.config/kubo-plugin/config.toml)
pub fn config_path() -> PathBuf {
    let path = env_opt(ENV_CONFIG).map(PathBuf::from).unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(FALLBACK_CONFIG_DIR))
            .join(PLUGIN_SUBDIR)
            .join("config.toml")
    });
    tracing::trace!(path = %path.display(), "Resolved config path");
    path
}

/// Root for `kubo/` and `tmp/` ($KUBO_PLUGIN_WORK_DIR)
pub fn work_dir() -> Option<PathBuf> {
    let val = env_opt(ENV_WORK_DIR).map(PathBuf::from);
    tracing::trace!(value = ?val, "KUBO_PLUGIN_WORK_DIR env var");
    val
}

/// Distribution mirror ($KUBO_PLUGIN_DIST_URL)
pub fn dist_url() -> Option<String> {
    let val = env_opt(ENV_DIST_URL);
    tracing::trace!(value = ?val, "KUBO_PLUGIN_DIST_URL env var");
    val
}

/// Kubo release ($KUBO_PLUGIN_VERSION)
pub fn version() -> Option<String> {
    let val = env_opt(ENV_VERSION);
    tracing::trace!(value = ?val, "KUBO_PLUGIN_VERSION env var");
    val
}

/// Download timeout in seconds ($KUBO_PLUGIN_DOWNLOAD_TIMEOUT)
pub fn download_timeout_secs() -> Option<u64> {
    env_u64(ENV_DOWNLOAD_TIMEOUT)
}

/// Stop grace period in seconds ($KUBO_PLUGIN_STOP_GRACE)
pub fn stop_grace_secs() -> Option<u64> {
    env_u64(ENV_STOP_GRACE)
}

/// Log filter ($KUBO_PLUGIN_LOG)
pub fn log_level() -> Option<String> {
    env_opt(ENV_LOG)
}
