use std::path::PathBuf;
use thiserror::Error;

/// Failures while resolving the daemon binary onto disk.
#[derive(Error, Debug)]
pub enum InstallError {
    /// No prebuilt archive exists for this OS/architecture. Never retried.
    #[error("no prebuilt kubo binary for {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    /// The archive carries an entry type the extractor refuses (symlink, device, ...).
    #[error("unsupported archive entry '{path}' of type {kind}")]
    UnsupportedEntry { path: String, kind: String },

    #[error("failed to extract '{path}': {reason}")]
    Extract { path: String, reason: String },

    #[error("install io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while driving the supervised daemon process.
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("kubo binary is not resolved at {}; run the build hook first", path.display())]
    NotResolved { path: PathBuf },

    #[error("failed to spawn {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to terminate daemon pid {pid}: {source}")]
    Termination {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum PluginError {
    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    /// Host delivered a hook the manifest never registered.
    #[error("hook not defined: {0}")]
    UnknownEvent(String),

    #[error("command not defined: {0}")]
    UnknownCommand(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PluginError>;
