//! Translates host lifecycle callbacks into resolver and supervisor calls.
//!
//! | event          | action                              |
//! |----------------|-------------------------------------|
//! | pre-build      | resolve                             |
//! | pre-serve      | resolve, then start the daemon      |
//! | post-serve     | log only                            |
//! | cleanup-serve  | remove `tmp/ipfs.tar` and `tmp/`    |
//! | post-build     | no-op                               |
//! | cleanup-build  | no-op                               |
//!
//! Commands: `shutdown` stops the daemon, `restart` restarts it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::ErrorKind;
use std::sync::Arc;

use crate::config::PluginConfig;
use crate::error::{PluginError, Result};
use crate::installer::ArchiveInstaller;
use crate::layout::Layout;
use crate::manifest::{Manifest, HOOK_BUILD, HOOK_SERVE};
use crate::resolver::ResolutionGate;
use crate::supervisor::{DaemonInfo, OutputMode, Supervisor};

pub const COMMAND_SHUTDOWN: &str = "shutdown";
pub const COMMAND_RESTART: &str = "restart";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookPhase {
    Pre,
    Post,
    Cleanup,
}

impl HookPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::Pre => "pre",
            HookPhase::Post => "post",
            HookPhase::Cleanup => "cleanup",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "pre" => Some(HookPhase::Pre),
            "post" => Some(HookPhase::Post),
            "cleanup" => Some(HookPhase::Cleanup),
            _ => None,
        }
    }
}

/// A named host callback such as `pre-serve`, with the host's arguments passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub phase: HookPhase,
    pub hook: String,
    pub args: Vec<String>,
}

impl LifecycleEvent {
    pub fn new(phase: HookPhase, hook: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            phase,
            hook: hook.into(),
            args,
        }
    }

    /// Parses `<phase>-<hook>`, e.g. `cleanup-serve`.
    pub fn parse(name: &str, args: Vec<String>) -> Result<Self> {
        let (phase, hook) = name
            .split_once('-')
            .and_then(|(phase, hook)| Some((HookPhase::parse(phase)?, hook)))
            .filter(|(_, hook)| !hook.is_empty())
            .ok_or_else(|| PluginError::UnknownEvent(name.to_string()))?;
        Ok(Self::new(phase, hook, args))
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.phase.as_str(), self.hook)
    }
}

pub struct Router {
    gate: Arc<ResolutionGate>,
    supervisor: Arc<Supervisor>,
}

impl Router {
    pub fn new(gate: Arc<ResolutionGate>, supervisor: Arc<Supervisor>) -> Self {
        Self { gate, supervisor }
    }

    /// Wires locator, installer, gate and supervisor from one config.
    pub fn from_config(config: &PluginConfig, output: OutputMode) -> Result<Self> {
        let layout = Layout::new(&config.work_dir);
        let installer = ArchiveInstaller::new(
            config.locator(),
            layout.clone(),
            config.download_timeout(),
        )?;
        let supervisor = Supervisor::new(layout)
            .with_stop_grace(config.stop_grace())
            .with_output(output);
        Ok(Self::new(
            Arc::new(ResolutionGate::new(installer)),
            Arc::new(supervisor),
        ))
    }

    pub fn manifest(&self) -> Manifest {
        Manifest::kubo()
    }

    pub fn layout(&self) -> &Layout {
        self.gate.layout()
    }

    pub async fn status(&self) -> DaemonInfo {
        self.supervisor.info().await
    }

    pub async fn resolve(&self) -> Result<()> {
        let binary = self.gate.ensure_installed().await?;
        tracing::info!(path = %binary.path.display(), "Kubo IPFS has been resolved");
        Ok(())
    }

    pub async fn handle_event(&self, event: &LifecycleEvent) -> Result<()> {
        tracing::debug!(event = %event, args = ?event.args, "Hook received");

        match (event.phase, event.hook.as_str()) {
            (HookPhase::Pre, HOOK_BUILD) => self.resolve().await,
            (HookPhase::Pre, HOOK_SERVE) => {
                self.resolve().await?;
                let pid = self.supervisor.start().await?;
                tracing::info!(pid, "daemon pid {}", pid);
                Ok(())
            }
            (HookPhase::Post, HOOK_SERVE) => {
                tracing::info!(event = %event, "Post event triggered");
                Ok(())
            }
            (HookPhase::Cleanup, HOOK_SERVE) => self.cleanup_scratch().await,
            (HookPhase::Post | HookPhase::Cleanup, HOOK_BUILD) => Ok(()),
            _ => Err(PluginError::UnknownEvent(event.to_string())),
        }
    }

    pub async fn execute_command(&self, name: &str, args: &[String]) -> Result<()> {
        tracing::debug!(command = name, args = ?args, "Command received");

        match name {
            COMMAND_SHUTDOWN => {
                tracing::info!("Killing ipfs daemon");
                self.supervisor.stop().await?;
                Ok(())
            }
            COMMAND_RESTART => {
                tracing::info!("Restarting ipfs daemon");
                let pid = self.supervisor.restart().await?;
                tracing::info!(pid, "daemon pid {}", pid);
                Ok(())
            }
            other => Err(PluginError::UnknownCommand(other.to_string())),
        }
    }

    /// Stops the daemon if one is tracked. Used when the host goes away.
    pub async fn shutdown(&self) -> Result<()> {
        self.supervisor.stop().await?;
        Ok(())
    }

    /// Removes `tmp/ipfs.tar` and then `tmp/` if nothing else lives there.
    async fn cleanup_scratch(&self) -> Result<()> {
        let layout = self.layout();
        tracing::info!(dir = %layout.scratch_dir().display(), "Cleaning up scratch directory");

        match tokio::fs::remove_file(layout.archive_path()).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let scratch = layout.scratch_dir();
        let mut entries = match tokio::fs::read_dir(&scratch).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if entries.next_entry().await?.is_some() {
            tracing::warn!(dir = %scratch.display(), "Scratch directory holds unknown files, leaving it");
            return Ok(());
        }

        match tokio::fs::remove_dir(&scratch).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
