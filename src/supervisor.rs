use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_STOP_GRACE_SECS;
use crate::error::SupervisorError;
use crate::layout::{InstalledBinary, Layout};

pub const DAEMON_ARG: &str = "daemon";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    Stopped,
    Running,
    /// Held only while `stop` runs under the supervisor lock. `status` and `info` wait on
    /// that lock, so they report `Stopped` or `Running`, never this.
    Terminating,
}

/// Where the daemon's stdout/stderr go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Piped into the plugin's log. Needs a runtime that outlives the daemon.
    #[default]
    Capture,
    /// Written straight to the plugin's stderr, so the daemon survives a one-shot invocation.
    Inherit,
}

/// Point-in-time view of the supervised daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonInfo {
    pub state: ProcessState,
    pub pid: Option<u32>,
    pub uptime_secs: Option<u64>,
}

/// The running daemon. Only the supervisor ever touches the child handle.
pub struct ManagedProcess {
    child: Child,
    pid: u32,
    started_at: Instant,
}

impl ManagedProcess {
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

struct Tracked {
    state: ProcessState,
    process: Option<ManagedProcess>,
}

impl Tracked {
    /// Clears the handle if the daemon exited on its own.
    fn reap_if_exited(&mut self) {
        let Some(process) = self.process.as_mut() else {
            return;
        };
        match process.child.try_wait() {
            Ok(Some(status)) => {
                info!(pid = process.pid, %status, "Kubo daemon exited");
                self.process = None;
                self.state = ProcessState::Stopped;
            }
            Ok(None) => {}
            Err(e) => debug!(pid = process.pid, "Failed to poll daemon: {}", e),
        }
    }
}

/// Owns the single kubo daemon process.
///
/// Every operation holds the lock for its full duration, so overlapping hooks and
/// commands can never leave two untracked daemons behind.
pub struct Supervisor {
    layout: Layout,
    stop_grace: Duration,
    output: OutputMode,
    inner: Mutex<Tracked>,
}

impl Supervisor {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            stop_grace: Duration::from_secs(DEFAULT_STOP_GRACE_SECS),
            output: OutputMode::default(),
            inner: Mutex::new(Tracked {
                state: ProcessState::Stopped,
                process: None,
            }),
        }
    }

    /// How long `stop` waits after SIGTERM before killing outright.
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Starts the daemon, stopping any instance already tracked.
    pub async fn start(&self) -> Result<u32, SupervisorError> {
        let mut tracked = self.inner.lock().await;
        self.start_locked(&mut tracked).await
    }

    pub async fn stop(&self) -> Result<(), SupervisorError> {
        let mut tracked = self.inner.lock().await;
        self.stop_locked(&mut tracked).await
    }

    /// Stop then start under one lock. An already-stopped daemon just starts.
    pub async fn restart(&self) -> Result<u32, SupervisorError> {
        let mut tracked = self.inner.lock().await;
        self.stop_locked(&mut tracked).await?;
        self.start_locked(&mut tracked).await
    }

    pub async fn status(&self) -> ProcessState {
        let mut tracked = self.inner.lock().await;
        tracked.reap_if_exited();
        tracked.state
    }

    pub async fn info(&self) -> DaemonInfo {
        let mut tracked = self.inner.lock().await;
        tracked.reap_if_exited();
        DaemonInfo {
            state: tracked.state,
            pid: tracked.process.as_ref().map(|p| p.pid),
            uptime_secs: tracked.process.as_ref().map(|p| p.uptime_secs()),
        }
    }

    async fn start_locked(&self, tracked: &mut Tracked) -> Result<u32, SupervisorError> {
        tracked.reap_if_exited();
        if tracked.process.is_some() {
            info!("Kubo daemon already running, stopping it first");
            self.stop_locked(tracked).await?;
        }

        let binary = InstalledBinary::inspect(&self.layout);
        if !binary.present {
            return Err(SupervisorError::NotResolved { path: binary.path });
        }

        let mut cmd = Command::new(&binary.path);
        cmd.arg(DAEMON_ARG)
            .current_dir(self.layout.root())
            .stdin(Stdio::null());
        match self.output {
            OutputMode::Capture => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
            OutputMode::Inherit => {
                cmd.stdout(Stdio::from(std::io::stderr()))
                    .stderr(Stdio::inherit());
            }
        }

        let mut child = cmd.spawn().map_err(|source| SupervisorError::Spawn {
            path: binary.path.clone(),
            source,
        })?;
        let pid = spawned_pid(&mut child, &binary.path)?;
        spawn_log_readers(&mut child);

        info!(pid, "Kubo daemon started");
        tracked.process = Some(ManagedProcess {
            child,
            pid,
            started_at: Instant::now(),
        });
        tracked.state = ProcessState::Running;
        Ok(pid)
    }

    async fn stop_locked(&self, tracked: &mut Tracked) -> Result<(), SupervisorError> {
        tracked.reap_if_exited();
        let Some(mut process) = tracked.process.take() else {
            tracked.state = ProcessState::Stopped;
            return Ok(());
        };

        tracked.state = ProcessState::Terminating;
        let pid = process.pid;
        info!(pid, "Stopping kubo daemon");

        if let Err(source) = send_terminate(&mut process.child, pid).await {
            // Signal never reached a live process; keep tracking it.
            tracked.process = Some(process);
            tracked.state = ProcessState::Running;
            return Err(SupervisorError::Termination { pid, source });
        }

        match tokio::time::timeout(self.stop_grace, process.child.wait()).await {
            Ok(Ok(status)) => debug!(pid, %status, "Kubo daemon stopped"),
            Ok(Err(e)) => debug!(pid, "Failed to collect daemon exit status: {}", e),
            Err(_) => {
                warn!(pid, "Kubo daemon did not stop in time, force killing");
                if let Err(source) = process.child.kill().await {
                    tracked.process = Some(process);
                    tracked.state = ProcessState::Running;
                    return Err(SupervisorError::Termination { pid, source });
                }
            }
        }

        tracked.state = ProcessState::Stopped;
        Ok(())
    }
}

/// A missing id must never become pid 0: `kill(0, ..)` signals the whole process group.
fn spawned_pid(child: &mut Child, path: &Path) -> Result<u32, SupervisorError> {
    match child.id() {
        Some(pid) => Ok(pid),
        None => {
            let _ = child.start_kill();
            Err(SupervisorError::Spawn {
                path: path.to_path_buf(),
                source: std::io::Error::other("spawned process reported no pid"),
            })
        }
    }
}

/// SIGTERM on unix, hard kill elsewhere. A process that is already gone counts as success.
async fn send_terminate(child: &mut Child, pid: u32) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let _ = child;
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::ESRCH) {
                debug!(pid, "Kubo daemon already gone");
                return Ok(());
            }
            return Err(err);
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        match child.start_kill() {
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }
}

/// Forwards the daemon's stdout/stderr into the log instead of the host's stdout.
fn spawn_log_readers(child: &mut Child) {
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(target: "kubo", "{}", line);
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(target: "kubo", "{}", line);
            }
        });
    }
}
