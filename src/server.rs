use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, trace, warn};

use crate::error::{PluginError, Result};
use crate::protocol::{MessageFrame, Request, Response};
use crate::router::{LifecycleEvent, Router};

/// Serves host requests over a line-oriented stream until EOF or a termination signal.
///
/// The daemon is stopped on the way out so the host never leaves an orphan behind.
pub struct PluginServer {
    router: Arc<Router>,
    version: String,
}

impl PluginServer {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub async fn run_stdio(self) -> Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();

        #[cfg(unix)]
        let shutdown = async {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = signal(SignalKind::terminate())?;
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM"),
                _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
            }
            Ok::<(), std::io::Error>(())
        };

        #[cfg(not(unix))]
        let shutdown = async {
            tokio::signal::ctrl_c().await?;
            info!("Received Ctrl+C");
            Ok::<(), std::io::Error>(())
        };

        let router = Arc::clone(&self.router);
        let result = tokio::select! {
            result = self.serve(reader, writer) => result,
            signal = shutdown => signal.map_err(PluginError::from),
        };

        info!("Stopping kubo daemon before exit");
        if let Err(e) = router.shutdown().await {
            warn!("Failed to stop kubo daemon: {}", e);
        }
        result
    }

    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(version = %self.version, "Kubo plugin ready");

        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                debug!("Host closed input");
                return Ok(());
            }
            if line.trim().is_empty() {
                continue;
            }
            trace!(request = %line.trim(), "Request received");

            let response = match MessageFrame::decode_request(&line) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    error!("Failed to decode request: {}", e);
                    Response::error(PluginError::Protocol(e.to_string()))
                }
            };

            let encoded = MessageFrame::encode_response(&response)?;
            writer.write_all(encoded.as_bytes()).await?;
            writer.flush().await?;
        }
    }

    pub async fn handle_request(&self, request: Request) -> Response {
        match request {
            Request::Ping => Response::Pong {
                version: self.version.clone(),
            },

            Request::Manifest => Response::Manifest {
                manifest: self.router.manifest(),
            },

            Request::Hook { phase, name, args } => {
                let event = LifecycleEvent::new(phase, name, args);
                debug!("Handling: Hook({})", event);
                match self.router.handle_event(&event).await {
                    Ok(()) => Response::Ok,
                    Err(e) => {
                        error!("Hook {} failed: {}", event, e);
                        Response::error(e)
                    }
                }
            }

            Request::Command { name, args } => {
                debug!("Handling: Command({})", name);
                match self.router.execute_command(&name, &args).await {
                    Ok(()) => Response::Ok,
                    Err(e) => {
                        error!("Command {} failed: {}", name, e);
                        Response::error(e)
                    }
                }
            }

            Request::Status => {
                let info = self.router.status().await;
                Response::Status {
                    state: info.state,
                    pid: info.pid,
                    uptime_secs: info.uptime_secs,
                }
            }
        }
    }
}
