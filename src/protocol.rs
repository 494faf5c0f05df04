//! Wire types for the stdio serve loop.
//!
//! One JSON object per line in each direction, tagged by `type`. Every request gets
//! exactly one response, in order.

use serde::{Deserialize, Serialize};

use crate::manifest::Manifest;
use crate::router::HookPhase;
use crate::supervisor::ProcessState;

/// Request from the host to the plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Liveness check
    Ping,
    /// Ask for the command/hook registrations
    Manifest,
    /// Lifecycle hook, e.g. phase `pre` of hook `serve`
    Hook {
        phase: HookPhase,
        name: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Direct command (`shutdown`, `restart`)
    Command {
        name: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Current daemon state
    Status,
}

/// Response from the plugin to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Pong { version: String },
    Manifest { manifest: Manifest },
    Ok,
    Status {
        state: ProcessState,
        pid: Option<u32>,
        uptime_secs: Option<u64>,
    },
    Error { message: String },
}

impl Response {
    pub fn error(err: impl std::fmt::Display) -> Self {
        Response::Error {
            message: err.to_string(),
        }
    }
}

/// Line framing for the JSON messages.
pub struct MessageFrame;

impl MessageFrame {
    pub fn encode_response(response: &Response) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(response)?;
        line.push('\n');
        Ok(line)
    }

    pub fn decode_request(line: &str) -> serde_json::Result<Request> {
        serde_json::from_str(line.trim())
    }

    pub fn decode_response(line: &str) -> serde_json::Result<Response> {
        serde_json::from_str(line.trim())
    }
}
