pub mod clienv;
pub mod config;
pub mod error;
pub mod installer;
pub mod layout;
pub mod manifest;
pub mod platform;
pub mod protocol;
pub mod resolver;
pub mod router;
pub mod server;
pub mod supervisor;

pub use config::PluginConfig;
pub use error::{InstallError, PluginError, Result, SupervisorError};
pub use layout::{InstalledBinary, Layout};
pub use manifest::Manifest;
pub use platform::{ArtifactLocator, PlatformKey};
pub use resolver::ResolutionGate;
pub use router::{HookPhase, LifecycleEvent, Router};
pub use server::PluginServer;
pub use supervisor::{OutputMode, ProcessState, Supervisor};
