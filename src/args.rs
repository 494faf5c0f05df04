use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kubo-plugin")]
#[command(version)]
#[command(about = "Resolves and supervises a Kubo IPFS daemon for chain build/serve hooks", long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Serve host requests as JSON lines over stdin/stdout (default)
    Serve,

    /// Print the command/hook manifest as JSON
    Manifest,

    /// Dispatch a single lifecycle event, e.g. `pre-build` or `cleanup-serve`
    Hook {
        /// Event name: <pre|post|cleanup>-<hook>
        event: String,

        /// Arguments passed through from the host
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run a plugin command (shutdown, restart)
    Command {
        name: String,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Download and unpack kubo if it is missing
    Resolve,
}
