use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `lockgate` - rule-based request validator issuing signed lock tokens.
#[derive(Parser, Debug)]
#[command(name = "lockgate")]
#[command(author = "theonlyhennygod")]
#[command(version)]
#[command(about = "Validate requests against policy rules and issue lock tokens.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.lockgate/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the default configuration if none exists
    Init,

    /// Print a fresh random signing key (hex)
    Keygen,

    /// Show the effective configuration
    Status,

    /// List configured policies and their rules
    Policies,

    /// Validate one request and print the decision as JSON
    ///
    /// Exit code: 0 locked, 2 quarantine, 3 reject.
    Validate {
        /// Request JSON file, or `-` for stdin
        #[arg(long, value_name = "FILE", conflicts_with_all = ["id", "payload"])]
        request: Option<String>,

        /// Request identifier (inline mode)
        #[arg(long, requires = "payload")]
        id: Option<String>,

        /// Policy version (inline mode)
        #[arg(long, default_value = "v1")]
        policy: String,

        /// Payload as JSON; non-JSON text is taken as a string (inline mode)
        #[arg(long, requires = "id")]
        payload: Option<String>,

        /// Also print per-rule results
        #[arg(long)]
        trace: bool,
    },

    /// Verify a compact lock token (`lg1.…`)
    Verify {
        /// Compact token string
        token: String,
    },

    /// Start the HTTP gateway
    Serve {
        /// Port to listen on (use 0 for random available port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },
}
