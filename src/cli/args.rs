//! CLI argument definitions using clap
//!
//! Commands:
//! - dbrpc serve [--config <path>] [flags]
//! - dbrpc methods [--config <path>] [flags]
//! - dbrpc call <method> [--config <path>] [flags] < args.json

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::GatewayConfig;

/// dbrpc - call database stored functions as RPC methods
#[derive(Parser, Debug)]
#[command(name = "dbrpc")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct Options {
    /// JSON configuration file; when given, flags are ignored
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub gateway: GatewayConfig,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect, load the catalog and serve JSON-RPC over HTTP
    Serve {
        #[command(flatten)]
        options: Options,
    },

    /// Print the loaded method descriptors
    Methods {
        #[command(flatten)]
        options: Options,
    },

    /// Invoke one method with a JSON object of arguments read from stdin
    Call {
        /// Method name
        method: String,

        #[command(flatten)]
        options: Options,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
