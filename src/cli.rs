//! CLI argument parsing module
//!
//! Uses clap derive macros to declaratively define the single entry point's
//! flags. This approach ensures type safety and automatically generates
//! --help and --version.

use clap::Parser;
use std::path::PathBuf;

/// switchboard - HTTP reverse-proxy load balancer
///
/// `--config`'s default matches `constants::DEFAULT_CONFIG_FILENAME`; kept
/// as a literal here since clap's `default_value` stringifies the default
/// for `--help` before any value-parsing happens.
#[derive(Parser, Debug)]
#[command(
    name = "switchboard",
    about = "HTTP reverse-proxy load balancer",
    version = env!("CARGO_PKG_VERSION"),
    author = "switchboard contributors"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.yaml",
        help = "Configuration file path"
    )]
    pub config: PathBuf,
}

impl Cli {
    /// Parse CLI arguments and create Cli struct
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
