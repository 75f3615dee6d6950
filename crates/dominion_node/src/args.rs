//! Command-line argument parsing for the mirror node.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the mirror node.
///
/// Arguments override the corresponding values from the settings file,
/// so one file can serve several nodes of a cluster.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Settings file path
    ///
    /// Path to the TOML settings file. A default file is created here
    /// when none exists.
    #[arg(short, long, default_value = "dominion.toml")]
    pub config: PathBuf,

    /// Server name override
    ///
    /// Unique name of this node within the cluster. Peers drop messages
    /// stamped with their own name, so two nodes must never share one.
    #[arg(short, long)]
    pub server: Option<String>,

    /// Cluster id override
    ///
    /// Nodes only see traffic published under the same cluster id.
    #[arg(long)]
    pub cluster: Option<String>,

    /// Redis URL override
    ///
    /// Connection string for the Redis broker, e.g.
    /// "redis://127.0.0.1:6379". Setting it selects the redis broker.
    #[arg(short, long)]
    pub redis: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config: PathBuf::from("dominion.toml"),
            server: None,
            cluster: None,
            redis: None,
            debug: false,
            json_logs: false,
        }
    }
}
