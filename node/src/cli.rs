//! # CLI Interface
//!
//! Defines the command-line argument structure for `denarius-node` using
//! `clap` derive. Supports four subcommands: `run`, `init`, `status`,
//! and `version`.
//!
//! Every runtime setting of `run` can also come from a `DNR_*` environment
//! variable, so container deployments need no flags at all.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use denarius_protocol::config::{
    DEFAULT_API_PORT, DEFAULT_CHAIN_FILE, DEFAULT_PEER_FETCH_TIMEOUT, DEFAULT_SYNC_INTERVAL,
};

use crate::logging::LogFormat;

/// Denarius proof-of-work ledger node.
///
/// Admits signed DNR transfers, seals them into blocks on demand, serves the
/// chain over HTTP, and reconciles with registered peers by the
/// longest-valid-chain rule.
#[derive(Parser, Debug)]
#[command(
    name = "denarius-node",
    about = "Denarius proof-of-work ledger node",
    version,
    propagate_version = true
)]
pub struct DenariusNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the Denarius node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node and serve the HTTP API.
    Run(RunArgs),
    /// Create the chain file with a freshly sealed genesis block, or verify
    /// an existing one.
    Init(InitArgs),
    /// Ask a running node for its chain and print the chain length.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the whole-chain snapshot file.
    ///
    /// Created with a genesis block on first run if it does not exist.
    #[arg(long, env = "DNR_CHAIN_FILE", default_value = DEFAULT_CHAIN_FILE)]
    pub chain_file: PathBuf,

    /// Address the HTTP API binds to.
    #[arg(long, env = "DNR_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Port for the HTTP API.
    #[arg(long, short = 'p', env = "DNR_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub port: u16,

    /// Peer to register at startup. Repeat the flag, or pass a
    /// comma-separated list through the environment.
    #[arg(long = "peer", env = "DNR_PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// Upper bound on a single peer chain fetch, in milliseconds.
    #[arg(long, env = "DNR_PEER_TIMEOUT_MS", default_value_t = DEFAULT_PEER_FETCH_TIMEOUT.as_millis() as u64)]
    pub peer_timeout_ms: u64,

    /// Seconds between background reconciliation rounds. 0 disables the
    /// background loop; `/nodes/sync` still works.
    #[arg(long, env = "DNR_SYNC_INTERVAL_SECS", default_value_t = DEFAULT_SYNC_INTERVAL.as_secs())]
    pub sync_interval_secs: u64,

    /// Log output format.
    #[arg(long, env = "DNR_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the chain file to create or verify.
    #[arg(long, env = "DNR_CHAIN_FILE", default_value = DEFAULT_CHAIN_FILE)]
    pub chain_file: PathBuf,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Address of the running node: `host:port` or an `http://` URL.
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub url: String,
}
