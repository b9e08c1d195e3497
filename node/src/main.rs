// Copyright (c) 2026 Denarius Contributors. MIT License.
// See LICENSE for details.

//! # Denarius Node
//!
//! Entry point for the `denarius-node` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the chain file, starts the
//! background reconciliation loop, and serves the HTTP API.
//!
//! The binary supports four subcommands:
//!
//! - `run`     — start the node
//! - `init`    — create or verify the chain file
//! - `status`  — print a running node's chain length
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod peer_client;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;

use denarius_protocol::config::PROTOCOL_VERSION;
use denarius_protocol::consensus::{ProofOfWork, StopFlag};
use denarius_protocol::crypto::signatures::Ed25519Verifier;
use denarius_protocol::network::node::Node;
use denarius_protocol::network::peers::PeerAddress;
use denarius_protocol::network::sync::{ChainResponse, PeerClient, SyncConfig, Synchronizer};
use denarius_protocol::storage::JsonFileStore;

use cli::{Commands, DenariusNodeCli};
use logging::LogFormat;
use metrics::NodeMetrics;
use peer_client::HttpPeerClient;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DenariusNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Opens the chain, wires up the node, and serves until a shutdown signal.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_FILTER, args.log_format)
        .context("failed to install log subscriber")?;

    tracing::info!(
        port = args.port,
        chain_file = %args.chain_file.display(),
        peers = args.peers.len(),
        sync_interval_secs = args.sync_interval_secs,
        "starting denarius-node"
    );

    // --- Chain ---
    let node = Arc::new(open_node(&args.chain_file)?);
    tracing::info!(
        length = node.chain_length(),
        tip = %node.tip_hash(),
        "chain ready"
    );

    // --- Peers ---
    node.add_peers(&args.peers)
        .context("invalid --peer address")?;

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);
    node_metrics.observe(node.chain_length(), node.pending_count());

    // --- Application state ---
    let client: Arc<dyn PeerClient> = Arc::new(HttpPeerClient::new());
    let sync_config = SyncConfig {
        fetch_timeout: Duration::from_millis(args.peer_timeout_ms),
    };
    let app_state = api::AppState {
        node: Arc::clone(&node),
        synchronizer: Arc::new(Synchronizer::new(client, sync_config)),
        metrics: Arc::clone(&node_metrics),
        node_id: uuid::Uuid::new_v4().simple().to_string(),
        mining_stop: StopFlag::new(),
    };
    tracing::info!(node_id = %app_state.node_id, "node identity assigned");

    // --- Background reconciliation ---
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sync_loop = (args.sync_interval_secs > 0).then(|| {
        tokio::spawn(sync_loop(
            app_state.clone(),
            Duration::from_secs(args.sync_interval_secs),
            shutdown_rx,
        ))
    });

    // --- API server ---
    let router = api::create_router(app_state.clone());
    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", addr))?;
    tracing::info!("API server listening on {}", addr);

    // --- Serve ---
    let mining_stop = app_state.mining_stop.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("shutdown signal received, draining connections");
            mining_stop.stop();
        })
        .await
        .context("API server error")?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = sync_loop {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "sync loop ended abnormally");
        }
    }

    tracing::info!("denarius-node stopped");
    Ok(())
}

fn open_node(chain_file: &std::path::Path) -> Result<Node> {
    Node::open(
        ProofOfWork::default(),
        Arc::new(Ed25519Verifier),
        Arc::new(JsonFileStore::new(chain_file)),
    )
    .with_context(|| format!("cannot establish chain from {}", chain_file.display()))
}

/// Periodic reconciliation until `shutdown` flips to `true`.
async fn sync_loop(state: api::AppState, every: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; skip it so startup is not a sync storm.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match api::run_sync_round(&state).await {
                    Ok(report) if report.updated => tracing::info!(
                        length = report.length,
                        peer = ?report.adopted_from.map(|p| p.to_string()),
                        "background sync replaced chain"
                    ),
                    Ok(report) => tracing::debug!(
                        length = report.length,
                        failures = report.failures.len(),
                        "background sync round complete"
                    ),
                    Err(e) => tracing::error!(error = %e, "background sync failed"),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    tracing::debug!("sync loop stopped");
}

/// Creates the chain file with a sealed genesis, or verifies an existing one.
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_FILTER, LogFormat::Pretty)
        .context("failed to install log subscriber")?;

    let existed = args.chain_file.exists();
    let node = open_node(&args.chain_file)?;

    if existed {
        println!("Chain file verified.");
    } else {
        println!("Chain file created.");
    }
    println!("  Chain file : {}", args.chain_file.display());
    println!("  Length     : {}", node.chain_length());
    println!("  Tip hash   : {}", node.tip_hash());

    Ok(())
}

/// Fetches a running node's chain and prints its length.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let peer: PeerAddress = args
        .url
        .parse()
        .with_context(|| format!("invalid node address: {}", args.url))?;

    let response = peer_client::http_get(&peer, peer_client::CHAIN_PATH)
        .await
        .with_context(|| format!("failed to query {}", peer))?;
    anyhow::ensure!(response.status == 200, "{} answered HTTP {}", peer, response.status);

    let value: serde_json::Value =
        serde_json::from_slice(&response.body).context("node returned non-JSON body")?;
    let chain = ChainResponse::from_value(value).context("node returned an invalid chain")?;

    println!("Node       : {}", peer);
    println!("Length     : {}", chain.length);
    if let Some(tip) = chain.chain.last() {
        println!("Tip hash   : {}", tip.hash());
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("denarius-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol      {}", PROTOCOL_VERSION);
    println!("rustc         {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed, that branch waits forever and the other still works.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
