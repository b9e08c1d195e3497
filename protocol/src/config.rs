//! # Protocol Configuration & Constants
//!
//! Every magic number in Denarius lives here. Consensus-relevant values
//! (difficulty target, genesis seed, reward sender) are part of the chain's
//! identity: two nodes that disagree on any of them will reject each other's
//! chains, so treat them as frozen once a network has been started.
//!
//! Operational defaults (timeouts, ports, file names) are only defaults. The
//! node binary exposes each of them as a CLI flag with an environment fallback.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Consensus
// ---------------------------------------------------------------------------

/// Leading hex characters a proof hash must start with. Four zeros means one
/// in 65 536 nonces succeeds on average: a fraction of a second on a laptop.
/// There is no retargeting; the target is fixed for the engine's lifetime.
pub const DIFFICULTY_TARGET: &str = "0000";

/// Seed string whose hash becomes the genesis block's `previous_hash`.
pub const GENESIS_SEED: &str = "genesis_block";

/// Sender address reserved for system-minted reward transactions.
/// Transactions from this sender skip signature and balance checks.
pub const REWARD_SENDER: &str = "0";

/// The one and only currency symbol carried by ledger transactions.
pub const CURRENCY: &str = "DNR";

/// Amount minted to the sealing node for every block it produces.
pub const MINING_REWARD: u64 = 1;

/// How many nonces the sealing loop tries between polls of its stop condition.
/// Polling an atomic every iteration would be measurable; every 1024 is not.
pub const STOP_POLL_INTERVAL: u64 = 1024;

// ---------------------------------------------------------------------------
// Operational defaults
// ---------------------------------------------------------------------------

/// Default location of the whole-chain snapshot file.
pub const DEFAULT_CHAIN_FILE: &str = "chain_data.json";

/// Upper bound on a single peer chain fetch. One dead peer must not stall a
/// reconciliation round, so every fetch runs under this timeout.
pub const DEFAULT_PEER_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between background reconciliation rounds in the node binary.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Default HTTP API port. Same as the reference deployment.
pub const DEFAULT_API_PORT: u16 = 5000;

/// Port assumed for peer addresses registered without an explicit port.
pub const DEFAULT_PEER_PORT: u16 = 80;

/// Crate version, surfaced by the node's `version` subcommand and `/health`.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");
