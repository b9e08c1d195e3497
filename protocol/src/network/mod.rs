//! # Network Module
//!
//! Everything that coordinates one node's ledger with the outside world:
//! the node context itself, its pending pool, its peer registry, and the
//! synchronizer that reconciles against peers.
//!
//! ## Architecture
//!
//! ```text
//! node.rs     — Node context: admission, mining, adoption, persistence
//! mempool.rs  — Ordered pending pool with post-adoption pruning
//! peers.rs    — Peer address normalization and the NodeSet registry
//! sync.rs     — Longest-valid-chain reconciliation over a PeerClient
//! ```
//!
//! ## Design Decisions
//!
//! - Chain and pool share one `parking_lot::Mutex`. Reads vastly outnumber
//!   writes, but every interesting write touches both, and a single lock
//!   makes "seal exactly what was snapshotted" trivially true.
//! - Proof-of-work never runs under that lock. See [`node`] for the
//!   template/seal/commit split.
//! - No HTTP here. The protocol crate stays transport-agnostic; the node
//!   binary plugs an HTTP [`PeerClient`] into the [`Synchronizer`].

pub mod mempool;
pub mod node;
pub mod peers;
pub mod sync;

pub use mempool::PendingPool;
pub use node::{BlockTemplate, Node};
pub use peers::{NodeSet, PeerAddress, PeerAddressError};
pub use sync::{ChainResponse, PeerClient, PeerError, SyncConfig, SyncReport, Synchronizer};
