//! # Storage Module
//!
//! Blocks, the chain they form, the balances derived from it, and the
//! snapshot store that keeps it across restarts.
//!
//! ## Architecture
//!
//! ```text
//! block.rs  — Block structure, genesis sealing, canonical block hash
//! chain.rs  — Validated block sequence and the total chain validator
//! ledger.rs — Balance replay and the tip-keyed balance cache
//! store.rs  — ChainStore trait, atomic JSON file store, in-memory store
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! Transaction → Block → Chain → Ledger (replayed, never stored)
//!                         ↓
//!                    ChainStore (whole-chain snapshot)
//! ```
//!
//! ## Design Decisions
//!
//! 1. **SHA-256 over canonical JSON for everything.** Block links and
//!    proof-of-work both hash the same canonical encoding, so there is one
//!    definition of "the bytes of a block" in the whole system.
//!
//! 2. **No balance table.** A stored balance is a second source of truth,
//!    and second sources of truth drift. Replay is slower and cannot lie.
//!
//! 3. **JSON on disk.** The chain file doubles as the peer wire format and
//!    as a debugging aid. Compactness was never the bottleneck.

pub mod block;
pub mod chain;
pub mod ledger;
pub mod store;

pub use block::Block;
pub use chain::{Chain, ChainFault, Validation};
pub use ledger::{Balance, BalanceCache, Ledger};
pub use store::{ChainStore, JsonFileStore, MemoryStore, StoreError};
