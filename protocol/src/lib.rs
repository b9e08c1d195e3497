// Copyright (c) 2026 Denarius Contributors. MIT License.
// See LICENSE for details.

//! # Denarius Protocol — Core Library
//!
//! The consensus and ledger engine behind a Denarius node: a replicated,
//! append-only ledger of signed transfers, sealed into proof-of-work blocks
//! and reconciled across nodes by the longest-valid-chain rule.
//!
//! It is deliberately small. No UTXOs (balances are replayed from the chain),
//! no difficulty retargeting (four hex zeros, forever), no gossip (peers are
//! registered by hand), no fee market (the pool is first come, first sealed).
//!
//! ## Architecture
//!
//! - **config** — Protocol constants and operational defaults.
//! - **crypto** — SHA-256 over canonical JSON, Ed25519 keys and verification.
//! - **transaction** — The transfer record and the admission request.
//! - **consensus** — Proof-of-work sealing and verification.
//! - **storage** — Blocks, chain validation, balance replay, chain snapshots.
//! - **network** — Node context, pending pool, peer registry, synchronizer.
//! - **error** — What node operations can fail with.
//!
//! ## Design Philosophy
//!
//! 1. Validation is total. Untrusted input yields `Invalid(reason)`, never a panic.
//! 2. Persist before serve. Nothing is visible until it is on disk.
//! 3. Sealing is the only slow thing, so it is the only thing done off the lock.
//! 4. If it touches balances, it has tests. Plural.

pub mod config;
pub mod consensus;
pub mod crypto;
pub mod error;
pub mod network;
pub mod storage;
pub mod transaction;

pub use error::{NodeError, NodeResult};
