//! # Proof-of-Work Engine
//!
//! Finding a nonce is expensive, checking one is a single hash. Both sides go
//! through the same private `meets_target` predicate over the same proof
//! input, so a nonce this engine seals is exactly a nonce it will accept
//! during validation. Any asymmetry there would be a consensus bug, which is
//! why the input format lives in one function and nowhere else.
//!
//! ## Proof input
//!
//! ```text
//! "{index}{previous_hash}{canonical_json(transactions)}{nonce}"
//! ```
//!
//! SHA-256 of that string, as lowercase hex, must start with the engine's
//! difficulty target (four `0` characters by default).
//!
//! ## Cancellation
//!
//! [`ProofOfWork::seal`] runs until it finds a nonce, full stop. The node
//! uses [`ProofOfWork::seal_until`] instead, which polls a [`StopFlag`] every
//! [`STOP_POLL_INTERVAL`] nonces so that a sealing job running on a blocking
//! worker can be abandoned when a competing block arrives or the process
//! shuts down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::config::{DIFFICULTY_TARGET, STOP_POLL_INTERVAL};
use crate::crypto::hash::{canonical_json_value, sha256_hex};
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// StopFlag
// ---------------------------------------------------------------------------

/// Shared abort handle for a sealing search. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every search holding this flag to give up at its next poll.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// SealOutcome
// ---------------------------------------------------------------------------

/// Result of an interruptible sealing search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealOutcome {
    /// A nonce satisfying the target.
    Found(u64),
    /// The stop flag was raised after `tried` nonces had been checked.
    Aborted { tried: u64 },
}

// ---------------------------------------------------------------------------
// ProofOfWork
// ---------------------------------------------------------------------------

/// Fixed-difficulty proof-of-work. No retargeting: the target is set at
/// construction and never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty_target: String,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::new(DIFFICULTY_TARGET)
    }
}

impl ProofOfWork {
    /// Create an engine with a custom prefix. Tests use `"0"` or `"00"` to
    /// keep sealing near-instant; production always uses the default.
    pub fn new(difficulty_target: impl Into<String>) -> Self {
        Self {
            difficulty_target: difficulty_target.into(),
        }
    }

    pub fn difficulty_target(&self) -> &str {
        &self.difficulty_target
    }

    /// The exact string hashed for a proof check.
    pub fn proof_input(
        index: u64,
        previous_hash: &str,
        transactions: &[Transaction],
        nonce: u64,
    ) -> String {
        format!("{}{}", Self::proof_prefix(index, previous_hash, transactions), nonce)
    }

    /// Everything in the proof input except the nonce. Computed once per
    /// search instead of once per attempt.
    fn proof_prefix(index: u64, previous_hash: &str, transactions: &[Transaction]) -> String {
        let txs = serde_json::Value::Array(transactions.iter().map(Transaction::to_value).collect());
        format!("{}{}{}", index, previous_hash, canonical_json_value(&txs))
    }

    fn meets_target(&self, prefix: &str, nonce: u64) -> bool {
        let digest = sha256_hex(format!("{}{}", prefix, nonce).as_bytes());
        digest.starts_with(&self.difficulty_target)
    }

    /// Does `nonce` seal these block contents?
    pub fn valid_proof(
        &self,
        index: u64,
        previous_hash: &str,
        transactions: &[Transaction],
        nonce: u64,
    ) -> bool {
        self.meets_target(&Self::proof_prefix(index, previous_hash, transactions), nonce)
    }

    /// Search nonces from 0 upward until one satisfies the target.
    ///
    /// Unbounded and CPU-bound. Never call this on an async executor thread.
    pub fn seal(&self, index: u64, previous_hash: &str, transactions: &[Transaction]) -> u64 {
        let prefix = Self::proof_prefix(index, previous_hash, transactions);
        let mut nonce = 0u64;
        while !self.meets_target(&prefix, nonce) {
            nonce = nonce.wrapping_add(1);
        }
        debug!(index, nonce, "block sealed");
        nonce
    }

    /// Like [`seal`](Self::seal), but gives up once `stop` is raised.
    ///
    /// The flag is checked before the first attempt and then every
    /// [`STOP_POLL_INTERVAL`] nonces, so an already-raised flag aborts with
    /// `tried == 0`.
    pub fn seal_until(
        &self,
        index: u64,
        previous_hash: &str,
        transactions: &[Transaction],
        stop: &StopFlag,
    ) -> SealOutcome {
        let prefix = Self::proof_prefix(index, previous_hash, transactions);
        let mut nonce = 0u64;
        loop {
            if nonce % STOP_POLL_INTERVAL == 0 && stop.is_stopped() {
                debug!(index, tried = nonce, "sealing aborted");
                return SealOutcome::Aborted { tried: nonce };
            }
            if self.meets_target(&prefix, nonce) {
                debug!(index, nonce, "block sealed");
                return SealOutcome::Found(nonce);
            }
            nonce = nonce.wrapping_add(1);
        }
    }
}
