//! # Block Structure
//!
//! A block bundles an ordered list of transactions, the hash of its
//! predecessor, and the nonce that seals it.
//!
//! ## Block Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  index: u64           (position in chain)   │
//! │  timestamp: f64       (unix seconds)        │
//! │  transactions: [Transaction]                │
//! │  nonce: u64           (proof-of-work)       │
//! │  previous_hash: Hex256                      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Hash Computation
//!
//! The block hash is SHA-256 over the canonical JSON of *all five* fields,
//! timestamp included. The nonce is bound separately by the proof-of-work
//! predicate, which deliberately leaves the timestamp out.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::GENESIS_SEED;
use crate::consensus::ProofOfWork;
use crate::crypto::hash::{canonical_json_value, hash_str, sha256_hex, Hex256};
use crate::transaction::Transaction;

/// A sealed block. Immutable once appended to a chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// 0-based position in the chain. Genesis is 0.
    pub index: u64,
    /// Unix time in seconds, with sub-second precision.
    pub timestamp: f64,
    /// Transactions in the order they were admitted.
    pub transactions: Vec<Transaction>,
    /// Proof-of-work nonce.
    pub nonce: u64,
    /// Hash of the preceding block; `Hash(GENESIS_SEED)` for genesis.
    pub previous_hash: Hex256,
}

impl Block {
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        nonce: u64,
        previous_hash: Hex256,
    ) -> Self {
        Self {
            index,
            timestamp: now_seconds(),
            transactions,
            nonce,
            previous_hash,
        }
    }

    /// Seal the genesis block: an empty transaction set against the hash of
    /// the fixed seed string.
    pub fn genesis(engine: &ProofOfWork) -> Self {
        let previous_hash = genesis_previous_hash();
        let nonce = engine.seal(0, &previous_hash, &[]);
        Self::new(0, Vec::new(), nonce, previous_hash)
    }

    /// Canonical JSON hash of the whole block.
    pub fn hash(&self) -> Hex256 {
        sha256_hex(canonical_json_value(&self.to_value()).as_bytes())
    }

    /// Does this block's nonce satisfy `engine` for its own contents?
    pub fn has_valid_proof(&self, engine: &ProofOfWork) -> bool {
        engine.valid_proof(self.index, &self.previous_hash, &self.transactions, self.nonce)
    }

    /// Lower to a JSON object without going through fallible serde plumbing.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("index".into(), Value::from(self.index));
        map.insert("timestamp".into(), Value::from(self.timestamp));
        map.insert(
            "transactions".into(),
            Value::Array(self.transactions.iter().map(Transaction::to_value).collect()),
        );
        map.insert("nonce".into(), Value::from(self.nonce));
        map.insert("previous_hash".into(), Value::from(self.previous_hash.as_str()));
        Value::Object(map)
    }
}

/// `previous_hash` every genesis block must carry.
pub fn genesis_previous_hash() -> Hex256 {
    hash_str(GENESIS_SEED)
}

fn now_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
