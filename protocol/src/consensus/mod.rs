//! # Consensus
//!
//! Denarius agrees on history the old-fashioned way: fixed-difficulty
//! proof-of-work per block, longest valid chain wins. This module holds the
//! work half of that sentence; the "longest valid chain" half lives in
//! [`crate::network::sync`].

pub mod pow;

pub use pow::{ProofOfWork, SealOutcome, StopFlag};
