//! # Chain
//!
//! The ordered sequence of blocks from genesis to tip, plus the validator
//! that decides whether an arbitrary sequence of blocks deserves to be one.
//!
//! ## Validation is a total function
//!
//! Candidate chains arrive from peers, which is to say from strangers. The
//! validator therefore never panics and never returns an error: it returns a
//! [`Validation`], and an `Invalid` carries the first [`ChainFault`] found.
//! Malformed JSON, missing fields, and wrong types all land on
//! `Invalid(Malformed)`.
//!
//! Checks, in order:
//!
//! 1. Non-empty.
//! 2. Genesis: index 0, no transactions, `previous_hash == Hash(GENESIS_SEED)`,
//!    valid proof.
//! 3. For every later block at position `i`: `index == i`,
//!    `previous_hash == Hash(block[i - 1])`, and a valid proof for
//!    `(i, previous_hash, transactions, nonce)`.
//!
//! ## Construction
//!
//! A [`Chain`] can only be obtained from a freshly sealed genesis
//! ([`Chain::new_with_genesis`]) or from blocks that pass validation
//! ([`Chain::from_blocks`]). After that, [`Chain::push`] appends locally
//! produced blocks without re-checking them: a node trusts its own sealing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::block::{genesis_previous_hash, Block};
use crate::consensus::ProofOfWork;
use crate::crypto::hash::Hex256;

// ---------------------------------------------------------------------------
// Validation result
// ---------------------------------------------------------------------------

/// Why a candidate chain was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainFault {
    #[error("chain is empty")]
    Empty,

    #[error("chain is malformed: {0}")]
    Malformed(String),

    #[error("block at position {position} claims index {found}")]
    IndexMismatch { position: u64, found: u64 },

    #[error("genesis block does not match the protocol genesis")]
    BadGenesis,

    #[error("block {index} does not link to its predecessor")]
    BrokenLink { index: u64 },

    #[error("block {index} carries an invalid proof-of-work")]
    InvalidProof { index: u64 },
}

/// Outcome of validating a candidate chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(ChainFault),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn into_result(self) -> Result<(), ChainFault> {
        match self {
            Self::Valid => Ok(()),
            Self::Invalid(fault) => Err(fault),
        }
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// A validated, non-empty chain of blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    /// A one-block chain holding a freshly sealed genesis.
    pub fn new_with_genesis(engine: &ProofOfWork) -> Self {
        Self {
            blocks: vec![Block::genesis(engine)],
        }
    }

    /// Adopt `blocks` as a chain if, and only if, they validate.
    pub fn from_blocks(blocks: Vec<Block>, engine: &ProofOfWork) -> Result<Self, ChainFault> {
        Self::validate(&blocks, engine).into_result()?;
        Ok(Self { blocks })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always `false`: a chain holds at least its genesis block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn genesis(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn tip(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn tip_hash(&self) -> Hex256 {
        self.tip().hash()
    }

    /// Index the next appended block will carry.
    pub fn next_index(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Append a locally sealed block. No validation happens here.
    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    // -- Validation ---------------------------------------------------------

    /// Validate an arbitrary block sequence.
    pub fn validate(blocks: &[Block], engine: &ProofOfWork) -> Validation {
        let Some(genesis) = blocks.first() else {
            return Validation::Invalid(ChainFault::Empty);
        };

        if genesis.index != 0
            || !genesis.transactions.is_empty()
            || genesis.previous_hash != genesis_previous_hash()
            || !genesis.has_valid_proof(engine)
        {
            return Validation::Invalid(ChainFault::BadGenesis);
        }

        let mut prior_hash = genesis.hash();
        for (position, block) in blocks.iter().enumerate().skip(1) {
            let position = position as u64;
            if block.index != position {
                return Validation::Invalid(ChainFault::IndexMismatch {
                    position,
                    found: block.index,
                });
            }
            if block.previous_hash != prior_hash {
                return Validation::Invalid(ChainFault::BrokenLink { index: position });
            }
            if !block.has_valid_proof(engine) {
                return Validation::Invalid(ChainFault::InvalidProof { index: position });
            }
            prior_hash = block.hash();
        }

        Validation::Valid
    }

    /// Validate untrusted JSON. Anything that is not an array of well-formed
    /// blocks is `Invalid(Malformed)`.
    pub fn validate_json(candidate: &Value, engine: &ProofOfWork) -> Validation {
        if !candidate.is_array() {
            return Validation::Invalid(ChainFault::Malformed("expected a JSON array".into()));
        }
        match Vec::<Block>::deserialize(candidate) {
            Ok(blocks) => Self::validate(&blocks, engine),
            Err(e) => Validation::Invalid(ChainFault::Malformed(e.to_string())),
        }
    }

    pub fn is_valid(blocks: &[Block], engine: &ProofOfWork) -> bool {
        Self::validate(blocks, engine).is_valid()
    }
}
