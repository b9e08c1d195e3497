//! # Ledger Node
//!
//! [`Node`] is the explicit context object for one Denarius participant. It
//! owns the chain, the pending pool, the peer registry, and the collaborators
//! they need (proof-of-work engine, signature verifier, chain store). There
//! are no globals: the serving layer constructs a `Node`, wraps it in an
//! `Arc`, and hands it to whatever needs it.
//!
//! ## Locking
//!
//! Chain and pool are one unit of mutable state behind a single
//! `parking_lot::Mutex`. Everything that reads both (admission, templates,
//! commits, adoption) sees a consistent pair.
//!
//! Mining never holds the lock while searching:
//!
//! ```text
//! prepare_template()   lock: snapshot (index, tip hash, pending + reward)
//! seal_until()         no lock, CPU-bound, abortable
//! commit_template()    lock: tip unchanged? persist, then take_front(n) + push
//! ```
//!
//! Transactions admitted during the search stay queued for the next block.
//! If the tip moved (a peer chain was adopted, or another commit won), the
//! commit is refused with [`NodeError::StaleTemplate`].
//!
//! Commits and adoptions persist while holding the lock, so both are
//! blocking calls. Async callers run them on the blocking pool (`/mine` and
//! `Synchronizer::reconcile`) rather than on a runtime worker.
//!
//! ## Persist before serve
//!
//! Every mutation builds the new block list, saves it, and only then swaps
//! in-memory state. A failed save leaves chain and pool exactly as they
//! were, so nothing this node ever served is missing from disk.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::MINING_REWARD;
use crate::consensus::{ProofOfWork, SealOutcome, StopFlag};
use crate::crypto::hash::Hex256;
use crate::crypto::keys::transfer_message;
use crate::crypto::signatures::SignatureVerifier;
use crate::error::{NodeError, NodeResult};
use crate::network::mempool::PendingPool;
use crate::network::peers::{NodeSet, PeerAddress};
use crate::storage::ledger::{Balance, BalanceCache, Ledger};
use crate::storage::store::{ChainStore, StoreError};
use crate::storage::{Block, Chain};
use crate::transaction::{Transaction, TransferRequest};

// ---------------------------------------------------------------------------
// LedgerState
// ---------------------------------------------------------------------------

/// Chain and pending pool, always locked together.
#[derive(Debug)]
struct LedgerState {
    chain: Chain,
    pool: PendingPool,
    balances: BalanceCache,
}

impl LedgerState {
    fn balance_of(&mut self, address: &str) -> Balance {
        self.balances.balance_of(&self.chain, address)
    }

    /// `chain` plus `block`, without touching `chain`.
    fn extended(&self, block: &Block) -> Vec<Block> {
        let mut blocks = Vec::with_capacity(self.chain.len() + 1);
        blocks.extend_from_slice(self.chain.blocks());
        blocks.push(block.clone());
        blocks
    }
}

// ---------------------------------------------------------------------------
// BlockTemplate
// ---------------------------------------------------------------------------

/// A consistent snapshot of what the next block will contain.
///
/// `transactions` is the pending pool at snapshot time followed by the
/// sealing node's reward. The template remembers how many pending entries it
/// captured so the commit removes exactly those.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockTemplate {
    pub index: u64,
    pub previous_hash: Hex256,
    pub transactions: Vec<Transaction>,
    pending_taken: usize,
}

impl BlockTemplate {
    /// Number of pool entries (excluding the reward) this template seals.
    pub fn pending_taken(&self) -> usize {
        self.pending_taken
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

pub struct Node {
    engine: ProofOfWork,
    verifier: Arc<dyn SignatureVerifier>,
    store: Arc<dyn ChainStore>,
    state: Mutex<LedgerState>,
    peers: Mutex<NodeSet>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("engine", &self.engine)
            .field("chain_length", &self.chain_length())
            .field("pending", &self.pending_count())
            .field("peers", &self.peers.lock().len())
            .finish()
    }
}

impl Node {
    /// Load the persisted chain, or seal and persist a fresh genesis.
    ///
    /// A persisted chain must validate under `engine`; anything else is
    /// reported as a persistence failure, and the node refuses to start.
    pub fn open(
        engine: ProofOfWork,
        verifier: Arc<dyn SignatureVerifier>,
        store: Arc<dyn ChainStore>,
    ) -> NodeResult<Self> {
        let chain = match store.load()? {
            Some(blocks) => {
                let chain = Chain::from_blocks(blocks, &engine)
                    .map_err(|fault| StoreError::Corrupt(fault.to_string()))?;
                info!(length = chain.len(), tip = %chain.tip_hash(), "chain loaded");
                chain
            }
            None => {
                let chain = Chain::new_with_genesis(&engine);
                store.save(chain.blocks())?;
                info!(genesis = %chain.tip_hash(), "genesis block sealed and persisted");
                chain
            }
        };

        Ok(Self {
            engine,
            verifier,
            store,
            state: Mutex::new(LedgerState {
                chain,
                pool: PendingPool::new(),
                balances: BalanceCache::new(),
            }),
            peers: Mutex::new(NodeSet::new()),
        })
    }

    pub fn engine(&self) -> &ProofOfWork {
        &self.engine
    }

    // -- Admission ----------------------------------------------------------

    /// Validate a transfer and queue it for the next block.
    ///
    /// Returns the index of the block the transaction is expected to land in.
    /// That index is advisory: a concurrent commit may seal first.
    pub fn admit(&self, request: TransferRequest) -> NodeResult<u64> {
        if !request.is_reward() {
            let message = transfer_message(&request.sender, &request.recipient, request.amount);
            let authentic = request
                .signature
                .as_deref()
                .is_some_and(|sig| self.verifier.verify(&request.sender, &message, sig));
            if !authentic {
                warn!(sender = %request.sender, "transaction rejected: invalid signature");
                return Err(NodeError::InvalidSignature);
            }
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;

        if !request.is_reward() {
            let balance = state.balance_of(&request.sender);
            if balance < Balance::from(request.amount) {
                warn!(
                    sender = %request.sender,
                    balance = %balance,
                    amount = request.amount,
                    "transaction rejected: insufficient balance"
                );
                return Err(NodeError::InsufficientBalance {
                    address: request.sender,
                    balance,
                    amount: request.amount,
                });
            }
        }

        let next_index = state.chain.tip().index + 1;
        let tx = request.into_transaction();
        debug!(%tx, next_index, "transaction admitted");
        state.pool.push(tx);
        Ok(next_index)
    }

    // -- Queries ------------------------------------------------------------

    pub fn balance_of(&self, address: &str) -> Balance {
        self.state.lock().balance_of(address)
    }

    pub fn total_supply(&self) -> u128 {
        Ledger::total_supply(self.state.lock().chain.blocks())
    }

    pub fn chain_snapshot(&self) -> Vec<Block> {
        self.state.lock().chain.blocks().to_vec()
    }

    pub fn chain_length(&self) -> usize {
        self.state.lock().chain.len()
    }

    pub fn tip_hash(&self) -> Hex256 {
        self.state.lock().chain.tip_hash()
    }

    pub fn pending(&self) -> Vec<Transaction> {
        self.state.lock().pool.snapshot()
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pool.len()
    }

    // -- Mining -------------------------------------------------------------

    /// Snapshot the next block's inputs: pending pool plus a reward for
    /// `reward_recipient`, against the current tip.
    pub fn prepare_template(&self, reward_recipient: &str) -> BlockTemplate {
        let state = self.state.lock();
        let mut transactions = state.pool.snapshot();
        let pending_taken = transactions.len();
        transactions.push(Transaction::reward(reward_recipient, MINING_REWARD));

        BlockTemplate {
            index: state.chain.next_index(),
            previous_hash: state.chain.tip_hash(),
            transactions,
            pending_taken,
        }
    }

    /// Append a block sealed from `template` with `nonce`.
    ///
    /// The nonce is trusted, as for any locally produced block. The template
    /// is not: if the tip moved since it was prepared, nothing is written
    /// and [`NodeError::StaleTemplate`] is returned.
    pub fn commit_template(&self, template: BlockTemplate, nonce: u64) -> NodeResult<Block> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if state.chain.next_index() != template.index
            || state.chain.tip_hash() != template.previous_hash
        {
            warn!(index = template.index, "sealed block is stale, discarding");
            return Err(NodeError::StaleTemplate);
        }

        let block = Block::new(
            template.index,
            template.transactions,
            nonce,
            template.previous_hash,
        );
        self.persist(state.extended(&block))?;

        state.pool.take_front(template.pending_taken);
        state.chain.push(block.clone());
        state.balances.invalidate();

        info!(
            index = block.index,
            transactions = block.transactions.len(),
            nonce,
            "block appended"
        );
        Ok(block)
    }

    /// Seal every pending transaction into a block on top of `previous_hash`.
    ///
    /// This is the single-writer form: the caller found `nonce` against the
    /// current tip and the current pool contents, and holds off concurrent
    /// admissions itself. Nothing is re-verified here.
    pub fn append(&self, nonce: u64, previous_hash: Hex256) -> NodeResult<Block> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let block = Block::new(
            state.chain.next_index(),
            state.pool.snapshot(),
            nonce,
            previous_hash,
        );
        self.persist(state.extended(&block))?;

        state.pool.take_all();
        state.chain.push(block.clone());
        state.balances.invalidate();

        info!(index = block.index, transactions = block.transactions.len(), "block appended");
        Ok(block)
    }

    /// Template, seal off the lock, commit. Blocking: run it on a worker
    /// thread, never on an async executor.
    pub fn mine(&self, reward_recipient: &str, stop: &StopFlag) -> NodeResult<Block> {
        let template = self.prepare_template(reward_recipient);
        debug!(index = template.index, pending = template.pending_taken, "sealing block");

        match self.engine.seal_until(
            template.index,
            &template.previous_hash,
            &template.transactions,
            stop,
        ) {
            SealOutcome::Found(nonce) => self.commit_template(template, nonce),
            SealOutcome::Aborted { tried } => {
                info!(index = template.index, tried, "sealing aborted");
                Err(NodeError::SealAborted)
            }
        }
    }

    // -- Peers --------------------------------------------------------------

    pub fn add_peer(&self, raw: &str) -> NodeResult<PeerAddress> {
        let address = self.peers.lock().add(raw)?;
        info!(peer = %address, "peer registered");
        Ok(address)
    }

    pub fn add_peers<I, S>(&self, raws: I) -> NodeResult<Vec<PeerAddress>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raws.into_iter().map(|raw| self.add_peer(raw.as_ref())).collect()
    }

    pub fn peers(&self) -> Vec<PeerAddress> {
        self.peers.lock().list()
    }

    // -- Fork resolution ----------------------------------------------------

    /// Replace the local chain with `candidate` if it is still strictly
    /// longer. Returns whether a replacement happened.
    ///
    /// `candidate` is already validated (that is what makes it a `Chain`).
    /// The length check is repeated here, under the lock, because local
    /// state may have grown since the caller compared lengths.
    ///
    /// Blocks on the store's save while holding the lock. Async callers go
    /// through `spawn_blocking` (see [`crate::network::sync::Synchronizer`]).
    pub fn adopt_chain(&self, candidate: Chain) -> NodeResult<bool> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if candidate.len() <= state.chain.len() {
            debug!(
                candidate = candidate.len(),
                local = state.chain.len(),
                "candidate no longer longer than local chain"
            );
            return Ok(false);
        }

        self.persist(candidate.blocks().to_vec())?;

        let replaced = std::mem::replace(&mut state.chain, candidate);
        state.balances.invalidate();
        let sealed = state.pool.prune_sealed(replaced.blocks(), state.chain.blocks());
        let unaffordable = state.pool.prune_unaffordable(state.chain.blocks());

        info!(
            from = replaced.len(),
            to = state.chain.len(),
            pruned_sealed = sealed,
            pruned_unaffordable = unaffordable,
            "local chain replaced"
        );
        Ok(true)
    }

    fn persist(&self, blocks: Vec<Block>) -> NodeResult<()> {
        self.store.save(&blocks).map_err(|e| {
            error!(error = %e, blocks = blocks.len(), "failed to persist chain");
            NodeError::PersistenceFailure(e)
        })
    }
}
