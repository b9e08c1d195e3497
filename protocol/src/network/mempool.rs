//! Pending transaction pool.
//!
//! Admitted, not-yet-sealed transactions in admission order. There is no
//! prioritization, no eviction, and no per-sender cap: the next block takes
//! everything that was pending when its template was cut.
//!
//! ## Design
//!
//! - The pool is a plain `Vec`. It is owned by the node's ledger state and
//!   only ever touched under that state's lock, so it needs no locking of
//!   its own.
//! - Sealing drains a *prefix* ([`PendingPool::take_front`]): transactions
//!   admitted while a block was being sealed stay queued for the next one.
//! - After a peer chain is adopted, [`PendingPool::prune_sealed`] and
//!   [`PendingPool::prune_unaffordable`] drop what the new chain already
//!   contains or can no longer pay for.

use std::collections::HashMap;

use tracing::debug;

use crate::storage::ledger::{self, Balance, Ledger};
use crate::storage::Block;
use crate::transaction::Transaction;

/// Ordered queue of admitted transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingPool {
    transactions: Vec<Transaction>,
}

impl PendingPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.transactions.clone()
    }

    /// Move everything out, leaving the pool empty.
    pub fn take_all(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.transactions)
    }

    /// Move out the oldest `n` transactions (fewer if the pool is shorter).
    pub fn take_front(&mut self, n: usize) -> Vec<Transaction> {
        let n = n.min(self.transactions.len());
        self.transactions.drain(..n).collect()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Drop pending transactions that the adopted chain already contains.
    ///
    /// "Already contains" is a multiset difference: every transaction that
    /// appears in `adopted` more often than in `replaced` cancels one
    /// matching pending entry. Identical transfers are indistinguishable, so
    /// this is the closest available notion of "already sealed elsewhere".
    /// Returns how many entries were removed.
    pub fn prune_sealed(&mut self, replaced: &[Block], adopted: &[Block]) -> usize {
        let mut newly_sealed: HashMap<&Transaction, isize> = HashMap::new();
        for tx in adopted.iter().flat_map(|b| b.transactions.iter()) {
            *newly_sealed.entry(tx).or_insert(0) += 1;
        }
        for tx in replaced.iter().flat_map(|b| b.transactions.iter()) {
            if let Some(count) = newly_sealed.get_mut(tx) {
                *count -= 1;
            }
        }

        let before = self.transactions.len();
        let mut kept = Vec::with_capacity(before);
        for tx in self.transactions.drain(..) {
            match newly_sealed.get_mut(&tx) {
                Some(count) if *count > 0 => *count -= 1,
                _ => kept.push(tx),
            }
        }
        self.transactions = kept;

        let removed = before - self.transactions.len();
        if removed > 0 {
            debug!(removed, "pruned pending transactions sealed by adopted chain");
        }
        removed
    }

    /// Drop transfers whose sender cannot cover them on `chain`.
    ///
    /// Balances start from a full replay of `chain` and are updated as the
    /// queue is walked in order, so two pending transfers that together
    /// overdraw a sender keep only the first. Rewards always survive.
    /// Returns how many entries were removed.
    pub fn prune_unaffordable(&mut self, chain: &[Block]) -> usize {
        let mut balances: HashMap<String, Balance> = Ledger::balances(chain);
        let before = self.transactions.len();

        self.transactions.retain(|tx| {
            if !tx.is_reward() {
                let available = balances.get(&tx.sender).copied().unwrap_or(0);
                if available < Balance::from(tx.amount) {
                    return false;
                }
            }
            ledger::apply(&mut balances, tx);
            true
        });

        let removed = before - self.transactions.len();
        if removed > 0 {
            debug!(removed, "pruned pending transfers no longer covered by balance");
        }
        removed
    }
}
