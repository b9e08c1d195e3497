//! # Ledger
//!
//! Balances are never stored. They are replayed from the chain on demand,
//! which makes them O(total transactions) per query and impossible to drift
//! out of sync with the blocks they are derived from.
//!
//! ## Replay rules
//!
//! For every transaction, in chain order:
//!
//! - the recipient is credited `amount`;
//! - the sender is debited `amount`, unless it is the reward sender `"0"`.
//!
//! A self-send therefore nets to zero. Nothing stops a replayed balance from
//! going negative: admission checks balances against the chain at the time a
//! transaction is admitted, but two admissions against the same balance can
//! both succeed before either is sealed.
//!
//! ## Caching
//!
//! [`BalanceCache`] replays the whole chain once into a map and serves
//! lookups from it until the chain changes. The cache key is `(length,
//! tip hash)`, so any append or replacement invalidates it on the next
//! lookup even if nobody calls [`BalanceCache::invalidate`].

use std::collections::HashMap;

use super::block::Block;
use super::chain::Chain;
use crate::config::CURRENCY;
use crate::crypto::hash::Hex256;
use crate::transaction::Transaction;

/// Signed balance. Wide enough that no sum of `u64` amounts can overflow it.
pub type Balance = i128;

/// Stateless replay functions over a block sequence.
pub struct Ledger;

impl Ledger {
    /// Replay every transaction in `blocks` and return `address`'s balance.
    pub fn balance_of(blocks: &[Block], address: &str) -> Balance {
        transactions(blocks).fold(0, |mut balance, tx| {
            if tx.recipient == address {
                balance += Balance::from(tx.amount);
            }
            if tx.sender == address && !tx.is_reward() {
                balance -= Balance::from(tx.amount);
            }
            balance
        })
    }

    /// Sum of every DNR amount ever recorded, minted or transferred.
    ///
    /// This is the node's historical `/supply` figure: it counts transfers as
    /// well as mints, so it measures volume rather than circulating supply.
    pub fn total_supply(blocks: &[Block]) -> u128 {
        transactions(blocks)
            .filter(|tx| tx.currency == CURRENCY)
            .map(|tx| u128::from(tx.amount))
            .sum()
    }

    /// Every address's balance after a full replay.
    pub fn balances(blocks: &[Block]) -> HashMap<String, Balance> {
        let mut balances = HashMap::new();
        for tx in transactions(blocks) {
            apply(&mut balances, tx);
        }
        balances
    }
}

/// Apply one transaction to a balance map using the replay rules.
pub(crate) fn apply(balances: &mut HashMap<String, Balance>, tx: &Transaction) {
    let amount = Balance::from(tx.amount);
    *balances.entry(tx.recipient.clone()).or_insert(0) += amount;
    if !tx.is_reward() {
        *balances.entry(tx.sender.clone()).or_insert(0) -= amount;
    }
}

fn transactions(blocks: &[Block]) -> impl Iterator<Item = &Transaction> {
    blocks.iter().flat_map(|block| block.transactions.iter())
}

// ---------------------------------------------------------------------------
// BalanceCache
// ---------------------------------------------------------------------------

/// Memoized full replay, keyed on the chain it was computed from.
#[derive(Debug, Default)]
pub struct BalanceCache {
    key: Option<(usize, Hex256)>,
    balances: HashMap<String, Balance>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `address`'s balance on `chain`, replaying only if the chain changed
    /// since the last lookup.
    pub fn balance_of(&mut self, chain: &Chain, address: &str) -> Balance {
        let key = (chain.len(), chain.tip_hash());
        if self.key.as_ref() != Some(&key) {
            self.balances = Ledger::balances(chain.blocks());
            self.key = Some(key);
        }
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Drop the memoized replay. Called on every chain mutation.
    pub fn invalidate(&mut self) {
        self.key = None;
        self.balances.clear();
    }
}
