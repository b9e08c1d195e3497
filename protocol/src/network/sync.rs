//! # Chain Synchronization
//!
//! Fork resolution by the longest-valid-chain rule. Each round asks every
//! known peer for its full chain and adopts the longest one that is strictly
//! longer than local state and passes full validation.
//!
//! ## Protocol Overview
//!
//! ```text
//! Local Node                          Peer
//! ──────────                         ──────
//!   │  GET /blockchain                 │
//!   │──────────────────────────────>   │
//!   │  { length, chain: [Block] }      │
//!   │<──────────────────────────────   │
//! ```
//!
//! ## Design Decisions
//!
//! - **Fan out, then decide in order.** All peers are fetched concurrently,
//!   each under its own timeout, so one dead peer costs at most one timeout
//!   per round. Responses are then examined in peer order, which keeps the
//!   outcome deterministic when two peers offer equally long chains (the
//!   first wins; ties never replace).
//!
//! - **Length must be honest.** A response whose advertised `length` differs
//!   from the number of blocks it carries is treated as invalid rather than
//!   trusted either way.
//!
//! - **Validate outside the lock.** Candidate chains are validated without
//!   touching local state. Only the final swap takes the node's lock, and
//!   [`Node::adopt_chain`] re-checks the length there.
//!
//! - **Adopt on the blocking pool.** `adopt_chain` writes and fsyncs the
//!   whole chain while holding the node's mutex, so `reconcile` runs it
//!   through `tokio::task::spawn_blocking`, like `/mine` does with sealing.
//!   Async workers keep serving while the disk catches up.
//!
//! - **Peer failures are not errors.** Unreachable peers, timeouts, garbage
//!   responses and invalid chains are logged and counted. A round only fails
//!   if adopting the winner fails: the save errors, or the blocking task
//!   dies.
//!
//! - **Transport-agnostic.** The synchronizer talks to peers through the
//!   [`PeerClient`] trait. The node binary supplies an HTTP implementation;
//!   tests supply canned ones.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_PEER_FETCH_TIMEOUT;
use crate::error::{NodeError, NodeResult};
use crate::network::node::Node;
use crate::network::peers::PeerAddress;
use crate::storage::{Block, Chain};

// ---------------------------------------------------------------------------
// Wire response
// ---------------------------------------------------------------------------

/// A peer's answer to a chain fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainResponse {
    pub length: u64,
    pub chain: Vec<Block>,
}

impl ChainResponse {
    pub fn new(chain: Vec<Block>) -> Self {
        Self {
            length: chain.len() as u64,
            chain,
        }
    }

    /// Decode an untrusted JSON body.
    pub fn from_value(value: Value) -> Result<Self, PeerError> {
        serde_json::from_value(value).map_err(|e| PeerError::InvalidResponse(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// PeerError
// ---------------------------------------------------------------------------

/// Why a single peer contributed nothing to a round.
///
/// None of these abort reconciliation; they are logged and counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerError {
    /// Connection refused, DNS failure, reset mid-response.
    Unreachable(String),

    /// No complete response within the fetch timeout.
    Timeout,

    /// Non-success status, unparseable body, or a length that lies.
    InvalidResponse(String),
}

impl std::fmt::Display for PeerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreachable(reason) => write!(f, "peer unreachable: {}", reason),
            Self::Timeout => write!(f, "peer fetch timed out"),
            Self::InvalidResponse(reason) => write!(f, "invalid peer response: {}", reason),
        }
    }
}

impl std::error::Error for PeerError {}

// ---------------------------------------------------------------------------
// PeerClient
// ---------------------------------------------------------------------------

/// Fetches a peer's full chain.
#[async_trait]
pub trait PeerClient: Send + Sync {
    async fn fetch_chain(&self, peer: &PeerAddress) -> Result<ChainResponse, PeerError>;
}

#[async_trait]
impl<C: PeerClient + ?Sized> PeerClient for Arc<C> {
    async fn fetch_chain(&self, peer: &PeerAddress) -> Result<ChainResponse, PeerError> {
        (**self).fetch_chain(peer).await
    }
}

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// Tuning knobs for reconciliation.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Upper bound on a single peer fetch, connection through last byte.
    pub fetch_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_PEER_FETCH_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// SyncReport
// ---------------------------------------------------------------------------

/// What one reconciliation round did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Whether the local chain was replaced.
    pub updated: bool,
    /// The peer whose chain was adopted, if any.
    pub adopted_from: Option<PeerAddress>,
    /// Local chain length after the round.
    pub length: usize,
    /// Peers that could not be fetched or answered nonsense.
    pub failures: Vec<(PeerAddress, PeerError)>,
    /// Peers that offered a longer chain that failed validation.
    pub rejected: Vec<PeerAddress>,
}

// ---------------------------------------------------------------------------
// Synchronizer
// ---------------------------------------------------------------------------

pub struct Synchronizer<C> {
    client: C,
    config: SyncConfig,
}

impl<C: PeerClient> Synchronizer<C> {
    pub fn new(client: C, config: SyncConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Fetch one peer under the configured timeout.
    async fn fetch(&self, peer: &PeerAddress) -> Result<ChainResponse, PeerError> {
        let response = tokio::time::timeout(self.config.fetch_timeout, self.client.fetch_chain(peer))
            .await
            .map_err(|_| PeerError::Timeout)??;

        if response.length != response.chain.len() as u64 {
            return Err(PeerError::InvalidResponse(format!(
                "advertised length {} but sent {} blocks",
                response.length,
                response.chain.len()
            )));
        }
        Ok(response)
    }

    /// Run one reconciliation round against every peer `node` knows.
    ///
    /// Replaces the local chain iff some peer serves a chain that is strictly
    /// longer than local state and valid. The longest such chain wins; the
    /// first peer (in address order) wins a tie between peers.
    pub async fn reconcile(&self, node: &Arc<Node>) -> NodeResult<SyncReport> {
        let peers = node.peers();
        let local_length = node.chain_length();
        debug!(peers = peers.len(), local_length, "reconciliation round started");

        let responses = join_all(peers.iter().map(|peer| self.fetch(peer))).await;

        let mut report = SyncReport::default();
        let mut best: Option<(PeerAddress, Chain)> = None;
        let mut best_length = local_length;

        for (peer, response) in peers.into_iter().zip(responses) {
            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    warn!(peer = %peer, error = %e, "skipping peer");
                    report.failures.push((peer, e));
                    continue;
                }
            };

            if response.chain.len() <= best_length {
                debug!(peer = %peer, length = response.chain.len(), "peer chain not longer");
                continue;
            }

            match Chain::from_blocks(response.chain, node.engine()) {
                Ok(candidate) => {
                    debug!(peer = %peer, length = candidate.len(), "new best candidate");
                    best_length = candidate.len();
                    best = Some((peer, candidate));
                }
                Err(fault) => {
                    warn!(peer = %peer, %fault, "peer served an invalid chain");
                    report.rejected.push(peer);
                }
            }
        }

        if let Some((peer, candidate)) = best {
            let adopter = Arc::clone(node);
            let adopted = tokio::task::spawn_blocking(move || adopter.adopt_chain(candidate))
                .await
                .map_err(|e| NodeError::TaskFailed(format!("chain adoption: {}", e)))??;
            if adopted {
                info!(peer = %peer, length = best_length, "adopted longer chain from peer");
                report.updated = true;
                report.adopted_from = Some(peer);
            }
        }

        report.length = node.chain_length();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{ProofOfWork, StopFlag};
    use crate::crypto::signatures::Ed25519Verifier;
    use crate::storage::store::{ChainStore, MemoryStore, StoreError};
    use std::collections::HashMap;
    use std::sync::mpsc;

    // -- Helpers ------------------------------------------------------------

    /// Canned responses keyed by peer; unknown peers are unreachable.
    #[derive(Default)]
    struct CannedClient {
        responses: HashMap<String, Result<ChainResponse, PeerError>>,
        delay: Option<Duration>,
    }

    impl CannedClient {
        fn serve(mut self, peer: &str, response: Result<ChainResponse, PeerError>) -> Self {
            self.responses.insert(peer.to_string(), response);
            self
        }
    }

    #[async_trait]
    impl PeerClient for CannedClient {
        async fn fetch_chain(&self, peer: &PeerAddress) -> Result<ChainResponse, PeerError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.responses
                .get(&peer.to_string())
                .cloned()
                .unwrap_or_else(|| Err(PeerError::Unreachable("connection refused".into())))
        }
    }

    fn engine() -> ProofOfWork {
        ProofOfWork::new("0")
    }

    fn open_node() -> Arc<Node> {
        Arc::new(
            Node::open(engine(), Arc::new(Ed25519Verifier), Arc::new(MemoryStore::new())).unwrap(),
        )
    }

    /// Every save waits for one token on `gate`, giving up after a few
    /// seconds.
    struct GatedStore {
        inner: MemoryStore,
        gate: std::sync::Mutex<mpsc::Receiver<()>>,
    }

    impl ChainStore for GatedStore {
        fn load(&self) -> Result<Option<Vec<Block>>, StoreError> {
            self.inner.load()
        }

        fn save(&self, blocks: &[Block]) -> Result<(), StoreError> {
            let gate = self
                .gate
                .lock()
                .map_err(|_| StoreError::Unavailable("gate poisoned".into()))?;
            gate.recv_timeout(Duration::from_secs(5))
                .map_err(|_| StoreError::Unavailable("save was never released".into()))?;
            self.inner.save(blocks)
        }
    }

    /// A node's chain after mining `blocks` extra blocks.
    fn chain_with(blocks: usize) -> Vec<Block> {
        let node = open_node();
        for _ in 0..blocks {
            node.mine("remote", &StopFlag::new()).unwrap();
        }
        node.chain_snapshot()
    }

    fn sync(client: CannedClient) -> Synchronizer<CannedClient> {
        Synchronizer::new(client, SyncConfig::default())
    }

    // -- 1. no_peers_no_update ----------------------------------------------

    #[tokio::test]
    async fn no_peers_no_update() {
        let node = open_node();
        let report = sync(CannedClient::default()).reconcile(&node).await.unwrap();
        assert!(!report.updated);
        assert_eq!(report.length, 1);
    }

    // -- 2. adopts_longer_valid_chain ---------------------------------------

    #[tokio::test]
    async fn adopts_longer_valid_chain() {
        let node = open_node();
        node.add_peer("a:1").unwrap();
        let remote = chain_with(2);
        let client = CannedClient::default().serve("a:1", Ok(ChainResponse::new(remote.clone())));

        let report = sync(client).reconcile(&node).await.unwrap();
        assert!(report.updated);
        assert_eq!(report.adopted_from.unwrap().to_string(), "a:1");
        assert_eq!(report.length, 3);
        assert_eq!(node.chain_snapshot(), remote);
    }

    // -- 3. second_round_is_a_no_op -----------------------------------------

    #[tokio::test]
    async fn second_round_is_a_no_op() {
        let node = open_node();
        node.add_peer("a:1").unwrap();
        let client = CannedClient::default().serve("a:1", Ok(ChainResponse::new(chain_with(2))));
        let synchronizer = sync(client);

        assert!(synchronizer.reconcile(&node).await.unwrap().updated);
        assert!(!synchronizer.reconcile(&node).await.unwrap().updated);
    }

    // -- 4. equal_length_never_replaces -------------------------------------

    #[tokio::test]
    async fn equal_length_never_replaces() {
        let node = open_node();
        node.mine("local", &StopFlag::new()).unwrap();
        let before = node.chain_snapshot();
        node.add_peer("a:1").unwrap();
        let client = CannedClient::default().serve("a:1", Ok(ChainResponse::new(chain_with(1))));

        let report = sync(client).reconcile(&node).await.unwrap();
        assert!(!report.updated);
        assert_eq!(node.chain_snapshot(), before);
    }

    // -- 5. longer_invalid_chain_rejected -----------------------------------

    #[tokio::test]
    async fn longer_invalid_chain_rejected() {
        let node = open_node();
        let before = node.chain_snapshot();
        node.add_peer("a:1").unwrap();
        let mut forged = chain_with(3);
        forged[2].previous_hash = "0".repeat(64);
        let client = CannedClient::default().serve("a:1", Ok(ChainResponse::new(forged)));

        let report = sync(client).reconcile(&node).await.unwrap();
        assert!(!report.updated);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(node.chain_snapshot(), before);
    }

    // -- 6. longest_valid_among_many_wins -----------------------------------

    #[tokio::test]
    async fn longest_valid_among_many_wins() {
        let node = open_node();
        node.add_peers(["a:1", "b:1", "c:1", "d:1"]).unwrap();

        let mut forged = chain_with(5);
        forged[3].nonce = forged[3].nonce.wrapping_add(1);
        forged[3].transactions.clear();
        let winner = chain_with(3);

        let client = CannedClient::default()
            .serve("a:1", Ok(ChainResponse::new(chain_with(1))))
            .serve("b:1", Ok(ChainResponse::new(winner.clone())))
            .serve("c:1", Ok(ChainResponse::new(forged)))
            .serve("d:1", Err(PeerError::InvalidResponse("HTTP 500".into())));

        let report = sync(client).reconcile(&node).await.unwrap();
        assert!(report.updated);
        assert_eq!(report.adopted_from.unwrap().to_string(), "b:1");
        assert_eq!(node.chain_snapshot(), winner);
        assert_eq!(report.failures.len(), 1);
    }

    // -- 7. failing_peer_does_not_abort_round -------------------------------

    #[tokio::test]
    async fn failing_peer_does_not_abort_round() {
        let node = open_node();
        node.add_peers(["dead:1", "live:1"]).unwrap();
        let client = CannedClient::default().serve("live:1", Ok(ChainResponse::new(chain_with(1))));

        let report = sync(client).reconcile(&node).await.unwrap();
        assert!(report.updated);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].1, PeerError::Unreachable(_)));
    }

    // -- 8. lying_length_is_invalid_response --------------------------------

    #[tokio::test]
    async fn lying_length_is_invalid_response() {
        let node = open_node();
        node.add_peer("a:1").unwrap();
        let mut response = ChainResponse::new(chain_with(2));
        response.length = 10;
        let client = CannedClient::default().serve("a:1", Ok(response));

        let report = sync(client).reconcile(&node).await.unwrap();
        assert!(!report.updated);
        assert!(matches!(report.failures[0].1, PeerError::InvalidResponse(_)));
    }

    // -- 9. slow_peer_times_out ---------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn slow_peer_times_out() {
        let node = open_node();
        node.add_peer("slow:1").unwrap();
        let mut client =
            CannedClient::default().serve("slow:1", Ok(ChainResponse::new(chain_with(1))));
        client.delay = Some(Duration::from_secs(60));
        let synchronizer = Synchronizer::new(
            client,
            SyncConfig {
                fetch_timeout: Duration::from_millis(100),
            },
        );

        let report = synchronizer.reconcile(&node).await.unwrap();
        assert!(!report.updated);
        assert_eq!(report.failures[0].1, PeerError::Timeout);
    }

    // -- 10. adoption_does_not_block_the_runtime ----------------------------

    #[tokio::test(flavor = "current_thread")]
    async fn adoption_does_not_block_the_runtime() {
        let (release, gate) = mpsc::channel();
        // Token for the genesis save inside `Node::open`.
        release.send(()).unwrap();
        let store = GatedStore {
            inner: MemoryStore::new(),
            gate: std::sync::Mutex::new(gate),
        };
        let node = Arc::new(Node::open(engine(), Arc::new(Ed25519Verifier), Arc::new(store)).unwrap());
        node.add_peer("a:1").unwrap();
        let remote = chain_with(2);
        let client = CannedClient::default().serve("a:1", Ok(ChainResponse::new(remote.clone())));
        let synchronizer = sync(client);

        // The adoption save only completes once the second future runs on
        // this same single-threaded runtime.
        let (report, ()) = tokio::join!(synchronizer.reconcile(&node), async {
            tokio::task::yield_now().await;
            release.send(()).unwrap();
        });

        let report = report.unwrap();
        assert!(report.updated);
        assert_eq!(node.chain_snapshot(), remote);
    }

    // -- 11. chain_response_rejects_garbage ---------------------------------

    #[test]
    fn chain_response_rejects_garbage() {
        assert!(ChainResponse::from_value(serde_json::json!({"length": 1})).is_err());
        assert!(ChainResponse::from_value(serde_json::json!({"length": 1, "chain": [{}]})).is_err());
        let ok = ChainResponse::from_value(serde_json::json!({"length": 0, "chain": []})).unwrap();
        assert!(ok.chain.is_empty());
    }

    // -- 12. config_defaults ------------------------------------------------

    #[test]
    fn config_defaults() {
        assert_eq!(SyncConfig::default().fetch_timeout, DEFAULT_PEER_FETCH_TIMEOUT);
    }
}
