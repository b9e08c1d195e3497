//! # REST API
//!
//! Builds the axum router that exposes the node's HTTP interface. All
//! endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                 | Description                              |
//! |--------|----------------------|------------------------------------------|
//! | GET    | `/`                  | HTML landing page                        |
//! | GET    | `/explorer`          | HTML view of every block                 |
//! | GET    | `/health`            | Liveness probe                           |
//! | POST   | `/transactions/new`  | Admit a signed transfer                  |
//! | GET    | `/mine`              | Seal pending transactions plus a reward  |
//! | GET    | `/blockchain`        | Full chain (the peer chain-fetch format) |
//! | POST   | `/nodes/add_nodes`   | Register peers                           |
//! | GET    | `/nodes/sync`        | Run one reconciliation round             |
//! | GET    | `/nodes`             | List registered peers                    |
//! | GET    | `/balance/:address`  | Replayed balance of an address           |
//! | GET    | `/supply`            | Sum of every amount ever moved           |
//! | GET    | `/metrics`           | Prometheus text format                   |
//!
//! The two HTML pages are rendered in place with `format!`. Every string
//! that came from a client or a peer goes through [`escape_html`] first.

use axum::{
    extract::{rejection::JsonRejection, FromRef, Path, State},
    http::{Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use denarius_protocol::config::{CURRENCY, PROTOCOL_VERSION};
use denarius_protocol::consensus::StopFlag;
use denarius_protocol::network::node::Node;
use denarius_protocol::network::peers::PeerAddress;
use denarius_protocol::network::sync::{ChainResponse, PeerClient, SyncReport, Synchronizer};
use denarius_protocol::storage::{Balance, Block};
use denarius_protocol::transaction::TransferRequest;
use denarius_protocol::{NodeError, NodeResult};

use crate::metrics::{metrics_handler, SharedMetrics};

/// Synchronizer over whichever peer transport the binary (or a test) picks.
pub type SharedSynchronizer = Arc<Synchronizer<Arc<dyn PeerClient>>>;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub node: Arc<Node>,
    pub synchronizer: SharedSynchronizer,
    pub metrics: SharedMetrics,
    /// Reward recipient for blocks this node seals.
    pub node_id: String,
    /// Raised on shutdown so an in-flight `/mine` stops searching.
    pub mining_stop: StopFlag,
}

impl FromRef<AppState> for SharedMetrics {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.metrics)
    }
}

impl AppState {
    fn refresh_gauges(&self) {
        self.metrics
            .observe(self.node.chain_length(), self.node.pending_count());
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(home_handler))
        .route("/explorer", get(explorer_handler))
        .route("/health", get(health_handler))
        .route("/transactions/new", post(new_transaction_handler))
        .route("/mine", get(mine_handler))
        .route("/blockchain", get(chain_handler))
        .route("/nodes/add_nodes", post(add_nodes_handler))
        .route("/nodes/sync", get(sync_handler))
        .route("/nodes", get(list_nodes_handler))
        .route("/balance/:address", get(balance_handler))
        .route("/supply", get(supply_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /nodes/add_nodes`.
#[derive(Debug, Deserialize)]
pub struct AddNodesRequest {
    #[serde(default)]
    pub nodes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdmittedResponse {
    pub message: String,
    /// Block the transaction is expected to land in.
    pub index: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MinedResponse {
    pub message: String,
    pub block: Block,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodesResponse {
    pub nodes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SyncResponse {
    pub message: String,
    pub updated: bool,
    pub length: usize,
    pub adopted_from: Option<String>,
    pub failed_peers: usize,
    pub rejected_peers: usize,
    pub chain: Vec<Block>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: Balance,
    pub currency: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SupplyResponse {
    pub total_supply: u128,
    pub currency: String,
}

/// Generic error body returned by every endpoint on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// HTTP status for a node operation failure.
fn node_error_status(err: &NodeError) -> StatusCode {
    match err {
        e if e.is_rejection() => StatusCode::BAD_REQUEST,
        NodeError::StaleTemplate => StatusCode::CONFLICT,
        NodeError::SealAborted => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Run one reconciliation round and record it in the metrics.
///
/// Shared by `/nodes/sync` and the background sync loop.
pub async fn run_sync_round(state: &AppState) -> NodeResult<SyncReport> {
    state.metrics.sync_rounds_total.inc();
    let report = state.synchronizer.reconcile(&state.node).await?;
    if report.updated {
        state.metrics.chain_replacements_total.inc();
    }
    state.refresh_gauges();
    Ok(report)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: 200 while the process is serving.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "node_id": state.node_id,
        "version": PROTOCOL_VERSION,
    }))
}

/// `POST /transactions/new`: verify and queue a transfer.
async fn new_transaction_handler(
    State(state): State<AppState>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            state.metrics.admission_rejections_total.inc();
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("missing or malformed fields: {}", rejection.body_text()),
            );
        }
    };

    match state.node.admit(request) {
        Ok(index) => {
            state.refresh_gauges();
            (
                StatusCode::CREATED,
                Json(AdmittedResponse {
                    message: format!("transaction will be added to block {}", index),
                    index,
                }),
            )
                .into_response()
        }
        Err(e) => {
            if e.is_rejection() {
                state.metrics.admission_rejections_total.inc();
            }
            error_response(node_error_status(&e), e.to_string())
        }
    }
}

/// `GET /mine`: reward this node, seal everything pending, append.
///
/// Sealing runs on the blocking pool so the executor keeps serving.
async fn mine_handler(State(state): State<AppState>) -> Response {
    let node = Arc::clone(&state.node);
    let node_id = state.node_id.clone();
    let stop = state.mining_stop.clone();

    let result = tokio::task::spawn_blocking(move || node.mine(&node_id, &stop)).await;
    match result {
        Ok(Ok(block)) => {
            state.metrics.blocks_mined_total.inc();
            state.refresh_gauges();
            Json(MinedResponse {
                message: "block appended".into(),
                block,
            })
            .into_response()
        }
        Ok(Err(e)) => error_response(node_error_status(&e), e.to_string()),
        Err(e) => {
            tracing::error!(error = %e, "mining task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "mining task failed")
        }
    }
}

/// `GET /blockchain`: `{chain, length}`. Peers reconcile against this.
async fn chain_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(ChainResponse::new(state.node.chain_snapshot()))
}

/// `POST /nodes/add_nodes`: register peers. All or nothing: one invalid
/// address rejects the whole request.
async fn add_nodes_handler(
    State(state): State<AppState>,
    payload: Result<Json<AddNodesRequest>, JsonRejection>,
) -> Response {
    let nodes = match payload {
        Ok(Json(body)) if !body.nodes.is_empty() => body.nodes,
        Ok(_) => return error_response(StatusCode::BAD_REQUEST, "missing nodes"),
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    if let Some(err) = nodes
        .iter()
        .find_map(|raw| raw.parse::<PeerAddress>().err())
    {
        return error_response(StatusCode::BAD_REQUEST, err.to_string());
    }
    if let Err(e) = state.node.add_peers(&nodes) {
        return error_response(node_error_status(&e), e.to_string());
    }

    Json(serde_json::json!({
        "message": "peers added",
        "nodes": peer_strings(&state.node),
    }))
    .into_response()
}

/// `GET /nodes/sync`: one reconciliation round, reported.
async fn sync_handler(State(state): State<AppState>) -> Response {
    match run_sync_round(&state).await {
        Ok(report) => {
            let message = if report.updated {
                "chain replaced"
            } else {
                "chain is up to date"
            };
            Json(SyncResponse {
                message: message.into(),
                updated: report.updated,
                length: report.length,
                adopted_from: report.adopted_from.map(|p| p.to_string()),
                failed_peers: report.failures.len(),
                rejected_peers: report.rejected.len(),
                chain: state.node.chain_snapshot(),
            })
            .into_response()
        }
        Err(e) => error_response(node_error_status(&e), e.to_string()),
    }
}

/// `GET /nodes`
async fn list_nodes_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(NodesResponse {
        nodes: peer_strings(&state.node),
    })
}

/// `GET /balance/:address`
async fn balance_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> impl IntoResponse {
    let balance = state.node.balance_of(&address);
    Json(BalanceResponse {
        address,
        balance,
        currency: CURRENCY.into(),
    })
}

/// `GET /supply`
async fn supply_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(SupplyResponse {
        total_supply: state.node.total_supply(),
        currency: CURRENCY.into(),
    })
}

fn peer_strings(node: &Node) -> Vec<String> {
    node.peers().iter().map(ToString::to_string).collect()
}

// ---------------------------------------------------------------------------
// HTML Pages
// ---------------------------------------------------------------------------

/// `GET /`: a one-line landing page pointing at the explorer.
async fn home_handler(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Denarius</title></head>\
         <body><h2 style=\"text-align:center\">Denarius node {} is running</h2>\
         <p style=\"text-align:center\">Browse the chain at <a href=\"/explorer\">/explorer</a>.</p>\
         </body></html>\n",
        escape_html(&state.node_id)
    ))
}

/// `GET /explorer`: every block with its index, previous hash, nonce, and
/// transactions, oldest first.
async fn explorer_handler(State(state): State<AppState>) -> Html<String> {
    Html(render_explorer(&state.node.chain_snapshot()))
}

fn render_explorer(blocks: &[Block]) -> String {
    let mut page = String::from(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Denarius Explorer</title></head><body>\n\
         <h1 style=\"text-align:center\">Denarius Explorer</h1>\n",
    );
    for block in blocks {
        // Writing into a String cannot fail.
        let _ = write!(
            page,
            "<div style=\"border:1px solid #ccc; padding:10px; margin:10px\">\n\
             <strong>Block #{}</strong><br/>\n\
             Previous hash: {}<br/>\n\
             Nonce: {}<br/>\n\
             <em>Transactions:</em>\n<ul>\n",
            block.index,
            escape_html(&block.previous_hash),
            block.nonce,
        );
        for tx in &block.transactions {
            let _ = writeln!(
                page,
                "<li>{} \u{279c} {}: {} {}</li>",
                escape_html(&tx.sender),
                escape_html(&tx.recipient),
                tx.amount,
                escape_html(&tx.currency),
            );
        }
        page.push_str("</ul>\n</div>\n");
    }
    page.push_str("</body></html>\n");
    page
}

/// Escape the five HTML-significant characters.
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use denarius_protocol::consensus::ProofOfWork;
    use denarius_protocol::crypto::keys::Keypair;
    use denarius_protocol::crypto::signatures::Ed25519Verifier;
    use denarius_protocol::network::sync::{PeerError, SyncConfig};
    use denarius_protocol::storage::MemoryStore;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    /// Serves one fixed chain to every peer.
    struct FixedChain(Vec<Block>);

    #[async_trait]
    impl PeerClient for FixedChain {
        async fn fetch_chain(&self, _peer: &PeerAddress) -> Result<ChainResponse, PeerError> {
            Ok(ChainResponse::new(self.0.clone()))
        }
    }

    fn open_node() -> Arc<Node> {
        Arc::new(
            Node::open(
                ProofOfWork::new("0"),
                Arc::new(Ed25519Verifier),
                Arc::new(MemoryStore::new()),
            )
            .expect("open node"),
        )
    }

    fn test_app_state_with_peer_chain(peer_chain: Vec<Block>) -> AppState {
        let client: Arc<dyn PeerClient> = Arc::new(FixedChain(peer_chain));
        AppState {
            node: open_node(),
            synchronizer: Arc::new(Synchronizer::new(client, SyncConfig::default())),
            metrics: Arc::new(crate::metrics::NodeMetrics::new().expect("metrics")),
            node_id: "test-node".into(),
            mining_stop: StopFlag::new(),
        }
    }

    fn test_app_state() -> AppState {
        test_app_state_with_peer_chain(Vec::new())
    }

    /// Sends a GET request and returns the (status, body_bytes).
    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    /// Sends a POST request with JSON body and returns (status, body_bytes).
    async fn post_json(
        router: &Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    // -- 1. health_endpoint_returns_ok --------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["node_id"], "test-node");
    }

    // -- 2. blockchain_serves_genesis ---------------------------------------

    #[tokio::test]
    async fn blockchain_serves_genesis() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/blockchain").await;

        assert_eq!(status, StatusCode::OK);
        let resp: ChainResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.length, 1);
        assert_eq!(resp.chain[0].index, 0);
    }

    // -- 3. missing_fields_rejected -----------------------------------------

    #[tokio::test]
    async fn missing_fields_rejected() {
        let state = test_app_state();
        let router = create_router(state.clone());
        let (status, body) = post_json(
            &router,
            "/transactions/new",
            serde_json::json!({ "sender": "a", "amount": 5 }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("missing or malformed"));
        assert_eq!(state.metrics.admission_rejections_total.get(), 1);
    }

    // -- 4. reward_transaction_admitted -------------------------------------

    #[tokio::test]
    async fn reward_transaction_admitted() {
        let state = test_app_state();
        let router = create_router(state.clone());
        let (status, body) = post_json(
            &router,
            "/transactions/new",
            serde_json::json!({ "sender": "0", "recipient": "alice", "amount": 5, "signature": "" }),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        let resp: AdmittedResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.index, 1);
        assert_eq!(state.node.pending_count(), 1);
        assert_eq!(state.metrics.pending_transactions.get(), 1);
    }

    // -- 5. overdraft_rejected_with_400 -------------------------------------

    #[tokio::test]
    async fn overdraft_rejected_with_400() {
        let state = test_app_state();
        let router = create_router(state.clone());
        let alice = Keypair::from_seed(&[3u8; 32]);
        let (status, body) = post_json(
            &router,
            "/transactions/new",
            serde_json::json!({
                "sender": alice.address(),
                "recipient": "bob",
                "amount": 10,
                "signature": alice.sign_transfer("bob", 10),
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("insufficient balance"));
        assert_eq!(state.node.pending_count(), 0);
    }

    // -- 6. bad_signature_rejected_with_400 ---------------------------------

    #[tokio::test]
    async fn bad_signature_rejected_with_400() {
        let router = create_router(test_app_state());
        let (status, body) = post_json(
            &router,
            "/transactions/new",
            serde_json::json!({
                "sender": "ab".repeat(32),
                "recipient": "bob",
                "amount": 1,
                "signature": "00".repeat(64),
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("signature"));
    }

    // -- 7. mine_appends_and_rewards_node -----------------------------------

    #[tokio::test]
    async fn mine_appends_and_rewards_node() {
        let state = test_app_state();
        let router = create_router(state.clone());
        let (status, body) = get(&router, "/mine").await;

        assert_eq!(status, StatusCode::OK);
        let resp: MinedResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.block.index, 1);
        assert_eq!(state.node.chain_length(), 2);
        assert_eq!(state.metrics.blocks_mined_total.get(), 1);
        assert_eq!(state.metrics.chain_length.get(), 2);

        let (_, body) = get(&router, "/balance/test-node").await;
        let balance: BalanceResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(balance.balance, 1);
        assert_eq!(balance.currency, "DNR");

        let (_, body) = get(&router, "/supply").await;
        let supply: SupplyResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(supply.total_supply, 1);
    }

    // -- 8. mine_after_shutdown_is_unavailable ------------------------------

    #[tokio::test]
    async fn mine_after_shutdown_is_unavailable() {
        let state = test_app_state();
        state.mining_stop.stop();
        let router = create_router(state.clone());
        let (status, _) = get(&router, "/mine").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(state.node.chain_length(), 1);
    }

    // -- 9. add_nodes_validates_input ---------------------------------------

    #[tokio::test]
    async fn add_nodes_validates_input() {
        let router = create_router(test_app_state());

        let (status, _) = post_json(&router, "/nodes/add_nodes", serde_json::json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            post_json(&router, "/nodes/add_nodes", serde_json::json!({ "nodes": [] })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_json(
            &router,
            "/nodes/add_nodes",
            serde_json::json!({ "nodes": ["good:1", "host:0"] }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = get(&router, "/nodes").await;
        let listed: NodesResponse = serde_json::from_slice(&body).unwrap();
        assert!(listed.nodes.is_empty());
    }

    // -- 10. add_nodes_normalizes -------------------------------------------

    #[tokio::test]
    async fn add_nodes_normalizes() {
        let router = create_router(test_app_state());
        let (status, body) = post_json(
            &router,
            "/nodes/add_nodes",
            serde_json::json!({ "nodes": ["http://Peer-B:5001/", "peer-b:5001", "10.0.0.7"] }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let resp: NodesResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.nodes, vec!["10.0.0.7:80", "peer-b:5001"]);
    }

    // -- 11. sync_adopts_longer_peer_chain ----------------------------------

    #[tokio::test]
    async fn sync_adopts_longer_peer_chain() {
        let remote = open_node();
        remote.mine("remote", &StopFlag::new()).unwrap();
        remote.mine("remote", &StopFlag::new()).unwrap();

        let state = test_app_state_with_peer_chain(remote.chain_snapshot());
        state.node.add_peer("remote:5000").unwrap();
        let router = create_router(state.clone());

        let (status, body) = get(&router, "/nodes/sync").await;
        assert_eq!(status, StatusCode::OK);
        let resp: SyncResponse = serde_json::from_slice(&body).unwrap();
        assert!(resp.updated);
        assert_eq!(resp.length, 3);
        assert_eq!(resp.adopted_from.as_deref(), Some("remote:5000"));
        assert_eq!(resp.chain, remote.chain_snapshot());
        assert_eq!(state.metrics.chain_replacements_total.get(), 1);

        let (_, body) = get(&router, "/nodes/sync").await;
        let resp: SyncResponse = serde_json::from_slice(&body).unwrap();
        assert!(!resp.updated);
        assert_eq!(state.metrics.sync_rounds_total.get(), 2);
    }

    // -- 12. metrics_endpoint_renders ---------------------------------------

    #[tokio::test]
    async fn metrics_endpoint_renders() {
        let router = create_router(test_app_state());
        get(&router, "/mine").await;
        let (status, body) = get(&router, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("denarius_blocks_mined_total 1"));
    }

    // -- 13. landing_page_links_explorer ------------------------------------

    #[tokio::test]
    async fn landing_page_links_explorer() {
        let router = create_router(test_app_state());
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = router.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/html"));
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("href=\"/explorer\""));
        assert!(html.contains("test-node"));
    }

    // -- 14. explorer_lists_blocks_and_transfers ----------------------------

    #[tokio::test]
    async fn explorer_lists_blocks_and_transfers() {
        let state = test_app_state();
        let router = create_router(state.clone());
        post_json(
            &router,
            "/transactions/new",
            serde_json::json!({ "sender": "0", "recipient": "<b>mallory</b>", "amount": 5, "signature": "" }),
        )
        .await;
        let (status, _) = get(&router, "/mine").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = get(&router, "/explorer").await;
        assert_eq!(status, StatusCode::OK);
        let html = String::from_utf8(body).unwrap();

        assert!(html.contains("Block #0"));
        assert!(html.contains("Block #1"));
        let chain = state.node.chain_snapshot();
        assert!(html.contains(&format!("Previous hash: {}", chain[1].previous_hash)));
        assert!(html.contains(&format!("Nonce: {}", chain[1].nonce)));
        assert!(html.contains("0 \u{279c} test-node: 1 DNR"));
        assert!(html.contains("0 \u{279c} &lt;b&gt;mallory&lt;/b&gt;: 5 DNR"));
        assert!(!html.contains("<b>mallory</b>"));
    }

    // -- 15. escape_html_covers_markup_characters ---------------------------

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }
}
