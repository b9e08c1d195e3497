//! # Prometheus Metrics
//!
//! Operational metrics for the node, scraped at `/metrics` on the API port.
//!
//! All metrics live in a dedicated [`prometheus::Registry`] with the
//! `denarius` prefix so they never collide with the default global registry.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Handles for every metric the node records.
///
/// Prometheus handles are reference-counted internally, so clones share the
/// same underlying counters.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Blocks sealed and appended by this node.
    pub blocks_mined_total: IntCounter,
    /// Current local chain length, genesis included.
    pub chain_length: IntGauge,
    /// Transactions waiting in the pending pool.
    pub pending_transactions: IntGauge,
    /// Reconciliation rounds run, manual and background.
    pub sync_rounds_total: IntCounter,
    /// Rounds that replaced the local chain with a peer's.
    pub chain_replacements_total: IntCounter,
    /// Transfers refused at admission (bad signature, overdraft, bad body).
    pub admission_rejections_total: IntCounter,
}

impl NodeMetrics {
    /// Create and register all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("denarius".into()), None)?;

        let blocks_mined_total = IntCounter::new(
            "blocks_mined_total",
            "Total number of blocks sealed and appended by this node",
        )?;
        registry.register(Box::new(blocks_mined_total.clone()))?;

        let chain_length = IntGauge::new("chain_length", "Current local chain length")?;
        registry.register(Box::new(chain_length.clone()))?;

        let pending_transactions = IntGauge::new(
            "pending_transactions",
            "Transactions admitted but not yet sealed",
        )?;
        registry.register(Box::new(pending_transactions.clone()))?;

        let sync_rounds_total = IntCounter::new(
            "sync_rounds_total",
            "Total number of reconciliation rounds run",
        )?;
        registry.register(Box::new(sync_rounds_total.clone()))?;

        let chain_replacements_total = IntCounter::new(
            "chain_replacements_total",
            "Reconciliation rounds that adopted a longer peer chain",
        )?;
        registry.register(Box::new(chain_replacements_total.clone()))?;

        let admission_rejections_total = IntCounter::new(
            "admission_rejections_total",
            "Transactions rejected at admission",
        )?;
        registry.register(Box::new(admission_rejections_total.clone()))?;

        Ok(Self {
            registry,
            blocks_mined_total,
            chain_length,
            pending_transactions,
            sync_rounds_total,
            chain_replacements_total,
            admission_rejections_total,
        })
    }

    /// Refresh the gauges that mirror node state.
    pub fn observe(&self, chain_length: usize, pending: usize) {
        self.chain_length.set(chain_length as i64);
        self.pending_transactions.set(pending as i64);
    }

    /// Encode all registered metrics in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<NodeMetrics>;

/// `GET /metrics`. Returns HTTP 500 if encoding fails.
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
