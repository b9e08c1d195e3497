//! # Node Logging
//!
//! One `tracing` subscriber for the whole process, installed by `run` and
//! `init` before the chain file is touched. Sealing, admission and
//! reconciliation all emit structured events through it.
//!
//! ## Design Decisions
//!
//! - **stderr only.** `init` and `status` print their results on stdout;
//!   keeping events off stdout means those can be piped into scripts.
//! - **One output layer, chosen at runtime.** `--log-format` picks the
//!   layer; the filter and writer setup is shared.
//! - **`RUST_LOG` wins.** When it is set and parses, it replaces
//!   [`DEFAULT_FILTER`] entirely. A malformed default falls back to `info`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset: the node, the protocol engine, and
/// per-request HTTP spans.
pub const DEFAULT_FILTER: &str = "denarius_node=info,denarius_protocol=info,tower_http=info";

/// How events are rendered (`--log-format`, `DNR_LOG_FORMAT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Colored text with source locations.
    Pretty,
    /// One JSON object per event, for shipping to a log store.
    Json,
}

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn output_layer(format: LogFormat) -> OutputLayer {
    let base = fmt::layer().with_writer(std::io::stderr).with_target(true);
    match format {
        LogFormat::Pretty => base.with_file(true).with_line_number(true).boxed(),
        LogFormat::Json => base.json().boxed(),
    }
}

/// `RUST_LOG` if present and valid, else `default_filter`, else `info`.
fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(default_filter: &str, format: LogFormat) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(output_layer(format))
        .with(env_filter(default_filter))
        .try_init()?;

    tracing::debug!(?format, "log subscriber installed");
    Ok(())
}
