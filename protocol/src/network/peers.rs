//! # Peer Registry
//!
//! The set of peer nodes this node reconciles against. Peers are registered
//! by hand (CLI flag, HTTP call); there is no discovery and no gossip.
//!
//! ## Normalization
//!
//! Operators type peer addresses in every imaginable shape:
//! `10.0.0.5:5000`, `http://node-b:5001/`, `HTTPS://Node-C`. All of them are
//! reduced to a canonical `host:port` so that the same peer is never stored
//! twice:
//!
//! 1. Trim whitespace; strip an `http://` or `https://` scheme (any case).
//! 2. Cut at the first `/`, `?` or `#`.
//! 3. Drop any `user:password@` prefix.
//! 4. Split off the port (default 80), lowercase the host.
//!
//! Bracketed IPv6 literals (`[::1]:5000`) keep their brackets.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::config::DEFAULT_PEER_PORT;

/// Why a peer address string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerAddressError {
    #[error("peer address is empty")]
    Empty,

    #[error("peer address has no host: {0:?}")]
    MissingHost(String),

    #[error("peer address has an invalid port: {0:?}")]
    InvalidPort(String),

    #[error("peer host contains invalid characters: {0:?}")]
    InvalidHost(String),
}

// ---------------------------------------------------------------------------
// PeerAddress
// ---------------------------------------------------------------------------

/// A normalized `host:port` peer location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerAddress {
    host: String,
    port: u16,
}

impl PeerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, PeerAddressError> {
        let host = host.into().to_ascii_lowercase();
        validate_host(&host)?;
        Ok(Self { host, port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL for plain-HTTP requests to this peer.
    pub fn base_url(&self) -> String {
        format!("http://{}", self)
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for PeerAddress {
    type Err = PeerAddressError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PeerAddressError::Empty);
        }

        let rest = strip_scheme(trimmed);
        let authority = rest
            .split(|c| c == '/' || c == '?' || c == '#')
            .next()
            .unwrap_or_default();
        let authority = authority.rsplit('@').next().unwrap_or_default();
        if authority.is_empty() {
            return Err(PeerAddressError::MissingHost(raw.to_string()));
        }

        let (host, port) = split_host_port(authority)?;
        if host.is_empty() {
            return Err(PeerAddressError::MissingHost(raw.to_string()));
        }
        Self::new(host, port.unwrap_or(DEFAULT_PEER_PORT))
    }
}

/// Drop a leading `http://` or `https://`, case-insensitively. The prefix is
/// taken with `get`, which yields `None` instead of splitting a multibyte
/// character.
fn strip_scheme(s: &str) -> &str {
    for scheme in ["http://", "https://"] {
        let matched = s
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme));
        if matched {
            return &s[scheme.len()..];
        }
    }
    s
}

fn split_host_port(authority: &str) -> Result<(&str, Option<u16>), PeerAddressError> {
    // [v6]:port
    if authority.starts_with('[') {
        let close = authority
            .find(']')
            .ok_or_else(|| PeerAddressError::InvalidHost(authority.to_string()))?;
        let host = &authority[..=close];
        return match &authority[close + 1..] {
            "" => Ok((host, None)),
            tail => match tail.strip_prefix(':') {
                Some(port) => Ok((host, Some(parse_port(port)?))),
                None => Err(PeerAddressError::InvalidHost(authority.to_string())),
            },
        };
    }

    match authority.rsplit_once(':') {
        Some((host, "")) => Ok((host, None)),
        Some((host, port)) => Ok((host, Some(parse_port(port)?))),
        None => Ok((authority, None)),
    }
}

fn parse_port(port: &str) -> Result<u16, PeerAddressError> {
    match port.parse::<u16>() {
        Ok(p) if p > 0 => Ok(p),
        _ => Err(PeerAddressError::InvalidPort(port.to_string())),
    }
}

fn validate_host(host: &str) -> Result<(), PeerAddressError> {
    let ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '[' | ']' | ':'));
    if ok {
        Ok(())
    } else {
        Err(PeerAddressError::InvalidHost(host.to_string()))
    }
}

// ---------------------------------------------------------------------------
// NodeSet
// ---------------------------------------------------------------------------

/// Deduplicated set of peers. Iteration order is the sorted address order,
/// which keeps reconciliation rounds deterministic.
#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    peers: BTreeSet<PeerAddress>,
}

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize and insert. Returns the stored address; re-adding a known
    /// peer is not an error.
    pub fn add(&mut self, raw: &str) -> Result<PeerAddress, PeerAddressError> {
        let address: PeerAddress = raw.parse()?;
        self.peers.insert(address.clone());
        Ok(address)
    }

    /// Insert many; stops at the first invalid entry, keeping those before it.
    pub fn extend<I, S>(&mut self, raws: I) -> Result<Vec<PeerAddress>, PeerAddressError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raws.into_iter().map(|raw| self.add(raw.as_ref())).collect()
    }

    pub fn list(&self) -> Vec<PeerAddress> {
        self.peers.iter().cloned().collect()
    }

    pub fn contains(&self, address: &PeerAddress) -> bool {
        self.peers.contains(address)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
