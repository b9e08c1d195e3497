//! Errors surfaced by node operations.
//!
//! Admission rejections (`InvalidSignature`, `InsufficientBalance`) are
//! ordinary, recoverable outcomes: the caller fixes the request and retries.
//! `PersistenceFailure` is fatal to whatever operation triggered it, and at
//! startup it is fatal to the process. Peer failures never show up here;
//! the synchronizer logs and skips them (see [`crate::network::sync::PeerError`]).

use thiserror::Error;

use crate::network::peers::PeerAddressError;
use crate::storage::ledger::Balance;
use crate::storage::store::StoreError;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("signature is missing or does not verify")]
    InvalidSignature,

    #[error("insufficient balance for {address}: has {balance}, needs {amount}")]
    InsufficientBalance {
        address: String,
        balance: Balance,
        amount: u64,
    },

    #[error("chain persistence failed: {0}")]
    PersistenceFailure(#[from] StoreError),

    #[error("chain tip moved while the block was being sealed")]
    StaleTemplate,

    #[error("sealing was aborted before a valid nonce was found")]
    SealAborted,

    #[error("invalid peer address: {0}")]
    InvalidPeerAddress(#[from] PeerAddressError),

    /// A blocking node operation handed to the runtime's blocking pool
    /// panicked or was cancelled.
    #[error("background task failed: {0}")]
    TaskFailed(String),
}

impl NodeError {
    /// Rejections the submitting client can correct and retry.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature | Self::InsufficientBalance { .. } | Self::InvalidPeerAddress(_)
        )
    }
}

pub type NodeResult<T> = Result<T, NodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_classification() {
        assert!(NodeError::InvalidSignature.is_rejection());
        assert!(NodeError::InsufficientBalance {
            address: "a".into(),
            balance: 0,
            amount: 1
        }
        .is_rejection());
        assert!(!NodeError::StaleTemplate.is_rejection());
        assert!(!NodeError::TaskFailed("panicked".into()).is_rejection());
        assert!(!NodeError::PersistenceFailure(StoreError::Unavailable("x".into())).is_rejection());
    }

    #[test]
    fn insufficient_balance_message_names_amounts() {
        let err = NodeError::InsufficientBalance {
            address: "alice".into(),
            balance: -3,
            amount: 10,
        };
        assert_eq!(
            err.to_string(),
            "insufficient balance for alice: has -3, needs 10"
        );
    }
}
