//! Core transaction types.
//!
//! A Denarius transaction is four fields and nothing else. No fee, no nonce,
//! no expiry: replay protection is the pool's and the chain's problem, not
//! the record's.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::config::{CURRENCY, REWARD_SENDER};

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A value transfer between two addresses, as sealed into blocks.
///
/// `sender == "0"` marks a system-minted reward. Rewards are exempt from
/// signature and balance checks and only ever credit their recipient.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
    pub currency: String,
}

impl Transaction {
    /// A regular transfer in the native currency.
    pub fn transfer(sender: impl Into<String>, recipient: impl Into<String>, amount: u64) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            currency: CURRENCY.to_string(),
        }
    }

    /// A system-minted reward paid to `recipient`.
    pub fn reward(recipient: impl Into<String>, amount: u64) -> Self {
        Self::transfer(REWARD_SENDER, recipient, amount)
    }

    pub fn is_reward(&self) -> bool {
        self.sender == REWARD_SENDER
    }

    /// Lower to a JSON object. Infallible, unlike `serde_json::to_value`,
    /// because every field is already a plain JSON scalar.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("sender".into(), Value::from(self.sender.as_str()));
        map.insert("recipient".into(), Value::from(self.recipient.as_str()));
        map.insert("amount".into(), Value::from(self.amount));
        map.insert("currency".into(), Value::from(self.currency.as_str()));
        Value::Object(map)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}: {} {}",
            self.sender, self.recipient, self.amount, self.currency
        )
    }
}

// ---------------------------------------------------------------------------
// TransferRequest
// ---------------------------------------------------------------------------

/// Admission input: a transfer plus the sender's signature.
///
/// The signature is hex-encoded and covers `"{sender}:{recipient}:{amount}"`.
/// It is optional on the wire so that reward mints (sender `"0"`) can omit it;
/// for anything else a missing signature is simply an invalid one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
    #[serde(default)]
    pub signature: Option<String>,
}

impl TransferRequest {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: u64,
        signature: Option<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            signature,
        }
    }

    pub fn is_reward(&self) -> bool {
        self.sender == REWARD_SENDER
    }

    /// The pool entry this request becomes once admitted.
    pub fn into_transaction(self) -> Transaction {
        Transaction::transfer(self.sender, self.recipient, self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_uses_reserved_sender() {
        let tx = Transaction::reward("miner", 1);
        assert!(tx.is_reward());
        assert_eq!(tx.sender, "0");
        assert_eq!(tx.currency, "DNR");
    }

    #[test]
    fn transfer_is_not_reward() {
        let tx = Transaction::transfer("alice", "bob", 5);
        assert!(!tx.is_reward());
        assert_eq!(tx.to_string(), "alice -> bob: 5 DNR");
    }

    #[test]
    fn to_value_matches_serde() {
        let tx = Transaction::transfer("alice", "bob", 5);
        assert_eq!(tx.to_value(), serde_json::to_value(&tx).unwrap());
    }

    #[test]
    fn request_signature_defaults_to_none() {
        let req: TransferRequest =
            serde_json::from_str(r#"{"sender":"0","recipient":"bob","amount":3}"#).unwrap();
        assert!(req.is_reward());
        assert_eq!(req.signature, None);
        assert_eq!(req.into_transaction(), Transaction::reward("bob", 3));
    }

    #[test]
    fn negative_amounts_do_not_deserialize() {
        let parsed: Result<TransferRequest, _> =
            serde_json::from_str(r#"{"sender":"a","recipient":"b","amount":-3}"#);
        assert!(parsed.is_err());
    }
}
