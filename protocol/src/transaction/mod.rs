//! # Transaction Module
//!
//! The ledger's unit of value movement. A [`Transaction`] is what gets sealed
//! into blocks; a [`TransferRequest`] is what a client submits for admission.
//!
//! ## Design Decisions
//!
//! - Amounts are `u64` in whole DNR. Negative amounts cannot be represented,
//!   so "send -5 to yourself" is rejected at the deserialization boundary
//!   rather than by a runtime check that someone will eventually forget.
//! - The currency field is carried on every transaction for wire compatibility,
//!   but only `"DNR"` is ever produced.

pub mod types;

pub use types::{Transaction, TransferRequest};
