//! # Cryptographic Primitives
//!
//! Hashing, canonical encoding, and signature checking. Nothing here is
//! clever and nothing here should become clever:
//!
//! - **SHA-256** for every digest: block links, proof-of-work, genesis seed.
//! - **Canonical JSON** as the byte encoding fed to the hash.
//! - **Ed25519** behind the [`SignatureVerifier`] seam for transfer signatures.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{canonical_json, hash_str, hash_value, sha256_hex, Hex256};
pub use keys::{transfer_message, Keypair};
pub use signatures::{Ed25519Verifier, SignatureVerifier};
