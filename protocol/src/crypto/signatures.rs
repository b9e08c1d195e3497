//! # Signature Verification
//!
//! The ledger core treats signature checking as an opaque capability: given
//! a signer identity, a message and a signature, say yes or no. That seam is
//! the [`SignatureVerifier`] trait. The node wires in [`Ed25519Verifier`];
//! tests are free to plug in anything that implements the trait.
//!
//! ## Wire encoding
//!
//! - **Signer identity** is the sender address: hex of a 32-byte Ed25519 public key.
//! - **Signature** is hex of the 64-byte Ed25519 signature.
//! - **Message** is `"{sender}:{recipient}:{amount}"` as UTF-8 bytes
//!   (see [`transfer_message`](super::keys::transfer_message)).
//!
//! Any decoding failure is just "not authentic". Verification never errors
//! and never tells the caller which part was wrong.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

/// Checks whether `signature` authenticates `message` for `signer`.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, signer: &str, message: &str, signature: &str) -> bool;
}

/// Strict Ed25519 verification over hex-encoded keys and signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl Ed25519Verifier {
    fn decode_key(signer: &str) -> Option<VerifyingKey> {
        let bytes: [u8; 32] = hex::decode(signer).ok()?.try_into().ok()?;
        VerifyingKey::from_bytes(&bytes).ok()
    }

    fn decode_signature(signature: &str) -> Option<Signature> {
        let bytes: [u8; 64] = hex::decode(signature).ok()?.try_into().ok()?;
        Some(Signature::from_bytes(&bytes))
    }
}

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, signer: &str, message: &str, signature: &str) -> bool {
        let (Some(key), Some(sig)) = (Self::decode_key(signer), Self::decode_signature(signature))
        else {
            return false;
        };
        key.verify_strict(message.as_bytes(), &sig).is_ok()
    }
}

impl<V: SignatureVerifier + ?Sized> SignatureVerifier for std::sync::Arc<V> {
    fn verify(&self, signer: &str, message: &str, signature: &str) -> bool {
        (**self).verify(signer, message, signature)
    }
}
