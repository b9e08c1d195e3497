//! # Key Management
//!
//! Ed25519 keypairs for Denarius addresses.
//!
//! An address is simply the hex encoding of a 32-byte Ed25519 public key.
//! There is no checksum, no prefix, no Bech32: the ledger compares addresses
//! as opaque strings and the verifier decodes them back into public keys.
//!
//! The core never loads keys from disk. This module exists so that clients
//! (wallet tooling, tests, benches) can produce transfers the admission path
//! will accept, using exactly the message layout the verifier checks.

use ed25519_dalek::{Signer, SigningKey, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during key operations.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: expected {SECRET_KEY_LENGTH} hex-encoded bytes")]
    InvalidSecretKey,
}

/// The exact string a transfer signature covers: `"{sender}:{recipient}:{amount}"`.
///
/// Signers and verifiers must both go through this function. A single stray
/// space on either side turns every signature into garbage.
pub fn transfer_message(sender: &str, recipient: &str, amount: u64) -> String {
    format!("{}:{}:{}", sender, recipient, amount)
}

/// An Ed25519 signing identity.
///
/// Deliberately not `Serialize`: exporting secret material should be an
/// explicit call to [`Keypair::secret_key_hex`], never a side effect of
/// putting a keypair in a JSON response.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic keypair from a 32-byte seed. Tests use this to get
    /// stable addresses.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstruct a keypair from a hex-encoded secret key.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; SECRET_KEY_LENGTH] =
            bytes.try_into().map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// The ledger address of this keypair: hex-encoded public key.
    pub fn address(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Hex-encoded secret key. Handle with care.
    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Sign arbitrary bytes, returning the raw 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Sign a transfer from this keypair's address, returning the hex
    /// signature the admission path expects.
    pub fn sign_transfer(&self, recipient: &str, amount: u64) -> String {
        let message = transfer_message(&self.address(), recipient, amount);
        hex::encode(self.sign(message.as_bytes()))
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material.
        write!(f, "Keypair(address={})", self.address())
    }
}
