//! Signing collaborator interfaces.
//!
//! Important: this crate does NOT implement cryptography. It defines the two
//! operations consensus needs (sign a message, verify a signature over a
//! message hash) and wires a default secp256k1 ECDSA backend from `k256`.
//! Key generation and storage belong to wallets.

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::EncodedPoint;
use rand_core::OsRng;

use crate::serialization::hash32;
use crate::types::{CoreError, Hash32};

/// Produces detached signatures for one key.
pub trait MessageSigner {
    /// Public key (hex) that verifies this signer's signatures.
    fn public_key_hex(&self) -> String;

    /// Sign `message`; the backend hashes it the same way verifiers expect.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CoreError>;
}

/// Checks detached signatures.
pub trait SignatureVerifier: Send + Sync {
    /// Returns `true` iff `signature` over `message_hash` verifies under `public_key`.
    fn verify(&self, public_key: &[u8], message_hash: &Hash32, signature: &[u8]) -> bool;
}

/// secp256k1 ECDSA signer over the SHAKE-256 message hash.
#[derive(Clone)]
pub struct Secp256k1Signer {
    key: SigningKey,
}

impl Secp256k1Signer {
    /// Fresh random key from the operating system RNG.
    pub fn random() -> Self {
        Self {
            key: SigningKey::random(&mut OsRng),
        }
    }

    /// Load a key from its 32-byte scalar.
    pub fn from_bytes(secret: &[u8]) -> Result<Self, CoreError> {
        let key = SigningKey::from_slice(secret)
            .map_err(|_| CoreError::Signing("invalid secp256k1 secret key"))?;
        Ok(Self { key })
    }
}

impl MessageSigner for Secp256k1Signer {
    fn public_key_hex(&self) -> String {
        hex::encode(EncodedPoint::from(self.key.verifying_key()).as_bytes())
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CoreError> {
        let digest = hash32(message);
        let sig: Signature = self
            .key
            .sign_prehash(digest.as_bytes())
            .map_err(|_| CoreError::Signing("ecdsa signing failed"))?;
        Ok(sig.to_bytes().to_vec())
    }
}

/// secp256k1 ECDSA verifier (SEC1 public keys, 64-byte compact signatures).
#[derive(Clone, Copy, Debug, Default)]
pub struct Secp256k1Verifier;

impl SignatureVerifier for Secp256k1Verifier {
    fn verify(&self, public_key: &[u8], message_hash: &Hash32, signature: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::from_sec1_bytes(public_key) else {
            return false;
        };
        let Ok(sig) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify_prehash(message_hash.as_bytes(), &sig).is_ok()
    }
}
