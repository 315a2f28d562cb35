//! Hash functions and signature verification

use crate::error::{Result, ScriptError};
use crate::types::Hash;
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};
use sha2::Sha256;
use sha3::{Digest, Sha3_256};

pub fn sha2_256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

pub fn sha3_256(data: &[u8]) -> Hash {
    Sha3_256::digest(data).into()
}

/// Signature check used by SIGNEDBY, MULTISIG and CHECKSIG
pub trait SignatureVerifier {
    fn verify(&self, data: &[u8], signature: &[u8], public_key: &[u8]) -> bool;
}

/// ECDSA over secp256k1, signing the SHA3-256 digest of the data
///
/// Signatures may be DER or 64-byte compact encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Verifier;

impl SignatureVerifier for Secp256k1Verifier {
    fn verify(&self, data: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        let secp = Secp256k1::verification_only();

        // 1. Parse public key
        let public_key = match PublicKey::from_slice(public_key) {
            Ok(pk) => pk,
            Err(_) => return false,
        };

        // 2. Parse signature (DER, then compact)
        let signature = match Signature::from_der(signature).or_else(|_| Signature::from_compact(signature)) {
            Ok(sig) => sig,
            Err(_) => return false,
        };

        // 3. Verify over the digest
        let message = match Message::from_digest_slice(&sha3_256(data)) {
            Ok(msg) => msg,
            Err(_) => return false,
        };
        secp.verify_ecdsa(&message, &signature, &public_key).is_ok()
    }
}

/// Compressed public key for a 32-byte secret
pub fn public_key(secret_key: &[u8]) -> Result<Vec<u8>> {
    let secp = Secp256k1::signing_only();
    let secret = SecretKey::from_slice(secret_key).map_err(|e| ScriptError::Crypto(e.to_string()))?;
    Ok(PublicKey::from_secret_key(&secp, &secret).serialize().to_vec())
}

/// DER signature accepted by [`Secp256k1Verifier`]
pub fn sign(secret_key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let secp = Secp256k1::signing_only();
    let secret = SecretKey::from_slice(secret_key).map_err(|e| ScriptError::Crypto(e.to_string()))?;
    let message = Message::from_digest_slice(&sha3_256(data)).map_err(|e| ScriptError::Crypto(e.to_string()))?;
    Ok(secp.sign_ecdsa(&message, &secret).serialize_der().to_vec())
}
