use crate::domain::{DomainError, DomainResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};

/// secp256k1 ECDSA operations on 32-byte digests
///
/// Signatures are 64-byte compact (r || s, low-S) encoded as base64;
/// public keys are 33-byte compressed points encoded as base64.
pub struct Ecdsa;

impl Ecdsa {
    /// Build a secret key from raw bytes
    pub fn secret_from_bytes(bytes: &[u8]) -> DomainResult<SecretKey> {
        if bytes.len() != 32 {
            return Err(DomainError::CryptoError(format!(
                "Invalid secret key length: {} (expected 32)",
                bytes.len()
            )));
        }
        SecretKey::from_slice(bytes)
            .map_err(|e| DomainError::CryptoError(format!("Invalid secret key: {}", e)))
    }

    /// Sign a digest and return the base64 compact signature
    pub fn sign(digest: &[u8], secret: &SecretKey) -> DomainResult<String> {
        let secp = Secp256k1::signing_only();
        let message = Self::message(digest)?;
        let signature = secp.sign_ecdsa(&message, secret);
        Ok(BASE64.encode(signature.serialize_compact()))
    }

    /// Verify a base64 signature against a base64 compressed public key
    pub fn verify(digest: &[u8], signature: &str, pubkey: &str) -> bool {
        let secp = Secp256k1::verification_only();

        let Ok(message) = Self::message(digest) else {
            return false;
        };
        let Ok(sig_bytes) = BASE64.decode(signature) else {
            return false;
        };
        let Ok(pub_bytes) = BASE64.decode(pubkey) else {
            return false;
        };
        let (Ok(signature), Ok(public)) = (
            Signature::from_compact(&sig_bytes),
            PublicKey::from_slice(&pub_bytes),
        ) else {
            return false;
        };

        secp.verify_ecdsa(&message, &signature, &public).is_ok()
    }

    /// Base64 of the compressed public key belonging to a secret key
    pub fn public_key_base64(secret: &SecretKey) -> String {
        let secp = Secp256k1::signing_only();
        let public = PublicKey::from_secret_key(&secp, secret);
        BASE64.encode(public.serialize())
    }

    fn message(digest: &[u8]) -> DomainResult<Message> {
        Message::from_digest_slice(digest).map_err(|e| {
            DomainError::CryptoError(format!(
                "Invalid digest length {} (expected 32): {}",
                digest.len(),
                e
            ))
        })
    }
}
